//! Descriptor and input validation
//!
//! Two passes, both reporting every problem found rather than the first:
//!
//! - `validate_descriptor` checks that a recipe is internally consistent
//!   and agrees with the contracts of the templates it binds.
//! - `validate_inputs` checks caller-provided values against the input
//!   schema and applies defaults.
//!
//! Both run before anything is executed.

use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use thiserror::Error;

use crate::descriptor::{BindingSource, DagDescriptor, InputField, TemplateMetadata};
use crate::formats::find_format;
use crate::inputs::{InputValues, ResolvedInputs};
use crate::types::InputKind;

/// Validation error with location context
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Input '{input}' is declared more than once")]
    DuplicateInput { input: String },

    #[error("Output '{output}' is declared more than once")]
    DuplicateOutput { output: String },

    #[error("Task '{task}' is declared more than once")]
    DuplicateTask { task: String },

    #[error("Task '{task}' binds undeclared input '{input}'")]
    UnknownBoundInput { task: String, input: String },

    #[error("Task '{task}' delegates to unknown template '{template}'")]
    UnknownTemplate { task: String, template: String },

    #[error("Task '{task}' binds unknown template parameter '{parameter}'")]
    UnknownTemplateParameter { task: String, parameter: String },

    #[error("Task '{task}' leaves required template parameter '{parameter}' unbound")]
    UnboundRequiredParameter { task: String, parameter: String },

    #[error("Task '{task}' binds {found} input to {expected} parameter '{parameter}'")]
    BindingTypeMismatch {
        task: String,
        parameter: String,
        expected: InputKind,
        found: InputKind,
    },

    #[error("Task '{task}' publishes unknown template output '{output}'")]
    UnknownTemplateOutput { task: String, output: String },

    #[error("Output '{output}' source '{source_path}' is not produced by any task")]
    UnresolvableArtifact { output: String, source_path: String },

    #[error("Input '{input}' has minimum {minimum} greater than maximum {maximum}")]
    InvalidBounds {
        input: String,
        minimum: f64,
        maximum: f64,
    },

    #[error("Input '{input}' has an invalid default: {reason}")]
    InvalidDefault { input: String, reason: String },

    #[error("Input '{input}' has an invalid pattern '{pattern}'")]
    InvalidPattern { input: String, pattern: String },

    #[error("Input '{input}' refers to unknown format '{format}'")]
    UnknownFormat { input: String, format: String },

    #[error("Value '{value}' for '{input}' is not a valid {format}: {reason}")]
    InvalidFormat {
        input: String,
        value: String,
        format: String,
        reason: String,
    },

    #[error("Missing required input: {input}")]
    MissingRequiredInput { input: String },

    #[error("Unknown input: {input}")]
    UnknownInput { input: String },

    #[error("Invalid type for '{input}': expected {expected}, got {found}")]
    WrongType {
        input: String,
        expected: InputKind,
        found: String,
    },

    #[error("Value {value} for '{input}' is outside {}", describe_range(.minimum, .maximum))]
    OutOfRange {
        input: String,
        value: f64,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },

    #[error("Value {value} for '{input}' is not one of the allowed values")]
    NotAllowed {
        input: String,
        value: serde_json::Value,
    },

    #[error("Value '{value}' for '{input}' does not match pattern '{pattern}'")]
    PatternMismatch {
        input: String,
        value: String,
        pattern: String,
    },

    #[error("File '{path}' for '{input}' needs one of the extensions [{}]", .allowed.join(", "))]
    ExtensionMismatch {
        input: String,
        path: String,
        allowed: Vec<String>,
    },
}

impl ValidationError {
    /// Name of the input field this error is about, if any
    pub fn input(&self) -> Option<&str> {
        match self {
            Self::DuplicateInput { input }
            | Self::UnknownBoundInput { input, .. }
            | Self::InvalidBounds { input, .. }
            | Self::InvalidDefault { input, .. }
            | Self::InvalidPattern { input, .. }
            | Self::UnknownFormat { input, .. }
            | Self::InvalidFormat { input, .. }
            | Self::MissingRequiredInput { input }
            | Self::UnknownInput { input }
            | Self::WrongType { input, .. }
            | Self::OutOfRange { input, .. }
            | Self::NotAllowed { input, .. }
            | Self::PatternMismatch { input, .. }
            | Self::ExtensionMismatch { input, .. } => Some(input),
            _ => None,
        }
    }
}

fn describe_range(minimum: &Option<f64>, maximum: &Option<f64>) -> String {
    match (minimum, maximum) {
        (Some(min), Some(max)) => format!("[{}, {}]", min, max),
        (Some(min), None) => format!("[{}, ∞)", min),
        (None, Some(max)) => format!("(-∞, {}]", max),
        (None, None) => "(-∞, ∞)".to_string(),
    }
}

/// Validate the structure of a recipe descriptor
///
/// Returns all validation errors found (not just the first). `templates`
/// holds the contracts of the templates the recipe may bind; a binding to a
/// template missing from the list is reported.
pub fn validate_descriptor(
    descriptor: &DagDescriptor,
    templates: &[&TemplateMetadata],
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    validate_unique_names(descriptor, &mut errors);
    validate_field_specs(descriptor, &mut errors);
    validate_bindings(descriptor, templates, &mut errors);
    validate_output_sources(descriptor, &mut errors);

    errors
}

/// Check that inputs, outputs and tasks are not declared twice
fn validate_unique_names(descriptor: &DagDescriptor, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for field in &descriptor.inputs {
        if !seen.insert(field.name.as_str()) {
            errors.push(ValidationError::DuplicateInput {
                input: field.name.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for field in &descriptor.outputs {
        if !seen.insert(field.name.as_str()) {
            errors.push(ValidationError::DuplicateOutput {
                output: field.name.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for task in &descriptor.tasks {
        if !seen.insert(task.name.as_str()) {
            errors.push(ValidationError::DuplicateTask {
                task: task.name.clone(),
            });
        }
    }
}

/// Check bounds, patterns and defaults of every field
fn validate_field_specs(descriptor: &DagDescriptor, errors: &mut Vec<ValidationError>) {
    for field in &descriptor.inputs {
        if let (Some(minimum), Some(maximum)) = (field.spec.minimum, field.spec.maximum) {
            if minimum > maximum {
                errors.push(ValidationError::InvalidBounds {
                    input: field.name.clone(),
                    minimum,
                    maximum,
                });
            }
        }

        if let Some(pattern) = &field.spec.pattern {
            if compile_pattern(pattern).is_none() {
                errors.push(ValidationError::InvalidPattern {
                    input: field.name.clone(),
                    pattern: pattern.clone(),
                });
                continue;
            }
        }

        if let Some(format) = &field.spec.format {
            if find_format(format).is_none() {
                errors.push(ValidationError::UnknownFormat {
                    input: field.name.clone(),
                    format: format.clone(),
                });
                continue;
            }
        }

        if let Some(default) = &field.default {
            if let Err(e) = check_value(field, default) {
                errors.push(ValidationError::InvalidDefault {
                    input: field.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Check every binding against the declared inputs and its template contract
fn validate_bindings(
    descriptor: &DagDescriptor,
    templates: &[&TemplateMetadata],
    errors: &mut Vec<ValidationError>,
) {
    for task in &descriptor.tasks {
        for input in task.bound_inputs() {
            if descriptor.find_input(input).is_none() {
                errors.push(ValidationError::UnknownBoundInput {
                    task: task.name.clone(),
                    input: input.to_string(),
                });
            }
        }

        let Some(template) = templates.iter().find(|t| t.template == task.template) else {
            errors.push(ValidationError::UnknownTemplate {
                task: task.name.clone(),
                template: task.template.clone(),
            });
            continue;
        };

        for binding in &task.parameters {
            let Some(parameter) = template.find_parameter(&binding.parameter) else {
                errors.push(ValidationError::UnknownTemplateParameter {
                    task: task.name.clone(),
                    parameter: binding.parameter.clone(),
                });
                continue;
            };

            if let BindingSource::Input(input) = &binding.source {
                if let Some(field) = descriptor.find_input(input) {
                    if !kinds_compatible(field.kind, parameter.kind) {
                        errors.push(ValidationError::BindingTypeMismatch {
                            task: task.name.clone(),
                            parameter: parameter.name.clone(),
                            expected: parameter.kind,
                            found: field.kind,
                        });
                    }
                }
            }
        }

        for parameter in template.parameters.iter().filter(|p| p.required) {
            let bound = task
                .parameters
                .iter()
                .any(|b| b.parameter == parameter.name);
            if !bound {
                errors.push(ValidationError::UnboundRequiredParameter {
                    task: task.name.clone(),
                    parameter: parameter.name.clone(),
                });
            }
        }

        for artifact in &task.artifacts {
            if template.find_output(&artifact.from).is_none() {
                errors.push(ValidationError::UnknownTemplateOutput {
                    task: task.name.clone(),
                    output: artifact.from.clone(),
                });
            }
        }
    }
}

/// Integers widen to numbers; everything else must match exactly
fn kinds_compatible(found: InputKind, expected: InputKind) -> bool {
    found == expected || (found == InputKind::Integer && expected == InputKind::Number)
}

/// Check that each output source is published by some binding
fn validate_output_sources(descriptor: &DagDescriptor, errors: &mut Vec<ValidationError>) {
    let produced: HashSet<&str> = descriptor.produced_paths().into_iter().collect();

    for output in &descriptor.outputs {
        if !produced.contains(output.source.as_str()) {
            errors.push(ValidationError::UnresolvableArtifact {
                output: output.name.clone(),
                source_path: output.source.clone(),
            });
        }
    }
}

/// Check a single value against a field's type and constraints
pub fn check_value(field: &InputField, value: &serde_json::Value) -> Result<(), ValidationError> {
    if !field.kind.accepts(value) {
        return Err(ValidationError::WrongType {
            input: field.name.clone(),
            expected: field.kind,
            found: json_type_name(value).to_string(),
        });
    }

    if field.kind.is_numeric() {
        if let Some(number) = value.as_f64() {
            if !field.spec.contains(number) {
                return Err(ValidationError::OutOfRange {
                    input: field.name.clone(),
                    value: number,
                    minimum: field.spec.minimum,
                    maximum: field.spec.maximum,
                });
            }
        }
    }

    if let Some(allowed) = &field.spec.allowed {
        if !allowed.iter().any(|a| values_equal(a, value)) {
            return Err(ValidationError::NotAllowed {
                input: field.name.clone(),
                value: value.clone(),
            });
        }
    }

    if let (Some(pattern), Some(text)) = (&field.spec.pattern, value.as_str()) {
        let matches = compile_pattern(pattern)
            .map(|re| re.is_match(text))
            .unwrap_or(false);
        if !matches {
            return Err(ValidationError::PatternMismatch {
                input: field.name.clone(),
                value: text.to_string(),
                pattern: pattern.clone(),
            });
        }
    }

    if let (Some(name), Some(text)) = (&field.spec.format, value.as_str()) {
        let format = find_format(name).ok_or_else(|| ValidationError::UnknownFormat {
            input: field.name.clone(),
            format: name.clone(),
        })?;
        if let Err(reason) = (format.check)(text) {
            return Err(ValidationError::InvalidFormat {
                input: field.name.clone(),
                value: text.to_string(),
                format: name.clone(),
                reason,
            });
        }
    }

    if let (Some(extensions), Some(path)) = (&field.extensions, value.as_str()) {
        if !has_allowed_extension(path, extensions) {
            return Err(ValidationError::ExtensionMismatch {
                input: field.name.clone(),
                path: path.to_string(),
                allowed: extensions.clone(),
            });
        }
    }

    Ok(())
}

/// Validate caller-provided values against a descriptor's input schema
///
/// Returns the resolved values (defaults applied) or every error found.
pub fn validate_inputs(
    descriptor: &DagDescriptor,
    values: &InputValues,
) -> Result<ResolvedInputs, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut resolved = ResolvedInputs::default();

    for name in values.names() {
        if descriptor.find_input(name).is_none() {
            errors.push(ValidationError::UnknownInput {
                input: name.to_string(),
            });
        }
    }

    for field in &descriptor.inputs {
        match values.get(&field.name) {
            Some(value) => match check_value(field, value) {
                Ok(()) => resolved.insert(field.name.clone(), value.clone()),
                Err(e) => errors.push(e),
            },
            None => match &field.default {
                Some(default) => resolved.insert(field.name.clone(), default.clone()),
                None if field.optional => {}
                None => errors.push(ValidationError::MissingRequiredInput {
                    input: field.name.clone(),
                }),
            },
        }
    }

    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(errors)
    }
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).ok()
}

fn has_allowed_extension(path: &str, allowed: &[String]) -> bool {
    let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    allowed
        .iter()
        .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Numbers compare by value so `1` and `1.0` are the same allowed entry
fn values_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_f64() => "number",
        serde_json::Value::Number(_) => "integer",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
