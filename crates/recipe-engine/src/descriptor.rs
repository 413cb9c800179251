//! Recipe descriptor traits and metadata types
//!
//! A recipe (entry point) is a declarative node: an ordered input schema,
//! one or more bindings to delegated task templates, and an output schema
//! whose sources are artifacts published by those bindings.
//!
//! Descriptors are built once and never mutated. They carry no execution
//! logic; `RecipeRunner` and the registered `TemplateExecutor`s act on them.

use serde::{Deserialize, Serialize};

use crate::types::{InputKind, InputName, OutputName, TemplateId, ValueSpec};

/// Trait for recipes that can describe themselves
///
/// # Example
///
/// ```ignore
/// use recipe_engine::{DagDescriptor, InputField, RecipeDescriptor};
///
/// impl RecipeDescriptor for MyRecipe {
///     fn descriptor() -> DagDescriptor {
///         DagDescriptor::new("my-recipe", "Does something useful")
///             .input(InputField::integer("north", "North angle").with_default(0))
///     }
/// }
/// ```
pub trait RecipeDescriptor {
    /// Get the static descriptor for this recipe
    fn descriptor() -> DagDescriptor
    where
        Self: Sized;
}

/// Trait for delegated task templates that can describe their contract
pub trait TemplateDescriptor {
    /// Get the parameter and output contract of this template
    fn template() -> TemplateMetadata
    where
        Self: Sized;
}

/// Link-time registration of a recipe descriptor
///
/// ```ignore
/// inventory::submit!(recipe_engine::DescriptorFn(MyRecipe::descriptor));
/// ```
pub struct DescriptorFn(pub fn() -> DagDescriptor);

inventory::collect!(DescriptorFn);

/// Link-time registration of a task template contract
pub struct TemplateFn(pub fn() -> TemplateMetadata);

inventory::collect!(TemplateFn);

/// A declared input of a recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    /// Field name (also the key in input files)
    pub name: InputName,
    /// Semantic type
    pub kind: InputKind,
    /// Human-readable description
    pub description: String,
    /// Default value used when the caller provides none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Validation constraints
    #[serde(default, skip_serializing_if = "ValueSpec::is_empty")]
    pub spec: ValueSpec,
    /// Allowed file extensions, without the dot (file inputs only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    /// Whether the field may be omitted without a default
    #[serde(default)]
    pub optional: bool,
    /// Relative path a file input is staged to inside the run folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl InputField {
    /// Create a new input field with no default and no constraints
    pub fn new(name: impl Into<String>, kind: InputKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            default: None,
            spec: ValueSpec::default(),
            extensions: None,
            optional: false,
            path: None,
        }
    }

    /// Create an integer field
    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::Integer, description)
    }

    /// Create a boolean field
    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::Boolean, description)
    }

    /// Create a floating point field
    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::Number, description)
    }

    /// Create a string field
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::String, description)
    }

    /// Create a file field
    pub fn file(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(name, InputKind::File, description)
    }

    /// Set the default value
    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the inclusive lower bound
    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.spec.minimum = Some(minimum);
        self
    }

    /// Set the inclusive upper bound
    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.spec.maximum = Some(maximum);
        self
    }

    /// Set both inclusive bounds
    pub fn with_range(self, minimum: f64, maximum: f64) -> Self {
        self.with_minimum(minimum).with_maximum(maximum)
    }

    /// Restrict string values to a regular expression
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.spec.pattern = Some(pattern.into());
        self
    }

    /// Require string values to satisfy a registered `ValueFormat`
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.spec.format = Some(format.into());
        self
    }

    /// Restrict values to an enumerated allow-list
    pub fn with_allowed(mut self, allowed: Vec<serde_json::Value>) -> Self {
        self.spec.allowed = Some(allowed);
        self
    }

    /// Restrict file inputs to the given extensions
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Set the relative staging path of a file input
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Mark this field as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// A field is required when it is not optional and has no default
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

/// Where a template parameter gets its value from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingSource {
    /// A declared input of the recipe
    Input(InputName),
    /// A fixed value
    Literal(serde_json::Value),
}

/// Binding of one template parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterBinding {
    /// Parameter name on the template
    pub parameter: String,
    /// Value source
    pub source: BindingSource,
}

/// Rename of a produced artifact into the recipe folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMapping {
    /// Output name on the template
    pub from: String,
    /// Published path, relative to the run folder
    pub to: String,
}

/// One delegated unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBinding {
    /// Task name, unique within the recipe
    pub name: String,
    /// Template the task delegates to
    pub template: TemplateId,
    /// Parameter bindings, in declaration order
    pub parameters: Vec<ParameterBinding>,
    /// Produced artifacts to publish
    pub artifacts: Vec<ArtifactMapping>,
}

impl TaskBinding {
    /// Create a binding with no parameters
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            parameters: Vec::new(),
            artifacts: Vec::new(),
        }
    }

    /// Bind a template parameter to a recipe input
    pub fn bind_input(mut self, parameter: impl Into<String>, input: impl Into<String>) -> Self {
        self.parameters.push(ParameterBinding {
            parameter: parameter.into(),
            source: BindingSource::Input(input.into()),
        });
        self
    }

    /// Bind every listed input to the template parameter of the same name
    pub fn bind_inputs<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        names
            .into_iter()
            .fold(self, |binding, name| binding.bind_input(name, name))
    }

    /// Bind a template parameter to a fixed value
    pub fn bind_literal(
        mut self,
        parameter: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.parameters.push(ParameterBinding {
            parameter: parameter.into(),
            source: BindingSource::Literal(value.into()),
        });
        self
    }

    /// Publish a template output at a path relative to the run folder
    pub fn publish(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.artifacts.push(ArtifactMapping {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Names of the recipe inputs this binding reads
    pub fn bound_inputs(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().filter_map(|p| match &p.source {
            BindingSource::Input(name) => Some(name.as_str()),
            BindingSource::Literal(_) => None,
        })
    }
}

/// A published output of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputField {
    /// Output name
    pub name: OutputName,
    /// Human-readable description
    pub description: String,
    /// Source path, relative to the run folder
    pub source: String,
}

impl OutputField {
    /// Create a file output
    pub fn file(
        name: impl Into<String>,
        source: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            source: source.into(),
        }
    }
}

/// Complete descriptor of a recipe entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DagDescriptor {
    /// Unique recipe name (e.g., "cumulative-radiation")
    pub name: String,
    /// Description of what the recipe does
    pub description: String,
    /// Input schema, in declaration order
    pub inputs: Vec<InputField>,
    /// Delegated tasks
    pub tasks: Vec<TaskBinding>,
    /// Output schema
    pub outputs: Vec<OutputField>,
}

impl DagDescriptor {
    /// Create an empty descriptor
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            inputs: Vec::new(),
            tasks: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Append an input field
    pub fn input(mut self, field: InputField) -> Self {
        self.inputs.push(field);
        self
    }

    /// Append a task binding
    pub fn task(mut self, binding: TaskBinding) -> Self {
        self.tasks.push(binding);
        self
    }

    /// Append an output field
    pub fn output(mut self, field: OutputField) -> Self {
        self.outputs.push(field);
        self
    }

    /// Find an input field by name
    pub fn find_input(&self, name: &str) -> Option<&InputField> {
        self.inputs.iter().find(|f| f.name == name)
    }

    /// Find an output field by name
    pub fn find_output(&self, name: &str) -> Option<&OutputField> {
        self.outputs.iter().find(|f| f.name == name)
    }

    /// Every path published by the task bindings
    pub fn produced_paths(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .flat_map(|t| t.artifacts.iter().map(|a| a.to.as_str()))
            .collect()
    }

    /// Render the input schema as a JSON-Schema object
    pub fn input_json_schema(&self) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for field in &self.inputs {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), field.kind.json_type().into());
            prop.insert("description".into(), field.description.clone().into());
            if field.kind == InputKind::File {
                prop.insert("format".into(), "path".into());
            } else if let Some(format) = &field.spec.format {
                prop.insert("format".into(), format.clone().into());
            }
            if let Some(default) = &field.default {
                prop.insert("default".into(), default.clone());
            }
            if let Some(min) = field.spec.minimum {
                prop.insert("minimum".into(), min.into());
            }
            if let Some(max) = field.spec.maximum {
                prop.insert("maximum".into(), max.into());
            }
            if let Some(allowed) = &field.spec.allowed {
                prop.insert("enum".into(), allowed.clone().into());
            }
            if let Some(pattern) = &field.spec.pattern {
                prop.insert("pattern".into(), pattern.clone().into());
            }
            if let Some(extensions) = &field.extensions {
                prop.insert("x-extensions".into(), extensions.clone().into());
            }
            properties.insert(field.name.clone(), prop.into());

            if field.is_required() {
                required.push(serde_json::Value::from(field.name.clone()));
            }
        }

        serde_json::json!({
            "title": self.name,
            "description": self.description,
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// A parameter accepted by a task template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateParameter {
    /// Parameter name
    pub name: String,
    /// Expected kind
    pub kind: InputKind,
    /// Whether a binding must provide it
    pub required: bool,
}

impl TemplateParameter {
    /// Create a required parameter
    pub fn required(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
        }
    }

    /// Create an optional parameter
    pub fn optional(name: impl Into<String>, kind: InputKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

/// A file produced by a task template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOutput {
    /// Output name
    pub name: String,
    /// Path of the produced file, relative to the task folder
    pub path: String,
    /// Human-readable description
    pub description: String,
}

/// Parameter and output contract of a delegated task template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMetadata {
    /// Template identifier (e.g., "incident-radiation")
    pub template: TemplateId,
    /// Description of the task
    pub description: String,
    /// Accepted parameters
    pub parameters: Vec<TemplateParameter>,
    /// Produced files
    pub outputs: Vec<TemplateOutput>,
}

impl TemplateMetadata {
    /// Find a parameter by name
    pub fn find_parameter(&self, name: &str) -> Option<&TemplateParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Find an output by name
    pub fn find_output(&self, name: &str) -> Option<&TemplateOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }
}
