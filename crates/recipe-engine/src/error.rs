//! Error types for the recipe engine

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type alias using RecipeError
pub type Result<T> = std::result::Result<T, RecipeError>;

/// Errors that can occur while describing, validating or running a recipe
#[derive(Debug, Error)]
pub enum RecipeError {
    /// The descriptor itself is inconsistent
    #[error("Invalid recipe descriptor '{recipe}': {}", join_errors(.errors))]
    InvalidDescriptor {
        recipe: String,
        errors: Vec<ValidationError>,
    },

    /// Caller-provided input values failed validation
    #[error("Invalid inputs for recipe '{recipe}': {}", join_errors(.errors))]
    InvalidInputs {
        recipe: String,
        errors: Vec<ValidationError>,
    },

    /// No recipe registered under this name
    #[error("Unknown recipe: {0}")]
    UnknownRecipe(String),

    /// No template registered under this id
    #[error("Unknown task template: {0}")]
    UnknownTemplate(String),

    /// A template is known but nothing can execute it
    #[error("No executor registered for task template '{0}'")]
    NoExecutor(String),

    /// A file input points at something that does not exist
    #[error("Input '{input}' references a path that cannot be resolved: {path}")]
    UnresolvablePath { input: String, path: String },

    /// A published artifact or output source was not produced
    #[error("Artifact '{name}' cannot be resolved at '{path}'")]
    UnresolvableArtifact { name: String, path: String },

    /// The delegated task failed
    #[error("Task execution failed: {0}")]
    ExecutionFailed(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecipeError {
    /// Create from a graph-flow error
    ///
    /// A task failure keeps only the task's own message.
    pub fn from_graph_flow(err: graph_flow::GraphError) -> Self {
        match err {
            graph_flow::GraphError::TaskExecutionFailed(msg) => Self::ExecutionFailed(msg),
            other => Self::ExecutionFailed(other.to_string()),
        }
    }

    /// Validation errors carried by this error, if any
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            Self::InvalidDescriptor { errors, .. } | Self::InvalidInputs { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Whether this error was raised before any task was executed
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDescriptor { .. }
                | Self::InvalidInputs { .. }
                | Self::UnknownRecipe(_)
                | Self::UnknownTemplate(_)
                | Self::NoExecutor(_)
                | Self::UnresolvablePath { .. }
        )
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_inputs_message_lists_every_error() {
        let err = RecipeError::InvalidInputs {
            recipe: "demo".to_string(),
            errors: vec![
                ValidationError::MissingRequiredInput {
                    input: "epw".to_string(),
                },
                ValidationError::MissingRequiredInput {
                    input: "study_mesh".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("'demo'"));
        assert!(msg.contains("epw"));
        assert!(msg.contains("study_mesh"));
        assert_eq!(err.validation_errors().len(), 2);
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_execution_failure_is_not_configuration_error() {
        let err = RecipeError::ExecutionFailed("exit code 2".to_string());
        assert!(!err.is_configuration_error());
        assert!(err.validation_errors().is_empty());
    }

    #[test]
    fn test_graph_flow_task_failure_has_single_prefix() {
        let err = RecipeError::from_graph_flow(graph_flow::GraphError::TaskExecutionFailed(
            "tool exited with code 2".to_string(),
        ));
        assert_eq!(
            err.to_string(),
            "Task execution failed: tool exited with code 2"
        );
    }
}
