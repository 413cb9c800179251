//! Context key conventions
//!
//! Delegated tasks implemented as graph-flow `Task`s communicate through the
//! shared `Context`:
//!
//! - Inputs: `{task_id}.input.{parameter}`
//! - Outputs: `{task_id}.output.{output}` (absolute path of the produced file)
//! - Metadata: `{task_id}.meta.{field}`

/// Helper for building context keys
pub struct ContextKeys;

impl ContextKeys {
    /// Build an input key: `{task_id}.input.{parameter}`
    pub fn input(task_id: &str, parameter: &str) -> String {
        format!("{}.input.{}", task_id, parameter)
    }

    /// Build an output key: `{task_id}.output.{output}`
    pub fn output(task_id: &str, output: &str) -> String {
        format!("{}.output.{}", task_id, output)
    }

    /// Build a metadata key: `{task_id}.meta.{field}`
    pub fn meta(task_id: &str, field: &str) -> String {
        format!("{}.meta.{}", task_id, field)
    }
}

/// Metadata field holding the task folder
pub const META_FOLDER: &str = "folder";

/// Metadata field holding the execution ID
pub const META_EXECUTION_ID: &str = "execution_id";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keys() {
        assert_eq!(ContextKeys::input("task1", "north"), "task1.input.north");
        assert_eq!(
            ContextKeys::output("task1", "radiation_values"),
            "task1.output.radiation_values"
        );
        assert_eq!(ContextKeys::meta("task1", META_FOLDER), "task1.meta.folder");
    }
}
