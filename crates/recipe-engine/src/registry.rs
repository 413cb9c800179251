//! Recipe and template registry
//!
//! Maps recipe names to their descriptors, and template ids to their
//! contracts and executors. Descriptors submitted through `inventory`
//! are picked up by `RecipeRegistry::with_builtins()`; executors are
//! attached by the host, since they usually need configuration.
//!
//! # Usage
//!
//! ```ignore
//! use recipe_engine::RecipeRegistry;
//!
//! let mut registry = RecipeRegistry::with_builtins();
//! registry.attach_executor("incident-radiation", Arc::new(MyExecutorFactory))?;
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use graph_flow::{Context, Task};

use crate::context::{ContextKeys, META_EXECUTION_ID, META_FOLDER};
use crate::descriptor::{DagDescriptor, DescriptorFn, TemplateFn, TemplateMetadata};
use crate::error::{RecipeError, Result};

/// Produced artifacts keyed by template output name
pub type ProducedArtifacts = HashMap<String, PathBuf>;

/// One call of a delegated task
#[derive(Debug, Clone)]
pub struct TaskInvocation {
    /// Execution this call belongs to
    pub execution_id: String,
    /// Task binding name
    pub task_id: String,
    /// Template being invoked
    pub template: String,
    /// Folder the task runs in; produced paths are relative to it
    pub folder: PathBuf,
    /// Bound parameter values
    pub inputs: BTreeMap<String, serde_json::Value>,
}

impl TaskInvocation {
    /// Get a bound parameter value
    pub fn input(&self, parameter: &str) -> Option<&serde_json::Value> {
        self.inputs.get(parameter)
    }
}

/// Executor for one task template
///
/// The only operation a delegated task exposes: take bound inputs,
/// return the files it produced.
#[async_trait]
pub trait TemplateExecutor: Send + Sync {
    /// Execute the template with the given invocation
    async fn execute(
        &self,
        invocation: &TaskInvocation,
        context: &Context,
    ) -> Result<ProducedArtifacts>;
}

/// Factory for creating or returning a shared TemplateExecutor
pub trait TemplateExecutorFactory: Send + Sync {
    fn create_executor(&self) -> Arc<dyn TemplateExecutor>;
}

/// A registration entry combining a contract with an optional executor factory
struct TemplateEntry {
    metadata: TemplateMetadata,
    factory: Option<Arc<dyn TemplateExecutorFactory>>,
}

/// Registry of recipes and task templates
pub struct RecipeRegistry {
    recipes: HashMap<String, DagDescriptor>,
    templates: HashMap<String, TemplateEntry>,
}

impl RecipeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            recipes: HashMap::new(),
            templates: HashMap::new(),
        }
    }

    /// Create a registry holding every descriptor submitted via `inventory`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in inventory::iter::<DescriptorFn> {
            registry.register_recipe((descriptor.0)());
        }
        for template in inventory::iter::<TemplateFn> {
            registry.register_template((template.0)());
        }
        log::debug!(
            "Collected {} recipes and {} templates",
            registry.recipes.len(),
            registry.templates.len()
        );
        registry
    }

    /// Register a recipe descriptor
    pub fn register_recipe(&mut self, descriptor: DagDescriptor) {
        self.recipes.insert(descriptor.name.clone(), descriptor);
    }

    /// Register a template contract without an executor
    ///
    /// An executor attached earlier for the same template is kept.
    pub fn register_template(&mut self, metadata: TemplateMetadata) {
        let factory = self
            .templates
            .remove(&metadata.template)
            .and_then(|entry| entry.factory);
        self.templates
            .insert(metadata.template.clone(), TemplateEntry { metadata, factory });
    }

    /// Register a template contract with an executor factory
    pub fn register_executor(
        &mut self,
        metadata: TemplateMetadata,
        factory: Arc<dyn TemplateExecutorFactory>,
    ) {
        self.templates.insert(
            metadata.template.clone(),
            TemplateEntry {
                metadata,
                factory: Some(factory),
            },
        );
    }

    /// Attach an executor factory to an already registered template
    pub fn attach_executor(
        &mut self,
        template: &str,
        factory: Arc<dyn TemplateExecutorFactory>,
    ) -> Result<()> {
        let entry = self
            .templates
            .get_mut(template)
            .ok_or_else(|| RecipeError::UnknownTemplate(template.to_string()))?;
        entry.factory = Some(factory);
        Ok(())
    }

    /// Register a template backed by a synchronous callback
    pub fn register_callback<F>(&mut self, metadata: TemplateMetadata, callback: F)
    where
        F: Fn(&TaskInvocation) -> Result<ProducedArtifacts> + Send + Sync + 'static,
    {
        let executor: Arc<dyn TemplateExecutor> = Arc::new(SyncCallbackExecutor::new(callback));
        self.register_executor(metadata, Arc::new(SharedExecutorFactory { executor }));
    }

    /// Get a recipe descriptor by name
    pub fn recipe(&self, name: &str) -> Option<&DagDescriptor> {
        self.recipes.get(name)
    }

    /// Check if a recipe is registered
    pub fn has_recipe(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    /// All recipe names, sorted
    pub fn recipe_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.recipes.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get a template contract by id
    pub fn template(&self, template: &str) -> Option<&TemplateMetadata> {
        self.templates.get(template).map(|e| &e.metadata)
    }

    /// Contracts of every template a recipe binds that is registered
    pub fn templates_for(&self, descriptor: &DagDescriptor) -> Vec<&TemplateMetadata> {
        let mut found: Vec<&TemplateMetadata> = Vec::new();
        for task in &descriptor.tasks {
            if let Some(metadata) = self.template(&task.template) {
                if !found.iter().any(|m| m.template == metadata.template) {
                    found.push(metadata);
                }
            }
        }
        found
    }

    /// Get the executor for a template
    pub fn executor(&self, template: &str) -> Option<Arc<dyn TemplateExecutor>> {
        self.templates
            .get(template)
            .and_then(|e| e.factory.as_ref())
            .map(|f| f.create_executor())
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` with the same name.
    pub fn merge(&mut self, other: RecipeRegistry) {
        self.recipes.extend(other.recipes);
        self.templates.extend(other.templates);
    }
}

impl Default for RecipeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Synchronous callback-based TemplateExecutor
///
/// Wraps a closure; used by hosts that run the tool themselves and by tests.
pub struct SyncCallbackExecutor {
    callback: Box<dyn Fn(&TaskInvocation) -> Result<ProducedArtifacts> + Send + Sync>,
}

impl SyncCallbackExecutor {
    pub fn new(
        callback: impl Fn(&TaskInvocation) -> Result<ProducedArtifacts> + Send + Sync + 'static,
    ) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl TemplateExecutor for SyncCallbackExecutor {
    async fn execute(
        &self,
        invocation: &TaskInvocation,
        _context: &Context,
    ) -> Result<ProducedArtifacts> {
        (self.callback)(invocation)
    }
}

/// Factory that returns a shared executor instance
pub struct SharedExecutorFactory {
    executor: Arc<dyn TemplateExecutor>,
}

impl SharedExecutorFactory {
    pub fn new(executor: Arc<dyn TemplateExecutor>) -> Self {
        Self { executor }
    }
}

impl TemplateExecutorFactory for SharedExecutorFactory {
    fn create_executor(&self) -> Arc<dyn TemplateExecutor> {
        self.executor.clone()
    }
}

type TaskBuilder = Box<dyn Fn(&TaskInvocation) -> Box<dyn Task> + Send + Sync>;

/// Runs a graph-flow `Task` as a template executor
///
/// Bound inputs are written to `{task_id}.input.{parameter}`, the task
/// folder and execution id to `{task_id}.meta.*`. After the task runs,
/// each template output is read from `{task_id}.output.{name}`; outputs
/// the task did not report fall back to the template's declared path
/// inside the task folder.
pub struct GraphTaskExecutor {
    metadata: TemplateMetadata,
    build_task: TaskBuilder,
}

impl GraphTaskExecutor {
    pub fn new(
        metadata: TemplateMetadata,
        build_task: impl Fn(&TaskInvocation) -> Box<dyn Task> + Send + Sync + 'static,
    ) -> Self {
        Self {
            metadata,
            build_task: Box::new(build_task),
        }
    }
}

#[async_trait]
impl TemplateExecutor for GraphTaskExecutor {
    async fn execute(
        &self,
        invocation: &TaskInvocation,
        context: &Context,
    ) -> Result<ProducedArtifacts> {
        let task_id = invocation.task_id.as_str();

        for (parameter, value) in &invocation.inputs {
            context
                .set(ContextKeys::input(task_id, parameter), value.clone())
                .await;
        }
        context
            .set(
                ContextKeys::meta(task_id, META_FOLDER),
                invocation.folder.to_string_lossy().to_string(),
            )
            .await;
        context
            .set(
                ContextKeys::meta(task_id, META_EXECUTION_ID),
                invocation.execution_id.clone(),
            )
            .await;

        let task = (self.build_task)(invocation);
        log::debug!(
            "GraphTaskExecutor: running task '{}' for template '{}'",
            task.id(),
            self.metadata.template
        );
        task.run(context.clone())
            .await
            .map_err(RecipeError::from_graph_flow)?;

        let mut produced = ProducedArtifacts::new();
        for output in &self.metadata.outputs {
            let reported: Option<String> =
                context.get(&ContextKeys::output(task_id, &output.name)).await;
            let path = reported
                .map(PathBuf::from)
                .unwrap_or_else(|| invocation.folder.join(&output.path));
            produced.insert(output.name.clone(), path);
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{InputField, TaskBinding, TemplateOutput, TemplateParameter};
    use crate::types::InputKind;
    use graph_flow::{NextAction, TaskResult};

    fn test_template(id: &str) -> TemplateMetadata {
        TemplateMetadata {
            template: id.to_string(),
            description: format!("Test {}", id),
            parameters: vec![TemplateParameter::optional("value", InputKind::String)],
            outputs: vec![TemplateOutput {
                name: "result".to_string(),
                path: "result.txt".to_string(),
                description: "Result".to_string(),
            }],
        }
    }

    fn test_recipe(name: &str, template: &str) -> DagDescriptor {
        DagDescriptor::new(name, "Test recipe")
            .input(InputField::string("value", "Value").with_default("x"))
            .task(TaskBinding::new("run", template).bind_inputs(["value"]))
    }

    fn invocation(folder: PathBuf) -> TaskInvocation {
        let mut inputs = BTreeMap::new();
        inputs.insert("value".to_string(), serde_json::json!("hello"));
        TaskInvocation {
            execution_id: "exec-1".to_string(),
            task_id: "run".to_string(),
            template: "echo".to_string(),
            folder,
            inputs,
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = RecipeRegistry::new();
        registry.register_recipe(test_recipe("b-recipe", "echo"));
        registry.register_recipe(test_recipe("a-recipe", "echo"));
        registry.register_template(test_template("echo"));

        assert!(registry.has_recipe("a-recipe"));
        assert!(!registry.has_recipe("unknown"));
        assert_eq!(registry.recipe_names(), vec!["a-recipe", "b-recipe"]);
        assert!(registry.template("echo").is_some());
        assert!(registry.executor("echo").is_none());
    }

    #[test]
    fn test_templates_for_deduplicates() {
        let mut registry = RecipeRegistry::new();
        registry.register_template(test_template("echo"));
        let recipe = test_recipe("r", "echo").task(TaskBinding::new("again", "echo"));

        let templates = registry.templates_for(&recipe);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].template, "echo");
    }

    #[test]
    fn test_attach_executor() {
        let mut registry = RecipeRegistry::new();
        let factory = Arc::new(SharedExecutorFactory::new(Arc::new(SyncCallbackExecutor::new(
            |_| Ok(ProducedArtifacts::new()),
        ))));

        assert!(matches!(
            registry.attach_executor("echo", factory.clone()),
            Err(RecipeError::UnknownTemplate(_))
        ));

        registry.register_template(test_template("echo"));
        registry.attach_executor("echo", factory).unwrap();
        assert!(registry.executor("echo").is_some());

        // Re-registering the contract keeps the executor
        registry.register_template(test_template("echo"));
        assert!(registry.executor("echo").is_some());
    }

    #[test]
    fn test_merge_override() {
        let mut registry1 = RecipeRegistry::new();
        let mut original = test_recipe("r", "echo");
        original.description = "Original".to_string();
        registry1.register_recipe(original);

        let mut registry2 = RecipeRegistry::new();
        let mut replacement = test_recipe("r", "echo");
        replacement.description = "Override".to_string();
        registry2.register_recipe(replacement);
        registry2.register_template(test_template("echo"));

        registry1.merge(registry2);
        assert_eq!(registry1.recipe("r").unwrap().description, "Override");
        assert!(registry1.template("echo").is_some());
    }

    #[tokio::test]
    async fn test_register_callback() {
        let mut registry = RecipeRegistry::new();
        registry.register_callback(test_template("echo"), |inv| {
            let mut produced = ProducedArtifacts::new();
            produced.insert("result".to_string(), inv.folder.join("result.txt"));
            Ok(produced)
        });

        let executor = registry.executor("echo").unwrap();
        let context = Context::new();
        let produced = executor
            .execute(&invocation(PathBuf::from("/runs/1")), &context)
            .await
            .unwrap();
        assert_eq!(produced["result"], PathBuf::from("/runs/1/result.txt"));
    }

    struct EchoTask {
        id: String,
    }

    #[async_trait]
    impl Task for EchoTask {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
            let value: Option<String> = context.get(&ContextKeys::input(&self.id, "value")).await;
            let folder: Option<String> = context
                .get(&ContextKeys::meta(&self.id, META_FOLDER))
                .await;
            let path = format!("{}/{}.txt", folder.unwrap_or_default(), value.unwrap_or_default());
            context
                .set(ContextKeys::output(&self.id, "result"), path.clone())
                .await;
            Ok(TaskResult::new(Some(path), NextAction::Continue))
        }
    }

    #[tokio::test]
    async fn test_graph_task_executor_reads_reported_outputs() {
        let executor = GraphTaskExecutor::new(test_template("echo"), |inv| {
            Box::new(EchoTask {
                id: inv.task_id.clone(),
            })
        });

        let context = Context::new();
        let produced = executor
            .execute(&invocation(PathBuf::from("/runs/1")), &context)
            .await
            .unwrap();

        assert_eq!(produced["result"], PathBuf::from("/runs/1/hello.txt"));
        let stored: Option<String> = context.get(&ContextKeys::input("run", "value")).await;
        assert_eq!(stored.as_deref(), Some("hello"));
    }

    struct SilentTask;

    #[async_trait]
    impl Task for SilentTask {
        fn id(&self) -> &str {
            "silent"
        }

        async fn run(&self, _context: Context) -> graph_flow::Result<TaskResult> {
            Ok(TaskResult::new(None, NextAction::Continue))
        }
    }

    #[test]
    fn test_graph_task_executor_falls_back_to_declared_paths() {
        let executor = GraphTaskExecutor::new(test_template("echo"), |_| Box::new(SilentTask));
        let context = Context::new();

        let produced = tokio_test::block_on(
            executor.execute(&invocation(PathBuf::from("/runs/2")), &context),
        )
        .unwrap();
        assert_eq!(produced["result"], PathBuf::from("/runs/2/result.txt"));
    }
}
