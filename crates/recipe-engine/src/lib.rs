//! Recipe Engine - declarative entry points for delegated simulation tasks
//!
//! A recipe describes one step of a larger pipeline without doing any of
//! the work itself:
//!
//! - an ordered input schema with defaults, optionality and bounds
//! - bindings from those inputs to the parameters of external task templates
//! - an output schema whose sources are artifacts the templates produce
//!
//! # Architecture
//!
//! - `DagDescriptor`: immutable schema plus task bindings
//! - `validation`: descriptor consistency and fail-fast input checks
//! - `RecipeRegistry`: recipes and template contracts, collected via `inventory`
//! - `TemplateExecutor`: the one operation a delegated task exposes
//! - `RecipeRunner`: validate → stage → execute → publish, reporting to an `EventSink`
//!
//! # Example
//!
//! ```ignore
//! use recipe_engine::{InputValues, RecipeRegistry, RecipeRunner};
//!
//! let registry = Arc::new(RecipeRegistry::with_builtins());
//! let runner = RecipeRunner::new(registry);
//! let outputs = runner.run("cumulative-radiation", &values, folder).await?;
//! ```

pub mod context;
pub mod descriptor;
pub mod error;
pub mod events;
pub mod formats;
pub mod inputs;
pub mod registry;
pub mod runner;
pub mod types;
pub mod validation;

// Re-export key types
pub use context::ContextKeys;
pub use descriptor::{
    ArtifactMapping, BindingSource, DagDescriptor, DescriptorFn, InputField, OutputField,
    ParameterBinding, RecipeDescriptor, TaskBinding, TemplateDescriptor, TemplateFn,
    TemplateMetadata, TemplateOutput, TemplateParameter,
};
pub use error::{RecipeError, Result};
pub use events::{EventSink, LogEventSink, NullEventSink, RecipeEvent, VecEventSink};
pub use formats::{find_format, ValueFormat};
pub use inputs::{InputValues, ResolvedInputs};
pub use registry::{
    GraphTaskExecutor, ProducedArtifacts, RecipeRegistry, SharedExecutorFactory,
    SyncCallbackExecutor, TaskInvocation, TemplateExecutor, TemplateExecutorFactory,
};
pub use runner::{RecipeRunner, RunOutputs};
pub use types::{InputKind, ValueSpec};
pub use validation::{check_value, validate_descriptor, validate_inputs, ValidationError};

// Re-export graph-flow types that template implementations need
pub use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};

// Re-export inventory so descriptor crates submit against the same version
pub use inventory;
