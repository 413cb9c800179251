//! Local recipe runner
//!
//! Plays the orchestrator's part for a single recipe run:
//!
//! 1. check the descriptor against the templates it binds,
//! 2. validate input values (nothing is touched on disk before this passes),
//! 3. resolve every file input, then create the run folder and stage them,
//! 4. invoke each task binding with its bound inputs,
//! 5. copy produced artifacts to their published paths,
//! 6. resolve the recipe outputs.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use graph_flow::Context;
use serde::Serialize;
use tokio::fs;

use crate::descriptor::{BindingSource, DagDescriptor, TaskBinding};
use crate::error::{RecipeError, Result};
use crate::events::{EventSink, NullEventSink, RecipeEvent};
use crate::inputs::{InputValues, ResolvedInputs};
use crate::registry::{RecipeRegistry, TaskInvocation};
use crate::types::InputKind;
use crate::validation::{validate_descriptor, validate_inputs};

/// Published outputs of a finished run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutputs {
    /// Execution ID of the run
    pub execution_id: String,
    /// Run folder
    pub folder: PathBuf,
    /// Absolute path of each recipe output
    pub outputs: BTreeMap<String, PathBuf>,
}

impl RunOutputs {
    /// Get the path of an output by name
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.outputs.get(name).map(|p| p.as_path())
    }
}

/// Runs registered recipes against a folder on disk
pub struct RecipeRunner {
    registry: Arc<RecipeRegistry>,
    events: Arc<dyn EventSink>,
}

impl RecipeRunner {
    /// Create a runner that discards events
    pub fn new(registry: Arc<RecipeRegistry>) -> Self {
        Self {
            registry,
            events: Arc::new(NullEventSink),
        }
    }

    /// Create a runner that reports to the given sink
    pub fn with_events(registry: Arc<RecipeRegistry>, events: Arc<dyn EventSink>) -> Self {
        Self { registry, events }
    }

    /// Get a reference to the underlying registry
    pub fn registry(&self) -> &RecipeRegistry {
        &self.registry
    }

    /// Check a recipe and its input values without running anything
    pub fn validate(&self, recipe: &str, values: &InputValues) -> Result<ResolvedInputs> {
        let descriptor = self.checked_descriptor(recipe)?;
        validate_inputs(descriptor, values).map_err(|errors| RecipeError::InvalidInputs {
            recipe: recipe.to_string(),
            errors,
        })
    }

    /// Run a recipe in `folder`
    ///
    /// File inputs are resolved before `folder` is created, so a run that
    /// fails on a missing file leaves nothing behind.
    pub async fn run(
        &self,
        recipe: &str,
        values: &InputValues,
        folder: &Path,
    ) -> Result<RunOutputs> {
        let execution_id = uuid::Uuid::new_v4().to_string();
        self.emit(RecipeEvent::RunStarted {
            recipe: recipe.to_string(),
            execution_id: execution_id.clone(),
            folder: folder.display().to_string(),
        });

        let result = self.run_inner(recipe, values, folder, &execution_id).await;

        match &result {
            Ok(outputs) => self.emit(RecipeEvent::RunCompleted {
                recipe: recipe.to_string(),
                execution_id: execution_id.clone(),
                outputs: outputs.outputs.keys().cloned().collect(),
            }),
            Err(e) => self.emit(RecipeEvent::RunFailed {
                recipe: recipe.to_string(),
                execution_id: execution_id.clone(),
                error: e.to_string(),
            }),
        }

        result
    }

    async fn run_inner(
        &self,
        recipe: &str,
        values: &InputValues,
        folder: &Path,
        execution_id: &str,
    ) -> Result<RunOutputs> {
        let resolved = self.validate(recipe, values)?;
        let descriptor = self.checked_descriptor(recipe)?;

        // Every executor must exist before anything is staged
        let mut executors = Vec::with_capacity(descriptor.tasks.len());
        for task in &descriptor.tasks {
            let executor = self
                .registry
                .executor(&task.template)
                .ok_or_else(|| RecipeError::NoExecutor(task.template.clone()))?;
            executors.push(executor);
        }

        self.emit(RecipeEvent::InputsValidated {
            recipe: recipe.to_string(),
            execution_id: execution_id.to_string(),
            resolved: resolved.len(),
        });

        // Resolve every file input before the run folder is created
        let folder = absolute(folder)?;
        let plan = plan_staging(descriptor, &resolved, &folder).await?;
        fs::create_dir_all(&folder).await?;
        stage_inputs(&plan.copies).await?;
        let staged = plan.inputs;

        let context = Context::new();
        for (task, executor) in descriptor.tasks.iter().zip(executors) {
            let invocation = TaskInvocation {
                execution_id: execution_id.to_string(),
                task_id: task.name.clone(),
                template: task.template.clone(),
                folder: folder.join(&task.name),
                inputs: bind_inputs(task, &staged),
            };
            fs::create_dir_all(&invocation.folder).await?;

            self.emit(RecipeEvent::TaskStarted {
                task: task.name.clone(),
                template: task.template.clone(),
                execution_id: execution_id.to_string(),
            });
            log::info!(
                "Running task '{}' ({}) with {} bound inputs",
                task.name,
                task.template,
                invocation.inputs.len()
            );

            let produced = match executor.execute(&invocation, &context).await {
                Ok(produced) => produced,
                Err(e) => {
                    self.emit(RecipeEvent::TaskFailed {
                        task: task.name.clone(),
                        execution_id: execution_id.to_string(),
                        error: e.to_string(),
                    });
                    return Err(e);
                }
            };

            self.emit(RecipeEvent::TaskCompleted {
                task: task.name.clone(),
                execution_id: execution_id.to_string(),
                artifacts: produced.keys().cloned().collect(),
            });

            self.publish_artifacts(task, &produced, &folder, execution_id)
                .await?;
        }

        let mut outputs = BTreeMap::new();
        for output in &descriptor.outputs {
            let path = folder.join(&output.source);
            if !is_file(&path).await {
                return Err(RecipeError::UnresolvableArtifact {
                    name: output.name.clone(),
                    path: path.display().to_string(),
                });
            }
            outputs.insert(output.name.clone(), path);
        }

        Ok(RunOutputs {
            execution_id: execution_id.to_string(),
            folder,
            outputs,
        })
    }

    /// Look up a recipe and check it against the registered templates
    fn checked_descriptor(&self, recipe: &str) -> Result<&DagDescriptor> {
        let descriptor = self
            .registry
            .recipe(recipe)
            .ok_or_else(|| RecipeError::UnknownRecipe(recipe.to_string()))?;

        let templates = self.registry.templates_for(descriptor);
        let errors = validate_descriptor(descriptor, &templates);
        if !errors.is_empty() {
            return Err(RecipeError::InvalidDescriptor {
                recipe: recipe.to_string(),
                errors,
            });
        }
        Ok(descriptor)
    }

    async fn publish_artifacts(
        &self,
        task: &TaskBinding,
        produced: &HashMap<String, PathBuf>,
        folder: &Path,
        execution_id: &str,
    ) -> Result<()> {
        for artifact in &task.artifacts {
            let source = produced.get(&artifact.from).ok_or_else(|| {
                RecipeError::UnresolvableArtifact {
                    name: artifact.from.clone(),
                    path: format!("<not reported by task '{}'>", task.name),
                }
            })?;
            if !is_file(source).await {
                return Err(RecipeError::UnresolvableArtifact {
                    name: artifact.from.clone(),
                    path: source.display().to_string(),
                });
            }

            let target = folder.join(&artifact.to);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }
            if *source != target {
                fs::copy(source, &target).await?;
            }

            self.emit(RecipeEvent::ArtifactPublished {
                task: task.name.clone(),
                execution_id: execution_id.to_string(),
                from: source.display().to_string(),
                to: artifact.to.clone(),
            });
        }
        Ok(())
    }

    fn emit(&self, event: RecipeEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Dropped recipe event: {}", e);
        }
    }
}

/// A file input to copy into the run folder
#[derive(Debug)]
struct StagedCopy {
    input: String,
    source: PathBuf,
    target: PathBuf,
}

/// Where every file input ends up, worked out before anything is written
#[derive(Debug)]
struct StagingPlan {
    /// Resolved inputs with file values rewritten to their staged path
    inputs: ResolvedInputs,
    copies: Vec<StagedCopy>,
}

/// Resolve every file input against the disk
///
/// Each source must be an existing regular file. A file input with a
/// declared staging path is rewritten to its place in the run folder;
/// any other is rewritten to its absolute source path. Nothing is
/// created or copied here.
async fn plan_staging(
    descriptor: &DagDescriptor,
    resolved: &ResolvedInputs,
    folder: &Path,
) -> Result<StagingPlan> {
    let mut inputs = resolved.clone();
    let mut copies = Vec::new();

    for field in descriptor.inputs.iter().filter(|f| f.kind == InputKind::File) {
        let Some(source) = resolved.get(&field.name).and_then(|v| v.as_str()) else {
            continue;
        };

        let source_path = absolute(Path::new(source))?;
        if !is_file(&source_path).await {
            return Err(RecipeError::UnresolvablePath {
                input: field.name.clone(),
                path: source.to_string(),
            });
        }

        let staged_path = match &field.path {
            Some(relative) => {
                let target = folder.join(relative);
                if source_path != target {
                    copies.push(StagedCopy {
                        input: field.name.clone(),
                        source: source_path,
                        target: target.clone(),
                    });
                }
                target
            }
            None => source_path,
        };
        inputs.insert(field.name.clone(), staged_path.display().to_string().into());
    }

    Ok(StagingPlan { inputs, copies })
}

/// Copy planned file inputs into the run folder
async fn stage_inputs(copies: &[StagedCopy]) -> Result<()> {
    for copy in copies {
        if let Some(parent) = copy.target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&copy.source, &copy.target).await?;
        log::debug!("Staged input '{}' at '{}'", copy.input, copy.target.display());
    }
    Ok(())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Build the parameter map of one task from staged inputs
///
/// Absent optional inputs are left out entirely.
fn bind_inputs(
    task: &TaskBinding,
    staged: &ResolvedInputs,
) -> BTreeMap<String, serde_json::Value> {
    let mut bound = BTreeMap::new();
    for binding in &task.parameters {
        let value = match &binding.source {
            BindingSource::Input(name) => staged.get(name).cloned(),
            BindingSource::Literal(value) => Some(value.clone()),
        };
        if let Some(value) = value {
            bound.insert(binding.parameter.clone(), value);
        }
    }
    bound
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
