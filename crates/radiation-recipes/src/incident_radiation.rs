//! Incident radiation task template
//!
//! The contract of the delegated `incident-radiation` task and a
//! process-backed implementation of it. The task spawns the external
//! radiation tool in its task folder and reports the two files it writes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use graph_flow::{Context, GraphError, NextAction, Task, TaskResult};
use recipe_engine::context::META_FOLDER;
use recipe_engine::{
    ContextKeys, GraphTaskExecutor, InputKind, SharedExecutorFactory, TemplateDescriptor,
    TemplateExecutorFactory, TemplateMetadata, TemplateOutput, TemplateParameter,
};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::analysis_period::AnalysisPeriod;
use crate::entry::defaults;

/// Template identifier
pub const TEMPLATE_ID: &str = "incident-radiation";

/// Default timeout in seconds for one radiation study
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Default executable of the radiation tool
pub const DEFAULT_PROGRAM: &str = "ladybug-radiance";

/// How to launch the external radiation tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncidentRadiationConfig {
    /// Executable name or path
    pub program: String,
    /// Arguments placed before the study arguments
    pub subcommand: Vec<String>,
    /// Kill the tool after this many seconds
    pub timeout_secs: u64,
}

impl Default for IncidentRadiationConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            subcommand: vec!["incident-radiation".to_string()],
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Contract of the incident radiation template
pub struct IncidentRadiation;

impl IncidentRadiation {
    // Parameters
    pub const PARAM_NORTH: &'static str = "north";
    pub const PARAM_HIGH_SKY_DENSITY: &'static str = "high_sky_density";
    pub const PARAM_AVERAGE_IRRADIANCE: &'static str = "average_irradiance";
    pub const PARAM_RADIATION_BENEFIT: &'static str = "radiation_benefit";
    pub const PARAM_BALANCE_TEMP: &'static str = "balance_temp";
    pub const PARAM_GROUND_REFLECTANCE: &'static str = "ground_reflectance";
    pub const PARAM_OFFSET_DIST: &'static str = "offset_dist";
    pub const PARAM_RUN_PERIOD: &'static str = "run_period";
    pub const PARAM_EPW: &'static str = "epw";
    pub const PARAM_STUDY_MESH: &'static str = "study_mesh";
    pub const PARAM_CONTEXT_MESH: &'static str = "context_mesh";
    pub const PARAM_DISPLAY_CONTEXT: &'static str = "display_context";

    // Outputs
    pub const OUTPUT_RADIATION_VALUES: &'static str = "radiation_values";
    pub const OUTPUT_VISUALIZATION_SET: &'static str = "visualization_set";

    /// Files written into the task folder
    pub const RADIATION_VALUES_FILE: &'static str = "radiation.json";
    pub const VISUALIZATION_SET_FILE: &'static str = "viz.vsf";

    /// Every parameter, in the order the entry point declares them
    pub const PARAMETERS: [&'static str; 12] = [
        Self::PARAM_NORTH,
        Self::PARAM_HIGH_SKY_DENSITY,
        Self::PARAM_AVERAGE_IRRADIANCE,
        Self::PARAM_RADIATION_BENEFIT,
        Self::PARAM_BALANCE_TEMP,
        Self::PARAM_GROUND_REFLECTANCE,
        Self::PARAM_OFFSET_DIST,
        Self::PARAM_RUN_PERIOD,
        Self::PARAM_EPW,
        Self::PARAM_STUDY_MESH,
        Self::PARAM_CONTEXT_MESH,
        Self::PARAM_DISPLAY_CONTEXT,
    ];
}

impl TemplateDescriptor for IncidentRadiation {
    fn template() -> TemplateMetadata {
        TemplateMetadata {
            template: TEMPLATE_ID.to_string(),
            description: "Compute incident radiation on a study mesh from a weather file"
                .to_string(),
            parameters: vec![
                TemplateParameter::optional(Self::PARAM_NORTH, InputKind::Integer),
                TemplateParameter::optional(Self::PARAM_HIGH_SKY_DENSITY, InputKind::Boolean),
                TemplateParameter::optional(Self::PARAM_AVERAGE_IRRADIANCE, InputKind::Boolean),
                TemplateParameter::optional(Self::PARAM_RADIATION_BENEFIT, InputKind::Boolean),
                TemplateParameter::optional(Self::PARAM_BALANCE_TEMP, InputKind::Number),
                TemplateParameter::optional(Self::PARAM_GROUND_REFLECTANCE, InputKind::Number),
                TemplateParameter::optional(Self::PARAM_OFFSET_DIST, InputKind::Number),
                TemplateParameter::optional(Self::PARAM_RUN_PERIOD, InputKind::String),
                TemplateParameter::required(Self::PARAM_EPW, InputKind::File),
                TemplateParameter::required(Self::PARAM_STUDY_MESH, InputKind::File),
                TemplateParameter::optional(Self::PARAM_CONTEXT_MESH, InputKind::File),
                TemplateParameter::optional(Self::PARAM_DISPLAY_CONTEXT, InputKind::Boolean),
            ],
            outputs: vec![
                TemplateOutput {
                    name: Self::OUTPUT_RADIATION_VALUES.to_string(),
                    path: Self::RADIATION_VALUES_FILE.to_string(),
                    description: "Radiation values for each face of the study mesh".to_string(),
                },
                TemplateOutput {
                    name: Self::OUTPUT_VISUALIZATION_SET.to_string(),
                    path: Self::VISUALIZATION_SET_FILE.to_string(),
                    description: "Visualization set of the study results".to_string(),
                },
            ],
        }
    }
}

inventory::submit!(recipe_engine::TemplateFn(IncidentRadiation::template));

/// Parameters of one incident radiation study, read from the context
#[derive(Debug, Clone, PartialEq)]
pub struct IncidentRadiationParams {
    pub north: i64,
    pub high_sky_density: bool,
    pub average_irradiance: bool,
    pub radiation_benefit: bool,
    pub balance_temp: f64,
    pub ground_reflectance: f64,
    pub offset_dist: f64,
    pub run_period: AnalysisPeriod,
    pub epw: PathBuf,
    pub study_mesh: PathBuf,
    pub context_mesh: Option<PathBuf>,
    pub display_context: bool,
}

impl IncidentRadiationParams {
    /// Study of `study_mesh` under `epw` with every other parameter defaulted
    pub fn new(epw: impl Into<PathBuf>, study_mesh: impl Into<PathBuf>) -> Self {
        Self {
            north: defaults::NORTH,
            high_sky_density: false,
            average_irradiance: false,
            radiation_benefit: false,
            balance_temp: defaults::BALANCE_TEMP,
            ground_reflectance: defaults::GROUND_REFLECTANCE,
            offset_dist: defaults::OFFSET_DIST,
            run_period: AnalysisPeriod::default(),
            epw: epw.into(),
            study_mesh: study_mesh.into(),
            context_mesh: None,
            display_context: false,
        }
    }

    /// Read the bound parameters of `task_id`
    ///
    /// Absent optional parameters take their defaults. A missing weather
    /// file or study mesh, or a run period that does not parse, fails.
    pub async fn from_context(task_id: &str, context: &Context) -> graph_flow::Result<Self> {
        let key = |param: &str| ContextKeys::input(task_id, param);

        let epw: String = context
            .get(&key(IncidentRadiation::PARAM_EPW))
            .await
            .ok_or_else(|| missing(task_id, IncidentRadiation::PARAM_EPW))?;
        let study_mesh: String = context
            .get(&key(IncidentRadiation::PARAM_STUDY_MESH))
            .await
            .ok_or_else(|| missing(task_id, IncidentRadiation::PARAM_STUDY_MESH))?;

        let mut params = Self::new(epw, study_mesh);

        // Integers may arrive as 90.0; read as f64 and truncate
        if let Some(north) = context.get::<f64>(&key(IncidentRadiation::PARAM_NORTH)).await {
            params.north = north as i64;
        }
        if let Some(v) = context
            .get::<bool>(&key(IncidentRadiation::PARAM_HIGH_SKY_DENSITY))
            .await
        {
            params.high_sky_density = v;
        }
        if let Some(v) = context
            .get::<bool>(&key(IncidentRadiation::PARAM_AVERAGE_IRRADIANCE))
            .await
        {
            params.average_irradiance = v;
        }
        if let Some(v) = context
            .get::<bool>(&key(IncidentRadiation::PARAM_RADIATION_BENEFIT))
            .await
        {
            params.radiation_benefit = v;
        }
        if let Some(v) = context.get::<f64>(&key(IncidentRadiation::PARAM_BALANCE_TEMP)).await {
            params.balance_temp = v;
        }
        if let Some(v) = context
            .get::<f64>(&key(IncidentRadiation::PARAM_GROUND_REFLECTANCE))
            .await
        {
            params.ground_reflectance = v;
        }
        if let Some(v) = context.get::<f64>(&key(IncidentRadiation::PARAM_OFFSET_DIST)).await {
            params.offset_dist = v;
        }
        if let Some(text) = context
            .get::<String>(&key(IncidentRadiation::PARAM_RUN_PERIOD))
            .await
        {
            params.run_period = AnalysisPeriod::parse(&text).map_err(|e| {
                GraphError::TaskExecutionFailed(format!("Task '{}': {}", task_id, e))
            })?;
        }
        params.context_mesh = context
            .get::<String>(&key(IncidentRadiation::PARAM_CONTEXT_MESH))
            .await
            .map(PathBuf::from);
        if let Some(v) = context.get::<bool>(&key(IncidentRadiation::PARAM_DISPLAY_CONTEXT)).await {
            params.display_context = v;
        }

        Ok(params)
    }

    /// Command line arguments for the radiation tool
    ///
    /// Output files are named relative to the working directory.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            self.study_mesh.display().to_string(),
            self.epw.display().to_string(),
        ];

        if let Some(context_mesh) = &self.context_mesh {
            args.push("--context-mesh".to_string());
            args.push(context_mesh.display().to_string());
            args.push(
                if self.display_context {
                    "--display-context"
                } else {
                    "--no-display-context"
                }
                .to_string(),
            );
        }

        args.push("--north".to_string());
        args.push(self.north.to_string());
        args.push(
            if self.high_sky_density {
                "--high-density"
            } else {
                "--low-density"
            }
            .to_string(),
        );
        args.push(
            if self.average_irradiance {
                "--average"
            } else {
                "--cumulative"
            }
            .to_string(),
        );
        if self.radiation_benefit {
            args.push("--benefit".to_string());
            args.push("--balance-temp".to_string());
            args.push(self.balance_temp.to_string());
        }
        args.push("--ground-reflectance".to_string());
        args.push(self.ground_reflectance.to_string());
        args.push("--offset-distance".to_string());
        args.push(self.offset_dist.to_string());
        args.push("--run-period".to_string());
        args.push(self.run_period.to_string());
        args.push("--output-file".to_string());
        args.push(IncidentRadiation::RADIATION_VALUES_FILE.to_string());
        args.push("--visualization-file".to_string());
        args.push(IncidentRadiation::VISUALIZATION_SET_FILE.to_string());
        args
    }
}

fn missing(task_id: &str, param: &str) -> GraphError {
    GraphError::TaskExecutionFailed(format!(
        "Missing required input '{}' at key '{}'",
        param,
        ContextKeys::input(task_id, param)
    ))
}

/// Runs the radiation tool for one task binding
///
/// # Inputs (from context)
/// - `{task_id}.input.{parameter}` for each template parameter
/// - `{task_id}.meta.folder` (required) - working directory of the tool
///
/// # Outputs (to context)
/// - `{task_id}.output.radiation_values` - absolute path of `radiation.json`
/// - `{task_id}.output.visualization_set` - absolute path of `viz.vsf`
#[derive(Clone)]
pub struct IncidentRadiationTask {
    task_id: String,
    config: IncidentRadiationConfig,
}

impl IncidentRadiationTask {
    pub fn new(task_id: impl Into<String>, config: IncidentRadiationConfig) -> Self {
        Self {
            task_id: task_id.into(),
            config,
        }
    }

    fn failed(&self, message: impl std::fmt::Display) -> GraphError {
        GraphError::TaskExecutionFailed(format!("Task '{}': {}", self.task_id, message))
    }

    async fn spawn_tool(&self, args: &[String], folder: &Path) -> graph_flow::Result<()> {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.subcommand)
            .args(args)
            .current_dir(folder)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let result = tokio::time::timeout(timeout, async {
            let child = cmd.spawn().map_err(|e| {
                self.failed(format!("failed to spawn '{}': {}", self.config.program, e))
            })?;
            child.wait_with_output().await.map_err(|e| {
                self.failed(format!("failed to wait for '{}': {}", self.config.program, e))
            })
        })
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(self.failed(format!(
                    "'{}' timed out after {}s",
                    self.config.program, self.config.timeout_secs
                )))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::debug!(
            "IncidentRadiationTask {}: exit_code={:?}, stdout={} bytes, stderr={} bytes",
            self.task_id,
            output.status.code(),
            stdout.len(),
            stderr.len()
        );

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(self.failed(format!(
                "'{}' exited with code {}: {}",
                self.config.program,
                code,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Task for IncidentRadiationTask {
    fn id(&self) -> &str {
        &self.task_id
    }

    async fn run(&self, context: Context) -> graph_flow::Result<TaskResult> {
        let params = IncidentRadiationParams::from_context(&self.task_id, &context).await?;

        let folder_key = ContextKeys::meta(&self.task_id, META_FOLDER);
        let folder: String = context.get(&folder_key).await.ok_or_else(|| {
            GraphError::TaskExecutionFailed(format!(
                "Missing task folder at key '{}'",
                folder_key
            ))
        })?;
        let folder = PathBuf::from(folder);
        tokio::fs::create_dir_all(&folder)
            .await
            .map_err(|e| self.failed(format!("cannot create '{}': {}", folder.display(), e)))?;

        let args = params.to_args();
        log::info!(
            "IncidentRadiationTask {}: running '{}' for {} ({})",
            self.task_id,
            self.config.program,
            params.study_mesh.display(),
            params.run_period
        );
        self.spawn_tool(&args, &folder).await?;

        for (output, file) in [
            (
                IncidentRadiation::OUTPUT_RADIATION_VALUES,
                IncidentRadiation::RADIATION_VALUES_FILE,
            ),
            (
                IncidentRadiation::OUTPUT_VISUALIZATION_SET,
                IncidentRadiation::VISUALIZATION_SET_FILE,
            ),
        ] {
            let path = folder.join(file);
            let written = tokio::fs::metadata(&path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if !written {
                return Err(self.failed(format!(
                    "'{}' did not write '{}'",
                    self.config.program,
                    path.display()
                )));
            }
            context
                .set(
                    ContextKeys::output(&self.task_id, output),
                    path.display().to_string(),
                )
                .await;
        }

        Ok(TaskResult::new(
            Some(format!("Incident radiation written to {}", folder.display())),
            NextAction::Continue,
        ))
    }
}

/// Executor factory running `IncidentRadiationTask` through the radiation tool
pub fn executor_factory(config: IncidentRadiationConfig) -> Arc<dyn TemplateExecutorFactory> {
    let executor = GraphTaskExecutor::new(IncidentRadiation::template(), move |invocation| {
        Box::new(IncidentRadiationTask::new(
            invocation.task_id.clone(),
            config.clone(),
        ))
    });
    Arc::new(SharedExecutorFactory::new(Arc::new(executor)))
}
