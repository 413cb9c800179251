//! End-to-end runs of the cumulative radiation entry point

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use radiation_recipes::entry::{RADIATION_VALUES_PATH, TASK_NAME, VISUALIZATION_SET_PATH};
use radiation_recipes::{IncidentRadiation, RECIPE_NAME};
use recipe_engine::{
    InputValues, ProducedArtifacts, RecipeError, RecipeEvent, RecipeRegistry, RecipeRunner,
    TaskInvocation, TemplateDescriptor, VecEventSink,
};
use serde_json::json;
use tempfile::TempDir;

/// Source files for one study, outside the run folder
struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("boston.epw"), "LOCATION,Boston").unwrap();
        std::fs::write(dir.path().join("study.json"), r#"{"type": "Mesh3D"}"#).unwrap();
        std::fs::write(dir.path().join("context.json"), r#"{"type": "Mesh3D"}"#).unwrap();
        Self { dir }
    }

    fn file(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    fn inputs(&self) -> InputValues {
        InputValues::new()
            .with("epw", self.file("boston.epw"))
            .with("study_mesh", self.file("study.json"))
    }

    fn run_folder(&self) -> PathBuf {
        self.dir.path().join("run")
    }
}

type Calls = Arc<Mutex<Vec<TaskInvocation>>>;

/// Registry whose incident radiation executor writes placeholder results
fn fake_registry() -> (RecipeRegistry, Calls) {
    let calls: Calls = Arc::new(Mutex::new(Vec::new()));
    let recorded = calls.clone();

    let mut registry = RecipeRegistry::with_builtins();
    registry.register_callback(IncidentRadiation::template(), move |invocation| {
        recorded.lock().unwrap().push(invocation.clone());

        let values = invocation.folder.join(IncidentRadiation::RADIATION_VALUES_FILE);
        let viz = invocation.folder.join(IncidentRadiation::VISUALIZATION_SET_FILE);
        std::fs::write(&values, "[412.5, 388.1]")?;
        std::fs::write(&viz, "vsf")?;

        let mut produced = ProducedArtifacts::new();
        produced.insert(IncidentRadiation::OUTPUT_RADIATION_VALUES.to_string(), values);
        produced.insert(IncidentRadiation::OUTPUT_VISUALIZATION_SET.to_string(), viz);
        Ok(produced)
    });
    (registry, calls)
}

#[tokio::test]
async fn run_publishes_both_outputs() {
    let site = Site::new();
    let (registry, calls) = fake_registry();
    let events = Arc::new(VecEventSink::new());
    let runner = RecipeRunner::with_events(Arc::new(registry), events.clone());

    let folder = site.run_folder();
    let outputs = runner
        .run(RECIPE_NAME, &site.inputs(), &folder)
        .await
        .unwrap();

    assert_eq!(
        outputs.get("radiation_values"),
        Some(folder.join(RADIATION_VALUES_PATH).as_path())
    );
    assert_eq!(
        outputs.get("visualization_set"),
        Some(folder.join(VISUALIZATION_SET_PATH).as_path())
    );
    assert_eq!(
        std::fs::read_to_string(folder.join("visualization/viz.vsf")).unwrap(),
        "vsf"
    );

    // Inputs are staged at their declared paths
    assert!(folder.join("weather.epw").exists());
    assert!(folder.join("input_geo.json").exists());
    assert!(!folder.join("context_geo.json").exists());

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.task_id, TASK_NAME);
    assert_eq!(call.folder, folder.join(TASK_NAME));
    assert_eq!(call.input("north"), Some(&json!(0)));
    assert_eq!(call.input("balance_temp"), Some(&json!(16.0)));
    assert_eq!(
        call.input("epw"),
        Some(&json!(folder.join("weather.epw").display().to_string()))
    );
    assert!(call.input("context_mesh").is_none());
    assert_eq!(call.inputs.len(), 11);

    let kinds: Vec<&str> = events
        .events()
        .iter()
        .map(|e| match e {
            RecipeEvent::RunStarted { .. } => "run-started",
            RecipeEvent::InputsValidated { .. } => "inputs-validated",
            RecipeEvent::TaskStarted { .. } => "task-started",
            RecipeEvent::TaskCompleted { .. } => "task-completed",
            RecipeEvent::TaskFailed { .. } => "task-failed",
            RecipeEvent::ArtifactPublished { .. } => "artifact-published",
            RecipeEvent::RunCompleted { .. } => "run-completed",
            RecipeEvent::RunFailed { .. } => "run-failed",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "run-started",
            "inputs-validated",
            "task-started",
            "task-completed",
            "artifact-published",
            "artifact-published",
            "run-completed",
        ]
    );
}

#[tokio::test]
async fn context_mesh_is_bound_when_given() {
    let site = Site::new();
    let (registry, calls) = fake_registry();
    let runner = RecipeRunner::new(Arc::new(registry));

    let folder = site.run_folder();
    let inputs = site
        .inputs()
        .with("context_mesh", site.file("context.json"))
        .with("display_context", true)
        .with("north", 90);
    runner.run(RECIPE_NAME, &inputs, &folder).await.unwrap();

    assert!(folder.join("context_geo.json").exists());
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].inputs.len(), 12);
    assert_eq!(calls[0].input("display_context"), Some(&json!(true)));
    assert_eq!(calls[0].input("north"), Some(&json!(90)));
}

#[tokio::test]
async fn invalid_inputs_never_reach_the_task() {
    let site = Site::new();
    let (registry, calls) = fake_registry();
    let runner = RecipeRunner::new(Arc::new(registry));

    let folder = site.run_folder();
    let inputs = site.inputs().with("north", 361);
    let err = runner.run(RECIPE_NAME, &inputs, &folder).await.unwrap_err();

    assert!(matches!(err, RecipeError::InvalidInputs { .. }));
    assert!(calls.lock().unwrap().is_empty());
    assert!(!folder.exists());
}

#[tokio::test]
async fn missing_study_mesh_file_is_unresolvable() {
    let site = Site::new();
    let (registry, calls) = fake_registry();
    let runner = RecipeRunner::new(Arc::new(registry));

    let inputs = site.inputs().with("study_mesh", site.file("missing.json"));
    let err = runner
        .run(RECIPE_NAME, &inputs, &site.run_folder())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecipeError::UnresolvablePath { ref input, .. } if input == "study_mesh"
    ));
    assert!(err.is_configuration_error());
    assert!(calls.lock().unwrap().is_empty());
    // The weather file resolves first but is not staged on its own
    assert!(!site.run_folder().exists());
}

#[tokio::test]
async fn weather_folder_is_not_a_weather_file() {
    let site = Site::new();
    std::fs::create_dir(site.dir.path().join("weather.epw")).unwrap();
    let (registry, calls) = fake_registry();
    let runner = RecipeRunner::new(Arc::new(registry));

    let inputs = site.inputs().with("epw", site.file("weather.epw"));
    let err = runner
        .run(RECIPE_NAME, &inputs, &site.run_folder())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RecipeError::UnresolvablePath { ref input, .. } if input == "epw"
    ));
    assert!(calls.lock().unwrap().is_empty());
    assert!(!site.run_folder().exists());
}

#[tokio::test]
async fn impossible_run_period_never_reaches_the_task() {
    let site = Site::new();
    let (registry, calls) = fake_registry();
    let runner = RecipeRunner::new(Arc::new(registry));

    let inputs = site
        .inputs()
        .with("run_period", "2/30 to 3/1 between 0 and 23 @1");
    let err = runner
        .run(RECIPE_NAME, &inputs, &site.run_folder())
        .await
        .unwrap_err();

    assert!(matches!(err, RecipeError::InvalidInputs { .. }));
    assert!(calls.lock().unwrap().is_empty());
    assert!(!site.run_folder().exists());
}

#[tokio::test]
async fn builtins_without_executor_refuse_to_run() {
    let site = Site::new();
    let runner = RecipeRunner::new(Arc::new(RecipeRegistry::with_builtins()));

    let err = runner
        .run(RECIPE_NAME, &site.inputs(), &site.run_folder())
        .await
        .unwrap_err();
    assert!(matches!(err, RecipeError::NoExecutor(ref t) if t == "incident-radiation"));
}

#[cfg(unix)]
mod process {
    use super::*;
    use radiation_recipes::IncidentRadiationConfig;
    use std::path::Path;

    const FAKE_TOOL: &str = r#"
out=""
viz=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output-file) out="$2"; shift ;;
    --visualization-file) viz="$2"; shift ;;
  esac
  shift
done
printf '[412.5, 388.1]' > "$out"
printf 'vsf' > "$viz"
"#;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path.display().to_string()
    }

    fn process_runner(script: String, timeout_secs: u64) -> RecipeRunner {
        let config = IncidentRadiationConfig {
            program: "sh".to_string(),
            subcommand: vec![script],
            timeout_secs,
        };
        let registry = radiation_recipes::registry(config).unwrap();
        RecipeRunner::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn runs_the_radiation_tool() {
        let site = Site::new();
        let runner = process_runner(script(site.dir.path(), "tool.sh", FAKE_TOOL), 30);

        let folder = site.run_folder();
        let outputs = runner
            .run(RECIPE_NAME, &site.inputs(), &folder)
            .await
            .unwrap();

        let values = outputs.get("radiation_values").unwrap();
        assert_eq!(std::fs::read_to_string(values).unwrap(), "[412.5, 388.1]");
        assert!(folder.join(TASK_NAME).join("viz.vsf").exists());
        assert!(folder.join("visualization/viz.vsf").exists());
    }

    #[tokio::test]
    async fn failing_tool_is_an_execution_error() {
        let site = Site::new();
        let body = "echo 'sky file not found' >&2\nexit 3\n";
        let runner = process_runner(script(site.dir.path(), "fail.sh", body), 30);

        let err = runner
            .run(RECIPE_NAME, &site.inputs(), &site.run_folder())
            .await
            .unwrap_err();

        assert!(!err.is_configuration_error());
        let message = err.to_string();
        assert!(message.contains("code 3"), "{}", message);
        assert!(message.contains("sky file not found"), "{}", message);
    }

    #[tokio::test]
    async fn tool_without_outputs_fails() {
        let site = Site::new();
        let runner = process_runner(script(site.dir.path(), "noop.sh", "exit 0\n"), 30);

        let err = runner
            .run(RECIPE_NAME, &site.inputs(), &site.run_folder())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not write"));
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let site = Site::new();
        let runner = process_runner(script(site.dir.path(), "slow.sh", "sleep 5\n"), 1);

        let err = runner
            .run(RECIPE_NAME, &site.inputs(), &site.run_folder())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
