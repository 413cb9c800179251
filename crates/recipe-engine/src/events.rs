//! Event types for reporting recipe runs
//!
//! Events are sent from the runner to any consumer (CLI, log, test) to
//! report validation, task execution and artifact publication.

use serde::{Deserialize, Serialize};

/// Trait for sending recipe events
///
/// This abstracts over the transport mechanism (log, channel, collector).
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: RecipeEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

/// Events emitted during a recipe run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecipeEvent {
    /// Run accepted by the runner
    #[serde(rename_all = "camelCase")]
    RunStarted {
        recipe: String,
        execution_id: String,
        folder: String,
    },

    /// Input values passed validation
    #[serde(rename_all = "camelCase")]
    InputsValidated {
        recipe: String,
        execution_id: String,
        resolved: usize,
    },

    /// A delegated task started
    #[serde(rename_all = "camelCase")]
    TaskStarted {
        task: String,
        template: String,
        execution_id: String,
    },

    /// A delegated task produced its artifacts
    #[serde(rename_all = "camelCase")]
    TaskCompleted {
        task: String,
        execution_id: String,
        artifacts: Vec<String>,
    },

    /// A delegated task failed
    #[serde(rename_all = "camelCase")]
    TaskFailed {
        task: String,
        execution_id: String,
        error: String,
    },

    /// A produced artifact was copied to its published path
    #[serde(rename_all = "camelCase")]
    ArtifactPublished {
        task: String,
        execution_id: String,
        from: String,
        to: String,
    },

    /// Run finished and every output resolved
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        recipe: String,
        execution_id: String,
        outputs: Vec<String>,
    },

    /// Run stopped with an error
    #[serde(rename_all = "camelCase")]
    RunFailed {
        recipe: String,
        execution_id: String,
        error: String,
    },
}

impl RecipeEvent {
    /// Execution this event belongs to
    pub fn execution_id(&self) -> &str {
        match self {
            Self::RunStarted { execution_id, .. }
            | Self::InputsValidated { execution_id, .. }
            | Self::TaskStarted { execution_id, .. }
            | Self::TaskCompleted { execution_id, .. }
            | Self::TaskFailed { execution_id, .. }
            | Self::ArtifactPublished { execution_id, .. }
            | Self::RunCompleted { execution_id, .. }
            | Self::RunFailed { execution_id, .. } => execution_id,
        }
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: RecipeEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// Forwards events to the `log` facade
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn send(&self, event: RecipeEvent) -> Result<(), EventError> {
        match &event {
            RecipeEvent::TaskFailed { task, error, .. } => {
                log::error!("Task '{}' failed: {}", task, error);
            }
            RecipeEvent::RunFailed { recipe, error, .. } => {
                log::error!("Recipe '{}' failed: {}", recipe, error);
            }
            RecipeEvent::ArtifactPublished { from, to, .. } => {
                log::debug!("Published '{}' -> '{}'", from, to);
            }
            other => log::info!("{:?}", other),
        }
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<RecipeEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<RecipeEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: RecipeEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .map_err(|_| EventError {
                message: "Event collector poisoned".to_string(),
            })?
            .push(event);
        Ok(())
    }
}
