// Workbox Library - Workflow Transition Engine
// This exposes the core components for testing and integration

pub mod workflows;
pub mod telemetry;
pub mod observability;
pub mod config;

// Re-export key types for easy access
pub use workflows::{
    Alert, BatchOutcome, BatchResult, CommentPrompt, EngineError, InMemoryWorkflowStore, ItemRef,
    ItemSnapshot, SelectedItem, TransitionAction, TransitionEngine, TransitionRequest, UiSignals,
    WorkflowError,
};
pub use telemetry::{init_telemetry, generate_correlation_id};
pub use observability::{transition_metrics, TransitionMetrics, OperationTimer};
pub use config::WorkboxConfig;
