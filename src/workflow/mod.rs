pub mod review_flow;
pub mod state;
pub mod store;

pub use review_flow::ReviewFlow;
pub use state::{SourceDocument, Stage, StageBoard, StageStatus, WorkflowPhase, WorkflowState};
pub use store::{
    Completion, ExtractionOutcome, LoadingGuard, RequestToken, StageTicket, WorkflowStore,
};
