// Finsight Engine - tool-calling conversation protocol core
// Layering: Util -> Normalize -> Accumulate -> Conversation

pub mod accumulate;
pub mod conversation; // Turn orchestrator, gateway contract, strategies, guard
pub mod normalize; // Payload repair, validation, canonical artifacts
pub mod util; // Errors, shared helpers

// Export main types
pub use util::errors::{FinsightError, FinsightResult, ValidationError};

pub use accumulate::AnalysisResult;
pub use conversation::{
    AnalysisStrategy, ContentBlock, ConversationMessage, ConversationTurn, ExecutionOutcome,
    ModelGateway, ModelResponse, Role, StopReason, StrategyKind, ToolSpec, TurnEvent,
    TurnInterceptor, TurnOrchestrator,
};
pub use normalize::{
    normalize, Artifact, ChartArtifact, ChartData, ChartKind, MetricArtifact, TableArtifact,
    TOOL_GRAPH, TOOL_METRICS, TOOL_TABLE,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
