//! Turn-loop layer
//!
//! Message log types, the model gateway contract, strategy configuration and
//! the bounded multi-turn orchestrator.

pub mod gateway;
pub mod guard;
pub mod orchestrator;
pub mod strategy;
pub mod types;

pub use gateway::{default_tool_catalog, ModelGateway, ModelResponse, ToolSpec};
pub use guard::{PlanSectionGuard, TurnInterceptor, PLAN_HEADING, REQUIRED_PLAN_SECTIONS};
pub use orchestrator::{ExecutionOutcome, TurnEvent, TurnOrchestrator};
pub use strategy::{AnalysisStrategy, StrategyKind};
pub use types::*;
