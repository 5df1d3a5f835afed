/// Finsight Streaming Layer
///
/// Per-connection state machines arbitrating streamed vs. finalized content:
/// - wire-protocol frames (persistent connection, JSON)
/// - keyed session registry with lifecycle + idle eviction
/// - content arbitration between partial and finalized text
pub mod arbitrate;
pub mod frames;
pub mod manager;
pub mod session;

pub use arbitrate::ContentArbiter;
pub use frames::{decode_client_frame, ClientFrame, MessageOptions, ServerFrame};
pub use manager::StreamingSessionManager;
pub use session::{
    spawn_idle_sweeper, SessionKey, SessionRegistry, SessionState, StreamingSession,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
