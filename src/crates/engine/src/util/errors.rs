use thiserror::Error;

/// Validation failure for a single tool payload.
///
/// Carries the tool identity and the failing field path so the error can be
/// rendered back to the model as an error tool result it can self-correct on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {tool_name} payload at '{field_path}': {message}")]
pub struct ValidationError {
    pub tool_name: String,
    pub tool_use_id: Option<String>,
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(
        tool_name: impl Into<String>,
        field_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_use_id: None,
            field_path: field_path.into(),
            message: message.into(),
        }
    }

    pub fn with_tool_use_id(mut self, tool_use_id: impl Into<String>) -> Self {
        self.tool_use_id = Some(tool_use_id.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum FinsightError {
    /// Model gateway unreachable or timed out. Fatal to the current turn run;
    /// retry policy lives outside the engine.
    #[error("model gateway transport error: {0}")]
    Transport(String),

    /// Tool payload failed schema validation after repair. Non-fatal: fed
    /// back to the model as an error tool result.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed frame or terminal event missing required fields. Dropped
    /// and logged, never forwarded downstream.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The owning connection went away; accumulated artifacts are discarded.
    #[error("run cancelled")]
    Cancelled,
}

pub type FinsightResult<T> = Result<T, FinsightError>;
