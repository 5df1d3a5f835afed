use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options a client may attach to a message frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MessageOptions {
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Frames the client sends over the persistent connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Message {
        content: String,
        #[serde(default)]
        options: MessageOptions,
    },
}

/// Frames the server emits. Per turn: exactly one `message_start`, zero or
/// more deltas and tool events, then exactly one `message_complete`. `error`
/// may appear at any point and ends the turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    MessageStart {
        message_id: String,
    },
    TextDelta {
        message_id: String,
        accumulated_text: String,
    },
    ContentUpdate {
        message_id: String,
        accumulated_text: String,
    },
    ToolStart {
        message_id: String,
        tool_id: String,
        tool_name: String,
    },
    ToolComplete {
        message_id: String,
        tool_id: String,
        tool_name: String,
    },
    MessageComplete {
        message_id: String,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
}

impl ServerFrame {
    pub fn frame_type(&self) -> &'static str {
        match self {
            ServerFrame::MessageStart { .. } => "message_start",
            ServerFrame::TextDelta { .. } => "text_delta",
            ServerFrame::ContentUpdate { .. } => "content_update",
            ServerFrame::ToolStart { .. } => "tool_start",
            ServerFrame::ToolComplete { .. } => "tool_complete",
            ServerFrame::MessageComplete { .. } => "message_complete",
            ServerFrame::Error { .. } => "error",
        }
    }
}

/// Parse one client frame. A malformed frame is a protocol violation: the
/// caller drops it (and logs) rather than forwarding anything downstream.
pub fn decode_client_frame(raw: &str) -> Result<ClientFrame, finsight_engine::FinsightError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| finsight_engine::FinsightError::Protocol(format!("unparseable frame: {}", e)))?;
    serde_json::from_value(value)
        .map_err(|e| finsight_engine::FinsightError::Protocol(format!("malformed frame: {}", e)))
}
