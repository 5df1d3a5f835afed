use crate::conversation::types::{ContentBlock, ConversationMessage, StopReason};
use crate::normalize::{TOOL_GRAPH, TOOL_METRICS, TOOL_TABLE};
use crate::util::errors::FinsightResult;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Tool catalog entry advertised to the model.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

/// Opaque generative-model contract.
///
/// The engine treats the model as an external collaborator: full message log
/// in, content blocks plus stop reason out. Streaming, retries and provider
/// selection live behind implementations of this trait.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        messages: &[ConversationMessage],
        tools: &[ToolSpec],
    ) -> FinsightResult<ModelResponse>;
}

/// The three structured-output tools the analysis strategies advertise.
pub fn default_tool_catalog() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: TOOL_GRAPH.to_string(),
            description: "Generate structured chart data for visualizing financial trends. \
                          Supports bar, multiBar, line, pie, area, stackedArea and scatter charts."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "chartType": {
                        "type": "string",
                        "enum": ["bar", "multiBar", "line", "pie", "area", "stackedArea", "scatter"]
                    },
                    "config": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "xAxisKey": { "type": "string" }
                        },
                        "required": ["title"]
                    },
                    "data": {
                        "type": "array",
                        "items": { "type": "object" }
                    },
                    "chartConfig": {
                        "type": "object",
                        "description": "Per-series config keyed by data field name",
                        "additionalProperties": {
                            "type": "object",
                            "properties": {
                                "label": { "type": "string" },
                                "unit": { "type": "string" },
                                "formatter": { "type": "string" },
                                "precision": { "type": "integer" }
                            }
                        }
                    }
                },
                "required": ["chartType", "config", "data", "chartConfig"]
            }),
        },
        ToolSpec {
            name: TOOL_TABLE.to_string(),
            description: "Generate a comparison or summary table from extracted financial data."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "tableType": {
                        "type": "string",
                        "enum": ["comparison", "summary", "detailed"]
                    },
                    "config": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "columns": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "key": { "type": "string" },
                                        "label": { "type": "string" },
                                        "format": { "type": "string" },
                                        "width": { "type": "string" }
                                    },
                                    "required": ["key"]
                                }
                            }
                        },
                        "required": ["title"]
                    },
                    "data": {
                        "type": "array",
                        "items": { "type": "object" }
                    }
                },
                "required": ["tableType", "config", "data"]
            }),
        },
        ToolSpec {
            name: TOOL_METRICS.to_string(),
            description: "Report a single named financial metric with its period, value and unit."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "category": { "type": "string" },
                    "name": { "type": "string" },
                    "period": { "type": "string" },
                    "value": {
                        "description": "Number, or numeric string with thousands separators",
                        "type": ["number", "string"]
                    },
                    "unit": { "type": "string" }
                },
                "required": ["category", "name", "period", "value", "unit"]
            }),
        },
    ]
}
