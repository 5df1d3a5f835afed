//! Visualization normalizer
//!
//! Repairs and validates raw tool payloads from the model into canonical
//! artifacts. Pure functions: untyped value in, typed artifact or
//! `ValidationError` out, no I/O.

pub mod artifact;
pub mod chart;
pub mod metric;
pub mod repair;
pub mod table;

pub use artifact::*;

use crate::util::errors::ValidationError;
use serde_json::Value;

pub const TOOL_GRAPH: &str = "generate_graph_data";
pub const TOOL_TABLE: &str = "generate_table_data";
pub const TOOL_METRICS: &str = "generate_metrics";

/// Normalize one tool invocation payload into a canonical artifact.
///
/// Deterministic for a given input. String payloads run through the repair
/// chain first; object payloads are inspected as-is.
pub fn normalize(
    tool_name: &str,
    tool_use_id: Option<&str>,
    raw: &Value,
) -> Result<Artifact, ValidationError> {
    let result = match repair::coerce_payload(raw) {
        Some(payload) => match tool_name {
            TOOL_GRAPH => chart::normalize_chart(&payload).map(Artifact::Chart),
            TOOL_TABLE => table::normalize_table(&payload).map(Artifact::Table),
            TOOL_METRICS => metric::normalize_metric(&payload).map(Artifact::Metric),
            other => Err(ValidationError::new(
                other,
                "",
                "unknown tool, expected one of the generate_* tools",
            )),
        },
        None => Err(ValidationError::new(
            tool_name,
            "",
            "payload is not valid JSON, even after repair",
        )),
    };

    result.map_err(|error| match tool_use_id {
        Some(id) => error.with_tool_use_id(id),
        None => error,
    })
}
