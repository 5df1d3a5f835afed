use crate::normalize::{Artifact, ChartArtifact, MetricArtifact, TableArtifact};
use serde::Serialize;

/// Aggregate result of one analysis run.
///
/// Append-only while the turn loop runs, returned once at loop termination
/// and owned by the caller afterwards.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub analysis_text: String,
    pub charts: Vec<ChartArtifact>,
    pub tables: Vec<TableArtifact>,
    pub metrics: Vec<MetricArtifact>,
}

impl AnalysisResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validated artifact, preserving turn order.
    ///
    /// No de-duplication: a repeated identical artifact across turns is added
    /// again. Current behavior, kept as-is pending product confirmation.
    pub fn accumulate(&mut self, artifact: Artifact) {
        match artifact {
            Artifact::Chart(chart) => self.charts.push(chart),
            Artifact::Table(table) => self.tables.push(table),
            Artifact::Metric(metric) => self.metrics.push(metric),
        }
    }

    pub fn artifact_count(&self) -> usize {
        self.charts.len() + self.tables.len() + self.metrics.len()
    }
}
