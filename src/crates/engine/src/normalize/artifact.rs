use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartKind {
    Bar,
    MultiBar,
    Line,
    Pie,
    Area,
    StackedArea,
    Scatter,
}

impl ChartKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "bar" => Some(Self::Bar),
            "multiBar" => Some(Self::MultiBar),
            "line" => Some(Self::Line),
            "pie" => Some(Self::Pie),
            "area" => Some(Self::Area),
            "stackedArea" => Some(Self::StackedArea),
            "scatter" => Some(Self::Scatter),
            _ => None,
        }
    }
}

/// Per-series display config, defaults filled during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesConfig {
    pub label: String,
    pub unit: String,
    pub formatter: String,
    pub precision: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub title: String,
    pub description: String,
    pub x_axis_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoints {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

/// Canonical chart data. Single-series charts (pie included) are ordered
/// (category, value) pairs; multi-series bar/area/stackedArea are grouped per
/// series; multi-series line charts keep the wide row form because their
/// rendering contract differs from the grouped one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartData {
    Points(Vec<ChartPoint>),
    Grouped(Vec<SeriesPoints>),
    Wide(Vec<Map<String, Value>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartArtifact {
    pub chart_type: ChartKind,
    pub config: ChartMeta,
    #[serde(rename = "chartConfig")]
    pub series_config: IndexMap<String, SeriesConfig>,
    pub data: ChartData,
    /// Sum of segment values, pie charts only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub key: String,
    pub header: String,
    pub format: String,
    pub width: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMeta {
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableArtifact {
    pub table_type: String,
    pub config: TableMeta,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricArtifact {
    pub category: String,
    pub name: String,
    pub period: String,
    pub value: f64,
    pub unit: String,
}

/// Closed union of canonical, schema-valid tool outputs. Never holds raw or
/// unrepaired data.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Chart(ChartArtifact),
    Table(TableArtifact),
    Metric(MetricArtifact),
}
