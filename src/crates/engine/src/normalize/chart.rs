use crate::normalize::artifact::{
    ChartArtifact, ChartData, ChartKind, ChartMeta, ChartPoint, SeriesConfig, SeriesPoints,
};
use crate::normalize::repair::coerce_number;
use crate::normalize::TOOL_GRAPH;
use crate::util::errors::ValidationError;
use indexmap::IndexMap;
use serde_json::{Map, Value};

const REQUIRED_KEYS: [&str; 4] = ["chartType", "config", "data", "chartConfig"];

pub fn normalize_chart(payload: &Value) -> Result<ChartArtifact, ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| err("", "expected a JSON object payload"))?;

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|key| !obj.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(err(
            &missing.join(", "),
            format!("missing required key(s): {}", missing.join(", ")),
        ));
    }

    let chart_type = obj["chartType"]
        .as_str()
        .and_then(ChartKind::parse)
        .ok_or_else(|| err("chartType", "not one of bar, multiBar, line, pie, area, stackedArea, scatter"))?;

    let config = obj["config"]
        .as_object()
        .ok_or_else(|| err("config", "expected an object"))?;
    let title = config
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    // Description falls back to the title.
    let description = config
        .get("description")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(&title)
        .to_string();

    let rows: Vec<&Map<String, Value>> = obj["data"]
        .as_array()
        .ok_or_else(|| err("data", "expected an array of row objects"))?
        .iter()
        .filter_map(Value::as_object)
        .collect();

    let series_config = parse_series_config(&obj["chartConfig"])?;

    let x_axis_key = resolve_x_axis_key(chart_type, config, &rows)?;

    // Configured series keys, category axis excluded.
    let configured: Vec<&String> = series_config.keys().filter(|k| **k != x_axis_key).collect();

    // Multi-series only when more than one configured key actually co-occurs
    // in a sampled data row; configured count alone is not enough.
    let sample = rows.first().copied();
    let co_occurring: Vec<String> = match sample {
        Some(row) => configured
            .iter()
            .filter(|k| row.contains_key(**k))
            .map(|k| (*k).clone())
            .collect(),
        None => Vec::new(),
    };
    let multi_series = co_occurring.len() > 1;

    let grouped_kind = matches!(
        chart_type,
        ChartKind::Bar | ChartKind::MultiBar | ChartKind::Area | ChartKind::StackedArea
    );

    let (data, total) = if multi_series && grouped_kind {
        (group_series(&rows, &x_axis_key, &co_occurring, &series_config), None)
    } else if multi_series && chart_type == ChartKind::Line {
        // Wide/flat form: the line renderer consumes rows directly.
        (ChartData::Wide(rows.iter().map(|r| (*r).clone()).collect()), None)
    } else {
        let value_key = resolve_value_key(&rows, &x_axis_key, &co_occurring, &configured)?;
        let points: Vec<ChartPoint> = rows
            .iter()
            .map(|row| ChartPoint {
                x: stringify(row.get(&x_axis_key)),
                y: row.get(&value_key).and_then(coerce_number).unwrap_or(0.0),
            })
            .collect();
        let total = (chart_type == ChartKind::Pie).then(|| points.iter().map(|p| p.y).sum());
        (ChartData::Points(points), total)
    };

    let artifact = ChartArtifact {
        chart_type,
        config: ChartMeta {
            title,
            description,
            x_axis_key,
        },
        series_config,
        data,
        total,
    };
    validate_canonical(&artifact)?;
    Ok(artifact)
}

fn parse_series_config(raw: &Value) -> Result<IndexMap<String, SeriesConfig>, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| err("chartConfig", "expected an object keyed by series field"))?;

    let mut out = IndexMap::new();
    for (key, entry) in obj {
        let entry_obj = entry.as_object();
        let label = entry_obj
            .and_then(|e| e.get("label"))
            .and_then(Value::as_str)
            .unwrap_or(key)
            .to_string();
        let unit = entry_obj
            .and_then(|e| e.get("unit"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let formatter = entry_obj
            .and_then(|e| e.get("formatter"))
            .and_then(Value::as_str)
            .unwrap_or("number")
            .to_string();
        let precision = entry_obj
            .and_then(|e| e.get("precision"))
            .and_then(Value::as_u64)
            .unwrap_or(0) as u8;
        out.insert(
            key.clone(),
            SeriesConfig {
                label,
                unit,
                formatter,
                precision,
            },
        );
    }
    Ok(out)
}

fn resolve_x_axis_key(
    chart_type: ChartKind,
    config: &Map<String, Value>,
    rows: &[&Map<String, Value>],
) -> Result<String, ValidationError> {
    if let Some(key) = config.get("xAxisKey").and_then(Value::as_str) {
        return Ok(key.to_string());
    }
    if chart_type == ChartKind::Pie {
        return Ok("name".to_string());
    }
    // Infer the first non-numeric field of the data.
    rows.first()
        .and_then(|row| {
            row.iter()
                .find(|(_, v)| v.is_string() && coerce_number(v).is_none())
                .map(|(k, _)| k.clone())
        })
        .ok_or_else(|| err("config.xAxisKey", "missing and no non-numeric field to infer from"))
}

/// Value field for single-series output: a field literally named "value",
/// else any numeric field, else a configured series key present in the data.
fn resolve_value_key(
    rows: &[&Map<String, Value>],
    x_axis_key: &str,
    co_occurring: &[String],
    configured: &[&String],
) -> Result<String, ValidationError> {
    let sample = rows
        .first()
        .ok_or_else(|| err("data", "no usable data rows"))?;

    if sample.contains_key("value") {
        return Ok("value".to_string());
    }
    if let Some((key, _)) = sample
        .iter()
        .find(|(k, v)| k.as_str() != x_axis_key && coerce_number(v).is_some())
    {
        return Ok(key.clone());
    }
    if let Some(key) = co_occurring.first() {
        return Ok(key.clone());
    }
    configured
        .iter()
        .find(|k| sample.contains_key(k.as_str()))
        .map(|k| (*k).clone())
        .ok_or_else(|| err("data", "no numeric value field in data rows"))
}

fn group_series(
    rows: &[&Map<String, Value>],
    x_axis_key: &str,
    keys: &[String],
    series_config: &IndexMap<String, SeriesConfig>,
) -> ChartData {
    let grouped = keys
        .iter()
        .map(|key| SeriesPoints {
            name: series_config
                .get(key)
                .map(|c| c.label.clone())
                .unwrap_or_else(|| key.clone()),
            points: rows
                .iter()
                .map(|row| ChartPoint {
                    x: stringify(row.get(x_axis_key)),
                    y: row.get(key).and_then(coerce_number).unwrap_or(0.0),
                })
                .collect(),
        })
        .collect();
    ChartData::Grouped(grouped)
}

fn stringify(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Final strict check against the canonical shape.
fn validate_canonical(artifact: &ChartArtifact) -> Result<(), ValidationError> {
    let empty = match &artifact.data {
        ChartData::Points(points) => points.is_empty(),
        ChartData::Grouped(series) => series.is_empty() || series.iter().all(|s| s.points.is_empty()),
        ChartData::Wide(rows) => rows.is_empty(),
    };
    if empty {
        return Err(err("data", "no usable data rows after normalization"));
    }
    Ok(())
}

fn err(field_path: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::new(TOOL_GRAPH, field_path, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn revenue_chart() -> Value {
        json!({
            "chartType": "bar",
            "config": {"title": "Revenue", "xAxisKey": "year"},
            "data": [
                {"year": "2022", "revenue": 100},
                {"year": "2023", "revenue": 120}
            ],
            "chartConfig": {"revenue": {"label": "Revenue"}}
        })
    }

    #[test]
    fn single_series_bar_canonicalizes_to_xy_points() {
        let artifact = normalize_chart(&revenue_chart()).unwrap();
        assert_eq!(artifact.config.description, "Revenue");
        assert_eq!(
            serde_json::to_value(&artifact.data).unwrap(),
            json!([{"x": "2022", "y": 100.0}, {"x": "2023", "y": 120.0}])
        );
    }

    #[test]
    fn each_missing_required_key_is_named() {
        for key in REQUIRED_KEYS {
            let mut raw = revenue_chart();
            raw.as_object_mut().unwrap().remove(key);
            let error = normalize_chart(&raw).unwrap_err();
            assert!(error.field_path.contains(key), "error should name {}", key);
        }
    }

    #[test]
    fn unknown_chart_type_is_rejected() {
        let mut raw = revenue_chart();
        raw["chartType"] = json!("donut");
        assert_eq!(normalize_chart(&raw).unwrap_err().field_path, "chartType");
    }

    #[test]
    fn pie_total_equals_segment_sum() {
        let raw = json!({
            "chartType": "pie",
            "config": {"title": "Revenue mix"},
            "data": [
                {"name": "Cloud", "value": 60},
                {"name": "Devices", "value": 25},
                {"name": "Services", "value": 15}
            ],
            "chartConfig": {"value": {"label": "Share"}}
        });
        let artifact = normalize_chart(&raw).unwrap();
        assert_eq!(artifact.config.x_axis_key, "name");
        assert_eq!(artifact.total, Some(100.0));
    }

    #[test]
    fn co_occurring_series_keys_produce_grouped_output() {
        let raw = json!({
            "chartType": "multiBar",
            "config": {"title": "Segments", "xAxisKey": "quarter"},
            "data": [
                {"quarter": "Q1", "cloud": 10, "devices": 5},
                {"quarter": "Q2", "cloud": 12, "devices": 6}
            ],
            "chartConfig": {
                "cloud": {"label": "Cloud"},
                "devices": {"label": "Devices"}
            }
        });
        let artifact = normalize_chart(&raw).unwrap();
        match artifact.data {
            ChartData::Grouped(series) => {
                assert_eq!(series.len(), 2);
                assert_eq!(series[0].name, "Cloud");
                assert_eq!(series[0].points[1].y, 12.0);
            }
            other => panic!("expected grouped data, got {:?}", other),
        }
    }

    #[test]
    fn lone_configured_key_in_rows_stays_single_series() {
        // Two keys configured, only one present in the data: incidental extra
        // config keys must not flip the chart to multi-series.
        let raw = json!({
            "chartType": "bar",
            "config": {"title": "Cloud only", "xAxisKey": "quarter"},
            "data": [
                {"quarter": "Q1", "cloud": 10},
                {"quarter": "Q2", "cloud": 12}
            ],
            "chartConfig": {
                "cloud": {"label": "Cloud"},
                "devices": {"label": "Devices"}
            }
        });
        let artifact = normalize_chart(&raw).unwrap();
        match artifact.data {
            ChartData::Points(points) => {
                assert_eq!(points.len(), 2);
                assert_eq!(points[0].y, 10.0);
            }
            other => panic!("expected single-series points, got {:?}", other),
        }
    }

    #[test]
    fn multi_series_line_keeps_wide_rows() {
        let raw = json!({
            "chartType": "line",
            "config": {"title": "Trends", "xAxisKey": "month"},
            "data": [
                {"month": "Jan", "revenue": 10, "costs": 7},
                {"month": "Feb", "revenue": 11, "costs": 8}
            ],
            "chartConfig": {
                "revenue": {"label": "Revenue"},
                "costs": {"label": "Costs"}
            }
        });
        let artifact = normalize_chart(&raw).unwrap();
        match artifact.data {
            ChartData::Wide(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0]["revenue"], json!(10));
            }
            other => panic!("expected wide rows, got {:?}", other),
        }
    }

    #[test]
    fn x_axis_inferred_from_first_non_numeric_field() {
        let raw = json!({
            "chartType": "bar",
            "config": {"title": "Margin"},
            "data": [{"segment": "Cloud", "margin": 0.62}],
            "chartConfig": {"margin": {"label": "Margin"}}
        });
        let artifact = normalize_chart(&raw).unwrap();
        assert_eq!(artifact.config.x_axis_key, "segment");
    }

    #[test]
    fn series_defaults_filled() {
        let artifact = normalize_chart(&revenue_chart()).unwrap();
        let series = &artifact.series_config["revenue"];
        assert_eq!(series.unit, "");
        assert_eq!(series.formatter, "number");
        assert_eq!(series.precision, 0);
    }

    #[test]
    fn empty_data_fails_final_validation() {
        let mut raw = revenue_chart();
        raw["data"] = json!([]);
        assert_eq!(normalize_chart(&raw).unwrap_err().field_path, "data");
    }
}
