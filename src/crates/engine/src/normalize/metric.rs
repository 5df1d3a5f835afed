use crate::normalize::artifact::MetricArtifact;
use crate::normalize::repair::coerce_number;
use crate::normalize::TOOL_METRICS;
use crate::util::errors::ValidationError;
use serde_json::Value;

const REQUIRED_KEYS: [&str; 5] = ["category", "name", "period", "value", "unit"];

pub fn normalize_metric(payload: &Value) -> Result<MetricArtifact, ValidationError> {
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

    let field = |key: &str| -> Result<String, ValidationError> {
        obj[key]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| err(key, "expected a string"))
    };

    // Number, or a numeric string with thousands separators. Anything else
    // is a validation failure, never a silent zero.
    let value = coerce_number(&obj["value"])
        .ok_or_else(|| err("value", "expected a number or numeric string"))?;

    Ok(MetricArtifact {
        category: field("category")?,
        name: field("name")?,
        period: field("period")?,
        value,
        unit: field("unit")?,
    })
}

fn err(field_path: &str, message: impl Into<String>) -> ValidationError {
    ValidationError::new(TOOL_METRICS, field_path, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gross_margin() -> Value {
        json!({
            "category": "profitability",
            "name": "Gross margin",
            "period": "Q2 FY2024",
            "value": 62.4,
            "unit": "%"
        })
    }

    #[test]
    fn plain_number_value() {
        let metric = normalize_metric(&gross_margin()).unwrap();
        assert_eq!(metric.value, 62.4);
        assert_eq!(metric.unit, "%");
    }

    #[test]
    fn thousands_separated_string_value() {
        let mut raw = gross_margin();
        raw["value"] = json!("1,234,567.5");
        let metric = normalize_metric(&raw).unwrap();
        assert_eq!(metric.value, 1_234_567.5);
    }

    #[test]
    fn non_numeric_value_is_rejected() {
        let mut raw = gross_margin();
        raw["value"] = json!("approximately twelve");
        assert_eq!(normalize_metric(&raw).unwrap_err().field_path, "value");
    }

    #[test]
    fn each_missing_key_is_named() {
        for key in REQUIRED_KEYS {
            let mut raw = gross_margin();
            raw.as_object_mut().unwrap().remove(key);
            let error = normalize_metric(&raw).unwrap_err();
            assert!(error.field_path.contains(key), "error should name {}", key);
        }
    }
}
