use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Max trailing characters the junk-stripping strategy will shave off.
const MAX_TRAILING_JUNK: usize = 3;

/// Repair a possibly malformed JSON string from the model.
///
/// Ordered chain of independent strategies, short-circuiting on the first
/// one that yields a parse: strict parse, trailing-junk strip, balanced
/// substring extraction.
pub fn repair_json(raw: &str) -> Option<Value> {
    parse_strict(raw)
        .or_else(|| strip_trailing_junk(raw))
        .or_else(|| extract_balanced(raw))
}

/// Resolve a raw tool input into a JSON value, repairing string payloads.
pub fn coerce_payload(raw: &Value) -> Option<Value> {
    match raw {
        Value::String(s) => repair_json(s),
        other => Some(other.clone()),
    }
}

pub(crate) fn parse_strict(raw: &str) -> Option<Value> {
    serde_json::from_str(raw.trim()).ok()
}

/// Drop up to a few trailing characters (duplicated closing brackets and
/// similar artifacts) and reparse after each drop.
pub(crate) fn strip_trailing_junk(raw: &str) -> Option<Value> {
    let mut candidate = raw.trim_end().to_string();
    for _ in 0..MAX_TRAILING_JUNK {
        candidate.pop()?;
        let trimmed = candidate.trim_end();
        if let Ok(value) = serde_json::from_str(trimmed) {
            return Some(value);
        }
    }
    None
}

/// Extract the first balanced `{...}` or `[...]` substring and parse it.
/// The scanner is string- and escape-aware so braces inside string literals
/// do not confuse the depth tracking.
pub(crate) fn extract_balanced(raw: &str) -> Option<Value> {
    let start = raw.find(|c| c == '{' || c == '[')?;
    let bytes = raw.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in raw[start..].bytes().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b if b == open => depth += 1,
            b if b == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let candidate = &raw[start..=start + offset];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// Coerce a JSON value into an f64: numbers pass through, numeric strings
/// with thousands separators are cleaned and parsed. Anything else is None.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            static NUMERIC: OnceLock<Regex> = OnceLock::new();
            let re = NUMERIC
                .get_or_init(|| Regex::new(r"^-?\d{1,3}(,\d{3})*(\.\d+)?$|^-?\d+(\.\d+)?$").unwrap());
            let trimmed = s.trim();
            if !re.is_match(trimmed) {
                return None;
            }
            trimmed.replace(',', "").parse::<f64>().ok()
        }
        _ => None,
    }
}
