//! Raw input coercion for bulk import and search filtering.
//!
//! Spreadsheet imports arrive as untyped cells; each cell is coerced to the
//! declared type of its target field. Coercion is forgiving where the data
//! warrants it: a date or number that cannot be parsed is dropped from the
//! row (`Ok(None)`) so one bad cell never aborts an import, while a value
//! whose JSON shape cannot possibly fit the target type is a hard
//! [`DomainError::InvalidFieldValue`] reported against the row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Map, Value};

use crate::error::DomainError;
use crate::fields::{FieldType, TypedValue};

/// Tokens recognized as boolean true, case-insensitive.
const TRUE_TOKENS: [&str; 7] = ["true", "1", "yes", "sim", "y", "s", "x"];

/// Coerces a raw cell to the declared field type.
///
/// Returns `Ok(None)` when the value should be omitted from the write
/// (unparseable dates and numbers), `Ok(Some(_))` with a shape-correct
/// payload otherwise.
pub fn coerce(raw: &Value, field_type: &FieldType) -> Result<Option<TypedValue>, DomainError> {
    let value = match field_type {
        FieldType::Number | FieldType::Money => match coerce_number(raw) {
            Some(n) => json!(n),
            None => return Ok(None),
        },
        FieldType::Check | FieldType::Done => json!(coerce_bool(raw)),
        FieldType::Date | FieldType::Datetime => match coerce_date(raw) {
            Some(iso) => json!(iso),
            None => return Ok(None),
        },
        FieldType::Array => json!(coerce_array(raw)),
        FieldType::Map => coerce_map(raw, field_type)?,
        FieldType::File | FieldType::Image => coerce_attachment(raw, field_type)?,
        FieldType::Hotspot => coerce_hotspot(raw),
        // text, area, select, form-data-select and unknown tags are opaque text
        _ => coerce_text(raw, field_type)?,
    };

    Ok(Some(TypedValue::new(field_type.clone(), value)))
}

/// Parses a decimal accepting comma-decimal input alongside plain decimals.
///
/// `"1.234,56"` parses as `1234.56` (dots as thousands separators); input
/// without a comma parses as a plain decimal.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalized.parse::<f64>().ok()
}

/// True iff `text` is one of the recognized true tokens.
pub fn parse_bool_token(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    TRUE_TOKENS.contains(&lowered.as_str())
}

/// Decodes an encoded hotspot selection to its bare option text.
///
/// A selected hotspot cell is stored as `hotspot<index>:<option>`; search
/// and sort operate on the option text alone. Input not in that form is
/// returned unchanged.
pub fn decode_hotspot_selection(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("hotspot") else {
        return text;
    };
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return text;
    }
    match rest[digits..].strip_prefix(':') {
        Some(option) => option.trim(),
        None => text,
    }
}

fn coerce_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn coerce_bool(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => parse_bool_token(s),
        _ => false,
    }
}

fn coerce_date(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => parse_date_text(s.trim()),
        // Numeric cells are epoch milliseconds.
        Value::Number(n) => {
            let millis = n.as_f64()? as i64;
            DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339())
        }
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc).to_rfc3339());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc().to_rfc3339());
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc().to_rfc3339());
        }
    }
    None
}

fn coerce_array(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn coerce_map(raw: &Value, field_type: &FieldType) -> Result<Value, DomainError> {
    if let Value::Object(obj) = raw {
        if obj.contains_key("lat") && obj.contains_key("lng") {
            return Ok(raw.clone());
        }
    }
    if let Value::String(s) = raw {
        if let Some((lat, lng)) = s.split_once(',') {
            let lat = lat.trim().parse::<f64>();
            let lng = lng.trim().parse::<f64>();
            if let (Ok(lat), Ok(lng)) = (lat, lng) {
                return Ok(json!({"lat": lat, "lng": lng}));
            }
        }
    }
    Err(invalid(field_type, raw))
}

fn coerce_attachment(raw: &Value, field_type: &FieldType) -> Result<Value, DomainError> {
    match raw {
        Value::Object(obj) if obj.contains_key("url") => Ok(raw.clone()),
        Value::String(s) if s.starts_with("http") => {
            let name = s
                .rsplit('/')
                .next()
                .map(|segment| segment.split('?').next().unwrap_or(segment))
                .unwrap_or_default();
            Ok(json!({"url": s, "name": name}))
        }
        // Data URIs and storage keys pass through untouched.
        Value::String(_) => Ok(raw.clone()),
        _ => Err(invalid(field_type, raw)),
    }
}

fn coerce_hotspot(raw: &Value) -> Value {
    match raw {
        // A selected cell decodes to the bare option text.
        Value::String(s) => json!(decode_hotspot_selection(s)),
        // The field-definition shape (image plus ordered markers) is kept.
        other => other.clone(),
    }
}

fn coerce_text(raw: &Value, field_type: &FieldType) -> Result<Value, DomainError> {
    match raw {
        Value::String(_) => Ok(raw.clone()),
        Value::Number(n) => Ok(json!(n.to_string())),
        Value::Bool(b) => Ok(json!(b.to_string())),
        Value::Null => Ok(json!("")),
        Value::Array(_) | Value::Object(_) => Err(invalid(field_type, raw)),
    }
}

fn invalid(field_type: &FieldType, raw: &Value) -> DomainError {
    DomainError::InvalidFieldValue {
        field_type: field_type.as_str().to_string(),
        message: format!("cannot coerce {raw}"),
    }
}

/// Coerces a whole import row against the form's field types.
///
/// Fields whose cells soft-fail are omitted; the first hard failure aborts
/// the row (not the import — callers report it per row).
pub fn coerce_row(
    row: &Map<String, Value>,
    field_types: &Map<String, Value>,
) -> Result<Map<String, Value>, DomainError> {
    let mut out = Map::new();
    for (name, raw) in row {
        let field_type = field_types
            .get(name)
            .and_then(Value::as_str)
            .map(FieldType::parse)
            .unwrap_or(FieldType::Text);
        if let Some(typed) = coerce(raw, &field_type)? {
            out.insert(name.clone(), serde_json::to_value(typed).unwrap_or(Value::Null));
        }
    }
    Ok(out)
}
