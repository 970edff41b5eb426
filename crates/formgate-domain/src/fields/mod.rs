//! The record field-type taxonomy.
//!
//! Form fields and record cells are tagged values: a [`FieldType`] tag plus
//! a JSON payload whose shape depends on the tag. The taxonomy is consumed
//! by bulk import (coercion of raw spreadsheet cells), by search filtering
//! (text and numeric extraction) and by the authorization layer (the org
//! field of a document is itself a scalar-or-array shape).
//!
//! Unrecognized tags are preserved verbatim and treated as opaque text for
//! search and sort purposes.

mod coerce;

pub use coerce::{coerce, decode_hotspot_selection, parse_bool_token, parse_decimal};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// The declared type of a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Area,
    Number,
    Money,
    Select,
    FormDataSelect,
    Date,
    Datetime,
    Check,
    Map,
    File,
    Image,
    Hotspot,
    Array,
    Done,
    /// Tag not in the taxonomy; round-tripped untouched, searched as text.
    Unknown(String),
}

impl FieldType {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "text" => FieldType::Text,
            "area" => FieldType::Area,
            "number" => FieldType::Number,
            "money" => FieldType::Money,
            "select" => FieldType::Select,
            "form-data-select" => FieldType::FormDataSelect,
            "date" => FieldType::Date,
            "datetime" => FieldType::Datetime,
            "check" => FieldType::Check,
            "map" => FieldType::Map,
            "file" => FieldType::File,
            "image" => FieldType::Image,
            "hotspot" => FieldType::Hotspot,
            "array" => FieldType::Array,
            "done" => FieldType::Done,
            other => FieldType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Area => "area",
            FieldType::Number => "number",
            FieldType::Money => "money",
            FieldType::Select => "select",
            FieldType::FormDataSelect => "form-data-select",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::Check => "check",
            FieldType::Map => "map",
            FieldType::File => "file",
            FieldType::Image => "image",
            FieldType::Hotspot => "hotspot",
            FieldType::Array => "array",
            FieldType::Done => "done",
            FieldType::Unknown(tag) => tag,
        }
    }

    /// Types whose payloads are numeric for search and sort.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Money)
    }

    /// Types whose payloads are boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(self, FieldType::Check | FieldType::Done)
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(tag) => Ok(FieldType::parse(&tag)),
            other => Err(D::Error::custom(format!(
                "field type must be a string, got {other}"
            ))),
        }
    }
}

/// A tagged field value as stored in a record's data map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub value: Value,
}

impl TypedValue {
    pub fn new(field_type: FieldType, value: Value) -> Self {
        Self { field_type, value }
    }

    /// Renders the payload as searchable text.
    ///
    /// Lists join with `", "`, map points render `"lat, lng"`, file and
    /// image payloads render their name (falling back to url), hotspot
    /// selections decode to the bare option text, and anything else
    /// stringifies.
    pub fn search_text(&self) -> String {
        match &self.field_type {
            FieldType::Hotspot => match &self.value {
                Value::String(s) => decode_hotspot_selection(s).to_string(),
                other => render_value(other),
            },
            FieldType::File | FieldType::Image => match &self.value {
                Value::Object(obj) => obj
                    .get("name")
                    .or_else(|| obj.get("url"))
                    .map(render_value)
                    .unwrap_or_default(),
                other => render_value(other),
            },
            _ => render_value(&self.value),
        }
    }

    /// Extracts a numeric payload, tolerating comma-decimal strings and
    /// singleton arrays. Hotspot selections decode before parsing so an
    /// encoded `hotspot<n>:<option>` cell can still match numeric filters.
    pub fn numeric_value(&self) -> Option<f64> {
        numeric_of(&self.value, &self.field_type)
    }
}

fn numeric_of(value: &Value, field_type: &FieldType) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let text = if *field_type == FieldType::Hotspot {
                decode_hotspot_selection(s)
            } else {
                s.as_str()
            };
            parse_decimal(text)
        }
        Value::Array(items) => items.first().and_then(|v| numeric_of(v, field_type)),
        _ => None,
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(obj) => {
            if let (Some(lat), Some(lng)) = (obj.get("lat"), obj.get("lng")) {
                format!("{}, {}", render_value(lat), render_value(lng))
            } else {
                Value::Object(obj.clone()).to_string()
            }
        }
    }
}
