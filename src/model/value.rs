/*!
Typed property values and property declarations.

DyNetML stores every value as an attribute string. The declared type of a property
(`propertyIdentity type="..."`) decides how that string is read into a `PropertyValue`
and how it is written back out.
*/

use std::fmt::Display;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timestamp layout used by DyNetML `date` properties.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
    #[error("'{0}' is not a boolean (expected true or false)")]
    InvalidBool(String),
    #[error("'{0}' is not a date in {DATE_FORMAT} form")]
    InvalidDate(String),
}

/// Declared type of a property, as found in `propertyIdentity type="..."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Number,
    Date,
    Text,
    CategoryText,
    Uri,
    Bool,
    /// `Bool` as spelled `boolean`; kept apart so the spelling survives a rewrite.
    Boolean,
    /// A type string this crate has no special handling for. Values are kept as text.
    Other(String),
}

impl PropertyType {
    pub fn from_dynetml(type_str: &str) -> Self {
        match type_str {
            "number" => PropertyType::Number,
            "date" => PropertyType::Date,
            "text" => PropertyType::Text,
            "categoryText" => PropertyType::CategoryText,
            "URI" => PropertyType::Uri,
            "bool" => PropertyType::Bool,
            "boolean" => PropertyType::Boolean,
            other => PropertyType::Other(other.to_string()),
        }
    }

    pub fn as_dynetml(&self) -> &str {
        match self {
            PropertyType::Number => "number",
            PropertyType::Date => "date",
            PropertyType::Text => "text",
            PropertyType::CategoryText => "categoryText",
            PropertyType::Uri => "URI",
            PropertyType::Bool => "bool",
            PropertyType::Boolean => "boolean",
            PropertyType::Other(s) => s,
        }
    }

    /// Reads a raw attribute string into a value of this type.
    pub fn parse(&self, raw: &str) -> Result<PropertyValue, ValueError> {
        match self {
            PropertyType::Number => parse_finite(raw)
                .map(PropertyValue::Number)
                .ok_or_else(|| ValueError::InvalidNumber(raw.to_string())),
            PropertyType::Bool | PropertyType::Boolean => match raw.trim().to_lowercase().as_str() {
                "true" => Ok(PropertyValue::Bool(true)),
                "false" => Ok(PropertyValue::Bool(false)),
                _ => Err(ValueError::InvalidBool(raw.to_string())),
            },
            PropertyType::Date => NaiveDateTime::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(PropertyValue::Date)
                .map_err(|_| ValueError::InvalidDate(raw.to_string())),
            PropertyType::Text
            | PropertyType::CategoryText
            | PropertyType::Uri
            | PropertyType::Other(_) => Ok(PropertyValue::Text(raw.to_string())),
        }
    }

    /// Whether a value of this shape may be stored under this declaration.
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        matches!(
            (self, value),
            (PropertyType::Number, PropertyValue::Number(_))
                | (PropertyType::Date, PropertyValue::Date(_))
                | (
                    PropertyType::Bool | PropertyType::Boolean,
                    PropertyValue::Bool(_)
                )
                | (
                    PropertyType::Text
                        | PropertyType::CategoryText
                        | PropertyType::Uri
                        | PropertyType::Other(_),
                    PropertyValue::Text(_)
                )
        )
    }
}

/// Parses a finite `f64`. `NaN`, infinities and overflowing literals such as `1e400`
/// are refused since DyNetML cannot write them back.
pub fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

impl Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_dynetml())
    }
}

/// A property declaration (`propertyIdentity`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyIdentity {
    pub value_type: PropertyType,
    pub single_valued: bool,
}

impl PropertyIdentity {
    pub fn new(value_type: PropertyType, single_valued: bool) -> Self {
        Self {
            value_type,
            single_valued,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl PropertyValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PropertyValue::Text(_) => "text",
            PropertyValue::Number(_) => "number",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Date(_) => "date",
        }
    }

    /// The DyNetML attribute text for this value.
    pub fn to_dynetml(&self) -> String {
        match self {
            PropertyValue::Text(s) => s.clone(),
            PropertyValue::Number(n) => n.to_string(),
            PropertyValue::Bool(b) => b.to_string(),
            PropertyValue::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_dynetml())
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}
