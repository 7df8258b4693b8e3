use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use uuid::Uuid;

/// A route parameter value after constraint conversion.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RouteValue {
    Str(String),
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Float(f32),
    /// Normalized decimal literal (sign, digits, optional fraction).
    Decimal(String),
    Guid(Uuid),
    DateTime(NaiveDateTime),
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteValue::Str(v) => f.write_str(v),
            RouteValue::Bool(v) => write!(f, "{v}"),
            RouteValue::Int(v) => write!(f, "{v}"),
            RouteValue::Long(v) => write!(f, "{v}"),
            RouteValue::Double(v) => write!(f, "{v}"),
            RouteValue::Float(v) => write!(f, "{v}"),
            RouteValue::Decimal(v) => f.write_str(v),
            RouteValue::Guid(v) => write!(f, "{v}"),
            RouteValue::DateTime(v) => write!(f, "{v}"),
        }
    }
}

/// Parameters extracted by a route match.
///
/// A `None` value marks a parameter the handler declares on another of its
/// templates that the matched template does not carry.
pub type RouteParameters = IndexMap<SmolStr, Option<RouteValue>>;
