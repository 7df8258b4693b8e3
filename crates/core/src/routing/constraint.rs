//! Typed constraints on route parameters (`{id:int}`).

use crate::error::RouteError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use modula_api::RouteValue;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// A stateless converter from a path segment to a typed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteConstraint {
    Bool,
    DateTime,
    Decimal,
    Double,
    Float,
    Guid,
    Int,
    Long,
}

static CONSTRAINTS: Lazy<HashMap<&'static str, RouteConstraint>> = Lazy::new(|| {
    [
        RouteConstraint::Bool,
        RouteConstraint::DateTime,
        RouteConstraint::Decimal,
        RouteConstraint::Double,
        RouteConstraint::Float,
        RouteConstraint::Guid,
        RouteConstraint::Int,
        RouteConstraint::Long,
    ]
    .into_iter()
    .map(|c| (c.keyword(), c))
    .collect()
});

// Leading or trailing sign, digits with optional group separators, optional
// fraction. No exponent.
static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-])?(\d[\d,]*)?(?:\.(\d*))?([+-])?$").expect("valid number pattern")
});

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Integer digits a decimal may carry before it overflows.
const DECIMAL_MAX_INTEGER_DIGITS: usize = 29;
const DECIMAL_MAX_SCALE: usize = 28;

impl RouteConstraint {
    /// Resolves the constraint keyword of `segment` in `template`.
    pub fn parse(template: &str, segment: &str, constraint: &str) -> Result<Self, RouteError> {
        if constraint.is_empty() {
            return Err(RouteError::MalformedTemplate {
                template: template.to_string(),
                reason: format!("Malformed segment '{segment}' contains an empty constraint."),
            });
        }

        CONSTRAINTS
            .get(constraint)
            .copied()
            .ok_or_else(|| RouteError::UnsupportedConstraint {
                template: template.to_string(),
                constraint: constraint.to_string(),
            })
    }

    pub fn keyword(self) -> &'static str {
        match self {
            RouteConstraint::Bool => "bool",
            RouteConstraint::DateTime => "datetime",
            RouteConstraint::Decimal => "decimal",
            RouteConstraint::Double => "double",
            RouteConstraint::Float => "float",
            RouteConstraint::Guid => "guid",
            RouteConstraint::Int => "int",
            RouteConstraint::Long => "long",
        }
    }

    /// Converts `segment`, or returns `None` if it does not satisfy the constraint.
    pub fn try_convert(self, segment: &str) -> Option<RouteValue> {
        let segment = segment.trim();
        match self {
            RouteConstraint::Bool => parse_bool(segment).map(RouteValue::Bool),
            RouteConstraint::DateTime => parse_date_time(segment).map(RouteValue::DateTime),
            RouteConstraint::Decimal => parse_decimal(segment).map(RouteValue::Decimal),
            RouteConstraint::Double => parse_number(segment)
                .and_then(|n| n.parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .map(RouteValue::Double),
            RouteConstraint::Float => parse_number(segment)
                .and_then(|n| n.parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .map(RouteValue::Float),
            RouteConstraint::Guid => Uuid::parse_str(segment).ok().map(RouteValue::Guid),
            RouteConstraint::Int => segment.parse().ok().map(RouteValue::Int),
            RouteConstraint::Long => segment.parse().ok().map(RouteValue::Long),
        }
    }
}

impl fmt::Display for RouteConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

fn parse_bool(segment: &str) -> Option<bool> {
    if segment.eq_ignore_ascii_case("true") {
        Some(true)
    } else if segment.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Normalizes a number literal into `[-]digits[.digits]`, dropping group
/// separators.
fn parse_number(segment: &str) -> Option<String> {
    let captures = NUMBER.captures(segment)?;
    let integer = captures
        .get(2)
        .map(|m| m.as_str().replace(',', ""))
        .unwrap_or_default();
    let fraction = captures.get(3).map(|m| m.as_str()).unwrap_or_default();
    if integer.is_empty() && fraction.is_empty() {
        return None;
    }

    let sign = match (captures.get(1), captures.get(4)) {
        (Some(_), Some(_)) => return None,
        (Some(m), None) | (None, Some(m)) => m.as_str(),
        (None, None) => "",
    };

    let mut normalized = String::new();
    if sign == "-" {
        normalized.push('-');
    }
    normalized.push_str(if integer.is_empty() { "0" } else { &integer });
    if !fraction.is_empty() {
        normalized.push('.');
        normalized.push_str(fraction);
    }
    Some(normalized)
}

fn parse_decimal(segment: &str) -> Option<String> {
    let normalized = parse_number(segment)?;
    let (sign, unsigned) = match normalized.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", normalized.as_str()),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let integer = integer.trim_start_matches('0');
    if integer.len() > DECIMAL_MAX_INTEGER_DIGITS {
        return None;
    }
    let integer = if integer.is_empty() { "0" } else { integer };
    let fraction = &fraction[..fraction.len().min(DECIMAL_MAX_SCALE)];

    let is_zero = integer == "0" && fraction.chars().all(|c| c == '0');
    let sign = if is_zero { "" } else { sign };
    if fraction.is_empty() {
        Some(format!("{sign}{integer}"))
    } else {
        Some(format!("{sign}{integer}.{fraction}"))
    }
}

fn parse_date_time(segment: &str) -> Option<NaiveDateTime> {
    if let Ok(value) = DateTime::parse_from_rfc3339(segment) {
        return Some(value.naive_utc());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(segment, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(segment, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
