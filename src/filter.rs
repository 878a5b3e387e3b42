//! SCIM filter expressions of the form `attribute operator value`.
//!
//! Only single comparisons are supported, which is what identity providers send
//! for list imports and user lookups:
//!
//! ```text
//! userName eq "jdoe@example.com"
//! number lt 4
//! active eq true
//! meta.lastModified gt "2021-05-07T14:19:34Z"
//! ```
//!
//! A parsed [`Filter`] is a typed predicate evaluated against any record
//! implementing [`Filterable`]. Values are typed when parsed: unquoted `true` and
//! `false` become booleans, unquoted digits become integers, and anything under
//! `meta.lastModified` or `meta.created` becomes a UTC timestamp. The record side
//! is coerced to the filter's type before comparing.

use crate::error::{ScimError, ScimResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

/// Attribute that marks a filter as an incremental import.
pub const LAST_MODIFIED: &str = "meta.lastModified";

const CREATED: &str = "meta.created";

/// `attribute op "value"`
static QUOTED_FILTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([\w._-]+) (\w+) "([^"]*)"$"#).expect("Invalid quoted filter regex")
});

/// `attribute op value`
static UNQUOTED_FILTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w._-]+) (\w+) ([a-zA-Z0-9_]+)$").expect("Invalid unquoted filter regex")
});

/// Supported comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Lt,
    Gt,
}

impl FilterOperator {
    fn parse(operator: &str) -> Option<Self> {
        match operator.to_ascii_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "lt" => Some(Self::Lt),
            "gt" => Some(Self::Gt),
            _ => None,
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Gt => ordering == Ordering::Greater,
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operator = match self {
            Self::Eq => "eq",
            Self::Lt => "lt",
            Self::Gt => "gt",
        };
        f.write_str(operator)
    }
}

/// A typed value on either side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

impl FilterValue {
    /// Convert a JSON scalar into a filter value; objects, arrays and null have
    /// no comparable form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| Some(Self::String(n.to_string()))),
            _ => None,
        }
    }

    fn from_unquoted(raw: &str) -> Self {
        match raw {
            "true" => Self::Boolean(true),
            "false" => Self::Boolean(false),
            _ => raw
                .parse::<i64>()
                .map(Self::Integer)
                .unwrap_or_else(|_| Self::String(raw.to_string())),
        }
    }

    /// Re-type `self` to match `target`, if it has a sensible reading of that type.
    fn coerce_like(&self, target: &FilterValue) -> Option<FilterValue> {
        match (self, target) {
            (Self::String(_), Self::String(_))
            | (Self::Integer(_), Self::Integer(_))
            | (Self::Boolean(_), Self::Boolean(_))
            | (Self::DateTime(_), Self::DateTime(_)) => Some(self.clone()),
            (Self::String(s), Self::Integer(_)) => s.trim().parse().ok().map(Self::Integer),
            (Self::String(s), Self::Boolean(_)) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(Self::Boolean(true)),
                "false" => Some(Self::Boolean(false)),
                _ => None,
            },
            (Self::String(s), Self::DateTime(_)) => parse_datetime(s).map(Self::DateTime),
            (other, Self::String(_)) => Some(Self::String(other.to_string())),
            _ => None,
        }
    }

    fn compare(&self, other: &FilterValue) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::DateTime(a), Self::DateTime(b)) => Some(a.cmp(b)),
            // Booleans only support equality.
            (Self::Boolean(a), Self::Boolean(b)) => {
                if a == b {
                    Some(Ordering::Equal)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
        }
    }
}

/// Parse an ISO-8601 timestamp, with or without a trailing `Z` or offset.
/// Timestamps without an offset are taken as UTC.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw.strip_suffix('Z').unwrap_or(raw);
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Records that can be evaluated against a [`Filter`].
pub trait Filterable {
    /// Every value the record holds for `attribute`.
    ///
    /// The attribute name is matched case-insensitively. Multi-valued
    /// attributes return one entry per value; an absent attribute returns an
    /// empty vector and never matches.
    fn attribute_values(&self, attribute: &str) -> Vec<FilterValue>;
}

/// Look up `attribute` among custom extension attributes.
///
/// Matches a top-level key directly, or a key inside any schema extension
/// object (`"urn:...:user:custom": {"number": 4}` matches `number`).
pub fn extension_values(extensions: &Map<String, Value>, attribute: &str) -> Vec<FilterValue> {
    let mut values = Vec::new();
    for (key, value) in extensions {
        if key.eq_ignore_ascii_case(attribute) {
            collect_values(value, &mut values);
        } else if let Value::Object(inner) = value {
            for (inner_key, inner_value) in inner {
                if inner_key.eq_ignore_ascii_case(attribute) {
                    collect_values(inner_value, &mut values);
                }
            }
        }
    }
    values
}

fn collect_values(value: &Value, into: &mut Vec<FilterValue>) {
    match value {
        Value::Array(items) => into.extend(items.iter().filter_map(FilterValue::from_json)),
        other => into.extend(FilterValue::from_json(other)),
    }
}

/// A parsed `attribute operator value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    attribute: String,
    operator: FilterOperator,
    value: FilterValue,
    expression: String,
}

impl Filter {
    /// Parse a filter expression.
    ///
    /// Returns [`ScimError::InvalidFilter`] for anything that is not a single
    /// supported comparison.
    pub fn parse(expression: &str) -> ScimResult<Self> {
        let trimmed = expression.trim();

        let (attribute, operator, raw, quoted) =
            if let Some(captures) = QUOTED_FILTER.captures(trimmed) {
                (captures[1].to_string(), captures[2].to_string(), captures[3].to_string(), true)
            } else if let Some(captures) = UNQUOTED_FILTER.captures(trimmed) {
                (captures[1].to_string(), captures[2].to_string(), captures[3].to_string(), false)
            } else {
                return Err(ScimError::invalid_filter(
                    expression,
                    "expected 'attribute operator value'",
                ));
            };

        let operator = FilterOperator::parse(&operator).ok_or_else(|| {
            ScimError::invalid_filter(
                expression,
                format!("unsupported operator '{operator}', expected eq, lt or gt"),
            )
        })?;

        let value = if attribute.eq_ignore_ascii_case(LAST_MODIFIED)
            || attribute.eq_ignore_ascii_case(CREATED)
        {
            let parsed = parse_datetime(&raw).ok_or_else(|| {
                ScimError::invalid_filter(expression, format!("'{raw}' is not a valid timestamp"))
            })?;
            FilterValue::DateTime(parsed)
        } else if quoted {
            FilterValue::String(raw)
        } else {
            FilterValue::from_unquoted(&raw)
        };

        Ok(Self {
            attribute,
            operator,
            value,
            expression: trimmed.to_string(),
        })
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FilterValue {
        &self.value
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Whether this filter selects records by last modification time.
    pub fn is_last_modified(&self) -> bool {
        self.attribute.eq_ignore_ascii_case(LAST_MODIFIED)
    }

    /// Evaluate the filter against a record.
    ///
    /// Multi-valued attributes match when any of their values does.
    pub fn matches<T: Filterable + ?Sized>(&self, record: &T) -> bool {
        record
            .attribute_values(&self.attribute)
            .iter()
            .filter_map(|candidate| candidate.coerce_like(&self.value))
            .filter_map(|candidate| candidate.compare(&self.value))
            .any(|ordering| self.operator.accepts(ordering))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
