//! Dynamic value model shared by every record operation

use crate::record::RecordValue;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Closed classification of a field's runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Int,
    Uint,
    Float,
    Complex,
    String,
    Timestamp,
    Sequence,
    Map,
    Record,
    Optional,
    Ignored,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Uint => "uint",
            FieldKind::Float => "float",
            FieldKind::Complex => "complex",
            FieldKind::String => "string",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Sequence => "sequence",
            FieldKind::Map => "map",
            FieldKind::Record => "record",
            FieldKind::Optional => "optional",
            FieldKind::Ignored => "ignored",
        }
    }

    /// Kinds rendered as a single token by [`crate::sprint`].
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldKind::Bool
                | FieldKind::Int
                | FieldKind::Uint
                | FieldKind::Float
                | FieldKind::Complex
                | FieldKind::String
        )
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A complex number with 64-bit float components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    pub fn is_zero(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let im = format_float(self.im);
        let sign = if im.starts_with('-') || im.starts_with('+') {
            ""
        } else {
            "+"
        };
        write!(f, "({}{}{}i)", format_float(self.re), sign, im)
    }
}

/// A dynamically typed field value.
///
/// `Optional` keeps its wrapper so the declared kind of a field survives even
/// when the option is empty.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(Complex),
    String(String),
    Timestamp(DateTime<Utc>),
    Sequence(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Record(RecordValue),
    Optional(Option<Box<Value>>),
    Ignored,
}

impl Default for Value {
    fn default() -> Self {
        Value::Optional(None)
    }
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Value::Bool(_) => FieldKind::Bool,
            Value::Int(_) => FieldKind::Int,
            Value::Uint(_) => FieldKind::Uint,
            Value::Float(_) => FieldKind::Float,
            Value::Complex(_) => FieldKind::Complex,
            Value::String(_) => FieldKind::String,
            Value::Timestamp(_) => FieldKind::Timestamp,
            Value::Sequence(_) => FieldKind::Sequence,
            Value::Map(_) => FieldKind::Map,
            Value::Record(_) => FieldKind::Record,
            Value::Optional(_) => FieldKind::Optional,
            Value::Ignored => FieldKind::Ignored,
        }
    }

    /// The zero value of the same shape.
    pub fn zero(&self) -> Value {
        match self {
            Value::Bool(_) => Value::Bool(false),
            Value::Int(_) => Value::Int(0),
            Value::Uint(_) => Value::Uint(0),
            Value::Float(_) => Value::Float(0.0),
            Value::Complex(_) => Value::Complex(Complex::default()),
            Value::String(_) => Value::String(String::new()),
            Value::Timestamp(_) => Value::Timestamp(DateTime::<Utc>::default()),
            Value::Sequence(_) => Value::Sequence(Vec::new()),
            Value::Map(_) => Value::Map(BTreeMap::new()),
            Value::Record(record) => Value::Record(record.zeroed()),
            Value::Optional(_) => Value::Optional(None),
            Value::Ignored => Value::Ignored,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Uint(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::Complex(c) => c.is_zero(),
            Value::String(s) => s.is_empty(),
            Value::Timestamp(t) => *t == DateTime::<Utc>::default(),
            Value::Sequence(items) => items.is_empty(),
            Value::Map(entries) => entries.is_empty(),
            Value::Record(record) => record.fields().iter().all(|f| f.value.is_zero()),
            Value::Optional(inner) => inner.is_none(),
            Value::Ignored => true,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Optional(None))
    }

    /// Dereferences one level of optional wrapping. `None` for an empty optional.
    pub fn deref(&self) -> Option<&Value> {
        match self {
            Value::Optional(Some(inner)) => Some(inner),
            Value::Optional(None) => None,
            other => Some(other),
        }
    }

    /// Dereferences optional wrapping until a concrete value is reached.
    pub fn deref_all(&self) -> Option<&Value> {
        let mut current = self;
        loop {
            match current {
                Value::Optional(Some(inner)) => current = inner,
                Value::Optional(None) => return None,
                other => return Some(other),
            }
        }
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn optional(value: Value) -> Value {
        Value::Optional(Some(Box::new(value)))
    }

    /// Converts to a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Uint(u) => serde_json::Value::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Complex(c) => serde_json::Value::String(c.to_string()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(t) => {
                serde_json::Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Record(record) => serde_json::Value::Object(
                record
                    .fields()
                    .iter()
                    .filter(|f| f.value.kind() != FieldKind::Ignored)
                    .map(|f| (f.name.clone(), f.value.to_json()))
                    .collect(),
            ),
            Value::Optional(Some(inner)) => inner.to_json(),
            Value::Optional(None) | Value::Ignored => serde_json::Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Optional(None),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Complex(c) => serializer.collect_str(c),
            Value::String(s) => serializer.serialize_str(s),
            Value::Timestamp(t) => {
                serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Record(record) => {
                let mut map = serializer.serialize_map(None)?;
                for field in record.fields() {
                    if field.value.kind() != FieldKind::Ignored {
                        map.serialize_entry(&field.name, &field.value)?;
                    }
                }
                map.end()
            }
            Value::Optional(Some(inner)) => serializer.serialize_some(inner.as_ref()),
            Value::Optional(None) | Value::Ignored => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Uint(u) => write!(f, "{}", u),
            Value::Float(v) => f.write_str(&format_float(*v)),
            Value::Complex(c) => write!(f, "{}", c),
            Value::String(s) => f.write_str(s),
            Value::Timestamp(t) => f.write_str(&format_timestamp(t)),
            Value::Sequence(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("map[")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}:{}", key, value)?;
                }
                f.write_str("]")
            }
            Value::Record(record) => {
                f.write_str("{")?;
                for (i, field) in record.fields().iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", field.value)?;
                }
                f.write_str("}")
            }
            Value::Optional(Some(inner)) => write!(f, "{}", inner),
            Value::Optional(None) => f.write_str("<nil>"),
            Value::Ignored => f.write_str("<func>"),
        }
    }
}

/// `2006-01-02 15:04:05.5 +0000 UTC`: fractional seconds only when present,
/// without trailing zeros.
fn format_timestamp(t: &DateTime<Utc>) -> String {
    let mut out = t.format("%Y-%m-%d %H:%M:%S").to_string();
    let nanos = t.timestamp_subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out.push_str(" +0000 UTC");
    out
}

/// Renders a float the way `%v` does: shortest round-trip digits, switching
/// to exponent form below 1e-4 and from 1e21 upwards.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };
    if !(-4..21).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    } else {
        format!("{}", value)
    }
}

/// Stringifies a value, yielding an empty string for absent values and empty
/// optionals.
pub fn sprint(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Optional(None)) => String::new(),
        Some(value) => value.to_string(),
    }
}
