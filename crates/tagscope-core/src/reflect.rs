//! Traits bridging concrete Rust types and the dynamic [`Value`] model
//!
//! Engines never touch a concrete struct directly. They take a snapshot with
//! [`Reflect::to_value`], work on the dynamic tree, and write results back with
//! [`Reflect::apply_value`].

use crate::error::{Result, TagscopeError};
use crate::record::RecordValue;
use crate::value::{Complex, FieldKind, Value};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

pub trait Reflect {
    /// Snapshot of the current value.
    fn to_value(&self) -> Value;

    /// Overwrites `self` from a dynamic value, widening numerics where lossless.
    fn apply_value(&mut self, value: Value) -> Result<()>;
}

/// Construction from a dynamic value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

impl<T: Reflect + Default> FromValue for T {
    fn from_value(value: Value) -> Result<Self> {
        let mut out = T::default();
        out.apply_value(value)?;
        Ok(out)
    }
}

/// A type whose fields can be enumerated and addressed by name.
///
/// Implemented by the [`record!`](crate::record) macro and by [`RecordValue`].
pub trait Record: Reflect {
    fn to_record(&self) -> RecordValue;

    /// Sets a single field by its declared name.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;
}

fn unwrap_optional(value: Value, expected: &str) -> Result<Value> {
    match value {
        Value::Optional(Some(inner)) => unwrap_optional(*inner, expected),
        Value::Optional(None) => Err(TagscopeError::mismatch(expected, FieldKind::Optional)),
        other => Ok(other),
    }
}

macro_rules! reflect_signed {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }

            fn apply_value(&mut self, value: Value) -> Result<()> {
                *self = match unwrap_optional(value, stringify!($ty))? {
                    Value::Int(v) => <$ty>::try_from(v)
                        .map_err(|_| TagscopeError::out_of_range(stringify!($ty), v))?,
                    Value::Uint(v) => <$ty>::try_from(v)
                        .map_err(|_| TagscopeError::out_of_range(stringify!($ty), v))?,
                    other => return Err(TagscopeError::mismatch(stringify!($ty), other.kind())),
                };
                Ok(())
            }
        }
    )*};
}

macro_rules! reflect_unsigned {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn to_value(&self) -> Value {
                Value::Uint(*self as u64)
            }

            fn apply_value(&mut self, value: Value) -> Result<()> {
                *self = match unwrap_optional(value, stringify!($ty))? {
                    Value::Uint(v) => <$ty>::try_from(v)
                        .map_err(|_| TagscopeError::out_of_range(stringify!($ty), v))?,
                    Value::Int(v) => <$ty>::try_from(v)
                        .map_err(|_| TagscopeError::out_of_range(stringify!($ty), v))?,
                    other => return Err(TagscopeError::mismatch(stringify!($ty), other.kind())),
                };
                Ok(())
            }
        }
    )*};
}

macro_rules! reflect_float {
    ($($ty:ty),*) => {$(
        impl Reflect for $ty {
            fn to_value(&self) -> Value {
                Value::Float(*self as f64)
            }

            fn apply_value(&mut self, value: Value) -> Result<()> {
                *self = match unwrap_optional(value, stringify!($ty))? {
                    Value::Float(v) => v as $ty,
                    Value::Int(v) => v as $ty,
                    Value::Uint(v) => v as $ty,
                    other => return Err(TagscopeError::mismatch(stringify!($ty), other.kind())),
                };
                Ok(())
            }
        }
    )*};
}

reflect_signed!(i8, i16, i32, i64, isize);
reflect_unsigned!(u8, u16, u32, u64, usize);
reflect_float!(f32, f64);

impl Reflect for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        match unwrap_optional(value, "bool")? {
            Value::Bool(b) => {
                *self = b;
                Ok(())
            }
            other => Err(TagscopeError::mismatch("bool", other.kind())),
        }
    }
}

impl Reflect for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        match unwrap_optional(value, "string")? {
            Value::String(s) => {
                *self = s;
                Ok(())
            }
            other => Err(TagscopeError::mismatch("string", other.kind())),
        }
    }
}

impl Reflect for Complex {
    fn to_value(&self) -> Value {
        Value::Complex(*self)
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        *self = match unwrap_optional(value, "complex")? {
            Value::Complex(c) => c,
            Value::Float(re) => Complex::new(re, 0.0),
            Value::Int(re) => Complex::new(re as f64, 0.0),
            Value::Uint(re) => Complex::new(re as f64, 0.0),
            other => return Err(TagscopeError::mismatch("complex", other.kind())),
        };
        Ok(())
    }
}

impl Reflect for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        *self = match unwrap_optional(value, "timestamp")? {
            Value::Timestamp(t) => t,
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| TagscopeError::mismatch("RFC 3339 timestamp", FieldKind::String))?,
            Value::Int(millis) => Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| TagscopeError::out_of_range("timestamp", millis))?,
            other => return Err(TagscopeError::mismatch("timestamp", other.kind())),
        };
        Ok(())
    }
}

impl<T: Reflect + Default> Reflect for Option<T> {
    fn to_value(&self) -> Value {
        Value::Optional(self.as_ref().map(|inner| Box::new(inner.to_value())))
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        let value = match value {
            Value::Optional(None) => {
                *self = None;
                return Ok(());
            }
            Value::Optional(Some(inner)) => *inner,
            other => other,
        };
        match self {
            Some(existing) => existing.apply_value(value),
            None => {
                *self = Some(T::from_value(value)?);
                Ok(())
            }
        }
    }
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn to_value(&self) -> Value {
        Value::Sequence(self.iter().map(Reflect::to_value).collect())
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        match unwrap_optional(value, "sequence")? {
            Value::Sequence(items) => {
                *self = items
                    .into_iter()
                    .map(T::from_value)
                    .collect::<Result<Vec<_>>>()?;
                Ok(())
            }
            other => Err(TagscopeError::mismatch("sequence", other.kind())),
        }
    }
}

impl<T: Reflect + Default, S: BuildHasher + Default> Reflect for HashMap<String, T, S> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        match unwrap_optional(value, "map")? {
            Value::Map(entries) => {
                let mut out = HashMap::with_capacity_and_hasher(entries.len(), S::default());
                for (key, value) in entries {
                    out.insert(key, T::from_value(value)?);
                }
                *self = out;
                Ok(())
            }
            other => Err(TagscopeError::mismatch("map", other.kind())),
        }
    }
}

impl<T: Reflect + Default> Reflect for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_value()))
                .collect(),
        )
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        match unwrap_optional(value, "map")? {
            Value::Map(entries) => {
                *self = entries
                    .into_iter()
                    .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                    .collect::<Result<_>>()?;
                Ok(())
            }
            other => Err(TagscopeError::mismatch("map", other.kind())),
        }
    }
}

/// Function pointers are carried along but never read or written.
impl Reflect for fn() {
    fn to_value(&self) -> Value {
        Value::Ignored
    }

    fn apply_value(&mut self, _value: Value) -> Result<()> {
        Ok(())
    }
}

/// A `Value` field holds anything, like an untyped interface slot.
impl Reflect for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        *self = value;
        Ok(())
    }
}
