//! Binding environment variables into `env`-tagged fields

use tagscope_core::{
    namespaces, walk_record, FieldKind, Record, RecordValue, Result, TagscopeError, Value,
};
use tracing::{debug, instrument, warn};

/// Binds process environment variables into every `env:"NAME"` field of `output`.
///
/// Unset or empty variables leave their field untouched. Values are decoded
/// as JSON; string fields accept bare text.
pub fn set_env_field_values<O: Record>(output: &mut O) -> Result<()> {
    set_env_field_values_with(output, |name| std::env::var(name).ok())
}

/// Same as [`set_env_field_values`], reading variables through `lookup`.
pub fn set_env_field_values_with<O, F>(output: &mut O, lookup: F) -> Result<()>
where
    O: Record,
    F: Fn(&str) -> Option<String>,
{
    let snapshot = output.to_record();
    for (field, raw) in bound_values(&snapshot, &lookup)? {
        output
            .set_field(&field, raw.value)
            .map_err(|e| decode_error(&raw.variable, e))?;
    }
    Ok(())
}

/// Dynamic env binding over a record value.
pub fn set_env_field_values_value<F>(output: &mut Value, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let record = match output {
        Value::Record(record) => record,
        Value::Optional(Some(inner)) => match inner.as_mut() {
            Value::Record(record) => record,
            other => {
                return Err(TagscopeError::InvalidRecordKind {
                    found: other.kind(),
                })
            }
        },
        Value::Optional(None) => {
            return Err(TagscopeError::PointerRequired {
                reason: "env binding output is an empty optional".to_string(),
            })
        }
        other => {
            return Err(TagscopeError::InvalidRecordKind {
                found: other.kind(),
            })
        }
    };

    for (field, raw) in bound_values(record, &lookup)? {
        record.set(&field, raw.value)?;
    }
    Ok(())
}

struct Bound {
    variable: String,
    value: Value,
}

#[instrument(skip(record, lookup), fields(record = record.name()))]
fn bound_values<F>(record: &RecordValue, lookup: &F) -> Result<Vec<(String, Bound)>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut bound = Vec::new();

    for descriptor in walk_record(record, namespaces::ENV) {
        let declared = descriptor
            .value(record)
            .and_then(Value::deref_all)
            .map(Value::kind);
        let variable = descriptor.external_name;
        let Some(raw) = lookup(&variable).filter(|v| !v.is_empty()) else {
            continue;
        };

        let text = if declared == Some(FieldKind::String) && !raw.contains('"') {
            format!("\"{}\"", raw)
        } else {
            raw
        };

        let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            warn!(variable = %variable, error = %e, "environment value is not valid JSON");
            TagscopeError::ValueDecodeError {
                variable: variable.clone(),
                reason: e.to_string(),
            }
        })?;

        debug!(variable = %variable, field = %descriptor.name, "binding environment variable");
        bound.push((
            descriptor.name,
            Bound {
                variable,
                value: Value::from(json),
            },
        ));
    }

    Ok(bound)
}

fn decode_error(variable: &str, error: TagscopeError) -> TagscopeError {
    match error {
        TagscopeError::TypeMismatch { .. } | TagscopeError::OutOfRange { .. } => {
            TagscopeError::ValueDecodeError {
                variable: variable.to_string(),
                reason: error.to_string(),
            }
        }
        other => other,
    }
}
