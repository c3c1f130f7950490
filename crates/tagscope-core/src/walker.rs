//! Field walker shared by every record operation

use crate::error::{Result, TagscopeError};
use crate::record::RecordValue;
use crate::tags::TagValue;
use crate::value::{FieldKind, Value};
use serde::{Deserialize, Serialize};

/// One field of a record as seen through a tag namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Position within the record's declared fields.
    pub index: usize,
    /// Declared field name.
    pub name: String,
    /// Tag value before the first comma, or the declared name when walking
    /// without a namespace.
    pub external_name: String,
    pub modifiers: Vec<String>,
    /// Kind after one level of optional dereference.
    pub kind: FieldKind,
    /// Declared as optional.
    pub optional: bool,
    /// Empty optional.
    pub nil: bool,
}

impl FieldDescriptor {
    pub fn is_nested(&self) -> bool {
        self.kind == FieldKind::Record
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }

    /// The described field's value in `record`, as stored.
    pub fn value<'a>(&self, record: &'a RecordValue) -> Option<&'a Value> {
        record.fields().get(self.index).map(|f| &f.value)
    }
}

/// Resolves a value to the record behind it, dereferencing one optional.
pub fn resolve_record(value: &Value) -> Result<&RecordValue> {
    match value {
        Value::Record(record) => Ok(record),
        Value::Optional(Some(inner)) => match inner.as_ref() {
            Value::Record(record) => Ok(record),
            other => Err(TagscopeError::InvalidRecordKind {
                found: other.kind(),
            }),
        },
        other => Err(TagscopeError::InvalidRecordKind {
            found: other.kind(),
        }),
    }
}

/// Walks the fields of a dynamic value that must resolve to a record.
pub fn walk(value: &Value, namespace: &str) -> Result<Vec<FieldDescriptor>> {
    resolve_record(value).map(|record| walk_record(record, namespace))
}

/// Lists the fields of `record` carrying `namespace`, in declaration order.
/// An empty namespace includes every field under its declared name.
pub fn walk_record(record: &RecordValue, namespace: &str) -> Vec<FieldDescriptor> {
    record
        .fields()
        .iter()
        .enumerate()
        .filter_map(|(index, field)| {
            let tag = if namespace.is_empty() {
                TagValue {
                    name: field.name.clone(),
                    modifiers: Vec::new(),
                }
            } else {
                field.tags.get(namespace)?
            };

            let (kind, optional, nil) = match &field.value {
                Value::Optional(Some(inner)) => (inner.kind(), true, false),
                Value::Optional(None) => (FieldKind::Optional, true, true),
                other => (other.kind(), false, false),
            };

            Some(FieldDescriptor {
                index,
                name: field.name.clone(),
                external_name: tag.name,
                modifiers: tag.modifiers,
                kind,
                optional,
                nil,
            })
        })
        .collect()
}
