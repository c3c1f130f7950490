//! Dynamic record snapshots and the `record!` declaration macro

use crate::error::{Result, TagscopeError};
use crate::reflect::{Record, Reflect};
use crate::tags::Tags;
use crate::value::Value;

/// One named, tagged field of a [`RecordValue`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub tags: Tags,
    pub value: Value,
}

/// Ordered, named collection of fields.
///
/// Produced by [`Record::to_record`] for declared records, or built directly
/// for documents whose shape is only known at runtime.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordValue {
    name: String,
    fields: Vec<Field>,
}

impl RecordValue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field, parsing `tags` as a raw tag string.
    pub fn with_field(mut self, name: impl Into<String>, tags: &str, value: Value) -> Self {
        self.push(Field {
            name: name.into(),
            tags: Tags::parse(tags),
            value,
        });
        self
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [Field] {
        &mut self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|f| &f.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .map(|f| &mut f.value)
    }

    /// Replaces the value of an existing field.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(TagscopeError::FieldResolutionFailure {
                path: format!("{}.{}", self.name, name),
            }),
        }
    }

    /// Same shape with every field set to its zero value.
    pub fn zeroed(&self) -> Self {
        Self {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .map(|f| Field {
                    name: f.name.clone(),
                    tags: f.tags.clone(),
                    value: f.value.zero(),
                })
                .collect(),
        }
    }

    /// Builds a record from a JSON object. Every key becomes a field tagged
    /// `namespace:"key"`; nested objects become nested records.
    pub fn from_json(
        name: impl Into<String>,
        object: serde_json::Map<String, serde_json::Value>,
        namespace: &str,
    ) -> Self {
        let mut record = Self::new(name);
        for (key, json) in object {
            let value = match json {
                serde_json::Value::Object(inner) => {
                    Value::Record(Self::from_json(key.clone(), inner, namespace))
                }
                other => Value::from(other),
            };
            let tags = if namespace.is_empty() {
                Tags::default()
            } else {
                Tags::single(namespace, &key)
            };
            record.push(Field {
                name: key,
                tags,
                value,
            });
        }
        record
    }
}

impl Reflect for RecordValue {
    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }

    fn apply_value(&mut self, value: Value) -> Result<()> {
        match value {
            Value::Record(other) => {
                for field in other.into_fields() {
                    if let Some(slot) = self.get_mut(&field.name) {
                        *slot = field.value;
                    }
                }
                Ok(())
            }
            Value::Map(entries) => {
                for (key, value) in entries {
                    if let Some(slot) = self.get_mut(&key) {
                        *slot = value;
                    }
                }
                Ok(())
            }
            Value::Optional(Some(inner)) => self.apply_value(*inner),
            other => Err(TagscopeError::TypeMismatch {
                expected: self.name.clone(),
                found: other.kind(),
            }),
        }
    }
}

impl Record for RecordValue {
    fn to_record(&self) -> RecordValue {
        self.clone()
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        self.set(name, value)
    }
}

/// Declares a struct together with its [`Reflect`] and [`Record`] impls.
///
/// Each field may carry a raw tag string after `=>`:
///
/// ```
/// tagscope_core::record! {
///     #[derive(Debug, Clone, Default, PartialEq)]
///     pub struct Planet {
///         pub name: String => r#"api:"planet" env:"PLANET_NAME""#,
///         pub moons: u32 => r#"api:"moons,omitempty""#,
///         pub notes: String,
///     }
/// }
///
/// use tagscope_core::Record;
/// let planet = Planet { name: "Earth".into(), moons: 1, notes: String::new() };
/// assert_eq!(planet.to_record().fields().len(), 3);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty $(=> $tags:literal)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Reflect for $name {
            fn to_value(&self) -> $crate::Value {
                $crate::Value::Record($crate::Record::to_record(self))
            }

            #[allow(unused_variables)]
            fn apply_value(&mut self, value: $crate::Value) -> $crate::Result<()> {
                match value {
                    $crate::Value::Record(record) => {
                        for field in record.into_fields() {
                            match field.name.as_str() {
                                $(
                                    stringify!($field) => {
                                        $crate::Reflect::apply_value(&mut self.$field, field.value)?
                                    }
                                )*
                                _ => {}
                            }
                        }
                        Ok(())
                    }
                    $crate::Value::Map(entries) => {
                        for (key, entry) in entries {
                            match key.as_str() {
                                $(
                                    stringify!($field) => {
                                        $crate::Reflect::apply_value(&mut self.$field, entry)?
                                    }
                                )*
                                _ => {}
                            }
                        }
                        Ok(())
                    }
                    $crate::Value::Optional(Some(inner)) => {
                        $crate::Reflect::apply_value(self, *inner)
                    }
                    other => Err($crate::TagscopeError::TypeMismatch {
                        expected: stringify!($name).to_string(),
                        found: other.kind(),
                    }),
                }
            }
        }

        impl $crate::Record for $name {
            fn to_record(&self) -> $crate::RecordValue {
                $crate::RecordValue::new(stringify!($name))
                    $(
                        .with_field(
                            stringify!($field),
                            concat!($($tags)?),
                            $crate::Reflect::to_value(&self.$field),
                        )
                    )*
            }

            #[allow(unused_variables)]
            fn set_field(&mut self, name: &str, value: $crate::Value) -> $crate::Result<()> {
                match name {
                    $(
                        stringify!($field) => $crate::Reflect::apply_value(&mut self.$field, value),
                    )*
                    _ => Err($crate::TagscopeError::FieldResolutionFailure {
                        path: format!("{}.{}", stringify!($name), name),
                    }),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldKind;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Inner {
            labels: HashMap<String, String> => r#"api:"labels""#,
        }
    }

    crate::record! {
        #[derive(Debug, Clone, Default, PartialEq)]
        struct Outer {
            id: u32 => r#"api:"id""#,
            name: String,
            inner: Inner => r#"api:",inline""#,
            parent: Option<Inner> => r#"api:"parent""#,
        }
    }

    #[test]
    fn test_record_snapshot_keeps_declaration_order() {
        let outer = Outer {
            id: 7,
            name: "seven".into(),
            ..Default::default()
        };
        let record = outer.to_record();
        assert_eq!(record.name(), "Outer");
        let names: Vec<_> = record.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "inner", "parent"]);
        assert_eq!(record.get("id"), Some(&Value::Uint(7)));
        assert!(record.field("name").unwrap().tags.is_empty());
        assert_eq!(record.get("inner").map(Value::kind), Some(FieldKind::Record));
        assert_eq!(record.get("parent"), Some(&Value::Optional(None)));
    }

    #[test]
    fn test_apply_round_trip() {
        let mut labels = HashMap::new();
        labels.insert("env".to_string(), "prod".to_string());
        let source = Outer {
            id: 3,
            name: "three".into(),
            inner: Inner { labels },
            parent: Some(Inner::default()),
        };

        let mut target = Outer::default();
        target.apply_value(source.to_value()).unwrap();
        assert_eq!(target, source);
    }

    #[test]
    fn test_set_field_is_strict() {
        let mut outer = Outer::default();
        outer.set_field("id", Value::Int(9)).unwrap();
        assert_eq!(outer.id, 9);
        assert!(matches!(
            outer.set_field("missing", Value::Int(1)),
            Err(TagscopeError::FieldResolutionFailure { .. })
        ));
        assert!(matches!(
            outer.set_field("name", Value::Int(1)),
            Err(TagscopeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_json_tags_every_key() {
        let json = serde_json::json!({"a": 1, "nested": {"b": "x"}});
        let object = match json {
            serde_json::Value::Object(object) => object,
            _ => unreachable!(),
        };
        let record = RecordValue::from_json("doc", object, "api");
        assert_eq!(record.field("a").unwrap().tags.lookup("api"), Some("a"));
        let nested = record.get("nested").and_then(Value::as_record).unwrap();
        assert_eq!(nested.get("b"), Some(&Value::String("x".into())));
    }

    #[test]
    fn test_zeroed_record() {
        let outer = Outer {
            id: 1,
            name: "x".into(),
            ..Default::default()
        };
        let zero = outer.to_record().zeroed();
        assert!(Value::Record(zero.clone()).is_zero());
        assert_eq!(zero, Outer::default().to_record());
    }
}
