//! Inherit and overwrite: filling an output record from ordered ancestors

use serde::{Deserialize, Serialize};
use tagscope_core::{namespaces, resolve_record, Record, RecordValue, Result, TagscopeError, Value};
use tracing::{debug, instrument, trace};

/// How ancestor values are written into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Only fields still at their zero value are filled.
    Inherit,
    /// Fields are replaced regardless of their current value.
    Overwrite,
}

/// Combination rule for tagged boolean fields during inherit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolStrategy {
    And,
    Or,
}

impl BoolStrategy {
    /// `"and"` selects [`BoolStrategy::And`]; anything else is `Or`.
    pub fn parse(raw: &str) -> Self {
        if raw == "and" {
            BoolStrategy::And
        } else {
            BoolStrategy::Or
        }
    }
}

/// Fills zero-valued fields of `output` from `ancestors`, considering every field.
pub fn inherit<O: Record, A: Record>(output: &mut O, ancestors: &[&A]) -> Result<()> {
    merge_typed(output, ancestors, "", MergeMode::Inherit)
}

/// Fills zero-valued fields of `output` carrying the `tag` namespace.
pub fn inherit_with_tag<O: Record, A: Record>(
    output: &mut O,
    ancestors: &[&A],
    tag: &str,
) -> Result<()> {
    merge_typed(output, ancestors, tag, MergeMode::Inherit)
}

/// Replaces fields of `output` from `ancestors`, considering every field.
pub fn overwrite<O: Record, A: Record>(output: &mut O, ancestors: &[&A]) -> Result<()> {
    merge_typed(output, ancestors, "", MergeMode::Overwrite)
}

/// Replaces fields of `output` carrying the `tag` namespace.
pub fn overwrite_with_tag<O: Record, A: Record>(
    output: &mut O,
    ancestors: &[&A],
    tag: &str,
) -> Result<()> {
    merge_typed(output, ancestors, tag, MergeMode::Overwrite)
}

/// Dynamic inherit. `output` must be a record or a populated optional record.
pub fn inherit_value(output: &mut Value, ancestors: &[&Value], tag: &str) -> Result<()> {
    merge_value(output, ancestors, tag, MergeMode::Inherit)
}

/// Dynamic overwrite. `output` must be a record or a populated optional record.
pub fn overwrite_value(output: &mut Value, ancestors: &[&Value], tag: &str) -> Result<()> {
    merge_value(output, ancestors, tag, MergeMode::Overwrite)
}

fn merge_typed<O: Record, A: Record>(
    output: &mut O,
    ancestors: &[&A],
    tag: &str,
    mode: MergeMode,
) -> Result<()> {
    if ancestors.is_empty() {
        return Ok(());
    }

    let snapshots: Vec<RecordValue> = ancestors.iter().map(|a| a.to_record()).collect();
    let sources: Vec<&RecordValue> = snapshots.iter().collect();

    let mut merged = output.to_record();
    merge_records(&mut merged, &sources, tag, mode);
    output.apply_value(Value::Record(merged))
}

#[instrument(skip(output, ancestors), fields(ancestors = ancestors.len()))]
pub fn merge_value(
    output: &mut Value,
    ancestors: &[&Value],
    tag: &str,
    mode: MergeMode,
) -> Result<()> {
    if ancestors.is_empty() {
        return Ok(());
    }

    let mut sources = Vec::with_capacity(ancestors.len());
    for ancestor in ancestors {
        if ancestor.is_nil() {
            trace!("skipping empty ancestor");
            continue;
        }
        sources.push(resolve_record(ancestor)?);
    }

    let target = match output {
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
                reason: "merge output is an empty optional".to_string(),
            })
        }
        other => {
            return Err(TagscopeError::InvalidRecordKind {
                found: other.kind(),
            })
        }
    };

    merge_records(target, &sources, tag, mode);
    debug!(record = target.name(), ?mode, "merged ancestors");
    Ok(())
}

/// Applies the per-kind merge rules field by field, in ancestor order.
fn merge_records(
    output: &mut RecordValue,
    ancestors: &[&RecordValue],
    tag: &str,
    mode: MergeMode,
) {
    let bool_tag = format!("{}{}", tag, namespaces::BOOL_SUFFIX);

    for field in output.fields_mut() {
        let mut bool_strategy = None;
        if !tag.is_empty() {
            if !field.tags.contains(tag) {
                continue;
            }
            bool_strategy = field.tags.lookup(&bool_tag).map(BoolStrategy::parse);
        }

        let name = field.name.as_str();
        let candidates = || ancestors.iter().filter_map(move |a| a.get(name));

        match &mut field.value {
            Value::Sequence(items) => {
                for candidate in candidates() {
                    if let Value::Sequence(extra) = candidate {
                        items.extend(extra.iter().cloned());
                    }
                }
            }
            Value::Bool(current) => match mode {
                MergeMode::Inherit => {
                    let Some(strategy) = bool_strategy else {
                        continue;
                    };
                    match strategy {
                        BoolStrategy::Or if *current => continue,
                        BoolStrategy::And if !*current => continue,
                        _ => {}
                    }
                    let decisive = strategy == BoolStrategy::Or;
                    if candidates().any(|c| matches!(c, Value::Bool(b) if *b == decisive)) {
                        *current = decisive;
                    }
                }
                MergeMode::Overwrite => {
                    if tag.is_empty() {
                        continue;
                    }
                    if let Some(b) = candidates().find_map(|c| match c {
                        Value::Bool(b) => Some(*b),
                        _ => None,
                    }) {
                        *current = b;
                    }
                }
            },
            Value::Ignored => continue,
            Value::Complex(current) => {
                if mode == MergeMode::Inherit && !current.is_zero() {
                    continue;
                }
                if let Some(c) = candidates().find_map(|c| match c {
                    Value::Complex(c) if !c.is_zero() => Some(*c),
                    _ => None,
                }) {
                    *current = c;
                }
            }
            Value::Float(current) => {
                if mode == MergeMode::Inherit && *current != 0.0 {
                    continue;
                }
                if let Some(f) = candidates().find_map(|c| match c {
                    Value::Float(f) if *f != 0.0 => Some(*f),
                    _ => None,
                }) {
                    *current = f;
                }
            }
            Value::Int(current) => {
                if mode == MergeMode::Inherit && *current != 0 {
                    continue;
                }
                let mut ints = candidates().filter_map(|c| match c.deref() {
                    Some(Value::Int(i)) => Some(*i),
                    _ => None,
                });
                let found = match mode {
                    MergeMode::Inherit => ints.find(|i| *i != 0),
                    MergeMode::Overwrite => ints.next(),
                };
                if let Some(i) = found {
                    *current = i;
                }
            }
            Value::Uint(current) => {
                if mode == MergeMode::Inherit && *current != 0 {
                    continue;
                }
                if let Some(u) = candidates().find_map(|c| match c {
                    Value::Uint(u) if *u != 0 => Some(*u),
                    _ => None,
                }) {
                    *current = u;
                }
            }
            Value::Map(entries) => {
                for candidate in candidates() {
                    if let Value::Map(extra) = candidate {
                        entries.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                }
            }
            Value::Optional(current) => {
                if mode == MergeMode::Inherit && current.is_some() {
                    continue;
                }
                if let Some(found) = candidates().find_map(|c| match c {
                    Value::Optional(Some(inner)) => Some(inner.clone()),
                    _ => None,
                }) {
                    *current = Some(found);
                }
            }
            Value::String(current) => {
                if mode == MergeMode::Inherit && !current.is_empty() {
                    continue;
                }
                if let Some(s) = candidates().find_map(|c| match c {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    _ => None,
                }) {
                    *current = s;
                }
            }
            Value::Timestamp(current) => {
                if let Some(t) = candidates().find_map(|c| match c {
                    Value::Timestamp(t) => Some(*t),
                    _ => None,
                }) {
                    *current = t;
                }
            }
            Value::Record(nested) => {
                let sources: Vec<&RecordValue> =
                    candidates().filter_map(Value::as_record).collect();
                // Nested records only ever inherit, even under overwrite.
                if !sources.is_empty() {
                    merge_records(nested, &sources, tag, MergeMode::Inherit);
                }
            }
        }

        trace!(field = name, kind = %field.value.kind(), "merged field");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Sample, SampleSub};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tagscope_core::Complex;
    use std::collections::HashMap;

    fn parent() -> Sample {
        let now = Utc.with_ymd_and_hms(2018, 8, 27, 16, 19, 44).unwrap();
        Sample {
            bool_val: true,
            bool_pointer_val: Some(true),
            float_val: 82471.1419,
            int_val: 12,
            string_val: "parent".into(),
            substruct_val: SampleSub {
                map_val: [("key1".to_string(), "val1".to_string())].into(),
                ..Default::default()
            },
            time_val: now,
            time_pointer_val: Some(now),
            ..Default::default()
        }
    }

    fn partial_child() -> Sample {
        Sample {
            string_val: "child".into(),
            substruct_val: SampleSub {
                map_val: [("key2".to_string(), "val2".to_string())].into(),
                ..Default::default()
            },
            uint_val: 98,
            ..Default::default()
        }
    }

    #[test]
    fn test_inherit_everything() {
        let parent = parent();
        let mut child = Sample::default();
        inherit(&mut child, &[&parent]).unwrap();

        assert!(!child.bool_val);
        assert_eq!(child.bool_pointer_val, parent.bool_pointer_val);
        assert_eq!(child.float_val, parent.float_val);
        assert_eq!(child.int_val, parent.int_val);
        assert_eq!(child.string_val, parent.string_val);
        assert_eq!(child.substruct_val, parent.substruct_val);
        assert_eq!(child.time_val, parent.time_val);
        assert_eq!(child.time_pointer_val, parent.time_pointer_val);
        assert_eq!(child.uint_val, parent.uint_val);
    }

    #[test]
    fn test_inherit_keeps_populated_fields() {
        let parent = parent();
        let mut child = partial_child();
        inherit(&mut child, &[&parent]).unwrap();

        assert_eq!(child.int_val, 12);
        assert_eq!(child.string_val, "child");
        assert_eq!(child.uint_val, 98);
        assert_eq!(
            child.substruct_val.map_val,
            HashMap::from([
                ("key1".to_string(), "val1".to_string()),
                ("key2".to_string(), "val2".to_string()),
            ])
        );
    }

    #[test]
    fn test_inherit_with_tag_gates_fields() {
        let parent = parent();
        let mut child = Sample::default();
        inherit_with_tag(&mut child, &[&parent], "inherit").unwrap();

        assert!(child.bool_val);
        assert_eq!(child.float_val, parent.float_val);
        assert_eq!(child.int_val, 0);
        assert_eq!(child.string_val, "parent");
        assert_eq!(child.substruct_val.map_val, parent.substruct_val.map_val);
        assert_eq!(child.time_pointer_val, parent.time_pointer_val);
        assert_eq!(child.uint_val, 0);
    }

    #[test]
    fn test_bool_strategies() {
        let record = |value: bool, strategy: &str| {
            Value::Record(RecordValue::new("Flags").with_field(
                "flag",
                &format!(r#"merge:"flag" mergebool:"{}""#, strategy),
                Value::Bool(value),
            ))
        };
        let flag = |v: &Value| v.as_record().and_then(|r| r.get("flag")).cloned();

        let mut out = record(false, "or");
        inherit_value(&mut out, &[&record(false, "or"), &record(true, "or")], "merge").unwrap();
        assert_eq!(flag(&out), Some(Value::Bool(true)));

        let mut out = record(true, "and");
        inherit_value(&mut out, &[&record(true, "and"), &record(false, "and")], "merge").unwrap();
        assert_eq!(flag(&out), Some(Value::Bool(false)));

        let mut out = record(true, "and");
        inherit_value(&mut out, &[&record(true, "and")], "merge").unwrap();
        assert_eq!(flag(&out), Some(Value::Bool(true)));

        let mut out = record(true, "xor");
        inherit_value(&mut out, &[&record(false, "xor")], "merge").unwrap();
        assert_eq!(flag(&out), Some(Value::Bool(true)));
    }

    #[test]
    fn test_overwrite_replaces_values() {
        let mut parent = parent();
        parent.uint_val = 99;
        let mut child = partial_child();
        child.uint_val = 250;
        overwrite(&mut child, &[&parent]).unwrap();

        assert!(!child.bool_val);
        assert_eq!(child.float_val, parent.float_val);
        assert_eq!(child.int_val, parent.int_val);
        assert_eq!(child.string_val, parent.string_val);
        assert_eq!(child.uint_val, 99);
        assert_eq!(child.substruct_val.map_val.len(), 2);
    }

    #[test]
    fn test_overwrite_with_tag_takes_first_bool() {
        let parent = parent();
        let mut child = partial_child();
        overwrite_with_tag(&mut child, &[&parent], "inherit").unwrap();

        assert!(child.bool_val);
        assert_eq!(child.int_val, 0);
        assert_eq!(child.string_val, "parent");
        assert_eq!(child.uint_val, 98);
    }

    #[test]
    fn test_overwrite_integers_take_any_magnitude() {
        let mut child = Sample {
            int_val: 5,
            ..Default::default()
        };
        overwrite(&mut child, &[&Sample::default()]).unwrap();
        assert_eq!(child.int_val, 0);
    }

    #[test]
    fn test_sequences_always_append() {
        let parent = Sample {
            substruct_val: SampleSub {
                slice_val: vec![1, 2],
                ..Default::default()
            },
            ..Default::default()
        };
        let mut child = Sample {
            substruct_val: SampleSub {
                slice_val: vec![0],
                ..Default::default()
            },
            ..Default::default()
        };

        overwrite(&mut child, &[&parent]).unwrap();
        overwrite(&mut child, &[&parent]).unwrap();
        assert_eq!(child.substruct_val.slice_val, vec![0, 1, 2, 1, 2]);
    }

    #[test]
    fn test_first_ancestor_wins() {
        let first = Sample {
            string_val: "first".into(),
            ..Default::default()
        };
        let second = Sample {
            string_val: "second".into(),
            float_val: 2.5,
            ..Default::default()
        };
        let mut child = Sample::default();
        inherit(&mut child, &[&first, &second]).unwrap();
        assert_eq!(child.string_val, "first");
        assert_eq!(child.float_val, 2.5);
    }

    #[test]
    fn test_empty_ancestors_is_a_no_op() {
        let mut child = partial_child();
        let ancestors: [&Sample; 0] = [];
        inherit(&mut child, &ancestors).unwrap();
        assert_eq!(child, partial_child());

        let mut nothing = Value::Int(1);
        assert!(inherit_value(&mut nothing, &[], "").is_ok());
    }

    #[test]
    fn test_dynamic_output_errors() {
        let ancestor = Value::Record(RecordValue::new("A"));

        let mut empty = Value::Optional(None);
        assert!(matches!(
            inherit_value(&mut empty, &[&ancestor], ""),
            Err(TagscopeError::PointerRequired { .. })
        ));

        let mut scalar = Value::Int(3);
        assert!(matches!(
            overwrite_value(&mut scalar, &[&ancestor], ""),
            Err(TagscopeError::InvalidRecordKind { .. })
        ));

        let mut record = Value::Record(RecordValue::new("A"));
        assert!(matches!(
            inherit_value(&mut record, &[&Value::Bool(true)], ""),
            Err(TagscopeError::InvalidRecordKind { .. })
        ));
        assert!(inherit_value(&mut record, &[&Value::Optional(None)], "").is_ok());
    }

    #[test]
    fn test_complex_fields() {
        let parent = Sample {
            complex_val: Complex::new(1.0, 2.0),
            ..Default::default()
        };

        let mut empty = Sample::default();
        inherit(&mut empty, &[&parent]).unwrap();
        assert_eq!(empty.complex_val, Complex::new(1.0, 2.0));

        let mut populated = Sample {
            complex_val: Complex::new(3.0, 0.0),
            ..Default::default()
        };
        inherit_with_tag(&mut populated, &[&parent], "inherit").unwrap();
        assert_eq!(populated.complex_val, Complex::new(3.0, 0.0));

        overwrite(&mut populated, &[&parent]).unwrap();
        assert_eq!(populated.complex_val, Complex::new(1.0, 2.0));

        overwrite(&mut populated, &[&Sample::default()]).unwrap();
        assert_eq!(populated.complex_val, Complex::new(1.0, 2.0));
    }

    #[test]
    fn test_inherit_replaces_populated_timestamps() {
        let parent = parent();
        let mut child = Sample {
            time_val: Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap(),
            ..Default::default()
        };
        inherit(&mut child, &[&parent]).unwrap();
        assert_eq!(child.time_val, parent.time_val);
    }

    #[test]
    fn test_inherit_keeps_populated_optionals() {
        let parent = parent();
        let mut child = Sample {
            bool_pointer_val: Some(false),
            ..Default::default()
        };
        inherit(&mut child, &[&parent]).unwrap();
        assert_eq!(child.bool_pointer_val, Some(false));

        overwrite(&mut child, &[&parent]).unwrap();
        assert_eq!(child.bool_pointer_val, Some(true));
    }

    #[test]
    fn test_overwrite_inherits_into_nested_records() {
        let outer = |name: &str| {
            Value::Record(RecordValue::new("Outer").with_field(
                "inner",
                "",
                Value::Record(RecordValue::new("Inner").with_field(
                    "name",
                    "",
                    Value::String(name.into()),
                )),
            ))
        };
        let inner_name = |v: &Value| {
            v.as_record()
                .and_then(|r| r.get("inner"))
                .and_then(Value::as_record)
                .and_then(|r| r.get("name"))
                .cloned()
        };

        let mut populated = outer("child");
        overwrite_value(&mut populated, &[&outer("parent")], "").unwrap();
        assert_eq!(inner_name(&populated), Some(Value::String("child".into())));

        let mut empty = outer("");
        overwrite_value(&mut empty, &[&outer("parent")], "").unwrap();
        assert_eq!(inner_name(&empty), Some(Value::String("parent".into())));
    }

    #[test]
    fn test_bool_strategy_parse() {
        assert_eq!(BoolStrategy::parse("and"), BoolStrategy::And);
        assert_eq!(BoolStrategy::parse("or"), BoolStrategy::Or);
        assert_eq!(BoolStrategy::parse("anything"), BoolStrategy::Or);
    }
}
