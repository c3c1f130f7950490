//! Flattening a tagged record into query parameters

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use tagscope_core::{
    namespaces, resolve_record, sprint, walk_record, Record, RecordValue, Result, Value,
};
use tracing::{debug, instrument};

/// Layout used for timestamps, e.g. `Monday August 27 16:19:44 2018 +0000`.
pub const QUERY_TIME_FORMAT: &str = "%A %B %d %H:%M:%S %Y %z";

/// Flattens `input` through the `api` namespace.
///
/// Every scalar field lands in `query_values` under its external name and in
/// the deduplicated, space-joined blob appended to `all_values`.
pub fn set_query_fields<I: Record>(
    input: &I,
    query_values: &mut HashMap<String, String>,
    all_values: &mut String,
) {
    set_query_fields_with_tag(input, query_values, all_values, namespaces::API)
}

/// Flattens `input` through the given namespace.
pub fn set_query_fields_with_tag<I: Record>(
    input: &I,
    query_values: &mut HashMap<String, String>,
    all_values: &mut String,
    tag: &str,
) {
    flatten(&input.to_record(), query_values, all_values, tag);
}

/// Dynamic flattening. `input` must resolve to a record.
pub fn set_query_fields_value(
    input: &Value,
    query_values: &mut HashMap<String, String>,
    all_values: &mut String,
    tag: &str,
) -> Result<()> {
    let record = resolve_record(input)?;
    flatten(record, query_values, all_values, tag);
    Ok(())
}

/// Renders a timestamp in [`QUERY_TIME_FORMAT`], in UTC.
pub fn format_query_time(time: &DateTime<Utc>) -> String {
    time.format(QUERY_TIME_FORMAT).to_string()
}

#[instrument(skip_all, fields(record = record.name()))]
fn flatten(
    record: &RecordValue,
    query_values: &mut HashMap<String, String>,
    all_values: &mut String,
    tag: &str,
) {
    let mut seen = BTreeSet::new();
    collect(record, tag, query_values, &mut seen);

    let blob = seen.into_iter().collect::<Vec<_>>().join(" ");
    debug!(keys = query_values.len(), "flattened record");
    all_values.push_str(&blob);
}

fn insert(
    key: &str,
    value: String,
    query_values: &mut HashMap<String, String>,
    seen: &mut BTreeSet<String>,
) {
    if value.is_empty() {
        return;
    }
    query_values.insert(key.to_string(), value.clone());
    seen.insert(value);
}

fn render(value: &Value) -> String {
    match value {
        Value::Timestamp(t) => format_query_time(t),
        other => sprint(Some(other)),
    }
}

fn collect(
    record: &RecordValue,
    tag: &str,
    query_values: &mut HashMap<String, String>,
    seen: &mut BTreeSet<String>,
) {
    for descriptor in walk_record(record, tag) {
        let Some(value) = descriptor.value(record).and_then(Value::deref) else {
            continue;
        };

        match value {
            Value::Map(entries) => {
                for (key, entry) in entries {
                    insert(key, render(entry), query_values, seen);
                }
            }
            Value::Record(nested) => collect(nested, tag, query_values, seen),
            Value::Timestamp(_) => {
                insert(&descriptor.external_name, render(value), query_values, seen);
            }
            other if other.kind().is_scalar() => {
                insert(&descriptor.external_name, render(other), query_values, seen);
            }
            Value::Optional(Some(_)) => {
                insert(&descriptor.external_name, render(value), query_values, seen);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Sample, SampleSub};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flatten_sample_record() {
        let sample_time = DateTime::parse_from_rfc3339("2018-08-27T11:19:44-05:00")
            .unwrap()
            .with_timezone(&Utc);
        let sample = Sample {
            bool_val: true,
            float_val: 45.67,
            int_val: 89,
            string_val: "aaabbb".into(),
            substruct_val: SampleSub {
                map_val: [("aa", "123"), ("bb", "456"), ("cc", "789")]
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..Default::default()
            },
            time_val: sample_time,
            time_pointer_val: Some(sample_time),
            ..Default::default()
        };

        let mut query = HashMap::new();
        let mut all = String::new();
        set_query_fields(&sample, &mut query, &mut all);

        let mut parts: Vec<&str> = all.split(' ').collect();
        parts.sort();
        assert_eq!(
            parts.join(" "),
            "+0000 0 123 16:19:44 2018 27 45.67 456 789 89 August Monday aaabbb true"
        );

        assert_eq!(query.get("stringVal").map(String::as_str), Some("aaabbb"));
        assert_eq!(query.get("bb").map(String::as_str), Some("456"));
        assert_eq!(
            query.get("timeVal").map(String::as_str),
            Some("Monday August 27 16:19:44 2018 +0000")
        );
        assert!(!query.contains_key("boolPointerVal"));
    }

    #[test]
    fn test_shared_values_appear_once() {
        let doc = RecordValue::new("Doc")
            .with_field("home", r#"api:"planet""#, Value::String("Earth".into()))
            .with_field("origin", r#"api:"origin""#, Value::String("Earth".into()));

        let mut query = HashMap::new();
        let mut all = String::new();
        set_query_fields(&doc, &mut query, &mut all);

        assert_eq!(query.get("planet").map(String::as_str), Some("Earth"));
        assert_eq!(all, "Earth");
    }

    #[test]
    fn test_query_time_format() {
        let t = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).unwrap();
        assert_eq!(format_query_time(&t), "Monday January 02 15:04:05 2006 +0000");
    }

    #[test]
    fn test_dynamic_flatten_rejects_scalars() {
        let mut query = HashMap::new();
        let mut all = String::new();
        assert!(set_query_fields_value(&Value::Bool(true), &mut query, &mut all, "api").is_err());
    }
}
