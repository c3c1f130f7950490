//! Field-level differences between two records

use std::collections::{BTreeMap, HashSet};
use tagscope_core::{
    namespaces, resolve_record, walk_record, FieldKind, Record, RecordValue, Result, Value,
};
use tracing::{debug, instrument};

/// Joins nested path segments. `.` is rejected as a key by several document
/// stores, so nested paths use `_` instead.
pub const PATH_SEPARATOR: &str = "_";

/// Prefix marking a removed or cleared path.
pub const REMOVED_PREFIX: &str = "-";

/// Path to stringified value. Removed paths carry a leading `-` and the old
/// value; added and updated paths carry the new value.
pub type DiffResult = BTreeMap<String, String>;

/// Diffs two records through the `api` namespace.
pub fn calculate_diff<B: Record, A: Record>(before: &B, after: &A) -> DiffResult {
    calculate_diff_with_tag(before, after, namespaces::API)
}

/// Diffs two records through the given namespace.
pub fn calculate_diff_with_tag<B: Record, A: Record>(
    before: &B,
    after: &A,
    tag: &str,
) -> DiffResult {
    let mut diff = DiffResult::new();
    diff_records(&before.to_record(), &after.to_record(), "", tag, &mut diff);
    diff
}

/// Diffs two dynamic values, each of which must resolve to a record.
#[instrument(skip(before, after))]
pub fn calculate_diff_values(before: &Value, after: &Value, tag: &str) -> Result<DiffResult> {
    let before = resolve_record(before)?;
    let after = resolve_record(after)?;

    let mut diff = DiffResult::new();
    diff_records(before, after, "", tag, &mut diff);
    debug!(changes = diff.len(), "calculated record diff");
    Ok(diff)
}

fn join(prefix: &str, segment: &str) -> String {
    match (prefix.is_empty(), segment.is_empty()) {
        (true, _) => segment.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}{}{}", prefix, PATH_SEPARATOR, segment),
    }
}

fn removed(path: &str) -> String {
    format!("{}{}", REMOVED_PREFIX, path)
}

fn diff_records(
    before: &RecordValue,
    after: &RecordValue,
    prefix: &str,
    tag: &str,
    diff: &mut DiffResult,
) {
    let mut processed = HashSet::new();

    for descriptor in walk_record(before, tag) {
        let Some(before_value) = descriptor.value(before).and_then(Value::deref_all) else {
            continue;
        };
        if before_value.kind() == FieldKind::Ignored {
            continue;
        }

        let path = join(prefix, &descriptor.external_name);
        processed.insert(descriptor.name.clone());

        let after_value = match after.get(&descriptor.name).and_then(Value::deref_all) {
            Some(value) => value,
            None => {
                if before_value.kind() != FieldKind::Bool && !path.is_empty() {
                    diff.insert(removed(&path), before_value.to_string());
                }
                continue;
            }
        };

        if before_value == after_value {
            continue;
        }

        // An inline record has no path of its own; its fields report instead.
        let inline = path.is_empty()
            && matches!((before_value, after_value), (Value::Record(_), Value::Record(_)));

        if !inline
            && before_value.kind() != FieldKind::Bool
            && (*after_value == before_value.zero()
                || (after_value.kind() != before_value.kind() && after_value.is_zero()))
        {
            if !path.is_empty() {
                diff.insert(removed(&path), before_value.to_string());
            }
            continue;
        }

        match (before_value, after_value) {
            (Value::Map(before_entries), Value::Map(after_entries)) => {
                diff_maps(before_entries, after_entries, &path, diff);
            }
            (Value::Record(before_record), Value::Record(after_record)) => {
                diff_records(before_record, after_record, &path, tag, diff);
            }
            (_, after_value) => {
                if !path.is_empty() {
                    diff.insert(path, after_value.to_string());
                }
            }
        }
    }

    for descriptor in walk_record(after, tag) {
        if processed.contains(&descriptor.name) {
            continue;
        }
        let Some(after_value) = descriptor.value(after).and_then(Value::deref_all) else {
            continue;
        };
        if after_value.kind() == FieldKind::Ignored || after_value.is_zero() {
            continue;
        }

        let path = join(prefix, &descriptor.external_name);
        if !path.is_empty() {
            diff.insert(path, after_value.to_string());
        }
    }
}

fn diff_maps(
    before: &BTreeMap<String, Value>,
    after: &BTreeMap<String, Value>,
    path: &str,
    diff: &mut DiffResult,
) {
    for (key, before_entry) in before {
        let entry_path = join(path, key);
        match after.get(key) {
            Some(after_entry) if after_entry != before_entry => {
                diff.insert(entry_path, after_entry.to_string());
            }
            Some(_) => {}
            None => {
                diff.insert(removed(&entry_path), before_entry.to_string());
            }
        }
    }

    for (key, after_entry) in after {
        if !before.contains_key(key) {
            diff.insert(join(path, key), after_entry.to_string());
        }
    }
}
