//! Dotted-path field names and lookups

use tagscope_core::{namespaces, Record, RecordValue, Value};

/// Dotted paths of every field, by declared name.
pub fn get_field_names<I: Record>(input: &I) -> Vec<String> {
    get_tag_field_names(input, "")
}

/// Dotted paths of every `api`-tagged field, by external name.
pub fn get_api_field_names<I: Record>(input: &I) -> Vec<String> {
    get_tag_field_names(input, namespaces::API)
}

/// Dotted paths of every field carrying `tag`, by external name. An empty tag
/// lists all fields by declared name.
///
/// Nested records are descended into, including populated optional records.
/// A nested record without a name in `tag` contributes its fields under the
/// parent's path.
pub fn get_tag_field_names<I: Record>(input: &I, tag: &str) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(&input.to_record(), tag, "", &mut names);
    names
}

/// Same as [`get_tag_field_names`] for a dynamic record.
pub fn field_names_of(record: &RecordValue, tag: &str) -> Vec<String> {
    let mut names = Vec::new();
    collect_names(record, tag, "", &mut names);
    names
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        prefix.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn collect_names(record: &RecordValue, tag: &str, prefix: &str, names: &mut Vec<String>) {
    for field in record.fields() {
        let path = if tag.is_empty() {
            let path = join(prefix, &field.name);
            names.push(path.clone());
            path
        } else {
            match field.tags.get(tag) {
                Some(tag_value) => {
                    let path = join(prefix, &tag_value.name);
                    if !tag_value.name.is_empty() {
                        names.push(path.clone());
                    }
                    path
                }
                None => prefix.to_string(),
            }
        };

        if let Some(Value::Record(nested)) = field.value.deref() {
            collect_names(nested, tag, &path, names);
        }
    }
}

/// Looks up a dotted path, returning a copy of the value found.
///
/// Each segment indexes a map by key or a record by field name. Field names
/// match exactly, then capitalised, then as the snake_case form of a camelCase
/// segment, so `stringVal` finds a `string_val` field.
pub fn get_field_value<I: Record>(input: &I, path: &str) -> Option<Value> {
    value_at(&Value::Record(input.to_record()), path).cloned()
}

/// Borrowing variant of [`get_field_value`] over a dynamic value.
pub fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| {
        if segment.is_empty() {
            return None;
        }
        match current.deref_all()? {
            Value::Map(entries) => entries.get(segment),
            Value::Record(record) => lookup_field(record, segment),
            _ => None,
        }
    })
}

fn lookup_field<'a>(record: &'a RecordValue, segment: &str) -> Option<&'a Value> {
    record
        .get(segment)
        .or_else(|| record.get(&capitalize(segment)))
        .or_else(|| record.get(&to_snake_case(segment)))
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn to_snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    for (i, c) in segment.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
