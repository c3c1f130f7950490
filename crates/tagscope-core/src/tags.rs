//! Field annotations in the `namespace:"value"` convention
//!
//! A field carries a single raw tag string such as
//! `api:"boolVal,omitempty" inherit:"dynamic"`. Each namespace maps to a value
//! whose first comma-separated part is the field's external name; the rest are
//! modifiers.

use serde::{Deserialize, Serialize};

/// Parsed tag set of a single field, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    entries: Vec<(String, String)>,
}

impl Tags {
    /// Parses a raw tag string. Parsing stops at the first malformed pair.
    pub fn parse(raw: &str) -> Self {
        let mut entries = Vec::new();
        let mut rest = raw;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            let name_end = rest
                .find(|c: char| c <= ' ' || c == ':' || c == '"' || c == '\u{7f}')
                .unwrap_or(rest.len());
            if name_end == 0 || !rest[name_end..].starts_with(":\"") {
                break;
            }
            let name = &rest[..name_end];
            rest = &rest[name_end + 2..];

            let mut value = String::new();
            let mut closed = false;
            let mut chars = rest.char_indices();
            while let Some((i, c)) = chars.next() {
                match c {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, escaped)) => value.push(escaped),
                        None => break,
                    },
                    '"' => {
                        rest = &rest[i + 1..];
                        closed = true;
                        break;
                    }
                    other => value.push(other),
                }
            }
            if !closed {
                break;
            }

            entries.push((name.to_string(), value));
        }

        Self { entries }
    }

    /// Builds a tag set holding a single namespace.
    pub fn single(namespace: &str, value: &str) -> Self {
        Self {
            entries: vec![(namespace.to_string(), value.to_string())],
        }
    }

    /// Raw value of the first entry for `namespace`, modifiers included.
    pub fn lookup(&self, namespace: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == namespace)
            .map(|(_, value)| value.as_str())
    }

    /// Parsed value of the first entry for `namespace`.
    pub fn get(&self, namespace: &str) -> Option<TagValue> {
        self.lookup(namespace).map(TagValue::parse)
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.lookup(namespace).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A namespace value split into external name and modifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValue {
    pub name: String,
    pub modifiers: Vec<String>,
}

impl TagValue {
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(',');
        let name = parts.next().unwrap_or_default().to_string();
        let modifiers = parts
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        Self { name, modifiers }
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.modifiers.iter().any(|m| m == modifier)
    }
}

/// Looks up `target` in a raw tag string, matching namespaces case-insensitively,
/// and returns the external name (the part before the first comma).
pub fn get_tag_value(tags: &str, target: &str) -> Option<String> {
    Tags::parse(tags)
        .iter()
        .find(|(name, _)| name.trim().to_lowercase() == target)
        .map(|(_, value)| TagValue::parse(value).name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multiple_namespaces() {
        let tags = Tags::parse(r#"api:"boolVal,omitempty" inherit:"dynamic" testtag:"boolVal""#);
        assert_eq!(tags.lookup("api"), Some("boolVal,omitempty"));
        assert_eq!(tags.lookup("inherit"), Some("dynamic"));
        assert_eq!(tags.lookup("testtag"), Some("boolVal"));
        assert_eq!(tags.lookup("env"), None);

        let api = tags.get("api").unwrap();
        assert_eq!(api.name, "boolVal");
        assert!(api.has_modifier("omitempty"));
    }

    #[test]
    fn test_inline_tag_has_empty_name() {
        let tags = Tags::parse(r#"api:",inline""#);
        let api = tags.get("api").unwrap();
        assert_eq!(api.name, "");
        assert_eq!(api.modifiers, vec!["inline".to_string()]);
    }

    #[test]
    fn test_escaped_quotes() {
        let tags = Tags::parse(r#"doc:"say \"hi\"" api:"x""#);
        assert_eq!(tags.lookup("doc"), Some(r#"say "hi""#));
        assert_eq!(tags.lookup("api"), Some("x"));
    }

    #[test]
    fn test_malformed_tags_stop_parsing() {
        let tags = Tags::parse(r#"api:"ok" broken api2:"never""#);
        assert_eq!(tags.lookup("api"), Some("ok"));
        assert_eq!(tags.lookup("api2"), None);
        assert!(Tags::parse("").is_empty());
        assert!(Tags::parse(r#"api:"unterminated"#).is_empty());
    }

    #[test]
    fn test_get_tag_value() {
        let raw = r#"API:"name,omitempty" env:"PORT""#;
        assert_eq!(get_tag_value(raw, "api"), Some("name".to_string()));
        assert_eq!(get_tag_value(raw, "env"), Some("PORT".to_string()));
        assert_eq!(get_tag_value(raw, "json"), None);
    }
}
