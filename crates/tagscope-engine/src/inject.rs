//! `${name}` substitution from a variable map

use std::collections::HashMap;
use tagscope_core::{Result, TagscopeError, Value};
use tracing::trace;

/// Replaces every `${name}` in `template` with the variable's string form.
///
/// A template with no `${...}` at all is treated as a variable name itself,
/// and that variable's value is returned unchanged. Unknown names fail with
/// [`TagscopeError::VariableNotFound`].
pub fn inject_variables(template: &str, variables: &HashMap<String, Value>) -> Result<Value> {
    let mut output = String::with_capacity(template.len());
    let mut name = String::new();
    let mut in_variable = false;
    let mut has_variable = false;
    let mut last = None;

    for c in template.chars() {
        if in_variable {
            if c == '}' {
                in_variable = false;
                let value = lookup(variables, &name)?;
                output.push_str(&value.to_string());
                name.clear();
            } else {
                name.push(c);
            }
        } else if c == '{' && last == Some('$') {
            in_variable = true;
            has_variable = true;
            output.pop();
        } else {
            output.push(c);
        }
        last = Some(c);
    }

    if has_variable {
        trace!(template, "injected variables");
        return Ok(Value::String(output));
    }

    lookup(variables, template).cloned()
}

fn lookup<'a>(variables: &'a HashMap<String, Value>, name: &str) -> Result<&'a Value> {
    variables
        .get(name)
        .ok_or_else(|| TagscopeError::VariableNotFound {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(entries: &[(&str, Value)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_inject_into_template() {
        let variables = vars(&[("value", Value::String("success".into()))]);
        assert_eq!(
            inject_variables("test${value}", &variables).unwrap(),
            Value::String("testsuccess".into())
        );
    }

    #[test]
    fn test_unknown_variable() {
        let err = inject_variables("test${unmatched}", &HashMap::new()).unwrap_err();
        assert!(matches!(err, TagscopeError::VariableNotFound { ref name } if name == "unmatched"));
    }

    #[test]
    fn test_whole_input_is_a_variable_name() {
        let variables = vars(&[("port", Value::Int(8080))]);
        assert_eq!(inject_variables("port", &variables).unwrap(), Value::Int(8080));
        assert!(inject_variables("host", &variables).is_err());
    }

    #[test]
    fn test_non_string_values_are_stringified() {
        let variables = vars(&[("n", Value::Float(1.5)), ("b", Value::Bool(true))]);
        assert_eq!(
            inject_variables("${n}/${b}$", &variables).unwrap(),
            Value::String("1.5/true$".into())
        );
    }
}
