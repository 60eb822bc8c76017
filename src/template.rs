//! `$variable` substitution over JSON template trees.

use serde_json::Value;
use std::collections::BTreeMap;

/// Variable name (including the `$`) to bound value.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    vars: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

/// Rebuild `template` with variables substituted.
///
/// A string leaf equal to a variable name becomes the bound value itself, keeping
/// its JSON type. Any other string leaf has each occurrence of a variable name
/// replaced with the value's display form. Other leaves are copied as-is.
pub fn apply(template: &Value, bindings: &Bindings) -> Value {
    match template {
        Value::String(s) => match bindings.get(s) {
            Some(value) => value.clone(),
            None => Value::String(interpolate(s, bindings)),
        },
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), apply(v, bindings)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| apply(v, bindings)).collect()),
        other => other.clone(),
    }
}

fn interpolate(s: &str, bindings: &Bindings) -> String {
    if !s.contains('$') {
        return s.to_string();
    }
    // Single pass: substituted text is never scanned again. At each `$` the
    // longest bound name wins, so `$count` never eats the front of `$count_total`.
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let hit = bindings
            .vars
            .iter()
            .filter(|(name, _)| tail.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len());
        match hit {
            Some((name, value)) => {
                out.push_str(&display(value));
                rest = &tail[name.len()..];
            }
            None => {
                out.push('$');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Strings render bare; everything else as compact JSON.
pub fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
