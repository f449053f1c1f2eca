//! Parameter mappings for test definitions
//!
//! Test definitions are open-ended YAML mappings: a fixed set of keys is
//! understood by the generator and everything else flows through to the
//! templates untouched. Parameters are kept as [`serde_yaml::Mapping`]
//! values, which preserve declaration order and clone deeply, so every
//! branch of variant expansion works on isolated state.

use serde_yaml::{Mapping, Value};

/// Raw parameter mapping for one test or variant.
pub type ParamMap = Mapping;

/// Build a string key for indexing a [`ParamMap`].
pub fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

/// Get a parameter value by name.
pub fn get<'a>(params: &'a ParamMap, name: &str) -> Option<&'a Value> {
    params.get(&key(name))
}

/// Get a string parameter by name.
pub fn get_str<'a>(params: &'a ParamMap, name: &str) -> Option<&'a str> {
    get(params, name).and_then(Value::as_str)
}

/// Get a boolean parameter, falling back to `default` when absent.
pub fn get_bool_or(params: &ParamMap, name: &str, default: bool) -> bool {
    get(params, name).and_then(Value::as_bool).unwrap_or(default)
}

/// True when the parameter is present, whatever its value.
pub fn contains(params: &ParamMap, name: &str) -> bool {
    params.contains_key(&key(name))
}

/// Insert or replace a parameter.
pub fn set(params: &mut ParamMap, name: &str, value: Value) {
    params.insert(key(name), value);
}

/// Shallow merge: a deep copy of `base` with `overlay` keys written over
/// it, later keys winning.
pub fn merged(base: &ParamMap, overlay: &ParamMap) -> ParamMap {
    let mut out = base.clone();
    for (k, v) in overlay {
        out.insert(k.clone(), v.clone());
    }
    out
}

/// Get a list-of-strings parameter, empty when absent.
pub fn str_list(params: &ParamMap, name: &str) -> Vec<String> {
    match get(params, name) {
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// Append `item` to a list-of-strings parameter, creating it if needed.
pub fn push_str(params: &mut ParamMap, name: &str, item: &str) {
    let entry = params
        .entry(key(name))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if let Value::Sequence(seq) = entry {
        seq.push(Value::String(item.to_string()));
    }
}

/// Append `piece` to a dot-joined shorthand parameter (`a` + `b` = `a.b`).
pub fn append_dotted(params: &mut ParamMap, name: &str, piece: &str) {
    let current = get_str(params, name).unwrap_or("").to_string();
    let joined = if current.is_empty() {
        piece.to_string()
    } else {
        format!("{current}.{piece}")
    };
    set(params, name, Value::String(joined));
}

/// Render a parameter value for error messages.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("\"{s}\""),
        Value::Sequence(seq) => {
            let items: Vec<String> = seq.iter().map(display_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", display_value(k), display_value(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
        Value::Tagged(tagged) => display_value(&tagged.value),
    }
}
