use alloy::json_abi::Param;
use serde_json::Value;

use crate::abi_decoder::strip_array_dimension;

/// Rewrite every `bool` leaf of `value` to a JSON boolean.
///
/// `"true"`/`"false"` (any case) become booleans; every other leaf, and any
/// leaf whose declared type is not exactly `bool`, passes through unchanged.
/// Applying it twice gives the same result as applying it once.
pub fn convert_booleans(value: Value, param: &Param) -> Value {
    convert_typed(value, &param.ty, &param.components)
}

/// `convert_booleans` over a whole argument list.
pub fn convert_booleans_for_inputs(values: Vec<Value>, inputs: &[Param]) -> Vec<Value> {
    let mut params = inputs.iter();
    values
        .into_iter()
        .map(|value| match params.next() {
            Some(param) => convert_booleans(value, param),
            None => value,
        })
        .collect()
}

fn convert_typed(value: Value, ty: &str, components: &[Param]) -> Value {
    if let Some(element_ty) = strip_array_dimension(ty) {
        return match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| convert_typed(item, element_ty, components))
                    .collect(),
            ),
            other => other,
        };
    }

    match ty.trim() {
        "bool" => to_bool(value),
        "tuple" => convert_tuple(value, components),
        inline if inline.starts_with('(') => {
            let inline_components: Vec<Param> = split_tuple_types(inline)
                .into_iter()
                .map(|ty| Param {
                    ty: ty.to_owned(),
                    name: String::new(),
                    components: Vec::new(),
                    internal_type: None,
                })
                .collect();
            convert_tuple(value, &inline_components)
        }
        _ => value,
    }
}

fn convert_tuple(value: Value, components: &[Param]) -> Value {
    match value {
        Value::Array(items) => {
            let mut fields = components.iter();
            Value::Array(
                items
                    .into_iter()
                    .map(|item| match fields.next() {
                        Some(c) => convert_typed(item, &c.ty, &c.components),
                        None => item,
                    })
                    .collect(),
            )
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| {
                    let converted = match components.iter().find(|c| c.name == key) {
                        Some(c) => convert_typed(item, &c.ty, &c.components),
                        None => item,
                    };
                    (key, converted)
                })
                .collect(),
        ),
        other => other,
    }
}

fn to_bool(value: Value) -> Value {
    match value {
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Value::Bool(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Value::Bool(false),
        other => other,
    }
}

/// `(bool,(uint256,bool)[])` -> `["bool", "(uint256,bool)[]"]`
fn split_tuple_types(inline: &str) -> Vec<&str> {
    let Some(inner) = inline
        .strip_prefix('(')
        .and_then(|rest| rest.rfind(')').map(|end| &rest[..end]))
    else {
        return Vec::new();
    };

    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(inner[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    if !inner[start..].trim().is_empty() {
        parts.push(inner[start..].trim());
    }
    parts
}
