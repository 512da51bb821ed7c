use std::borrow::Cow;
use std::str::FromStr;

use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt};
use alloy::json_abi::{Constructor, Function, Param};
use alloy::primitives::{hex, Address, Bytes, FixedBytes, I256, U256};
use serde_json::Value;

use crate::abi_decoder::{resolve_type, strip_array_dimension, type_descriptor};
use crate::domain::DecodeRecursiveResult;
use crate::error::EncodeError;

/// Where the function definition for an encode comes from.
#[derive(Debug, Clone, Copy)]
pub enum FunctionSource<'a> {
    /// Text signature, e.g. `transfer(address,uint256)` or
    /// `function transfer(address to, uint256 amount)`.
    Signature(&'a str),
    Abi(&'a Function),
}

/// Selector followed by the ABI-encoded arguments.
///
/// `bool` arguments must already be JSON booleans, see `convert_booleans`.
pub fn encode_function_call(source: FunctionSource<'_>, args: &[Value]) -> Result<Bytes, EncodeError> {
    let function: Cow<'_, Function> = match source {
        FunctionSource::Signature(signature) => Cow::Owned(
            Function::parse(signature.trim()).map_err(|e| EncodeError::InvalidSignature {
                signature: signature.to_owned(),
                reason: e.to_string(),
            })?,
        ),
        FunctionSource::Abi(function) => Cow::Borrowed(function),
    };

    let values = values_for_params(&function.inputs, args)?;
    let encoded = function
        .abi_encode_input(&values)
        .map_err(|e| EncodeError::Abi(e.to_string()))?;
    Ok(Bytes::from(encoded))
}

/// ABI-encoded arguments without a selector.
pub fn encode_parameters(params: &[Param], args: &[Value]) -> Result<Bytes, EncodeError> {
    let values = values_for_params(params, args)?;
    Ok(Bytes::from(DynSolValue::Tuple(values).abi_encode_params()))
}

/// ABI-encoded arguments for a bare type list such as `["address", "uint256[]"]`.
pub fn encode_type_list(types: &[&str], args: &[Value]) -> Result<Bytes, EncodeError> {
    let values = values_for_types(types, args)?;
    Ok(Bytes::from(DynSolValue::Tuple(values).abi_encode_params()))
}

/// Tight `abi.encodePacked` concatenation: no padding, no offsets.
pub fn encode_packed(types: &[&str], args: &[Value]) -> Result<Bytes, EncodeError> {
    let values = values_for_types(types, args)?;
    let mut packed = Vec::new();
    for value in &values {
        packed.extend_from_slice(&value.abi_encode_packed());
    }
    Ok(Bytes::from(packed))
}

/// Creation bytecode followed by the encoded constructor arguments.
pub fn encode_constructor(
    bytecode: &str,
    constructor: Option<&Constructor>,
    args: &[Value],
) -> Result<Bytes, EncodeError> {
    let trimmed = bytecode.trim();
    let mut out = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .map_err(|e| EncodeError::InvalidBytecode(e.to_string()))?;

    match constructor {
        Some(constructor) => {
            let values = values_for_params(&constructor.inputs, args)?;
            out.extend_from_slice(&DynSolValue::Tuple(values).abi_encode_params());
        }
        None if !args.is_empty() => {
            return Err(EncodeError::ArgumentCount {
                expected: 0,
                got: args.len(),
            })
        }
        None => {}
    }
    Ok(Bytes::from(out))
}

/// Re-encode a decode result from its raw decoded values.
pub fn encode_decoded(result: &DecodeRecursiveResult) -> Result<Bytes, EncodeError> {
    let selector = hex::decode(result.selector.trim_start_matches("0x"))
        .map_err(|e| EncodeError::Abi(format!("invalid selector '{}': {e}", result.selector)))?;
    let mut out = selector;
    if !result.raw_args.is_empty() {
        out.extend_from_slice(&DynSolValue::Tuple(result.raw_args.clone()).abi_encode_params());
    }
    Ok(Bytes::from(out))
}

fn values_for_params(params: &[Param], args: &[Value]) -> Result<Vec<DynSolValue>, EncodeError> {
    if params.len() != args.len() {
        return Err(EncodeError::ArgumentCount {
            expected: params.len(),
            got: args.len(),
        });
    }

    let mut values = Vec::with_capacity(args.len());
    for (idx, (param, arg)) in params.iter().zip(args.iter()).enumerate() {
        let ty = resolve_type(param).map_err(|e| EncodeError::UnsupportedType {
            ty: param.ty.clone(),
            reason: e.to_string(),
        })?;
        let positional = to_positional(arg.clone(), &param.ty, &param.components);
        let value = value_for_type(&positional, &ty).map_err(|reason| {
            EncodeError::EncodingTypeMismatch {
                name: param_label(param, idx),
                ty: type_descriptor(param),
                reason,
            }
        })?;
        values.push(value);
    }
    Ok(values)
}

fn values_for_types(types: &[&str], args: &[Value]) -> Result<Vec<DynSolValue>, EncodeError> {
    if types.len() != args.len() {
        return Err(EncodeError::ArgumentCount {
            expected: types.len(),
            got: args.len(),
        });
    }

    let mut values = Vec::with_capacity(args.len());
    for (idx, (ty_str, arg)) in types.iter().zip(args.iter()).enumerate() {
        let ty = DynSolType::parse(ty_str.trim()).map_err(|e| EncodeError::UnsupportedType {
            ty: (*ty_str).to_owned(),
            reason: e.to_string(),
        })?;
        let value = value_for_type(arg, &ty).map_err(|reason| EncodeError::EncodingTypeMismatch {
            name: format!("arg{idx}"),
            ty: (*ty_str).to_owned(),
            reason,
        })?;
        values.push(value);
    }
    Ok(values)
}

fn param_label(param: &Param, idx: usize) -> String {
    if param.name.is_empty() {
        format!("arg{idx}")
    } else {
        param.name.clone()
    }
}

// Tuples given as objects keyed by component name become positional arrays.
fn to_positional(value: Value, ty: &str, components: &[Param]) -> Value {
    if let Some(element_ty) = strip_array_dimension(ty) {
        return match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| to_positional(item, element_ty, components))
                    .collect(),
            ),
            other => other,
        };
    }
    if ty != "tuple" {
        return value;
    }
    match value {
        Value::Object(mut map) => Value::Array(
            components
                .iter()
                .map(|c| {
                    let item = map.remove(&c.name).unwrap_or(Value::Null);
                    to_positional(item, &c.ty, &c.components)
                })
                .collect(),
        ),
        // length mismatches are reported by `value_for_type`
        Value::Array(items) if items.len() != components.len() => Value::Array(items),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .zip(components.iter())
                .map(|(item, c)| to_positional(item, &c.ty, &c.components))
                .collect(),
        ),
        other => other,
    }
}

fn number_text(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) if s.trim().is_empty() => {
            Err("expected numeric string, got empty string".to_owned())
        }
        Value::String(s) => Ok(s.trim().to_owned()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(format!("expected numeric string or number, got {other}")),
    }
}

fn hex_text(value: &Value, what: &str) -> Result<Vec<u8>, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected {what} hex string, got {value}"))?
        .trim();
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| format!("invalid {what} hex: {e}"))
}

fn value_for_type(value: &Value, ty: &DynSolType) -> Result<DynSolValue, String> {
    match ty {
        DynSolType::Bool => value
            .as_bool()
            .map(DynSolValue::Bool)
            .ok_or_else(|| format!("expected bool, got {value}")),
        DynSolType::Uint(bits) => {
            let text = number_text(value)?;
            let parsed = U256::from_str(&text).map_err(|e| format!("invalid uint '{text}': {e}"))?;
            if *bits < 256 && parsed.bit_len() > *bits {
                return Err(format!("{parsed} does not fit in uint{bits}"));
            }
            Ok(DynSolValue::Uint(parsed, *bits))
        }
        DynSolType::Int(bits) => {
            let text = number_text(value)?;
            let parsed = I256::from_str(&text).map_err(|e| format!("invalid int '{text}': {e}"))?;
            // two's complement: the magnitude of x or -x-1 must fit in bits-1
            let magnitude = if parsed.is_negative() {
                !parsed.into_raw()
            } else {
                parsed.into_raw()
            };
            if *bits < 256 && magnitude.bit_len() >= *bits {
                return Err(format!("{parsed} does not fit in int{bits}"));
            }
            Ok(DynSolValue::Int(parsed, *bits))
        }
        DynSolType::Address => value
            .as_str()
            .ok_or_else(|| format!("expected address string, got {value}"))
            .and_then(|s| {
                Address::from_str(s.trim())
                    .map(DynSolValue::Address)
                    .map_err(|e| format!("invalid address: {e}"))
            }),
        DynSolType::FixedBytes(size) => {
            let bytes = hex_text(value, "fixed bytes")?;
            if bytes.len() != *size {
                return Err(format!(
                    "expected {size} bytes, got {}",
                    bytes.len()
                ));
            }
            Ok(DynSolValue::FixedBytes(
                FixedBytes::<32>::right_padding_from(&bytes),
                *size,
            ))
        }
        DynSolType::Function => {
            let bytes = hex_text(value, "function")?;
            if bytes.len() != 24 {
                return Err(format!("expected 24 bytes, got {}", bytes.len()));
            }
            Ok(DynSolValue::Function(alloy::primitives::Function::from_slice(
                &bytes,
            )))
        }
        DynSolType::Bytes => hex_text(value, "bytes").map(DynSolValue::Bytes),
        DynSolType::String => value
            .as_str()
            .map(|s| DynSolValue::String(s.to_owned()))
            .ok_or_else(|| format!("expected string, got {value}")),
        DynSolType::Array(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected array, got {value}"))?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(value_for_type(item, inner)?);
            }
            Ok(DynSolValue::Array(out))
        }
        DynSolType::FixedArray(inner, size) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected array, got {value}"))?;
            if items.len() != *size {
                return Err(format!(
                    "fixed array length mismatch: expected {size}, got {}",
                    items.len()
                ));
            }
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(value_for_type(item, inner)?);
            }
            Ok(DynSolValue::FixedArray(out))
        }
        DynSolType::Tuple(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("expected tuple array, got {value}"))?;
            if items.len() != inner.len() {
                return Err(format!(
                    "tuple length mismatch: expected {}, got {}",
                    inner.len(),
                    items.len()
                ));
            }
            let mut out = Vec::with_capacity(items.len());
            for (item, inner_ty) in items.iter().zip(inner.iter()) {
                out.push(value_for_type(item, inner_ty)?);
            }
            Ok(DynSolValue::Tuple(out))
        }
        #[allow(unreachable_patterns)]
        other => Err(format!("type {other} is not supported")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_transfer_with_selector() {
        let calldata = encode_function_call(
            FunctionSource::Signature("transfer(address,uint256)"),
            &[
                json!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"),
                json!("1000000000000000000"),
            ],
        )
        .unwrap();
        assert_eq!(
            hex::encode(&calldata),
            "a9059cbb000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa960450000000000000000000000000000000000000000000000000de0b6b3a7640000"
        );
    }

    #[test]
    fn encodes_without_arguments() {
        let calldata =
            encode_function_call(FunctionSource::Signature("totalSupply()"), &[]).unwrap();
        assert_eq!(calldata.len(), 4);
    }

    #[test]
    fn rejects_non_numeric_uint() {
        let err = encode_function_call(
            FunctionSource::Signature("transfer(address,uint256)"),
            &[json!("0x000000000000000000000000000000000000dEaD"), json!("abc")],
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::EncodingTypeMismatch { ref ty, .. } if ty == "uint256"));
    }

    #[test]
    fn rejects_string_bool_without_normalisation() {
        let err = encode_type_list(&["bool"], &[json!("true")]).unwrap_err();
        assert!(matches!(err, EncodeError::EncodingTypeMismatch { .. }));
    }

    #[test]
    fn rejects_uint_overflowing_its_width() {
        assert!(encode_type_list(&["uint8"], &[json!("256")]).is_err());
        assert!(encode_type_list(&["uint8"], &[json!(255)]).is_ok());
    }

    #[test]
    fn rejects_int_outside_its_width() {
        assert!(encode_type_list(&["int8"], &[json!("1000")]).is_err());
        assert!(encode_type_list(&["int8"], &[json!("128")]).is_err());
        assert!(encode_type_list(&["int8"], &[json!("-129")]).is_err());

        let max = encode_type_list(&["int8"], &[json!("127")]).unwrap();
        assert_eq!(max[31], 0x7f);
        let min = encode_type_list(&["int8"], &[json!(-128)]).unwrap();
        assert!(min[..31].iter().all(|b| *b == 0xff));
        assert_eq!(min[31], 0x80);
    }

    #[test]
    fn rejects_empty_numbers() {
        let err = encode_type_list(&["uint256"], &[json!("")]).unwrap_err();
        assert!(matches!(err, EncodeError::EncodingTypeMismatch { .. }));
        assert!(encode_type_list(&["int256"], &[json!("  ")]).is_err());
    }

    #[test]
    fn rejects_tuple_with_surplus_element() {
        let err = encode_function_call(
            FunctionSource::Signature("f((address,bool))"),
            &[json!(["0x000000000000000000000000000000000000dEaD", true, "extra"])],
        )
        .unwrap_err();
        assert!(matches!(err, EncodeError::EncodingTypeMismatch { .. }));
    }

    #[test]
    fn rejects_wrong_argument_count() {
        let err = encode_function_call(
            FunctionSource::Signature("transfer(address,uint256)"),
            &[json!("0x000000000000000000000000000000000000dEaD")],
        )
        .unwrap_err();
        assert_eq!(err, EncodeError::ArgumentCount { expected: 2, got: 1 });
    }

    #[test]
    fn packs_without_padding() {
        let packed = encode_packed(
            &["address", "uint8", "bytes"],
            &[
                json!("0x000000000000000000000000000000000000dEaD"),
                json!(1),
                json!("0xabcd"),
            ],
        )
        .unwrap();
        assert_eq!(
            hex::encode(&packed),
            "000000000000000000000000000000000000dead01abcd"
        );
    }

    #[test]
    fn accepts_tuple_objects_by_component_name() {
        let function = Function::parse("f((address to,bool ok) item)").unwrap();
        let by_name = encode_function_call(
            FunctionSource::Abi(&function),
            &[json!({"ok": true, "to": "0x000000000000000000000000000000000000dEaD"})],
        )
        .unwrap();
        let positional = encode_function_call(
            FunctionSource::Abi(&function),
            &[json!(["0x000000000000000000000000000000000000dEaD", true])],
        )
        .unwrap();
        assert_eq!(by_name, positional);
    }

    #[test]
    fn appends_constructor_args_to_bytecode() {
        let constructor = Constructor {
            inputs: vec![Param {
                ty: "uint256".to_owned(),
                name: "supply".to_owned(),
                components: Vec::new(),
                internal_type: None,
            }],
            state_mutability: alloy::json_abi::StateMutability::NonPayable,
        };
        let out = encode_constructor("0x6080", Some(&constructor), &[json!("5")]).unwrap();
        assert_eq!(out.len(), 2 + 32);
        assert_eq!(&out[..2], &[0x60, 0x80]);
        assert_eq!(out[33], 5);

        assert!(encode_constructor("0x6080", None, &[json!("5")]).is_err());
        assert!(encode_constructor("0xzz", None, &[]).is_err());
    }

    #[test]
    fn encodes_fixed_bytes_left_aligned() {
        let out = encode_type_list(&["bytes4"], &[json!("0xdeadbeef")]).unwrap();
        assert_eq!(&out[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(out[4..].iter().all(|b| *b == 0));
        assert!(encode_type_list(&["bytes4"], &[json!("0xdead")]).is_err());
    }
}
