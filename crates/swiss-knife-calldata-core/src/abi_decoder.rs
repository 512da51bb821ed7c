//! Typed decoding of parameter bytes against a function definition.
//!
//! Signature parsing goes through `alloy_json_abi::Function::parse()` and
//! decoding through `JsonAbiExt::abi_decode_input`, the same path Foundry's
//! `abi_decode_calldata` takes.

use alloy::dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, Param};
use alloy::primitives::hex;
use tracing::debug;

use crate::error::DecodeError;
use crate::selector::parse_signature;

/// How much of the parameter bytes a decode must account for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Canonical re-encoding must reproduce the bytes exactly. Used when
    /// choosing between database candidates.
    ///
    /// Stricter than a byte-length check: valid but non-canonical encodings
    /// (dirty padding, out-of-order tail offsets) are rejected too.
    Exact,
    /// Trailing bytes after the parameters are tolerated. Used for ABIs the
    /// caller vouches for.
    AllowTrailing,
}

/// Decode `params` (calldata without the selector) against `function`.
pub fn decode_inputs(
    function: &Function,
    params: &[u8],
    layout: Layout,
) -> Result<Vec<DynSolValue>, DecodeError> {
    let signature = function.signature();
    let mismatch = |reason: String| DecodeError::DecodeMismatch {
        signature: signature.clone(),
        reason,
    };

    if function.inputs.is_empty() {
        if layout == Layout::Exact && !params.is_empty() {
            return Err(mismatch(format!(
                "function takes no parameters but {} bytes follow the selector",
                params.len()
            )));
        }
        return Ok(Vec::new());
    }

    let values = function
        .abi_decode_input(params, false)
        .map_err(|e| mismatch(e.to_string()))?;

    if values.len() != function.inputs.len() {
        return Err(mismatch(format!(
            "decoded {} values for {} parameters",
            values.len(),
            function.inputs.len()
        )));
    }

    if layout == Layout::Exact {
        let reencoded = DynSolValue::Tuple(values.clone()).abi_encode_params();
        if reencoded.len() != params.len() {
            return Err(mismatch(format!(
                "layout covers {} bytes but {} were given",
                reencoded.len(),
                params.len()
            )));
        }
        if reencoded != params {
            return Err(mismatch("non-canonical encoding".to_owned()));
        }
    }

    Ok(values)
}

/// Try one text signature against full calldata (selector included).
pub fn decode_candidate(
    signature: &str,
    calldata: &[u8],
) -> Result<(Function, Vec<DynSolValue>), DecodeError> {
    let function = parse_signature(signature)?;
    if calldata.len() < 4 || function.selector().as_slice() != &calldata[..4] {
        return Err(DecodeError::DecodeMismatch {
            signature: signature.to_owned(),
            reason: "selector does not match calldata".to_owned(),
        });
    }
    let values = decode_inputs(&function, &calldata[4..], Layout::Exact)?;
    Ok((function, values))
}

/// Walk the candidates in ranking order and keep the first that decodes.
pub fn try_candidates(
    selector: &str,
    candidates: &[String],
    calldata: &[u8],
) -> Result<(Function, Vec<DynSolValue>), DecodeError> {
    for candidate in candidates {
        match decode_candidate(candidate, calldata) {
            Ok(decoded) => {
                debug!(%selector, signature = %candidate, "candidate decoded");
                return Ok(decoded);
            }
            Err(e) => debug!(%selector, signature = %candidate, error = %e, "candidate rejected"),
        }
    }
    Err(DecodeError::NoMatchingCandidate {
        selector: selector.to_owned(),
        tried: candidates.len(),
    })
}

/// Canonical type descriptor of a parameter, tuples spelled `(a,b)`.
pub fn type_descriptor(param: &Param) -> String {
    param.selector_type().into_owned()
}

/// Descriptor with every array dimension removed; `tuple` for tuples.
pub fn base_type(param: &Param) -> String {
    let mut ty = param.ty.as_str();
    while let Some(inner) = strip_array_dimension(ty) {
        ty = inner;
    }
    if ty.starts_with("tuple") || ty.starts_with('(') {
        "tuple".to_owned()
    } else {
        ty.to_owned()
    }
}

/// `uint256[3][]` -> `uint256[3]`; `None` when `ty` is not an array.
pub fn strip_array_dimension(ty: &str) -> Option<&str> {
    let ty = ty.trim();
    if !ty.ends_with(']') {
        return None;
    }
    ty.rfind('[').map(|idx| &ty[..idx])
}

/// Element parameter of an array parameter, keeping tuple components.
pub fn array_element(param: &Param) -> Option<Param> {
    strip_array_dimension(&param.ty).map(|inner| Param {
        ty: inner.to_owned(),
        name: String::new(),
        components: param.components.clone(),
        internal_type: None,
    })
}

pub fn resolve_type(param: &Param) -> Result<DynSolType, DecodeError> {
    param.resolve().map_err(|e| DecodeError::InvalidSignature {
        signature: param.ty.clone(),
        reason: e.to_string(),
    })
}

/// Leaf rendering: integers in decimal, addresses checksummed, byte strings
/// as lowercase `0x` hex.
pub fn format_primitive(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        // bytesN is right-padded inside the word, keep the first `size` bytes
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word.as_slice()[..(*size).min(32)]),
        DynSolValue::Address(a) => a.to_checksum(None),
        DynSolValue::Function(f) => hex::encode_prefixed(f.as_slice()),
        DynSolValue::Bytes(b) => hex::encode_prefixed(b),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            let inner: Vec<String> = items.iter().map(format_primitive).collect();
            format!("[{}]", inner.join(","))
        }
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}
