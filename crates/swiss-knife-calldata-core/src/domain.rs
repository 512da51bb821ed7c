use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{hex, Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::abi_decoder::format_primitive;

/// Function name carried by results whose parameter layout was inferred from
/// the raw bytes instead of a known signature.
pub const GUESSED_FUNCTION_NAME: &str = "__guessed__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DecodeSource {
    Abi,
    SignatureDatabase,
    Guessed,
}

/// Root of a decode tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeRecursiveResult {
    pub function_name: String,
    pub signature: String,
    pub selector: String,
    pub source: DecodeSource,
    #[serde(skip)]
    pub raw_args: Vec<DynSolValue>,
    pub args: Vec<Arg>,
}

impl DecodeRecursiveResult {
    pub fn is_guessed(&self) -> bool {
        self.source == DecodeSource::Guessed
    }

    /// Argument values in the shape the encoder accepts. Booleans come back
    /// as strings, so run them through `convert_booleans` before encoding.
    pub fn args_as_json(&self) -> Vec<Value> {
        self.args.iter().map(Arg::to_json_value).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arg {
    pub name: String,
    /// Type with every array dimension removed, `tuple` for tuples.
    pub base_type: String,
    /// Canonical ABI type descriptor, e.g. `(address,bool)[]`.
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(skip)]
    pub raw_value: DynSolValue,
    pub value: ArgValue,
}

impl Arg {
    pub fn to_json_value(&self) -> Value {
        match &self.value {
            ArgValue::Primitive(s) => Value::String(s.clone()),
            ArgValue::Tuple(items) | ArgValue::Array(items) if !self.is_packed_batch() => {
                Value::Array(items.iter().map(Arg::to_json_value).collect())
            }
            ArgValue::Undecoded { raw, .. } => Value::String(raw.clone()),
            _ => Value::String(format_primitive(&self.raw_value)),
        }
    }

    // A MultiSend blob keeps its declared `bytes` type while its value is the
    // unpacked record list.
    fn is_packed_batch(&self) -> bool {
        matches!(self.raw_value, DynSolValue::Bytes(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum ArgValue {
    Primitive(String),
    NestedCall(Box<DecodeRecursiveResult>),
    Tuple(Vec<Arg>),
    Array(Vec<Arg>),
    /// Bytes in a position that must hold calldata but did not decode.
    Undecoded { raw: String, reason: String },
}

impl ArgValue {
    pub fn as_primitive(&self) -> Option<&str> {
        match self {
            ArgValue::Primitive(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_nested_call(&self) -> Option<&DecodeRecursiveResult> {
        match self {
            ArgValue::NestedCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[Arg]> {
        match self {
            ArgValue::Tuple(items) | ArgValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_undecoded(&self) -> bool {
        matches!(self, ArgValue::Undecoded { .. })
    }
}

/// Calldata that could not be decoded, split into selector and payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnparsedCalldata {
    pub selector: String,
    pub payload: String,
}

impl UnparsedCalldata {
    pub fn from_bytes(data: &[u8]) -> Self {
        let split = data.len().min(4);
        Self {
            selector: hex::encode_prefixed(&data[..split]),
            payload: hex::encode_prefixed(&data[split..]),
        }
    }
}

/// One record of a Safe MultiSend packed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSendTransaction {
    pub operation: u8,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}
