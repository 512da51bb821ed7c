//! Recursive call decoding.
//!
//! A decode resolves the selector, picks the first candidate whose layout
//! consumes the calldata exactly, then walks the decoded values. Byte
//! arguments that carry calldata (MultiSend batches, multicall elements,
//! plain `bytes` of at least a selector's length) are decoded again in
//! place, so the result is a tree of calls.

use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::{Function, JsonAbi, Param};
use alloy::primitives::{hex, Address};
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::abi_decoder::{
    array_element, base_type, decode_inputs, format_primitive, try_candidates, type_descriptor,
    Layout,
};
use crate::domain::{Arg, ArgValue, DecodeRecursiveResult, DecodeSource, UnparsedCalldata};
use crate::error::DecodeError;
use crate::guess::guess_function;
use crate::multisend::{decode_multisend, record_value, MULTISEND_SELECTOR};
use crate::ports::{AbiSourcePort, SignatureLookupPort};
use crate::selector::{calldata_bytes, parse_signature, selector_hex, SelectorResolver};

/// How a value's position treats embedded calldata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgContext {
    /// `bytes` is tried as calldata and stays a hex leaf when that fails.
    Plain,
    /// `bytes` must be calldata; a failure marks the element `Undecoded`.
    CallBatch,
    /// `bytes` is a packed MultiSend batch.
    MultiSendBatch,
}

pub struct CalldataDecoder<P, F> {
    resolver: SelectorResolver<P, F>,
}

impl<P, F> CalldataDecoder<P, F>
where
    P: SignatureLookupPort,
    F: SignatureLookupPort,
{
    pub fn new(resolver: SelectorResolver<P, F>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &SelectorResolver<P, F> {
        &self.resolver
    }

    /// Resolve the selector through the signature databases and decode.
    /// Falls back to a guessed layout when no candidate fits.
    pub async fn decode(&self, calldata: &str) -> Result<DecodeRecursiveResult, DecodeError> {
        let data = calldata_bytes(calldata)?;
        self.decode_top_level(&data).await
    }

    pub async fn decode_with_selector(&self, calldata: &str) -> Option<DecodeRecursiveResult> {
        match self.decode(calldata).await {
            Ok(result) => Some(result),
            Err(e) => {
                debug!(error = %e, "calldata left undecoded");
                None
            }
        }
    }

    /// Like [`decode_with_selector`](Self::decode_with_selector), but hands
    /// back the split selector and payload when nothing decodes.
    pub async fn decode_or_unparsed(
        &self,
        calldata: &str,
    ) -> Result<DecodeRecursiveResult, UnparsedCalldata> {
        let data = match calldata_bytes(calldata) {
            Ok(data) => data,
            Err(_) => {
                return Err(UnparsedCalldata {
                    selector: String::new(),
                    payload: calldata.trim().to_owned(),
                })
            }
        };
        match self.decode_top_level(&data).await {
            Ok(result) => Ok(result),
            Err(e) => {
                debug!(error = %e, "returning unparsed calldata");
                Err(UnparsedCalldata::from_bytes(&data))
            }
        }
    }

    /// Decode against a signature the caller vouches for. Trailing bytes are
    /// tolerated.
    pub async fn decode_with_signature(
        &self,
        calldata: &str,
        signature: &str,
    ) -> Result<DecodeRecursiveResult, DecodeError> {
        let data = calldata_bytes(calldata)?;
        let function = parse_signature(signature)?;
        if data.len() < 4 || function.selector().as_slice() != &data[..4] {
            return Err(DecodeError::DecodeMismatch {
                signature: function.signature(),
                reason: "selector does not match calldata".to_owned(),
            });
        }
        let values = decode_inputs(&function, &data[4..], Layout::AllowTrailing)?;
        let selector = selector_hex(&data[..4]);
        Ok(self
            .build_result(function, values, DecodeSource::Abi, selector)
            .await)
    }

    /// Decode against a full contract ABI, falling back to selector
    /// resolution when the ABI has no matching function or it does not fit.
    pub async fn decode_with_abi(
        &self,
        calldata: &str,
        abi: &JsonAbi,
    ) -> Option<DecodeRecursiveResult> {
        let data = calldata_bytes(calldata).ok()?;
        if data.len() >= 4 {
            let matching = abi
                .functions()
                .find(|f| f.selector().as_slice() == &data[..4]);
            if let Some(function) = matching {
                match decode_inputs(function, &data[4..], Layout::AllowTrailing) {
                    Ok(values) => {
                        let selector = selector_hex(&data[..4]);
                        let result = self
                            .build_result(function.clone(), values, DecodeSource::Abi, selector)
                            .await;
                        return Some(result);
                    }
                    Err(e) => debug!(error = %e, "abi function did not decode"),
                }
            }
        }
        self.decode_top_level(&data).await.ok()
    }

    /// Fetch the target contract's ABI and decode against it.
    pub async fn decode_with_address<A>(
        &self,
        calldata: &str,
        address: Address,
        chain_id: u64,
        abi_source: &A,
    ) -> Option<DecodeRecursiveResult>
    where
        A: AbiSourcePort + ?Sized,
    {
        match abi_source.fetch_abi(address, chain_id).await {
            Ok(Some(abi)) => return self.decode_with_abi(calldata, &abi).await,
            Ok(None) => debug!(%address, chain_id, "no abi published for contract"),
            Err(e) => warn!(%address, chain_id, error = %e, "abi fetch failed"),
        }
        self.decode_with_selector(calldata).await
    }

    async fn decode_top_level(&self, data: &[u8]) -> Result<DecodeRecursiveResult, DecodeError> {
        match self.decode_call(data).await {
            Ok(result) => Ok(result),
            Err(err @ DecodeError::NoMatchingCandidate { .. }) => match guess_function(data) {
                Some((function, values)) => {
                    debug!(signature = %function.signature(), "using guessed layout");
                    let selector = selector_hex(&data[..4]);
                    Ok(self
                        .build_result(function, values, DecodeSource::Guessed, selector)
                        .await)
                }
                None => Err(err),
            },
            Err(e) => Err(e),
        }
    }

    fn decode_call<'a>(
        &'a self,
        data: &'a [u8],
    ) -> BoxFuture<'a, Result<DecodeRecursiveResult, DecodeError>> {
        Box::pin(async move {
            if data.len() < 4 {
                return Err(DecodeError::InvalidCalldata(format!(
                    "{} bytes is shorter than a selector",
                    data.len()
                )));
            }
            let selector = selector_hex(&data[..4]);
            let candidates = self.resolver.resolve(&selector).await?;
            let (function, values) = try_candidates(&selector, &candidates, data)?;
            Ok(self
                .build_result(function, values, DecodeSource::SignatureDatabase, selector)
                .await)
        })
    }

    async fn build_result(
        &self,
        function: Function,
        values: Vec<DynSolValue>,
        source: DecodeSource,
        selector: String,
    ) -> DecodeRecursiveResult {
        let multisend = is_multisend(&function);
        let batch = is_call_batch(&function);

        let mut args = Vec::with_capacity(values.len());
        for (idx, (param, value)) in function.inputs.iter().zip(values.iter()).enumerate() {
            let context = if multisend && param.ty == "bytes" {
                ArgContext::MultiSendBatch
            } else if batch && param.ty.ends_with(']') {
                ArgContext::CallBatch
            } else {
                ArgContext::Plain
            };
            let arg = self
                .decode_arg(arg_name(param, idx), param.clone(), value.clone(), context)
                .await;
            args.push(arg);
        }

        DecodeRecursiveResult {
            function_name: function.name.clone(),
            signature: function.signature(),
            selector,
            source,
            raw_args: values,
            args,
        }
    }

    fn decode_arg<'a>(
        &'a self,
        name: String,
        param: Param,
        value: DynSolValue,
        context: ArgContext,
    ) -> BoxFuture<'a, Arg> {
        Box::pin(async move {
            let decoded = match &value {
                DynSolValue::Bytes(bytes) => self.decode_bytes(bytes, context).await,
                DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
                    match array_element(&param) {
                        Some(element) => {
                            let mut out = Vec::with_capacity(items.len());
                            for (idx, item) in items.iter().enumerate() {
                                let arg = self
                                    .decode_arg(
                                        idx.to_string(),
                                        element.clone(),
                                        item.clone(),
                                        context,
                                    )
                                    .await;
                                out.push(arg);
                            }
                            ArgValue::Array(out)
                        }
                        None => ArgValue::Primitive(format_primitive(&value)),
                    }
                }
                DynSolValue::Tuple(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (idx, (component, item)) in
                        param.components.iter().zip(items.iter()).enumerate()
                    {
                        let arg = self
                            .decode_arg(
                                arg_name(component, idx),
                                component.clone(),
                                item.clone(),
                                context,
                            )
                            .await;
                        out.push(arg);
                    }
                    ArgValue::Tuple(out)
                }
                other => ArgValue::Primitive(format_primitive(other)),
            };

            Arg {
                name,
                base_type: base_type(&param),
                ty: type_descriptor(&param),
                raw_value: value,
                value: decoded,
            }
        })
    }

    async fn decode_bytes(&self, bytes: &[u8], context: ArgContext) -> ArgValue {
        match context {
            ArgContext::MultiSendBatch => match decode_multisend(bytes) {
                Ok(transactions) => {
                    let record = record_param();
                    let mut out = Vec::with_capacity(transactions.len());
                    for (idx, tx) in transactions.iter().enumerate() {
                        let arg = self
                            .decode_arg(
                                idx.to_string(),
                                record.clone(),
                                record_value(tx),
                                ArgContext::CallBatch,
                            )
                            .await;
                        out.push(arg);
                    }
                    ArgValue::Array(out)
                }
                Err(e) => {
                    debug!(error = %e, "multisend batch left undecoded");
                    undecoded(bytes, &e)
                }
            },
            ArgContext::CallBatch if bytes.is_empty() => {
                ArgValue::Primitive(hex::encode_prefixed(bytes))
            }
            ArgContext::CallBatch => match self.decode_call(bytes).await {
                Ok(call) => ArgValue::NestedCall(Box::new(call)),
                Err(e) => {
                    debug!(error = %e, "batched call left undecoded");
                    undecoded(bytes, &e)
                }
            },
            ArgContext::Plain if bytes.len() >= 4 => match self.decode_call(bytes).await {
                Ok(call) => ArgValue::NestedCall(Box::new(call)),
                Err(_) => ArgValue::Primitive(hex::encode_prefixed(bytes)),
            },
            ArgContext::Plain => ArgValue::Primitive(hex::encode_prefixed(bytes)),
        }
    }
}

fn arg_name(param: &Param, idx: usize) -> String {
    if param.name.is_empty() {
        format!("arg{idx}")
    } else {
        param.name.clone()
    }
}

fn undecoded(bytes: &[u8], err: &DecodeError) -> ArgValue {
    ArgValue::Undecoded {
        raw: hex::encode_prefixed(bytes),
        reason: err.to_string(),
    }
}

// `multiSend(bytes)` and look-alikes such as `multiSendCallOnly(bytes)`.
fn is_multisend(function: &Function) -> bool {
    let single_bytes = function.inputs.len() == 1 && function.inputs[0].ty == "bytes";
    function.selector().0 == MULTISEND_SELECTOR
        || (single_bytes && function.name.to_ascii_lowercase().starts_with("multisend"))
}

fn is_call_batch(function: &Function) -> bool {
    let name = function.name.to_ascii_lowercase();
    name.contains("multicall") || name.starts_with("aggregate") || name.starts_with("tryaggregate")
}

fn leaf(ty: &str, name: &str) -> Param {
    Param {
        ty: ty.to_owned(),
        name: name.to_owned(),
        components: Vec::new(),
        internal_type: None,
    }
}

fn record_param() -> Param {
    Param {
        ty: "tuple".to_owned(),
        name: String::new(),
        components: vec![
            leaf("uint8", "operation"),
            leaf("address", "to"),
            leaf("uint256", "value"),
            leaf("uint256", "dataLength"),
            leaf("bytes", "data"),
        ],
        internal_type: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_batch_functions() {
        let multicall = Function::parse("multicall(uint256 deadline, bytes[] data)").unwrap();
        let aggregate = Function::parse("aggregate3((address,bool,bytes)[] calls)").unwrap();
        let transfer = Function::parse("transfer(address,uint256)").unwrap();
        assert!(is_call_batch(&multicall));
        assert!(is_call_batch(&aggregate));
        assert!(!is_call_batch(&transfer));
    }

    #[test]
    fn recognises_multisend_variants() {
        let multisend = Function::parse("multiSend(bytes transactions)").unwrap();
        let call_only = Function::parse("multiSendCallOnly(bytes transactions)").unwrap();
        let other = Function::parse("multiSendTokens(address,bytes)").unwrap();
        assert!(is_multisend(&multisend));
        assert!(is_multisend(&call_only));
        assert!(!is_multisend(&other));
    }

    #[test]
    fn record_tuple_matches_packed_layout() {
        assert_eq!(
            type_descriptor(&record_param()),
            "(uint8,address,uint256,uint256,bytes)"
        );
    }
}
