#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use alloy::json_abi::JsonAbi;
use alloy::primitives::{hex, Address};
use async_trait::async_trait;

use swiss_knife_calldata_core::{
    selector_for, AbiSourcePort, CalldataDecoder, NoopLookup, PortError, SelectorResolver,
    SignatureLookupPort,
};

/// Signature database backed by a map, counting how often it is asked.
#[derive(Debug, Default)]
pub struct MapLookup {
    entries: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
}

impl MapLookup {
    pub fn with(signatures: &[&str]) -> Self {
        let mut lookup = Self::default();
        for signature in signatures {
            lookup.insert(signature);
        }
        lookup
    }

    /// Register `signature` under its own selector, after any existing entry.
    pub fn insert(&mut self, signature: &str) {
        let selector = hex::encode_prefixed(selector_for(signature).expect("valid signature"));
        self.entries
            .entry(selector)
            .or_default()
            .push(signature.to_owned());
    }

    /// Register `signature` under an arbitrary selector, e.g. to fake a
    /// collision.
    pub fn insert_raw(&mut self, selector: &str, signature: &str) {
        self.entries
            .entry(selector.to_owned())
            .or_default()
            .push(signature.to_owned());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignatureLookupPort for MapLookup {
    async fn lookup(&self, selector: &str) -> Result<Vec<String>, PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.get(selector).cloned().unwrap_or_default())
    }
}

/// Lookup whose transport is always down.
#[derive(Debug, Default)]
pub struct FailingLookup;

#[async_trait]
impl SignatureLookupPort for FailingLookup {
    async fn lookup(&self, _selector: &str) -> Result<Vec<String>, PortError> {
        Err(PortError::Transport("connection refused".to_owned()))
    }
}

/// ABI source serving one fixed ABI for every contract.
#[derive(Debug, Clone)]
pub struct StaticAbiSource(pub Option<JsonAbi>);

#[async_trait]
impl AbiSourcePort for StaticAbiSource {
    async fn fetch_abi(
        &self,
        _address: Address,
        _chain_id: u64,
    ) -> Result<Option<JsonAbi>, PortError> {
        Ok(self.0.clone())
    }
}

pub fn decoder(primary: MapLookup) -> CalldataDecoder<MapLookup, NoopLookup> {
    CalldataDecoder::new(SelectorResolver::new(primary, NoopLookup))
}

pub fn decoder_with_fallback(
    primary: MapLookup,
    fallback: MapLookup,
) -> CalldataDecoder<MapLookup, MapLookup> {
    CalldataDecoder::new(SelectorResolver::new(primary, fallback))
}

/// Common signatures used across the decode tests.
pub fn known_signatures() -> MapLookup {
    MapLookup::with(&[
        "transfer(address,uint256)",
        "approve(address,uint256)",
        "multiSend(bytes)",
        "multicall(bytes[])",
        "aggregate3((address,bool,bytes)[])",
        "execTransaction(address,uint256,bytes,uint8,uint256,uint256,uint256,address,address,bytes)",
    ])
}

pub fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}
