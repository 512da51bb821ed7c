use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Maps a normalised selector (`0x` + 8 lowercase hex chars) to candidate
/// text signatures, most likely first.
#[async_trait]
pub trait SignatureLookupPort: Send + Sync {
    async fn lookup(&self, selector: &str) -> Result<Vec<String>, PortError>;
}

/// Fetches the ABI of a deployed contract, `Ok(None)` when the source has no
/// ABI for it.
#[async_trait]
pub trait AbiSourcePort: Send + Sync {
    async fn fetch_abi(&self, address: Address, chain_id: u64)
        -> Result<Option<JsonAbi>, PortError>;
}

/// Lookup that never knows any selector. Used where no database is wired in,
/// e.g. offline decoding or as an absent fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLookup;

#[async_trait]
impl SignatureLookupPort for NoopLookup {
    async fn lookup(&self, _selector: &str) -> Result<Vec<String>, PortError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl AbiSourcePort for NoopLookup {
    async fn fetch_abi(
        &self,
        _address: Address,
        _chain_id: u64,
    ) -> Result<Option<JsonAbi>, PortError> {
        Ok(None)
    }
}
