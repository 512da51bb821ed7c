use alloy::json_abi::Function;
use alloy::primitives::hex;
use tracing::debug;

use crate::error::DecodeError;
use crate::ports::SignatureLookupPort;

/// Normalise a selector to lowercase `0x` + 8 hex chars.
pub fn normalize_selector(selector: &str) -> Result<String, DecodeError> {
    let trimmed = selector.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DecodeError::InvalidSelector(selector.to_owned()));
    }
    Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

pub fn selector_hex(selector: &[u8]) -> String {
    hex::encode_prefixed(selector)
}

/// Selector of a text signature, e.g. `transfer(address,uint256)`.
pub fn selector_for(signature: &str) -> Result<[u8; 4], DecodeError> {
    let function = parse_signature(signature)?;
    Ok(function.selector().0)
}

pub fn parse_signature(signature: &str) -> Result<Function, DecodeError> {
    Function::parse(signature.trim()).map_err(|e| DecodeError::InvalidSignature {
        signature: signature.to_owned(),
        reason: e.to_string(),
    })
}

/// Hex calldata (with or without `0x`) to bytes.
pub fn calldata_bytes(calldata: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = calldata.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).map_err(|e| DecodeError::InvalidCalldata(e.to_string()))
}

/// Two-tier selector lookup: the primary database first, the fallback only
/// when the primary knows nothing about the selector.
#[derive(Debug, Clone)]
pub struct SelectorResolver<P, F> {
    primary: P,
    fallback: F,
}

impl<P, F> SelectorResolver<P, F>
where
    P: SignatureLookupPort,
    F: SignatureLookupPort,
{
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Candidate signatures in database ranking order, possibly empty.
    pub async fn resolve(&self, selector: &str) -> Result<Vec<String>, DecodeError> {
        let selector = normalize_selector(selector)?;

        let primary = self
            .primary
            .lookup(&selector)
            .await
            .map_err(|e| DecodeError::ResolutionFailure {
                selector: selector.clone(),
                reason: e.to_string(),
            })?;
        if !primary.is_empty() {
            debug!(%selector, count = primary.len(), "resolved from primary database");
            return Ok(primary);
        }

        let fallback = self
            .fallback
            .lookup(&selector)
            .await
            .map_err(|e| DecodeError::ResolutionFailure {
                selector: selector.clone(),
                reason: e.to_string(),
            })?;
        debug!(%selector, count = fallback.len(), "resolved from fallback database");
        Ok(fallback)
    }
}
