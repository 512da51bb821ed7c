//! Sourcify signature database lookup with caching.
//!
//! https://docs.sourcify.dev/docs/api/#/Signature%20Database/get_signature_database_v1_lookup

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use swiss_knife_calldata_core::{normalize_selector, PortError, SignatureLookupPort};
use tracing::debug;

use crate::cache::{FailureTracker, SelectorCache};
use crate::config::CalldataAdapterConfig;
use crate::http::get_json;

#[derive(Debug, Deserialize)]
struct SourcifyResponse {
    ok: bool,
    result: SourcifyResult,
}

#[derive(Debug, Deserialize)]
struct SourcifyResult {
    #[serde(default)]
    function: HashMap<String, Option<Vec<SignatureEntry>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureEntry {
    name: String,
    #[serde(default)]
    filtered: bool,
    has_verified_contract: Option<bool>,
}

/// Primary signature database.
#[derive(Debug, Clone)]
pub struct SourcifySignatureLookup {
    client: reqwest::Client,
    url: String,
    cache: Arc<SelectorCache>,
    tracker: Arc<FailureTracker>,
}

impl SourcifySignatureLookup {
    pub fn new(config: &CalldataAdapterConfig) -> Result<Self, PortError> {
        Ok(Self {
            client: config.http_client()?,
            url: config.signature_lookup_url.clone(),
            cache: Arc::new(SelectorCache::new(config.max_cached_selectors)),
            tracker: Arc::new(FailureTracker::new("sourcify", config.max_failed_requests)),
        })
    }

    pub fn is_unavailable(&self) -> bool {
        self.tracker.is_unavailable()
    }

    /// Clear the unavailable flag, e.g. before a manual retry.
    pub fn reset(&self) {
        self.tracker.reset();
    }

    pub fn is_cached(&self, selector: &str) -> bool {
        normalize_selector(selector)
            .map(|s| self.cache.contains(&s))
            .unwrap_or(false)
    }

    async fn fetch(&self, selector: &str) -> Result<Vec<String>, PortError> {
        let url = format!("{}?function={}&filter=true", self.url, selector);
        let Some(response) = get_json::<SourcifyResponse>(&self.client, &url, &self.tracker).await?
        else {
            return Ok(Vec::new());
        };
        if !response.ok {
            return Err(PortError::Validation(
                "signature database returned ok=false".to_owned(),
            ));
        }

        let entries = response
            .result
            .function
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(selector))
            .and_then(|(_, entries)| entries)
            .unwrap_or_default();
        Ok(rank_entries(entries))
    }
}

/// Drop filtered entries unless nothing else is left, verified contracts
/// first, otherwise keep the service's order.
fn rank_entries(entries: Vec<SignatureEntry>) -> Vec<String> {
    let all_filtered = entries.iter().all(|e| e.filtered);
    let mut kept: Vec<SignatureEntry> = entries
        .into_iter()
        .filter(|e| all_filtered || !e.filtered)
        .collect();
    kept.sort_by_key(|e| !e.has_verified_contract.unwrap_or(false));
    kept.into_iter().map(|e| e.name).collect()
}

#[async_trait]
impl SignatureLookupPort for SourcifySignatureLookup {
    async fn lookup(&self, selector: &str) -> Result<Vec<String>, PortError> {
        if self.tracker.is_unavailable() {
            debug!(%selector, "skipping lookup, sourcify marked unavailable");
            return Ok(Vec::new());
        }
        let selector = normalize_selector(selector)
            .map_err(|e| PortError::Validation(e.to_string()))?;

        if let Some(hit) = self.cache.get(&selector) {
            debug!(%selector, count = hit.len(), "cache hit");
            return Ok(hit);
        }

        let signatures = self.fetch(&selector).await?;
        debug!(%selector, count = signatures.len(), "fetched signatures");
        self.cache.insert(&selector, signatures.clone());
        Ok(signatures)
    }
}
