//! 4byte.directory lookup, queried when Sourcify knows nothing about a
//! selector.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use swiss_knife_calldata_core::{normalize_selector, PortError, SignatureLookupPort};
use tracing::debug;

use crate::cache::{FailureTracker, SelectorCache};
use crate::config::CalldataAdapterConfig;
use crate::http::get_json;

#[derive(Debug, Deserialize)]
struct FourByteResponse {
    #[serde(default)]
    results: Vec<FourByteEntry>,
}

#[derive(Debug, Deserialize)]
struct FourByteEntry {
    id: Option<u64>,
    text_signature: String,
}

#[derive(Debug, Clone)]
pub struct FourByteSignatureLookup {
    client: reqwest::Client,
    url: String,
    cache: Arc<SelectorCache>,
    tracker: Arc<FailureTracker>,
}

impl FourByteSignatureLookup {
    pub fn new(config: &CalldataAdapterConfig) -> Result<Self, PortError> {
        Ok(Self {
            client: config.http_client()?,
            url: config.fallback_lookup_url.clone(),
            cache: Arc::new(SelectorCache::new(config.max_cached_selectors)),
            tracker: Arc::new(FailureTracker::new("4byte", config.max_failed_requests)),
        })
    }

    pub fn is_unavailable(&self) -> bool {
        self.tracker.is_unavailable()
    }

    pub fn reset(&self) {
        self.tracker.reset();
    }
}

// Lowest id (oldest registration) first, entries without an id last.
fn rank_entries(mut entries: Vec<FourByteEntry>) -> Vec<String> {
    entries.sort_by_key(|e| e.id.unwrap_or(u64::MAX));
    entries.into_iter().map(|e| e.text_signature).collect()
}

#[async_trait]
impl SignatureLookupPort for FourByteSignatureLookup {
    async fn lookup(&self, selector: &str) -> Result<Vec<String>, PortError> {
        if self.tracker.is_unavailable() {
            debug!(%selector, "skipping lookup, 4byte marked unavailable");
            return Ok(Vec::new());
        }
        let selector = normalize_selector(selector)
            .map_err(|e| PortError::Validation(e.to_string()))?;

        if let Some(hit) = self.cache.get(&selector) {
            return Ok(hit);
        }

        let url = format!("{}?hex_signature={}", self.url, selector);
        let signatures = get_json::<FourByteResponse>(&self.client, &url, &self.tracker)
            .await?
            .map(|response| rank_entries(response.results))
            .unwrap_or_default();
        debug!(%selector, count = signatures.len(), "fetched signatures");
        self.cache.insert(&selector, signatures.clone());
        Ok(signatures)
    }
}
