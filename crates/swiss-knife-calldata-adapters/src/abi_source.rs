use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use swiss_knife_calldata_core::{AbiSourcePort, PortError};
use tracing::debug;

use crate::cache::FailureTracker;
use crate::config::CalldataAdapterConfig;
use crate::http::get_json;

#[derive(Debug, Deserialize)]
struct ContractResponse {
    abi: Option<JsonAbi>,
}

/// Verified contract ABIs from a Sourcify server (`/v2/contract`).
#[derive(Debug, Clone)]
pub struct SourcifyAbiSource {
    client: reqwest::Client,
    base_url: String,
    tracker: Arc<FailureTracker>,
}

impl SourcifyAbiSource {
    pub fn new(config: &CalldataAdapterConfig) -> Result<Self, PortError> {
        Ok(Self {
            client: config.http_client()?,
            base_url: config.sourcify_base_url.trim_end_matches('/').to_owned(),
            tracker: Arc::new(FailureTracker::new(
                "sourcify-abi",
                config.max_failed_requests,
            )),
        })
    }

    pub fn contract_url(&self, address: Address, chain_id: u64) -> String {
        format!(
            "{}/v2/contract/{chain_id}/{}?fields=abi",
            self.base_url,
            address.to_checksum(None)
        )
    }
}

#[async_trait]
impl AbiSourcePort for SourcifyAbiSource {
    async fn fetch_abi(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<Option<JsonAbi>, PortError> {
        if self.tracker.is_unavailable() {
            debug!(%address, chain_id, "skipping abi fetch, sourcify marked unavailable");
            return Ok(None);
        }
        let url = self.contract_url(address, chain_id);
        let response = get_json::<ContractResponse>(&self.client, &url, &self.tracker).await?;
        Ok(response.and_then(|r| r.abi))
    }
}
