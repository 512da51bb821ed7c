use std::time::Duration;

use swiss_knife_calldata_core::PortError;
use tracing::warn;

pub const ENV_SIGNATURE_URL: &str = "SWISS_KNIFE_SIGNATURE_URL";
pub const ENV_FALLBACK_SIGNATURE_URL: &str = "SWISS_KNIFE_FALLBACK_SIGNATURE_URL";
pub const ENV_SOURCIFY_URL: &str = "SWISS_KNIFE_SOURCIFY_URL";
pub const ENV_HTTP_TIMEOUT_MS: &str = "SWISS_KNIFE_HTTP_TIMEOUT_MS";
pub const ENV_MAX_FAILED_REQUESTS: &str = "SWISS_KNIFE_MAX_FAILED_REQUESTS";
pub const ENV_MAX_CACHED_SELECTORS: &str = "SWISS_KNIFE_MAX_CACHED_SELECTORS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalldataAdapterConfig {
    /// Sourcify signature database lookup endpoint.
    pub signature_lookup_url: String,
    /// 4byte.directory signatures endpoint, queried when the primary has no
    /// entry.
    pub fallback_lookup_url: String,
    /// Sourcify server base URL for verified contract ABIs.
    pub sourcify_base_url: String,
    pub http_timeout_ms: u64,
    /// Consecutive connectivity failures before an adapter stops calling out.
    pub max_failed_requests: usize,
    pub max_cached_selectors: usize,
}

impl Default for CalldataAdapterConfig {
    fn default() -> Self {
        Self {
            signature_lookup_url: "https://api.4byte.sourcify.dev/signature-database/v1/lookup"
                .to_owned(),
            fallback_lookup_url: "https://www.4byte.directory/api/v1/signatures/".to_owned(),
            sourcify_base_url: "https://sourcify.dev/server".to_owned(),
            http_timeout_ms: 15_000,
            max_failed_requests: 3,
            max_cached_selectors: 1_000,
        }
    }
}

impl CalldataAdapterConfig {
    /// Defaults overridden by `SWISS_KNIFE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(url) = get(ENV_SIGNATURE_URL) {
            cfg.signature_lookup_url = url;
        }
        if let Some(url) = get(ENV_FALLBACK_SIGNATURE_URL) {
            cfg.fallback_lookup_url = url;
        }
        if let Some(url) = get(ENV_SOURCIFY_URL) {
            cfg.sourcify_base_url = url;
        }
        if let Some(ms) = parse_var(&get, ENV_HTTP_TIMEOUT_MS) {
            cfg.http_timeout_ms = ms;
        }
        if let Some(n) = parse_var(&get, ENV_MAX_FAILED_REQUESTS) {
            cfg.max_failed_requests = n;
        }
        if let Some(n) = parse_var(&get, ENV_MAX_CACHED_SELECTORS) {
            cfg.max_cached_selectors = n;
        }
        cfg
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn http_client(&self) -> Result<reqwest::Client, PortError> {
        reqwest::Client::builder()
            .timeout(self.http_timeout())
            .build()
            .map_err(|e| PortError::Transport(format!("http client init failed: {e}")))
    }
}

fn parse_var<F, T>(get: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}
