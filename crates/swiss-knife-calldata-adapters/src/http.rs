use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use swiss_knife_calldata_core::PortError;
use tracing::debug;

use crate::cache::{is_connectivity_error, FailureTracker};

/// GET `url` and parse the JSON body. `Ok(None)` on 404.
pub(crate) async fn get_json<T>(
    client: &reqwest::Client,
    url: &str,
    tracker: &FailureTracker,
) -> Result<Option<T>, PortError>
where
    T: DeserializeOwned,
{
    debug!(%url, "fetching");
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            if is_connectivity_error(&e) {
                tracker.on_failure(&e.to_string());
            }
            return Err(PortError::Transport(e.to_string()));
        }
    };

    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        tracker.on_success();
        return Ok(None);
    }
    if status.is_server_error() {
        tracker.on_failure(&status.to_string());
        return Err(PortError::Transport(format!("server error {status}")));
    }
    if !status.is_success() {
        return Err(PortError::Validation(format!("unexpected status {status}")));
    }

    let body = response
        .json::<T>()
        .await
        .map_err(|e| PortError::Validation(format!("invalid response body: {e}")))?;
    tracker.on_success();
    Ok(Some(body))
}
