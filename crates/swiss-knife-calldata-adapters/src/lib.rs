pub mod abi_source;
mod cache;
pub mod config;
pub mod fourbyte;
mod http;
pub mod sourcify;

pub use abi_source::SourcifyAbiSource;
pub use cache::{FailureTracker, SelectorCache};
pub use config::CalldataAdapterConfig;
pub use fourbyte::FourByteSignatureLookup;
pub use sourcify::SourcifySignatureLookup;

use swiss_knife_calldata_core::{PortError, SelectorResolver};

pub type HttpSelectorResolver = SelectorResolver<SourcifySignatureLookup, FourByteSignatureLookup>;

/// Sourcify first, 4byte.directory as fallback.
pub fn http_resolver(config: &CalldataAdapterConfig) -> Result<HttpSelectorResolver, PortError> {
    Ok(SelectorResolver::new(
        SourcifySignatureLookup::new(config)?,
        FourByteSignatureLookup::new(config)?,
    ))
}
