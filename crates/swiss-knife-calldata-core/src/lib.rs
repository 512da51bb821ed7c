pub mod abi_decoder;
pub mod booleans;
pub mod domain;
pub mod encoder;
pub mod error;
pub mod guess;
pub mod multisend;
pub mod ports;
pub mod recursive;
pub mod selector;

pub use abi_decoder::Layout;
pub use booleans::{convert_booleans, convert_booleans_for_inputs};
pub use domain::{
    Arg, ArgValue, DecodeRecursiveResult, DecodeSource, MultiSendTransaction, UnparsedCalldata,
    GUESSED_FUNCTION_NAME,
};
pub use encoder::{
    encode_constructor, encode_decoded, encode_function_call, encode_packed, encode_parameters,
    encode_type_list, FunctionSource,
};
pub use error::{DecodeError, EncodeError};
pub use multisend::{decode_multisend, encode_multisend, encode_multisend_call, MULTISEND_SELECTOR};
pub use ports::{AbiSourcePort, NoopLookup, PortError, SignatureLookupPort};
pub use recursive::CalldataDecoder;
pub use selector::{normalize_selector, selector_for, SelectorResolver};
