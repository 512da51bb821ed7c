use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid calldata: {0}")]
    InvalidCalldata(String),
    #[error("invalid selector '{0}': expected 4 bytes of hex")]
    InvalidSelector(String),
    #[error("invalid signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },
    #[error("could not resolve selector {selector}: {reason}")]
    ResolutionFailure { selector: String, reason: String },
    #[error("calldata does not match '{signature}': {reason}")]
    DecodeMismatch { signature: String, reason: String },
    #[error("none of {tried} candidate signatures for {selector} decode the calldata")]
    NoMatchingCandidate { selector: String, tried: usize },
    #[error("malformed MultiSend batch: {0}")]
    MalformedNestedBatch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("invalid signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },
    #[error("unsupported type '{ty}': {reason}")]
    UnsupportedType { ty: String, reason: String },
    #[error("argument count mismatch: expected {expected}, got {got}")]
    ArgumentCount { expected: usize, got: usize },
    #[error("value for '{name}' does not match type '{ty}': {reason}")]
    EncodingTypeMismatch {
        name: String,
        ty: String,
        reason: String,
    },
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),
    #[error("abi encoding failed: {0}")]
    Abi(String),
}
