/// Errors produced while validating server responses.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("server reports {uploaded} uploaded chunks for a file of {chunks} chunks")]
    ChunkCountOutOfRange { uploaded: u64, chunks: u64 },

    #[error("server reports {uploaded} uploaded chunks for an unregistered file")]
    Inconsistent { uploaded: u64 },

    #[error("signature mismatch: expected {expected}, server computed {actual}")]
    SignatureMismatch { expected: String, actual: String },
}
