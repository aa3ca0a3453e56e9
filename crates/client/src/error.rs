//! Upload error types.

use chunkup_protocol::ProtocolError;
use chunkup_transfer::TransferError;

use crate::config::ConfigError;
use crate::session::Phase;

/// Errors produced by a [`RemoteStore`](crate::store::RemoteStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response: {0}")]
    Protocol(#[from] ProtocolError),
}

impl StoreError {
    /// Returns `true` if repeating the same request may succeed.
    ///
    /// Transport failures (including timeouts), 408, 429 and 5xx are
    /// transient. Other statuses and invalid responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => !e.is_builder() && !e.is_decode(),
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
            Self::Protocol(_) => false,
        }
    }
}

/// Errors surfaced by the upload client.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no file selected")]
    NoFileSelected,

    #[error("file is empty")]
    EmptyFile,

    #[error("session busy ({0:?})")]
    Busy(Phase),

    #[error("session not ready to submit ({0:?})")]
    NotReady(Phase),

    #[error("read failed: {0}")]
    Read(#[source] TransferError),

    #[error("hash failed: {0}")]
    Hash(#[source] TransferError),

    #[error("file status query failed: {0}")]
    MetadataQuery(#[source] StoreError),

    #[error("chunk {index} failed after {attempts} attempt(s): {source}")]
    ChunkTransmission {
        index: u64,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<TransferError> for UploadError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::HashIncomplete { .. } => Self::Hash(e),
            TransferError::EmptyFile => Self::EmptyFile,
            other => Self::Read(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transience() {
        let status = |status| StoreError::Status {
            status,
            body: String::new(),
        };
        assert!(status(500).is_transient());
        assert!(status(503).is_transient());
        assert!(status(429).is_transient());
        assert!(status(408).is_transient());
        assert!(!status(400).is_transient());
        assert!(!status(404).is_transient());
    }

    #[test]
    fn protocol_errors_are_not_transient() {
        let err = StoreError::Protocol(ProtocolError::MissingField("uploaded_chunks"));
        assert!(!err.is_transient());
    }

    #[test]
    fn transfer_errors_map_to_taxonomy() {
        let hash: UploadError = TransferError::HashIncomplete {
            expected: 2,
            hashed: 1,
        }
        .into();
        assert!(matches!(hash, UploadError::Hash(_)));

        let empty: UploadError = TransferError::EmptyFile.into();
        assert!(matches!(empty, UploadError::EmptyFile));

        let read: UploadError = TransferError::Read {
            index: 3,
            source: std::io::ErrorKind::UnexpectedEof.into(),
        }
        .into();
        assert!(matches!(read, UploadError::Read(_)));
    }

    #[test]
    fn chunk_error_message_names_index() {
        let err = UploadError::ChunkTransmission {
            index: 4,
            attempts: 2,
            source: StoreError::Status {
                status: 503,
                body: "Service Unavailable".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "chunk 4 failed after 2 attempt(s): server error 503: Service Unavailable"
        );
    }
}
