use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Whole-file metadata registered with `POST /files`.
///
/// Built once after the file has been scanned; immutable for that file
/// selection. `chunk_count == ceil(size / chunk_size)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size: u64,
    #[serde(rename = "chunks")]
    pub chunk_count: u64,
    pub signature: String,
}

/// Raw `POST /files` response body.
///
/// The server answers with one of two shapes: `{exists, uploaded_chunks}`
/// while the file is incomplete, and `{exists, expected_signature,
/// signature, message}` once every chunk has landed and the assembled file
/// was re-hashed. Use [`FileStatusResponse::into_state`] before trusting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatusResponse {
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_chunks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl FileStatusResponse {
    /// Parses a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Validates the response against the metadata it answers.
    pub fn into_state(self, metadata: &FileMetadata) -> Result<ServerUploadState, ProtocolError> {
        if let Some(uploaded) = self.uploaded_chunks {
            if uploaded > metadata.chunk_count {
                return Err(ProtocolError::ChunkCountOutOfRange {
                    uploaded,
                    chunks: metadata.chunk_count,
                });
            }
            if !self.exists && uploaded != 0 {
                return Err(ProtocolError::Inconsistent { uploaded });
            }
            return Ok(ServerUploadState {
                exists: self.exists,
                uploaded_chunks: uploaded,
            });
        }

        // Completed shape: the server re-hashed the assembled file.
        match (self.exists, self.signature) {
            (true, Some(actual)) => {
                let expected = self
                    .expected_signature
                    .unwrap_or_else(|| metadata.signature.clone());
                if actual != expected || expected != metadata.signature {
                    return Err(ProtocolError::SignatureMismatch {
                        expected: metadata.signature.clone(),
                        actual,
                    });
                }
                Ok(ServerUploadState {
                    exists: true,
                    uploaded_chunks: metadata.chunk_count,
                })
            }
            _ => Err(ProtocolError::MissingField("uploaded_chunks")),
        }
    }
}

/// Validated snapshot of how much of a file the remote store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerUploadState {
    pub exists: bool,
    pub uploaded_chunks: u64,
}

impl ServerUploadState {
    /// Returns `true` if every chunk is already stored.
    pub fn is_complete(&self, chunk_count: u64) -> bool {
        self.uploaded_chunks == chunk_count
    }
}

/// Text fields sent alongside the chunk bytes in `PUT /uploads/{signature}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFields {
    /// Signature of this chunk's bytes.
    pub signature: String,
    /// Zero-based chunk index.
    pub position: u64,
    /// Cumulative byte offset after this chunk (the chunk's end).
    pub size: u64,
}

impl ChunkFields {
    /// Returns the text fields in wire order, excluding the chunk part.
    pub fn to_pairs(&self) -> [(&'static str, String); 3] {
        use crate::constants::{FIELD_POSITION, FIELD_SIGNATURE, FIELD_SIZE};
        [
            (FIELD_SIGNATURE, self.signature.clone()),
            (FIELD_POSITION, self.position.to_string()),
            (FIELD_SIZE, self.size.to_string()),
        ]
    }
}

/// Optional acknowledgement body of `PUT /uploads/{signature}`.
///
/// Intermediate chunks carry only a `message`. The final chunk also carries
/// the expected and recomputed whole-file signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl UploadAck {
    /// Parses an acknowledgement body. An empty body is an empty ack.
    pub fn from_slice(body: &[u8]) -> Result<Self, ProtocolError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(body)?)
    }

    /// Fails if the server reports a whole-file signature mismatch.
    pub fn verify(&self) -> Result<(), ProtocolError> {
        if let (Some(expected), Some(actual)) = (&self.expected_signature, &self.signature)
            && expected != actual
        {
            return Err(ProtocolError::SignatureMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> FileMetadata {
        FileMetadata {
            size: 25 * 1024 * 1024,
            chunk_count: 3,
            signature: "abc123".into(),
        }
    }

    #[test]
    fn file_metadata_wire_shape() {
        let json = serde_json::to_value(metadata()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"size": 26214400, "chunks": 3, "signature": "abc123"})
        );
    }

    #[test]
    fn new_file_state() {
        let resp = FileStatusResponse::from_slice(br#"{"exists":false,"uploaded_chunks":0}"#).unwrap();
        let state = resp.into_state(&metadata()).unwrap();
        assert_eq!(
            state,
            ServerUploadState {
                exists: false,
                uploaded_chunks: 0
            }
        );
        assert!(!state.is_complete(3));
    }

    #[test]
    fn partial_file_state() {
        let resp = FileStatusResponse::from_slice(br#"{"exists":true,"uploaded_chunks":2}"#).unwrap();
        let state = resp.into_state(&metadata()).unwrap();
        assert_eq!(state.uploaded_chunks, 2);
        assert!(state.exists);
    }

    #[test]
    fn completed_shape_counts_as_all_chunks() {
        let body = br#"{"exists":true,"expected_signature":"abc123","signature":"abc123","message":"File uploaded successfully"}"#;
        let state = FileStatusResponse::from_slice(body)
            .unwrap()
            .into_state(&metadata())
            .unwrap();
        assert!(state.is_complete(3));
    }

    #[test]
    fn completed_shape_with_bad_signature_rejected() {
        let body = br#"{"exists":true,"expected_signature":"abc123","signature":"ffff","message":"File uploaded with error"}"#;
        let err = FileStatusResponse::from_slice(body)
            .unwrap()
            .into_state(&metadata())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::SignatureMismatch { .. }));
    }

    #[test]
    fn completed_shape_for_other_file_rejected() {
        let body = br#"{"exists":true,"expected_signature":"zzz","signature":"zzz"}"#;
        let err = FileStatusResponse::from_slice(body)
            .unwrap()
            .into_state(&metadata())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::SignatureMismatch { .. }));
    }

    #[test]
    fn missing_uploaded_chunks_rejected() {
        let err = FileStatusResponse::from_slice(br#"{"exists":true}"#)
            .unwrap()
            .into_state(&metadata())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::MissingField("uploaded_chunks")));
    }

    #[test]
    fn uploaded_beyond_chunk_count_rejected() {
        let err = FileStatusResponse::from_slice(br#"{"exists":true,"uploaded_chunks":4}"#)
            .unwrap()
            .into_state(&metadata())
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::ChunkCountOutOfRange {
                uploaded: 4,
                chunks: 3
            }
        ));
    }

    #[test]
    fn progress_on_unregistered_file_rejected() {
        let err = FileStatusResponse::from_slice(br#"{"exists":false,"uploaded_chunks":1}"#)
            .unwrap()
            .into_state(&metadata())
            .unwrap_err();
        assert!(matches!(err, ProtocolError::Inconsistent { uploaded: 1 }));
    }

    #[test]
    fn non_json_status_is_malformed() {
        let err = FileStatusResponse::from_slice(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn missing_exists_is_malformed() {
        let err = FileStatusResponse::from_slice(br#"{"uploaded_chunks": 1}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn wrong_type_is_malformed() {
        let err = FileStatusResponse::from_slice(br#"{"exists":"yes","uploaded_chunks":0}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn chunk_fields_in_wire_order() {
        let fields = ChunkFields {
            signature: "s".into(),
            position: 2,
            size: 26214400,
        };
        let pairs = fields.to_pairs();
        assert_eq!(pairs[0], ("signature", "s".to_string()));
        assert_eq!(pairs[1], ("position", "2".to_string()));
        assert_eq!(pairs[2], ("size", "26214400".to_string()));
    }

    #[test]
    fn empty_ack_is_accepted() {
        let ack = UploadAck::from_slice(b"").unwrap();
        assert_eq!(ack, UploadAck::default());
        ack.verify().unwrap();
    }

    #[test]
    fn intermediate_ack() {
        let ack = UploadAck::from_slice(br#"{"message":"Chunk uploaded successfully"}"#).unwrap();
        assert_eq!(ack.message.as_deref(), Some("Chunk uploaded successfully"));
        ack.verify().unwrap();
    }

    #[test]
    fn final_ack_mismatch_fails_verification() {
        let ack = UploadAck::from_slice(
            br#"{"message":"File uploaded with error","expected_signature":"a","signature":"b"}"#,
        )
        .unwrap();
        assert!(matches!(
            ack.verify(),
            Err(ProtocolError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn non_json_ack_is_malformed() {
        assert!(matches!(
            UploadAck::from_slice(b"ok"),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
