//! Resume offset discovery.

use chunkup_protocol::{FileMetadata, ProtocolError};
use tracing::info;

use crate::error::{StoreError, UploadError};
use crate::store::RemoteStore;

/// Where the upload pipeline should begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// The store holds every chunk; nothing to send.
    AlreadyStored,
    /// First chunk index the store does not hold.
    StartAt(u64),
}

/// Queries the store once and derives the resume point.
///
/// The start index is the store's `uploaded_chunks` as-is (chunks are
/// zero-based). On any failure no offset is guessed.
pub async fn query_resume_point(
    store: &dyn RemoteStore,
    metadata: &FileMetadata,
) -> Result<ResumePoint, UploadError> {
    let state = store
        .query_progress(metadata)
        .await
        .map_err(UploadError::MetadataQuery)?;

    if state.uploaded_chunks > metadata.chunk_count {
        return Err(UploadError::MetadataQuery(StoreError::Protocol(
            ProtocolError::ChunkCountOutOfRange {
                uploaded: state.uploaded_chunks,
                chunks: metadata.chunk_count,
            },
        )));
    }

    info!(
        signature = %metadata.signature,
        exists = state.exists,
        uploaded_chunks = state.uploaded_chunks,
        chunk_count = metadata.chunk_count,
        "file status received"
    );

    if state.is_complete(metadata.chunk_count) {
        Ok(ResumePoint::AlreadyStored)
    } else {
        Ok(ResumePoint::StartAt(state.uploaded_chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockStore;

    fn metadata() -> FileMetadata {
        FileMetadata {
            size: 25,
            chunk_count: 3,
            signature: "sig".into(),
        }
    }

    #[tokio::test]
    async fn new_file_starts_at_zero() {
        let store = MockStore::new(0);
        let point = query_resume_point(&store, &metadata()).await.unwrap();
        assert_eq!(point, ResumePoint::StartAt(0));
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn partial_file_starts_at_uploaded_count() {
        let store = MockStore::new(2);
        let point = query_resume_point(&store, &metadata()).await.unwrap();
        assert_eq!(point, ResumePoint::StartAt(2));
    }

    #[tokio::test]
    async fn complete_file_is_already_stored() {
        let store = MockStore::new(3);
        let point = query_resume_point(&store, &metadata()).await.unwrap();
        assert_eq!(point, ResumePoint::AlreadyStored);
    }

    #[tokio::test]
    async fn out_of_range_count_rejected() {
        let store = MockStore::new(7);
        let err = query_resume_point(&store, &metadata()).await.unwrap_err();
        assert!(matches!(err, UploadError::MetadataQuery(StoreError::Protocol(_))));
    }

    #[tokio::test]
    async fn query_failure_is_metadata_failure() {
        let store = MockStore::new(0);
        store.fail_queries();
        let err = query_resume_point(&store, &metadata()).await.unwrap_err();
        assert!(matches!(err, UploadError::MetadataQuery(_)));
    }
}
