//! Resumable, content-addressed chunked upload client.
//!
//! This crate implements the **upload engine** behind a file picker UI. It
//! has no UI dependencies: the host drives an [`UploadClient`] and renders
//! its [`SessionSnapshot`] and [`UploadEvent`]s.
//!
//! # Phases
//!
//! 1. **Prepare**: plan chunks and stream the file through one hash to
//!    build its [`FileMetadata`]
//! 2. **Resume**: ask the remote store how many chunks it already holds
//! 3. **Upload**: send the remaining chunks strictly in order, one request
//!    per chunk, each with its own signature
//!
//! A failed upload is retried by calling [`UploadClient::submit`] again,
//! which re-queries the store and resumes from its reported offset.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod resume;
pub mod retry;
pub mod session;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export primary types for convenience.
pub use chunkup_protocol::{FileMetadata, ServerUploadState};
pub use client::UploadClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{StoreError, UploadError};
pub use http::HttpStore;
pub use pipeline::{PipelineState, UploadPipeline};
pub use resume::{ResumePoint, query_resume_point};
pub use retry::RetryPolicy;
pub use session::{Phase, SessionSnapshot};
pub use store::{ChunkUpload, RemoteStore};
pub use types::{ChunkProgress, UploadEvent, UploadOutcome};
