//! Wire protocol types for the chunked upload endpoints.
//!
//! The remote store exposes two endpoints:
//!
//! - `POST /files` takes a [`FileMetadata`] JSON body and answers with a
//!   [`FileStatusResponse`], validated into a [`ServerUploadState`].
//! - `PUT /uploads/{signature}` takes one chunk as a multipart form
//!   ([`ChunkFields`] plus the raw bytes) and answers with an [`UploadAck`].

pub mod constants;
pub mod error;
pub mod messages;

pub use error::ProtocolError;
pub use messages::{ChunkFields, FileMetadata, FileStatusResponse, ServerUploadState, UploadAck};
