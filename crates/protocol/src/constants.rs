/// Default chunk width: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

/// Path of the file status endpoint.
pub const FILES_PATH: &str = "/files";

/// Path prefix of the chunk upload endpoint; the whole-file signature follows.
pub const UPLOADS_PATH: &str = "/uploads";

/// Multipart field holding the chunk's own signature.
pub const FIELD_SIGNATURE: &str = "signature";

/// Multipart field holding the zero-based chunk index.
pub const FIELD_POSITION: &str = "position";

/// Multipart field holding the raw chunk bytes.
pub const FIELD_CHUNK: &str = "chunk";

/// Multipart field holding the cumulative byte offset after the chunk.
pub const FIELD_SIZE: &str = "size";

/// File name attached to the chunk part.
///
/// Form parsers only expose a part as an uploaded file when it carries a
/// file name.
pub const CHUNK_FILE_NAME: &str = "blob";

/// Content type of the chunk part.
pub const CHUNK_CONTENT_TYPE: &str = "application/octet-stream";

/// Builds the upload path for a whole-file signature.
pub fn upload_path(file_signature: &str) -> String {
    format!("{UPLOADS_PATH}/{file_signature}")
}
