use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::TransferError;

/// Content signature algorithm.
///
/// `Md5` (128-bit) matches the reference store, which re-hashes assembled
/// files with MD5 and compares hex digests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl SignatureAlgorithm {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Length of a hex-encoded signature.
    pub const fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }
}

enum HashState {
    Md5(Md5),
    Sha256(Sha256),
}

/// Incremental signature over an ordered sequence of byte buffers.
///
/// Buffers must be appended in file order, each exactly once. The result is
/// a lowercase hex digest.
pub struct HashStream {
    state: HashState,
    appended: u64,
}

impl HashStream {
    /// Starts a new stream.
    pub fn begin(algorithm: SignatureAlgorithm) -> Self {
        let state = match algorithm {
            SignatureAlgorithm::Md5 => HashState::Md5(Md5::new()),
            SignatureAlgorithm::Sha256 => HashState::Sha256(Sha256::new()),
        };
        Self { state, appended: 0 }
    }

    /// Feeds the next buffer.
    pub fn append(&mut self, bytes: &[u8]) {
        match &mut self.state {
            HashState::Md5(h) => h.update(bytes),
            HashState::Sha256(h) => h.update(bytes),
        }
        self.appended += bytes.len() as u64;
    }

    /// Total bytes fed so far.
    pub fn bytes_appended(&self) -> u64 {
        self.appended
    }

    /// Finalizes the stream and returns the hex digest.
    pub fn finish(self) -> String {
        match self.state {
            HashState::Md5(h) => hex::encode(h.finalize()),
            HashState::Sha256(h) => hex::encode(h.finalize()),
        }
    }

    /// Finalizes the stream, failing unless exactly `expected` bytes were fed.
    pub fn finish_covering(self, expected: u64) -> Result<String, TransferError> {
        if self.appended != expected {
            return Err(TransferError::HashIncomplete {
                expected,
                hashed: self.appended,
            });
        }
        Ok(self.finish())
    }
}

/// Signature of a single buffer, computed with a fresh stream.
pub fn signature_of(algorithm: SignatureAlgorithm, data: &[u8]) -> String {
    let mut stream = HashStream::begin(algorithm);
    stream.append(data);
    stream.finish()
}
