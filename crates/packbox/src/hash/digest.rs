//! Streaming SHA-1 digests of local files
//!
//! The same digest serves as the Modrinth lookup key and as the integrity
//! check the installer runs before deciding to skip a download.

use std::path::Path;

use sha1::{Digest, Sha1};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::core::{FileOperation, PackboxError, Result};

const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Computes lowercase-hex SHA-1 digests over fixed-size read chunks
#[derive(Debug, Clone)]
pub struct ContentHasher {
    chunk_size: usize,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl ContentHasher {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Digest a file without loading it into memory
    pub async fn digest_file<P: AsRef<Path>>(&self, path: P) -> Result<String> {
        let path = path.as_ref();
        let mut file = fs::File::open(path)
            .await
            .map_err(|e| PackboxError::fs(path, FileOperation::Read, e))?;

        let mut hasher = Sha1::new();
        let mut buffer = vec![0u8; self.chunk_size];
        let mut total = 0u64;

        loop {
            let bytes_read = file
                .read(&mut buffer)
                .await
                .map_err(|e| PackboxError::fs(path, FileOperation::Read, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
            total += bytes_read as u64;
        }

        let digest = hex::encode(hasher.finalize());
        debug!("SHA-1 of {} ({} bytes): {}", path.display(), total, digest);
        Ok(digest)
    }

    /// Whether the file on disk still has the recorded digest
    ///
    /// Errors mean "cannot verify"; callers decide whether that forces a re-download.
    pub async fn matches<P: AsRef<Path>>(&self, path: P, expected: &str) -> Result<bool> {
        let actual = self.digest_file(path).await?;
        Ok(actual.eq_ignore_ascii_case(expected))
    }
}

/// Digest an in-memory buffer
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}
