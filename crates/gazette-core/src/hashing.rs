//! Streaming content fingerprints for page images.
//!
//! Local scans and remote catalog entries are matched purely by content
//! hash, so both sides must be hashed the same way: streamed SHA-256,
//! lowercase hex. A zero-byte file hashes to [`EMPTY_SHA256`], which the
//! reconciliation layer treats as a validity error rather than a match.

use crate::error::{GazetteError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Chunk size for reading files (8MB).
const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// File size above which a progress line is logged before hashing.
const LARGE_FILE_BYTES: u64 = 64 * 1024 * 1024;

/// SHA-256 of the empty byte stream.
///
/// A local or remote page that hashes to this value is a broken zero-length
/// scan, never a legitimate duplicate of another zero-length page.
pub const EMPTY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Returns true if `fingerprint` is the empty-content sentinel.
pub fn is_empty_hash(fingerprint: &str) -> bool {
    fingerprint == EMPTY_SHA256
}

/// Hash an in-memory buffer (a fetched remote payload).
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Compute the streamed SHA-256 of a local file.
///
/// A missing file is reported as [`GazetteError::FileNotFound`], which is
/// distinct from the empty-content sentinel: "no file" means the page is
/// absent, while the sentinel means the page exists but is zero bytes.
pub fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(GazetteError::FileNotFound(path.to_path_buf()));
    }

    let mut file = std::fs::File::open(path).map_err(|e| GazetteError::io_with_path(e, path))?;

    let total_bytes = file
        .metadata()
        .map_err(|e| GazetteError::io_with_path(e, path))?
        .len();
    if total_bytes >= LARGE_FILE_BYTES {
        debug!("Hashing large file ({} bytes): {}", total_bytes, path.display());
    }

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| GazetteError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash a file on the blocking pool.
///
/// The audit walk is async because of the catalog fetches; file hashing is
/// blocking I/O and runs via `spawn_blocking`.
pub async fn hash_file_async(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || hash_file(&path))
        .await
        .map_err(|e| GazetteError::Other(format!("Hash task failed: {}", e)))?
}
