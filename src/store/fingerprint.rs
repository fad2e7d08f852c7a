//! Cheap change detection for the chat export on disk.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{ChatError, Result};

/// Number of leading bytes hashed.
const HASH_PREFIX_LEN: usize = 4096;

/// Size, modification time and a hash of the first 4 KiB of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFingerprint {
    pub size: u64,
    /// Seconds since the Unix epoch (0 when the platform cannot tell).
    pub modified: i64,
    pub sha256_head: [u8; 32],
}

impl SourceFingerprint {
    /// Fingerprint the file at `path`.
    pub fn capture(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChatError::FileNotFound(path.to_path_buf())
            } else {
                ChatError::io(path, e)
            }
        })?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Ok(Self {
            size: meta.len(),
            modified,
            sha256_head: sha256_first_n(path, HASH_PREFIX_LEN)?,
        })
    }

    /// Whether the file at `path` still has this fingerprint.
    pub fn matches(&self, path: &Path) -> Result<bool> {
        let current = Self::capture(path)?;
        if current.size != self.size {
            debug!("Source size changed");
            return Ok(false);
        }
        if current.modified != self.modified {
            debug!("Source modification time changed");
            return Ok(false);
        }
        if current.sha256_head != self.sha256_head {
            debug!("Source content hash changed");
            return Ok(false);
        }
        Ok(true)
    }
}

fn sha256_first_n(path: &Path, n: usize) -> Result<[u8; 32]> {
    let file = File::open(path).map_err(|e| ChatError::io(path, e))?;
    let mut buf = Vec::with_capacity(n);
    file.take(n as u64)
        .read_to_end(&mut buf)
        .map_err(|e| ChatError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&buf);
    Ok(hasher.finalize().into())
}
