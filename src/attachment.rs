//! Attachment lookup on the local file system.
//!
//! Messages only carry bare attachment names. [`AttachmentResolver`] maps a
//! name to a file inside one configured directory, reporting metadata for
//! message pages and resolving paths for downloads. Names are sanitised before
//! any file-system access and resolved paths must stay inside the root.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use humansize::{format_size, BINARY};
use lru::LruCache;
use tracing::{debug, warn};

use crate::error::{ChatError, Result};
use crate::model::attachment::{AttachmentInfo, AttachmentKind};

/// Default number of metadata lookups to remember.
pub const DEFAULT_CACHE_SIZE: usize = 4096;

const NO_DIRECTORY: &str = "No attachment directory";
const NOT_FOUND: &str = "File not found";

/// Resolves attachment names against an optional root directory.
pub struct AttachmentResolver {
    root: Option<PathBuf>,
    cache: Mutex<LruCache<String, AttachmentInfo>>,
}

impl AttachmentResolver {
    /// Create a resolver. `root = None` disables attachments: every lookup
    /// reports `exists = false`.
    pub fn new(root: Option<PathBuf>, cache_size: usize) -> Self {
        if let Some(dir) = &root {
            if !dir.is_dir() {
                warn!(path = %dir.display(), "Attachment directory does not exist");
            }
        }
        let cap = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            root,
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Metadata for one attachment name. Never fails: problems degrade to
    /// `exists = false` with a short reason in `size`.
    pub fn describe(&self, name: &str) -> AttachmentInfo {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(info) = cache.get(name) {
            return info.clone();
        }
        let info = self.probe(name);
        cache.put(name.to_string(), info.clone());
        info
    }

    /// Metadata for every name, in order.
    pub fn describe_all(&self, names: &[String]) -> Vec<AttachmentInfo> {
        names.iter().map(|n| self.describe(n)).collect()
    }

    /// Drop all cached metadata (after the directory contents changed).
    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Resolve `name` to a readable file inside the root.
    ///
    /// Fails with `InvalidAttachmentName` for names that could escape the
    /// root, `AttachmentsDisabled` without a root and `AttachmentNotFound`
    /// when no such file exists.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let name = sanitize_name(name)?;
        let root = self.root.as_ref().ok_or(ChatError::AttachmentsDisabled)?;

        let candidate = root.join(name);
        let resolved = match candidate.canonicalize() {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChatError::AttachmentNotFound(name.to_string()));
            }
            Err(e) => return Err(ChatError::io(&candidate, e)),
        };
        let root = root.canonicalize().map_err(|e| ChatError::io(root, e))?;

        // Symlinks may still point elsewhere.
        if !resolved.starts_with(&root) {
            warn!(name, resolved = %resolved.display(), "Attachment escapes root");
            return Err(ChatError::InvalidAttachmentName(name.to_string()));
        }
        if !resolved.is_file() {
            return Err(ChatError::AttachmentNotFound(name.to_string()));
        }
        Ok(resolved)
    }

    fn probe(&self, name: &str) -> AttachmentInfo {
        let kind = AttachmentKind::from_name(name);
        let unavailable = |reason: &str| AttachmentInfo {
            name: name.to_string(),
            kind,
            exists: false,
            size: reason.to_string(),
        };

        if self.root.is_none() {
            return unavailable(NO_DIRECTORY);
        }
        let path = match self.resolve(name) {
            Ok(p) => p,
            Err(e) => {
                debug!(name, error = %e, "Attachment unavailable");
                return unavailable(NOT_FOUND);
            }
        };
        match std::fs::metadata(&path) {
            Ok(meta) => AttachmentInfo {
                name: name.to_string(),
                kind,
                exists: true,
                size: format_size(meta.len(), BINARY),
            },
            Err(_) => unavailable(NOT_FOUND),
        }
    }
}

/// Reject names that are empty, relative-path components or contain
/// separators or NUL. Surrounding whitespace is trimmed.
pub fn sanitize_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    let bad = trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\', '\0'])
        || Path::new(trimmed).is_absolute();
    if bad {
        return Err(ChatError::InvalidAttachmentName(name.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, AttachmentResolver) {
        let dir = tempfile::tempdir().unwrap();
        for (name, data) in files {
            std::fs::write(dir.path().join(name), data).unwrap();
        }
        let resolver = AttachmentResolver::new(Some(dir.path().to_path_buf()), 16);
        (dir, resolver)
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        for bad in ["", "  ", ".", "..", "../etc/passwd", "a/b.jpg", "a\\b.jpg", "x\0y"] {
            assert!(sanitize_name(bad).is_err(), "{bad:?} should be rejected");
        }
        assert_eq!(sanitize_name(" foto.jpg ").unwrap(), "foto.jpg");
        assert_eq!(sanitize_name("..foto.jpg").unwrap(), "..foto.jpg");
    }

    #[test]
    fn test_describe_existing_file() {
        let (_dir, resolver) = resolver_with(&[("foto.jpg", &[0u8; 2048])]);
        let info = resolver.describe("foto.jpg");
        assert!(info.exists);
        assert_eq!(info.kind, AttachmentKind::Image);
        assert!(info.size.contains("KiB"), "size was {}", info.size);
    }

    #[test]
    fn test_describe_missing_file() {
        let (_dir, resolver) = resolver_with(&[]);
        let info = resolver.describe("nota.opus");
        assert!(!info.exists);
        assert_eq!(info.kind, AttachmentKind::Audio);
        assert_eq!(info.size, NOT_FOUND);
    }

    #[test]
    fn test_describe_without_root() {
        let resolver = AttachmentResolver::new(None, 16);
        let info = resolver.describe("foto.jpg");
        assert!(!info.exists);
        assert_eq!(info.size, NO_DIRECTORY);
        assert!(matches!(
            resolver.resolve("foto.jpg"),
            Err(ChatError::AttachmentsDisabled)
        ));
    }

    #[test]
    fn test_resolve_errors() {
        let (_dir, resolver) = resolver_with(&[("doc.pdf", b"%PDF")]);
        assert!(resolver.resolve("doc.pdf").is_ok());
        assert!(matches!(
            resolver.resolve("../doc.pdf"),
            Err(ChatError::InvalidAttachmentName(_))
        ));
        assert!(matches!(
            resolver.resolve("absent.pdf"),
            Err(ChatError::AttachmentNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_outside_root_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secret.txt");
        std::fs::write(&secret, "x").unwrap();
        let (dir, resolver) = resolver_with(&[]);
        std::os::unix::fs::symlink(&secret, dir.path().join("link.txt")).unwrap();
        assert!(matches!(
            resolver.resolve("link.txt"),
            Err(ChatError::InvalidAttachmentName(_))
        ));
    }

    #[test]
    fn test_describe_is_cached_until_cleared() {
        let (dir, resolver) = resolver_with(&[]);
        assert!(!resolver.describe("late.png").exists);
        std::fs::write(dir.path().join("late.png"), b"png").unwrap();
        assert!(!resolver.describe("late.png").exists);
        resolver.clear_cache();
        assert!(resolver.describe("late.png").exists);
    }
}
