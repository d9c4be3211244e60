/// Watch target resolution: turn the user-supplied target into a canonical
/// path and decide which directory to monitor for it.
use crate::error::SetupError;
use std::path::{Path, PathBuf};

/// A resolved, canonical filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// Watched as-is.
    Directory(PathBuf),
    /// Its parent directory is watched; only events naming the file matter.
    File(PathBuf),
}

impl WatchTarget {
    /// Resolve `raw` as a path on disk, falling back to a lookup on the
    /// executable search path.
    pub fn resolve(raw: &str) -> Result<Self, SetupError> {
        let candidate = Path::new(raw);
        let found = if candidate.exists() {
            candidate.to_path_buf()
        } else {
            let looked_up = which::which(raw).map_err(|_| SetupError::TargetNotFound {
                target: raw.to_string(),
            })?;
            tracing::debug!(
                requested = raw,
                found = %looked_up.display(),
                "target found on search path"
            );
            looked_up
        };
        Self::from_existing(&found)
    }

    fn from_existing(path: &Path) -> Result<Self, SetupError> {
        let unreadable = |e: std::io::Error| SetupError::TargetUnreadable {
            path: path.to_path_buf(),
            source: e,
        };
        let canonical = path.canonicalize().map_err(unreadable)?;
        let meta = std::fs::metadata(&canonical).map_err(unreadable)?;
        if meta.is_dir() {
            Ok(WatchTarget::Directory(canonical))
        } else {
            Ok(WatchTarget::File(canonical))
        }
    }

    /// The resolved target itself.
    pub fn path(&self) -> &Path {
        match self {
            WatchTarget::Directory(p) | WatchTarget::File(p) => p,
        }
    }

    /// The directory handed to the change source.
    pub fn watch_root(&self) -> &Path {
        match self {
            WatchTarget::Directory(p) => p,
            // A canonical file path always has a parent.
            WatchTarget::File(p) => p.parent().unwrap_or(p),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, WatchTarget::File(_))
    }
}
