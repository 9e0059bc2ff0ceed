//! Filesystem store for firmware artifacts.
//!
//! A flat directory keyed by file name. Writes land in a temporary file in
//! the same directory, are synced, then renamed over the final name so a
//! reader never observes a partially written artifact.

use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::hashing::sha256_hex;

/// Durable placement of firmware binaries, decoupled from catalog metadata.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// SHA-256 hex digest of the artifact bytes.
    pub fn compute_digest(data: &[u8]) -> String {
        sha256_hex(data)
    }

    /// Write `data` under `filename`, replacing any existing file.
    ///
    /// Errors propagate; on failure no temporary file is left behind and an
    /// existing file under `filename` is untouched.
    pub async fn store(&self, filename: &str, data: &[u8]) -> io::Result<()> {
        let target = self.path_for(filename)?;
        fs::create_dir_all(&self.root).await?;

        let staging = self
            .root
            .join(format!(".{filename}.{}.partial", uuid::Uuid::new_v4()));

        if let Err(e) = write_synced(&staging, data).await {
            discard(&staging).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&staging, &target).await {
            discard(&staging).await;
            return Err(e);
        }

        tracing::debug!(filename, size = data.len(), "Stored firmware artifact");
        Ok(())
    }

    /// Path of a stored artifact, or `None` when no regular file exists.
    ///
    /// A catalog row does not imply the file is readable: disk and database
    /// can diverge.
    pub async fn resolve_path(&self, filename: &str) -> Option<PathBuf> {
        let path = self.path_for(filename).ok()?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Length in bytes of a stored artifact, or `None` when it is missing.
    pub async fn file_len(&self, filename: &str) -> Option<u64> {
        let path = self.path_for(filename).ok()?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            _ => None,
        }
    }

    /// Remove a stored artifact. Removing a missing file succeeds.
    pub async fn remove(&self, filename: &str) -> io::Result<()> {
        let path = self.path_for(filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Join `filename` onto the root, accepting only a single normal path
    /// component.
    fn path_for(&self, filename: &str) -> io::Result<PathBuf> {
        let mut components = Path::new(filename).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) if name == filename => {
                Ok(self.root.join(filename))
            }
            _ => Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("invalid artifact file name '{filename}'"),
            )),
        }
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove staging file");
        }
    }
}
