//! Download root configuration and guarded file access.
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{self, PathBuf};
use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::domain::{self, ResolveError, ResolvedPath};

/// Errors raised while configuring the download root.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("download root cannot be empty")]
    EmptyRoot,
    #[error("resolve download root {path}: {source}")]
    Resolve {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Failures while locating, opening, or copying a download.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download root is not configured")]
    RootNotConfigured,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("stat file: {0}")]
    Stat(#[source] io::Error),
    #[error("not a regular file")]
    NotRegularFile,
    #[error("open file: {0}")]
    Open(#[source] io::Error),
    #[error("copy file: {0}")]
    Copy(#[source] io::Error),
}

/// Shared handle to the directory downloads must stay inside.
///
/// Constructed once at start-up and passed to whoever needs it; there is no
/// process-wide instance. Readers take a snapshot under a shared lock, the
/// two writers (`set`, `reset`) are serialized and the last one wins.
#[derive(Clone, Debug, Default)]
pub struct DownloadRoot {
    inner: Arc<RwLock<Option<PathBuf>>>,
}

impl DownloadRoot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored root with the absolute form of `root`.
    pub fn set(&self, root: &str) -> Result<(), ConfigError> {
        if root.is_empty() {
            return Err(ConfigError::EmptyRoot);
        }

        let absolute = path::absolute(root).map_err(|source| ConfigError::Resolve {
            path: root.to_string(),
            source,
        })?;
        let absolute = domain::lexical_clean(&absolute);

        *self.write() = Some(absolute);
        Ok(())
    }

    /// Snapshot of the current root. The lock is not held by the caller.
    pub fn current(&self) -> Option<PathBuf> {
        self.inner
            .read()
            .expect("download root lock poisoned")
            .clone()
    }

    /// Clears the root so later resolutions fail. Test teardown and
    /// administrative use only.
    pub fn reset(&self) {
        *self.write() = None;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<PathBuf>> {
        self.inner.write().expect("download root lock poisoned")
    }
}

/// Filesystem side of a download: stat, type check, open, copy.
#[derive(Clone, Debug)]
pub struct DownloadService {
    root: DownloadRoot,
}

impl DownloadService {
    pub fn new(root: DownloadRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &DownloadRoot {
        &self.root
    }

    /// Resolves a requested path against the current root snapshot.
    pub fn resolve(&self, requested: &str) -> Result<ResolvedPath, DownloadError> {
        let root = self
            .root
            .current()
            .ok_or(DownloadError::RootNotConfigured)?;
        Ok(ResolvedPath::resolve(&root, requested)?)
    }

    /// Stats and opens a resolved file, rejecting anything that is not a
    /// regular file.
    pub fn open(&self, resolved: &ResolvedPath) -> Result<DownloadFile, DownloadError> {
        let metadata = fs::metadata(resolved.as_path()).map_err(DownloadError::Stat)?;
        if !metadata.is_file() {
            return Err(DownloadError::NotRegularFile);
        }

        let file = File::open(resolved.as_path()).map_err(DownloadError::Open)?;

        Ok(DownloadFile {
            file,
            size: metadata.len(),
            file_name: resolved.file_name(),
        })
    }
}

/// An opened download. The handle is released when the value is dropped,
/// on success and on every failure path alike.
#[derive(Debug)]
pub struct DownloadFile {
    file: File,
    size: u64,
    file_name: String,
}

impl DownloadFile {
    /// File size reported by stat at open time.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Copies the whole file to `sink` in one pass.
    pub fn write_to<W: Write>(&mut self, sink: &mut W) -> Result<u64, DownloadError> {
        io::copy(&mut self.file, sink).map_err(DownloadError::Copy)
    }
}
