//! Lexical path resolution for guarded downloads.
//!
//! Everything in this module works on path strings only. No filesystem
//! access happens here, so containment decisions are deterministic and can
//! be tested without touching disk.
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Reasons a requested path cannot be resolved against a root.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ResolveError {
    #[error("download path cannot be empty")]
    EmptyPath,
    #[error("path escapes download root")]
    PathEscape,
}

/// Absolute path proven to be the download root or a descendant of it.
///
/// The checked [`ResolvedPath::resolve`] constructor is the only way to
/// obtain a value, so holding one is proof of containment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResolvedPath(PathBuf);

impl ResolvedPath {
    /// Resolves `requested` against an absolute `root`.
    ///
    /// The requested path is cleaned lexically (no symlink following), an
    /// absolute request is taken as the candidate directly while a relative
    /// one is joined onto the root, and the candidate is accepted only when
    /// its lexical relation to the root contains no leading parent-escape
    /// segment.
    pub fn resolve(root: &Path, requested: &str) -> Result<Self, ResolveError> {
        let cleaned = lexical_clean(Path::new(requested));
        if cleaned == Path::new(".") {
            return Err(ResolveError::EmptyPath);
        }

        let candidate = if cleaned.is_absolute() {
            cleaned
        } else {
            root.join(cleaned)
        };

        let relative = relative_to(root, &candidate);
        if relative.components().next() == Some(Component::ParentDir) {
            return Err(ResolveError::PathEscape);
        }

        Ok(Self(candidate))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Base name of the resolved file, empty when the path has none.
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl From<ResolvedPath> for PathBuf {
    fn from(value: ResolvedPath) -> Self {
        value.0
    }
}

/// Collapses `.` and `..` segments syntactically.
///
/// Parent segments pop a preceding normal segment, are dropped at an
/// absolute root, and are kept when they would lead out of a relative path.
/// The empty path cleans to `.`.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                cleaned.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal =
                    matches!(cleaned.components().next_back(), Some(Component::Normal(_)));
                if last_is_normal {
                    cleaned.pop();
                } else if !cleaned.has_root() {
                    // Keep leading parents of a relative path; at an
                    // absolute root they have nowhere to go and are dropped.
                    cleaned.push(component.as_os_str());
                }
            }
        }
    }

    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }

    cleaned
}

/// Lexical equivalent of "how do I get from `root` to `path`".
///
/// Both arguments must already be cleaned. Returns `.` when the paths are
/// equal; a result starting with `..` means `path` lies outside `root`.
fn relative_to(root: &Path, path: &Path) -> PathBuf {
    let root_parts: Vec<Component> = root.components().collect();
    let path_parts: Vec<Component> = path.components().collect();

    let shared = root_parts
        .iter()
        .zip(path_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in shared..root_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[shared..] {
        relative.push(part.as_os_str());
    }

    if relative.as_os_str().is_empty() {
        relative.push(".");
    }

    relative
}
