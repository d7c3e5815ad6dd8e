//! Sandbox - confines caller-supplied paths to a single root directory
//!
//! Every file tool resolves its `filepath` parameter through [`Sandbox::resolve`]
//! before touching the filesystem. Resolution follows symlinks and `..`
//! segments on the real filesystem and then checks ancestry component-wise,
//! so neither `../` chains nor symlinks pointing outside the root can escape.

use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use super::ToolError;

/// A canonical root directory that all file operations are confined to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at an existing directory
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        let root = root.as_ref();
        debug!(?root, "Sandbox::new: called");
        let canonical = root.canonicalize().map_err(|_| ToolError::InvalidSandboxRoot {
            root: root.to_path_buf(),
        })?;

        if !canonical.is_dir() {
            debug!("Sandbox::new: root is not a directory");
            return Err(ToolError::InvalidSandboxRoot {
                root: root.to_path_buf(),
            });
        }

        Ok(Self { root: canonical })
    }

    /// The canonical sandbox root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller-supplied path to a verified absolute path under the root
    ///
    /// Leading separators are stripped, so `/src/lib.rs` means `<root>/src/lib.rs`.
    /// Components that exist are canonicalized (following symlinks); components
    /// that don't exist yet are appended lexically. Rejection has no side effect.
    pub fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        debug!(%requested, "Sandbox::resolve: called");
        if requested.contains('\0') {
            return Err(self.invalid(requested, "path contains a NUL byte"));
        }

        let relative = requested.trim_start_matches('/');
        let mut resolved = self.root.clone();

        for component in Path::new(relative).components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::Normal(name) => {
                    let candidate = resolved.join(name);
                    resolved = match std::fs::symlink_metadata(&candidate) {
                        Ok(_) => candidate
                            .canonicalize()
                            .map_err(|e| self.invalid(requested, &e.to_string()))?,
                        Err(e) if e.kind() == io::ErrorKind::NotFound => candidate,
                        Err(e) => return Err(self.invalid(requested, &e.to_string())),
                    };
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(self.invalid(requested, "unexpected absolute component"));
                }
            }
        }

        if resolved.starts_with(&self.root) {
            debug!(?resolved, "Sandbox::resolve: path is within sandbox");
            Ok(resolved)
        } else {
            warn!(%requested, root = ?self.root, "Rejected path outside sandbox");
            Err(ToolError::SandboxViolation {
                path: requested.to_string(),
                root: self.root.clone(),
            })
        }
    }

    /// Path relative to the root, for display
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| path.display().to_string())
    }

    fn invalid(&self, requested: &str, reason: &str) -> ToolError {
        debug!(%requested, %reason, "Sandbox::invalid: resolution failed");
        ToolError::InvalidPath {
            path: requested.to_string(),
            reason: reason.to_string(),
        }
    }
}
