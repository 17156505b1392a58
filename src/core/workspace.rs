use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

use crate::core::errors::SandboxError;

const DIR_MODE: u32 = 0o700;

/// A uniquely named working directory owned by one execution.
///
/// The directory is removed when the guard is dropped, whichever way the
/// owning call ends.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Prepares the shared root. Called once at startup.
    pub async fn init_root(root: &Path) -> Result<(), SandboxError> {
        let err = |source| SandboxError::Workspace {
            path: root.to_path_buf(),
            source,
        };
        fs::create_dir_all(root).await.map_err(err)?;
        fs::set_permissions(root, std::fs::Permissions::from_mode(DIR_MODE))
            .await
            .map_err(err)
    }

    /// Creates a fresh directory under `root`.
    ///
    /// `create_dir` fails on an existing path, so a name is never shared
    /// between two executions.
    pub async fn create(root: &Path) -> Result<Self, SandboxError> {
        let path = root.join(Uuid::new_v4().simple().to_string());
        let err = |source| SandboxError::Workspace {
            path: path.clone(),
            source,
        };

        fs::create_dir(&path).await.map_err(err)?;
        let workspace = Self { path };
        fs::set_permissions(&workspace.path, std::fs::Permissions::from_mode(DIR_MODE))
            .await
            .map_err(|source| SandboxError::Workspace {
                path: workspace.path.clone(),
                source,
            })?;

        tracing::debug!("Created workspace {}", workspace.path.display());
        Ok(workspace)
    }

    /// A guard for a path that was never created here. Used by tests that
    /// need an `Artifact` without touching the filesystem.
    #[cfg(test)]
    pub(crate) fn detached(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, file: &Path, contents: &str) -> Result<(), SandboxError> {
        debug_assert!(file.starts_with(&self.path));
        fs::write(file, contents)
            .await
            .map_err(|source| SandboxError::Workspace {
                path: file.to_path_buf(),
                source,
            })
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => tracing::debug!("Removed workspace {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove workspace {}: {}", self.path.display(), e),
        }
    }
}
