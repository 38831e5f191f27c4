//! Per-request frame directory

use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A uniquely named directory under the scratch root that is removed when
/// the animation run ends.
///
/// Call [`ScratchDir::remove`] on the normal path; `Drop` removes the
/// directory if that never happened (early return or panic).
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    /// Create `<root>/<uuid>`
    pub async fn create(root: &Path) -> Result<Self> {
        let path = root.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&path).await?;

        // Owned before any further setup so a failure below still removes it
        let scratch = Self {
            path,
            removed: false,
        };
        scratch.open_permissions().await?;

        debug!("Created scratch dir {}", scratch.path.display());
        Ok(scratch)
    }

    #[cfg(unix)]
    async fn open_permissions(&self) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o777)).await?;
        Ok(())
    }

    #[cfg(not(unix))]
    async fn open_permissions(&self) -> Result<()> {
        Ok(())
    }

    /// Directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and its contents. Failures are logged.
    pub async fn remove(mut self) {
        self.removed = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!("Removed scratch dir {}", self.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                "Failed to remove scratch dir {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed scratch dir {} on drop", self.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                "Failed to remove scratch dir {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}
