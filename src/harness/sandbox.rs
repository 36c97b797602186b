//! Ephemeral sandbox directory for the SUT's file-backed resource store.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// An exclusively-owned sandbox directory.
///
/// Created immediately before a group's SUT starts and destroyed
/// immediately after it stops, regardless of test outcomes. The directory
/// is fully removed between groups, never truncated, so no state can leak
/// from one group into the next. The `Drop` impl is a best-effort backstop
/// for panic paths; normal flow calls [`Sandbox::destroy`] explicitly.
#[derive(Debug)]
pub struct Sandbox {
    root: PathBuf,
    destroyed: bool,
}

impl Sandbox {
    /// Destroy any stale directory at `root` and recreate it empty.
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        remove_if_present(&root)?;
        fs::create_dir_all(&root)
            .map_err(|e| Error::io(format!("creating sandbox {}", root.display()), e))?;
        debug!(sandbox = %root.display(), "sandbox created");
        Ok(Self {
            root,
            destroyed: false,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recursively remove the sandbox directory. Idempotent.
    pub fn destroy(mut self) -> Result<()> {
        self.destroyed = true;
        remove_if_present(&self.root)?;
        debug!(sandbox = %self.root.display(), "sandbox destroyed");
        Ok(())
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        if !self.destroyed
            && let Err(e) = remove_if_present(&self.root)
        {
            warn!(sandbox = %self.root.display(), error = %e, "sandbox cleanup failed in drop");
        }
    }
}

fn remove_if_present(root: &Path) -> Result<()> {
    if root.exists() {
        fs::remove_dir_all(root)
            .map_err(|e| Error::io(format!("removing sandbox {}", root.display()), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_clears_stale_state() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("sandbox");

        fs::create_dir_all(root.join("Shoes")).unwrap();
        fs::write(root.join("Shoes/1"), b"{}").unwrap();

        let sandbox = Sandbox::create(&root).unwrap();
        assert!(root.exists());
        assert!(!root.join("Shoes").exists(), "stale state must not leak");
        sandbox.destroy().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn destroy_is_idempotent_against_missing_dir() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("sandbox");

        let sandbox = Sandbox::create(&root).unwrap();
        fs::remove_dir_all(&root).unwrap();
        sandbox.destroy().unwrap();
    }

    #[test]
    fn drop_removes_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("sandbox");
        {
            let _sandbox = Sandbox::create(&root).unwrap();
            assert!(root.exists());
        }
        assert!(!root.exists());
    }
}
