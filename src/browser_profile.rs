//! Throwaway Chrome profile directories
//!
//! Chrome takes a SingletonLock on its profile directory, so every engine
//! process in the pool runs against a directory of its own. The directory
//! lives exactly as long as the [`BrowserProfile`] that created it.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Name prefix of every profile directory this crate creates
pub const PROFILE_PREFIX: &str = "pagefetch-profile";

/// Owns a profile directory and deletes it on drop
#[derive(Debug)]
pub struct BrowserProfile {
    dir: PathBuf,
}

impl BrowserProfile {
    /// Fresh profile under the system temp dir
    pub fn create() -> Result<Self> {
        Self::create_in(&std::env::temp_dir())
    }

    /// Fresh profile under `parent`
    pub fn create_in(parent: &Path) -> Result<Self> {
        let dir = parent.join(format!("{PROFILE_PREFIX}-{}", Uuid::new_v4().simple()));
        // create_dir, not create_dir_all: an existing directory is an error
        std::fs::create_dir(&dir)
            .with_context(|| format!("Failed to create browser profile at {}", dir.display()))?;
        debug!("Created browser profile {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for BrowserProfile {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!("Removed browser profile {}", self.dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove browser profile {}: {}", self.dir.display(), e),
        }
    }
}
