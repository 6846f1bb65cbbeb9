use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::error::Result;

static STAGING_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Private working directory for one ingestion's artifacts.
///
/// Everything is written under a hidden staging directory next to the final
/// location and moved into place by [`commit`](Self::commit). A staging
/// area that is dropped without being committed is deleted, so failed or
/// cancelled runs leave nothing behind.
#[derive(Debug)]
pub struct ArtifactStaging {
    staging: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl ArtifactStaging {
    pub fn create(output_root: &Path, name: &str) -> Result<Self> {
        fs::create_dir_all(output_root)?;
        let unique = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        let staging = output_root.join(format!(".{name}.partial-{}-{unique}", std::process::id()));
        fs::create_dir_all(&staging)?;
        debug!(path = %staging.display(), "Created staging directory");
        Ok(Self {
            staging,
            target: output_root.join(name),
            committed: false,
        })
    }

    /// Path of an artifact inside the staging directory.
    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.staging.join(relative)
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Final directory the artifacts are published to.
    pub fn target_dir(&self) -> &Path {
        &self.target
    }

    /// Move the staged artifacts to the target directory, replacing any
    /// previous output of the same capture.
    pub fn commit(mut self) -> Result<PathBuf> {
        if self.target.exists() {
            fs::remove_dir_all(&self.target)?;
        }
        fs::rename(&self.staging, &self.target)?;
        self.committed = true;
        Ok(self.target.clone())
    }

    fn remove(&self) {
        if self.staging.exists() {
            if let Err(e) = fs::remove_dir_all(&self.staging) {
                warn!(path = %self.staging.display(), error = %e, "Failed to remove staging directory");
            } else {
                debug!(path = %self.staging.display(), "Removed partial artifacts");
            }
        }
    }
}

impl Drop for ArtifactStaging {
    fn drop(&mut self) {
        if !self.committed {
            self.remove();
        }
    }
}
