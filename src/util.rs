use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// RAII guard that changes the process working directory and restores
/// the previous one on drop, including when the guarded operation fails.
///
/// The process cwd is shared mutable state, so callers that hold a
/// `ScopedDir` must not create another one concurrently.
#[derive(Debug)]
pub struct ScopedDir {
    original: PathBuf,
}

impl ScopedDir {
    /// Enter `dir`, remembering the current directory.
    pub fn enter(dir: &Path) -> Result<Self> {
        let original = env::current_dir().context("Failed to read current directory")?;
        env::set_current_dir(dir)
            .with_context(|| format!("Failed to change directory to {:?}", dir))?;
        Ok(Self { original })
    }
}

impl Drop for ScopedDir {
    fn drop(&mut self) {
        if let Err(err) = env::set_current_dir(&self.original) {
            tracing::error!("Failed to restore working directory {:?}: {}", self.original, err);
        }
    }
}
