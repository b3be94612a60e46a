use std::{
    io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Working directory for compile artifacts, unique per interpreter instance.
#[derive(Debug)]
pub struct ScratchDirectory {
    path: PathBuf,
}

impl ScratchDirectory {
    pub fn new() -> Self {
        let instance = INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            path: std::env::temp_dir()
                .join("Gigi")
                .join(format!("{}_{}", std::process::id(), instance)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes whatever a previous compile left and creates an empty directory.
    pub fn recreate(&self) -> io::Result<()> {
        self.remove()?;
        std::fs::create_dir_all(&self.path)
    }

    pub fn remove(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.path) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error),
            _ => Ok(()),
        }
    }
}

impl Default for ScratchDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScratchDirectory {
    fn drop(&mut self) {
        if let Err(error) = self.remove() {
            log::warn!("Failed to remove scratch directory {:?}: {}", self.path, error);
        }
    }
}
