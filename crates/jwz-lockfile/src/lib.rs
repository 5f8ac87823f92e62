//! Advisory file locking over the store's `lock` sentinel.
//!
//! Writers take the exclusive lock for the duration of a log append;
//! replay takes the shared lock for the duration of a log read so a
//! concurrent writer cannot slip a partial record under it. Locks are
//! advisory: every process touching the store must go through this
//! module.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Errors raised while acquiring or releasing a lock.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Creating, opening, or locking the sentinel file failed.
    #[error("lock file error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for lock operations.
pub type Result<T> = std::result::Result<T, LockError>;

/// Handle to the store's lock sentinel file.
///
/// The handle is held for the lifetime of an open store; guards taken
/// from it scope individual critical sections.
#[derive(Debug)]
pub struct LockFile {
    file: File,
    path: PathBuf,
}

impl LockFile {
    /// Opens the sentinel at `path`, creating it with mode 0600 if
    /// missing.
    pub fn open(path: &Path) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Blocks until the exclusive lock is held.
    pub fn exclusive(&self) -> Result<LockGuard<'_>> {
        self.file.lock_exclusive()?;
        Ok(LockGuard { file: &self.file })
    }

    /// Blocks until a shared lock is held.
    pub fn shared(&self) -> Result<LockGuard<'_>> {
        self.file.lock_shared()?;
        Ok(LockGuard { file: &self.file })
    }

    /// Path of the sentinel file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// RAII guard for a held lock; releases on drop.
#[derive(Debug)]
pub struct LockGuard<'a> {
    file: &'a File,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        // Unlock failures on drop are unreportable; the OS releases
        // the lock when the descriptor closes anyway.
        let _ = FileExt::unlock(self.file);
    }
}
