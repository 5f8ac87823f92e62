//! Store directory lifecycle: creation and discovery.
//!
//! A store root is a directory named `.jwz` (preferred) or `.zawinski`
//! (recognised for compatibility) containing the append-only log, the
//! index database, an ignore file, and the lock sentinel:
//!
//! ```text
//! .jwz/
//!   messages.jsonl   append-only log (source of truth)
//!   messages.db      index (plus *.db-wal / *.db-shm while open)
//!   .gitignore       lists the index artifacts and `lock`
//!   lock             advisory-lock sentinel
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Result, StoreError};

/// Preferred store directory name.
pub const STORE_DIR_NAME: &str = ".jwz";

/// Legacy store directory name, recognised on discovery.
pub const ALT_STORE_DIR_NAME: &str = ".zawinski";

/// Index database file name.
pub const DB_FILE: &str = "messages.db";

/// Append-only log file name.
pub const LOG_FILE: &str = "messages.jsonl";

/// Advisory lock sentinel file name.
pub const LOCK_FILE: &str = "lock";

/// Ignore file content: the index is rebuildable and the lock is
/// per-host, so only the log belongs in version control.
const GITIGNORE_CONTENT: &str = "messages.db\nmessages.db-wal\nmessages.db-shm\nlock\n";

/// Creates a new store directory under `parent`.
///
/// Writes the empty log and the ignore file. The index is not created
/// here; it materialises on first open.
///
/// # Errors
///
/// Returns [`StoreError::StoreAlreadyExists`] if `parent` already has
/// a `.jwz` directory.
pub fn init_store(parent: &Path) -> Result<PathBuf> {
    let root = parent.join(STORE_DIR_NAME);
    if root.exists() {
        return Err(StoreError::StoreAlreadyExists(root));
    }

    fs::create_dir_all(parent)?;
    fs::create_dir(&root)?;
    fs::write(root.join(LOG_FILE), "")?;
    fs::write(root.join(".gitignore"), GITIGNORE_CONTENT)?;

    info!(root = %root.display(), "initialized message store");
    Ok(root)
}

/// Walks up from `start`'s real path looking for a store root.
///
/// At each level both recognised names are checked, `.jwz` first.
///
/// # Errors
///
/// Returns [`StoreError::StoreNotFound`] when the filesystem root is
/// reached without finding one.
pub fn discover(start: &Path) -> Result<PathBuf> {
    let start = start.canonicalize().map_err(|_| StoreError::StoreNotFound)?;

    let mut current = start.as_path();
    loop {
        for name in [STORE_DIR_NAME, ALT_STORE_DIR_NAME] {
            let candidate = current.join(name);
            if candidate.is_dir() {
                return Ok(candidate);
            }
        }

        match current.parent() {
            Some(parent) if parent != current => current = parent,
            _ => return Err(StoreError::StoreNotFound),
        }
    }
}
