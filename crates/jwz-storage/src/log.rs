//! Append-only log file I/O.
//!
//! The log is the source of truth. It is only ever appended to, one
//! complete line per record, under the store's exclusive lock. The
//! caller owns locking; this module owns the byte-level protocol:
//! single write call, fsync before close, never overwrite.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Appends one complete record line (with its trailing newline) and
/// returns the log's new byte length.
pub(crate) fn append_line(path: &Path, line: &str) -> io::Result<u64> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.sync_all()?;
    file.metadata().map(|m| m.len())
}

/// Reads everything from `offset` to the end of the log.
pub(crate) fn read_from(path: &Path, offset: u64) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Current byte length of the log; a missing file counts as empty.
pub(crate) fn size(path: &Path) -> io::Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}
