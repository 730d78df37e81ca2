use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

/// Advisory lock guarding one logical file (`flock(2)` on Unix).
///
/// Released when dropped.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Acquire an exclusive lock, blocking until it is free. Used by writers.
    pub fn exclusive(path: &Path) -> std::io::Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()?;
        Ok(Self { _file: file })
    }

    /// Acquire a shared lock, blocking while a writer holds it. Used by readers.
    pub fn shared(path: &Path) -> std::io::Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_shared()?;
        Ok(Self { _file: file })
    }
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_exclusive_blocks_try_lock() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".users.data.lock");

        let lock = FileLock::exclusive(&path).unwrap();
        let other = open_lock_file(&path).unwrap();
        assert!(other.try_lock_shared().is_err());

        drop(lock);
        assert!(other.try_lock_exclusive().is_ok());
    }

    #[test]
    fn test_shared_locks_coexist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".users.data.lock");

        let _a = FileLock::shared(&path).unwrap();
        let _b = FileLock::shared(&path).unwrap();
        let other = open_lock_file(&path).unwrap();
        assert!(other.try_lock_exclusive().is_err());
    }
}
