//! Advisory file locking for instance exclusion.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Encapsulates a lock file, which allows limited mutual exclusion of
/// different processes.
///
/// The actual lock is acquired on the first successful [`LockFile::lock`]
/// call. The implementation is re-entrant: `lock` may be invoked multiple
/// times and the underlying file lock is released when the locking calls
/// are balanced with [`LockFile::unlock`] calls, or when the value is
/// dropped.
pub struct LockFile {
    file: File,
    path: PathBuf,
    count: u32,
}

impl LockFile {
    /// Opens the lock file, creating it when missing, without acquiring
    /// the lock yet.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::instance_io(&path, &e))?;

        Ok(Self {
            file,
            path,
            count: 0,
        })
    }

    /// Opens the lock file and acquires the lock immediately.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let mut result = Self::new(path)?;
        result.lock()?;
        Ok(result)
    }

    /// Ensures that the lock on the file is acquired.
    ///
    /// Fails with [`Error::InstanceBusy`] when another process holds the
    /// lock and with [`Error::InstanceIo`] when the attempt itself fails.
    ///
    /// # Panics
    ///
    /// Panics when the re-entrant count saturates, which indicates
    /// unbalanced lock management in the caller.
    pub fn lock(&mut self) -> Result<()> {
        if self.count > 0 {
            self.count = self
                .count
                .checked_add(1)
                .unwrap_or_else(|| panic!("too many lock attempts: {}", self.path.display()));
            return Ok(());
        }

        match self.file.try_lock_exclusive() {
            Ok(()) => {
                self.count = 1;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                Err(Error::InstanceBusy(self.path.clone()))
            }
            Err(e) => Err(Error::instance_io(&self.path, &e)),
        }
    }

    /// Negates the effect of a single [`LockFile::lock`] invocation; when
    /// the invocations are balanced, the lock on the file is released.
    ///
    /// Returns `false` if the lock was not held, e.g., because
    /// [`LockFile::abort`] broke it before.
    pub fn unlock(&mut self) -> Result<bool> {
        if self.count == 0 {
            return Ok(false);
        }

        self.count -= 1;
        if self.count == 0 {
            fs2::FileExt::unlock(&self.file).map_err(|e| Error::instance_io(&self.path, &e))?;
        }

        Ok(true)
    }

    /// Releases the lock regardless of the current count, ignoring failures.
    pub fn abort(&mut self) {
        self.count = 0;
        let _ = fs2::FileExt::unlock(&self.file);
    }

    /// Returns `true` if the lock is still acquired.
    pub fn locked(&self) -> bool {
        self.count > 0
    }

    /// Returns the path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        // Closing the file descriptor releases the lock anyway, but be
        // explicit about the balance going away.
        self.count = 0;
    }
}

impl std::fmt::Debug for LockFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockFile")
            .field("path", &self.path)
            .field("count", &self.count)
            .finish()
    }
}
