//! Cross-process advisory lock around allocate-then-persist sequences.

// Standard library
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

// External crates
use fs2::FileExt;
use tracing::debug;

// Internal imports
use hark_core::error::{HarkError, Result};

const RETRY_DELAY: Duration = Duration::from_millis(10);

/// An exclusive lock on `{home}/hark.lock`, released on drop.
#[derive(Debug)]
pub struct WorkflowLock {
    file: File,
    path: PathBuf,
}

impl WorkflowLock {
    /// Acquire the lock, retrying until `timeout` has elapsed.
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        let lock_start = Instant::now();
        let mut attempts = 0u32;

        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(e) => {
                    attempts += 1;
                    if lock_start.elapsed() >= timeout {
                        return Err(HarkError::Lock(format!(
                            "timed out waiting for {} after {} attempts: {}",
                            path.display(),
                            attempts,
                            e
                        )));
                    }
                    std::thread::sleep(RETRY_DELAY);
                }
            }
        }

        debug!("Acquired workflow lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkflowLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!("Released workflow lock {}", self.path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_second_acquire_times_out_while_held() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("hark.lock");

        let held = WorkflowLock::acquire(&path, Duration::from_secs(1))
            .expect("Failed to acquire lock");
        let err = WorkflowLock::acquire(&path, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, HarkError::Lock(_)));

        drop(held);
        WorkflowLock::acquire(&path, Duration::from_millis(50))
            .expect("Lock should be free after drop");
    }

    #[test]
    fn test_creates_missing_parent() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("home").join("hark.lock");
        let lock = WorkflowLock::acquire(&path, Duration::from_secs(1))
            .expect("Failed to acquire lock");
        assert_eq!(lock.path(), path);
        assert!(path.exists());
    }
}
