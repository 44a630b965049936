use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Process-scoped session lock guard that removes the lock file on drop.
/// Held for the life of a run so two invocations on the same repository
/// fail cleanly instead of corrupting each other's session.
#[derive(Debug)]
pub struct SessionLock {
    file: File,
    path: PathBuf,
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        // Best-effort unlock; ignore errors
        let _ = fs2::FileExt::unlock(&self.file);

        // Try removal with brief retries
        for _ in 0..10 {
            if !self.path.exists() {
                break;
            }
            if fs::remove_file(&self.path).is_ok() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    }
}

/// Acquire a non-blocking exclusive lock at `p`.
pub fn acquire_lock_at(p: &Path) -> io::Result<SessionLock> {
    if let Some(parent) = p.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let f = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .open(p)?;
    match f.try_lock_exclusive() {
        Ok(_) => Ok(SessionLock {
            file: f,
            path: p.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Err(io::Error::other(
            "Another mailpatch process is already running in this repository (lock held).",
        )),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_is_exclusive_and_released_on_drop() {
        let td = tempfile::tempdir().expect("tmpdir");
        let p = td.path().join("mailpatch.lock");

        let first = acquire_lock_at(&p).expect("first acquire failed");
        let err = acquire_lock_at(&p).expect_err("second acquire unexpectedly succeeded");
        assert!(
            err.to_string().contains("already running"),
            "unexpected error message: {err}"
        );

        drop(first);
        let _again = acquire_lock_at(&p).expect("acquire after release failed");
    }

    #[test]
    fn test_lock_file_removed_after_drop() {
        let td = tempfile::tempdir().expect("tmpdir");
        let p = td.path().join("mailpatch.lock");
        {
            let _lock = acquire_lock_at(&p).expect("acquire");
            assert!(p.exists());
        }
        assert!(!p.exists(), "lock file should be removed on drop");
    }
}
