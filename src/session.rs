//! Session directory: the on-disk record of an in-progress application job.
//!
//! The directory holds the split messages plus the per-session (`next`,
//! `last`) and per-patch (`info`, `msg`, `patch`, `author-script`,
//! `final-commit`) state files. A session is "in progress" iff the
//! directory exists and `last` and `next` are regular files; nothing else
//! affects that predicate, so setup writes them last.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct SessionDir {
    dir: PathBuf,
}

impl SessionDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of a file inside the session directory.
    pub fn path_in(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Create the session directory. An already-existing directory is fine;
    /// a stale one can only be mistaken for a live session once `next` and
    /// `last` land, which happens after the splitter has succeeded.
    pub fn create(&self) -> io::Result<()> {
        match fs::create_dir(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Read a state file. Returns Ok(None) iff the file does not exist;
    /// any other read error propagates. With `trim`, surrounding ASCII
    /// whitespace is removed.
    pub fn read_state(&self, name: &str, trim: bool) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path_in(name)) {
            Ok(mut bytes) => {
                if trim {
                    bytes = trim_ascii(&bytes).to_vec();
                }
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Atomically replace a state file: write to a sibling temp file, fsync,
    /// rename over the target. A concurrent reader sees either the previous
    /// contents or the complete new contents.
    pub fn write_state(&self, name: &str, contents: impl AsRef<[u8]>) -> io::Result<()> {
        let target = self.path_in(name);
        let tmp = self.path_in(&format!("{name}.new"));
        {
            use std::io::Write;
            let mut f = fs::File::create(&tmp)?;
            f.write_all(contents.as_ref())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &target)
    }

    /// Remove a state file; missing files are not an error.
    pub fn remove_state(&self, name: &str) -> io::Result<()> {
        match fs::remove_file(self.path_in(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Recursively remove the session directory. Idempotent.
    pub fn destroy(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// The session-presence predicate: directory is a directory, and `last`
    /// and `next` are regular files. Symlinks do not count.
    pub fn in_progress(&self) -> bool {
        let is_dir = fs::symlink_metadata(&self.dir)
            .map(|m| m.file_type().is_dir())
            .unwrap_or(false);
        if !is_dir {
            return false;
        }
        self.is_regular_file("last") && self.is_regular_file("next")
    }

    fn is_regular_file(&self, name: &str) -> bool {
        fs::symlink_metadata(self.path_in(name))
            .map(|m| m.file_type().is_file())
            .unwrap_or(false)
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(start);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, SessionDir) {
        let td = tempfile::tempdir().expect("tmpdir");
        let session = SessionDir::new(td.path().join("rebase-apply"));
        (td, session)
    }

    #[test]
    fn test_read_state_missing_is_none() {
        let (_td, s) = scratch();
        s.create().unwrap();
        assert!(s.read_state("next", true).unwrap().is_none());
    }

    #[test]
    fn test_write_then_read_state_with_trim() {
        let (_td, s) = scratch();
        s.create().unwrap();
        s.write_state("next", "3\n").unwrap();
        assert_eq!(s.read_state("next", true).unwrap().unwrap(), b"3");
        assert_eq!(s.read_state("next", false).unwrap().unwrap(), b"3\n");
    }

    #[test]
    fn test_write_state_replaces_whole_contents() {
        let (_td, s) = scratch();
        s.create().unwrap();
        s.write_state("last", "100\n").unwrap();
        s.write_state("last", "2\n").unwrap();
        assert_eq!(s.read_state("last", true).unwrap().unwrap(), b"2");
        // No temp file left behind
        assert!(!s.path_in("last.new").exists());
    }

    #[test]
    fn test_create_twice_is_ok() {
        let (_td, s) = scratch();
        s.create().unwrap();
        s.create().unwrap();
    }

    #[test]
    fn test_remove_state_missing_is_ok() {
        let (_td, s) = scratch();
        s.create().unwrap();
        s.remove_state("author-script").unwrap();
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let (_td, s) = scratch();
        s.create().unwrap();
        s.write_state("next", "1\n").unwrap();
        s.destroy().unwrap();
        s.destroy().unwrap();
        assert!(!s.dir().exists());
    }

    #[test]
    fn test_in_progress_requires_both_cursor_files() {
        let (_td, s) = scratch();
        assert!(!s.in_progress(), "absent directory");
        s.create().unwrap();
        assert!(!s.in_progress(), "empty directory");
        s.write_state("last", "3\n").unwrap();
        assert!(!s.in_progress(), "missing next");
        s.write_state("next", "1\n").unwrap();
        assert!(s.in_progress());
        s.remove_state("last").unwrap();
        assert!(!s.in_progress(), "missing last");
        s.write_state("last", "3\n").unwrap();
        s.destroy().unwrap();
        assert!(!s.in_progress(), "after destroy");
    }

    #[test]
    fn test_other_files_do_not_affect_predicate() {
        let (_td, s) = scratch();
        s.create().unwrap();
        s.write_state("0001", "From x\n").unwrap();
        s.write_state("author-script", "x").unwrap();
        assert!(!s.in_progress());
    }
}
