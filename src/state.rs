//! The session state machine.
//!
//! A session moves through three states: Absent (no directory), Armed
//! (directory with `next` and `last` on disk) and Completing (cursor past
//! the last patch, directory about to be removed). Every transition is
//! crash-safe: interrupting the process at any point leaves a directory
//! that either fails the session-presence predicate or resumes at the
//! patch that was in flight.

use std::fs;
use std::path::{Path, PathBuf};

use crate::author::{decode_author_script, encode_author_script};
use crate::commit::commit_current;
use crate::errors::{ApplyError, Result};
use crate::first_line_lossy;
use crate::format::{detect_patch_format, PatchFormat};
use crate::mailinfo::parse_mail;
use crate::repo::Repo;
use crate::session::SessionDir;
use crate::split::split_mail;

/// Zero-pad width of the split message filenames.
pub const MSGNUM_PREC: usize = 4;

pub struct ApplyState {
    session: SessionDir,

    /// Current and last patch numbers, 1-indexed.
    cur: u32,
    last: u32,

    /// Author identity and commit message of the patch being applied;
    /// present only between a successful parse and the advance to the
    /// next patch.
    author_name: Option<String>,
    author_email: Option<String>,
    author_date: Option<String>,
    msg: Option<Vec<u8>>,

    prec: usize,
}

impl ApplyState {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            session: SessionDir::new(dir),
            cur: 0,
            last: 0,
            author_name: None,
            author_email: None,
            author_date: None,
            msg: None,
            prec: MSGNUM_PREC,
        }
    }

    pub fn session_dir(&self) -> &Path {
        self.session.dir()
    }

    /// True when a session is in progress on disk.
    pub fn in_progress(&self) -> bool {
        self.session.in_progress()
    }

    /// Filename of the current patch message, zero-padded.
    pub fn msgnum(&self) -> String {
        format!("{:0width$}", self.cur, width = self.prec)
    }

    /// Set up a fresh session: detect the format, split the input into
    /// numbered messages, then arm the session by writing the cursor
    /// files. `next` and `last` define session presence, so they are the
    /// last files written.
    pub fn setup(
        &mut self,
        repo: &Repo,
        format: Option<PatchFormat>,
        paths: &[PathBuf],
    ) -> Result<()> {
        let format = match format {
            Some(f) => f,
            None => detect_patch_format(paths)?.ok_or_else(|| {
                ApplyError::Fatal("Patch format detection failed.".to_string())
            })?,
        };

        self.session.create().map_err(|e| {
            ApplyError::Fatal(format!(
                "failed to create directory '{}': {e}",
                self.session.dir().display()
            ))
        })?;

        match split_mail(format, repo, &self.session, self.prec, paths) {
            Ok(last) => {
                self.cur = 1;
                self.last = last;
            }
            Err(e) => {
                tracing::debug!(error = %e, "mail splitter failed");
                self.session.destroy()?;
                return Err(ApplyError::Fatal("Failed to split patches.".to_string()));
            }
        }

        self.session.write_state("next", format!("{}\n", self.cur))?;
        self.session.write_state("last", format!("{}\n", self.last))?;

        tracing::debug!(last = self.last, dir = %self.session.dir().display(), "session armed");
        Ok(())
    }

    /// Load an Armed session from disk.
    pub fn load(&mut self) -> Result<()> {
        self.cur = self.read_cursor_file("next")?;
        self.last = self.read_cursor_file("last")?;

        match self.session.read_state("author-script", false)? {
            None => {}
            Some(bytes) => match decode_author_script(&bytes) {
                Some((name, email, date)) => {
                    self.author_name = Some(name);
                    self.author_email = Some(email);
                    self.author_date = Some(date);
                }
                None => {
                    return Err(ApplyError::Fatal(
                        "could not parse author script".to_string(),
                    ))
                }
            },
        }

        self.msg = self.session.read_state("final-commit", false)?;

        tracing::debug!(cur = self.cur, last = self.last, "session loaded");
        Ok(())
    }

    fn read_cursor_file(&self, name: &str) -> Result<u32> {
        let bytes = self
            .session
            .read_state(name, true)?
            .ok_or_else(|| ApplyError::Bug(format!("state file '{name}' does not exist")))?;
        std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ApplyError::Bug(format!("state file '{name}' is not a number")))
    }

    /// Advance the cursor past the current patch, dropping its scratch
    /// state. A crash between the removals and the `next` write re-enters
    /// the same patch on resume; re-parsing it is deterministic, so that
    /// is safe.
    fn next(&mut self) -> Result<()> {
        self.clear_patch_fields();

        self.session.remove_state("author-script")?;
        self.session.remove_state("final-commit")?;

        self.cur += 1;
        self.session.write_state("next", format!("{}\n", self.cur))?;
        Ok(())
    }

    fn clear_patch_fields(&mut self) {
        self.author_name = None;
        self.author_email = None;
        self.author_date = None;
        self.msg = None;
    }

    /// Apply all queued messages, committing one per patch, then tear the
    /// session down and trigger background maintenance.
    pub fn run(&mut self, repo: &Repo) -> Result<()> {
        repo.refresh_index()?;

        while self.cur <= self.last {
            let mail = self.session.path_in(&self.msgnum());

            // A removed message file means the user chose to skip it.
            if fs::symlink_metadata(&mail).is_ok() {
                // Per-patch scratch is regenerable from the message, and a
                // resume may have pre-populated these from disk; parsing
                // starts from a clean slate either way.
                self.clear_patch_fields();

                if let Some(parsed) = parse_mail(repo, &self.session, &mail)? {
                    self.author_name = Some(parsed.author_name);
                    self.author_email = Some(parsed.author_email);
                    self.author_date = Some(parsed.author_date);
                    self.msg = Some(parsed.msg);

                    self.write_author_script()?;
                    self.write_commit_msg()?;

                    let msg = self.msg.as_deref().unwrap_or_default();
                    println!("Applying: {}", first_line_lossy(msg));

                    if !repo.apply_index(&self.session.path_in("patch"))? {
                        eprintln!(
                            "Patch failed at {} {}",
                            self.msgnum(),
                            first_line_lossy(msg)
                        );
                        if repo.config_bool("advice.amworkdir", true) {
                            eprintln!(
                                "The copy of the patch that failed is found in: {}",
                                self.session.path_in("patch").display()
                            );
                        }
                        return Err(ApplyError::PatchFailed);
                    }

                    self.do_commit(repo)?;
                }
            }

            self.next()?;
        }

        self.destroy()?;
        repo.gc_auto();
        Ok(())
    }

    fn write_author_script(&self) -> Result<()> {
        let script = encode_author_script(
            self.author_name.as_deref().unwrap_or_default(),
            self.author_email.as_deref().unwrap_or_default(),
            self.author_date.as_deref().unwrap_or_default(),
        );
        self.session.write_state("author-script", script)?;
        Ok(())
    }

    fn write_commit_msg(&self) -> Result<()> {
        let msg = self
            .msg
            .as_deref()
            .ok_or_else(|| ApplyError::Bug("no commit message to write".to_string()))?;
        self.session.write_state("final-commit", msg)?;
        Ok(())
    }

    fn do_commit(&self, repo: &Repo) -> Result<()> {
        commit_current(
            repo,
            self.author_name.as_deref().unwrap_or_default(),
            self.author_email.as_deref().unwrap_or_default(),
            self.author_date.as_deref().unwrap_or_default(),
            self.msg.as_deref().unwrap_or_default(),
        )
    }

    /// Forcefully terminate the session, removing its directory.
    pub fn destroy(&self) -> Result<()> {
        self.session.destroy()?;
        tracing::debug!(dir = %self.session.dir().display(), "session destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msgnum_is_zero_padded_to_four() {
        let mut state = ApplyState::new("/nonexistent/rebase-apply");
        state.cur = 1;
        assert_eq!(state.msgnum(), "0001");
        state.cur = 42;
        assert_eq!(state.msgnum(), "0042");
        state.cur = 12345;
        assert_eq!(state.msgnum(), "12345");
    }

    #[test]
    fn test_load_without_session_is_a_bug() {
        let td = tempfile::tempdir().expect("tmpdir");
        let mut state = ApplyState::new(td.path().join("rebase-apply"));
        match state.load() {
            Err(ApplyError::Bug(msg)) => assert!(msg.contains("next")),
            other => panic!("expected Bug error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_corrupt_author_script() {
        let td = tempfile::tempdir().expect("tmpdir");
        let session = SessionDir::new(td.path().join("rebase-apply"));
        session.create().unwrap();
        session.write_state("next", "1\n").unwrap();
        session.write_state("last", "1\n").unwrap();
        session
            .write_state("author-script", "GIT_AUTHOR_NAME=unquoted\n")
            .unwrap();

        let mut state = ApplyState::new(td.path().join("rebase-apply"));
        match state.load() {
            Err(ApplyError::Fatal(msg)) => {
                assert_eq!(msg, "could not parse author script")
            }
            other => panic!("expected Fatal error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_restores_cursor_and_author() {
        let td = tempfile::tempdir().expect("tmpdir");
        let session = SessionDir::new(td.path().join("rebase-apply"));
        session.create().unwrap();
        session.write_state("next", "2\n").unwrap();
        session.write_state("last", "5\n").unwrap();
        session
            .write_state("author-script", encode_author_script("Ada", "ada@x", "now"))
            .unwrap();
        session.write_state("final-commit", "Add foo\n").unwrap();

        let mut state = ApplyState::new(td.path().join("rebase-apply"));
        state.load().unwrap();
        assert_eq!(state.cur, 2);
        assert_eq!(state.last, 5);
        assert_eq!(state.author_name.as_deref(), Some("Ada"));
        assert_eq!(state.author_email.as_deref(), Some("ada@x"));
        assert_eq!(state.author_date.as_deref(), Some("now"));
        assert_eq!(state.msg.as_deref(), Some(b"Add foo\n".as_slice()));
    }
}
