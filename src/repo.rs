//! Repository plumbing: discovery plus the handful of git commands the
//! state machine drives. Children run synchronously; the driver blocks.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use once_cell::sync::OnceCell;
use which::which;

use crate::errors::{ApplyError, Result};

static GIT_BIN: OnceCell<PathBuf> = OnceCell::new();

/// Locate the git binary once per process.
pub fn git_binary() -> io::Result<&'static Path> {
    GIT_BIN
        .get_or_try_init(|| {
            which("git").map_err(|e| {
                io::Error::new(io::ErrorKind::NotFound, format!("git not found in PATH: {e}"))
            })
        })
        .map(|p| p.as_path())
}

/// Handle to the repository the session operates on: the worktree root and
/// the git directory. Passed explicitly through the state machine.
pub struct Repo {
    worktree: PathBuf,
    git_dir: PathBuf,
}

impl Repo {
    /// Discover the repository enclosing `dir`.
    pub fn discover(dir: &Path) -> Result<Repo> {
        let worktree = rev_parse_path(dir, "--show-toplevel")?;
        let git_dir = rev_parse_path(dir, "--absolute-git-dir")?;
        Ok(Repo { worktree, git_dir })
    }

    pub fn worktree(&self) -> &Path {
        &self.worktree
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Location of the persistent session directory.
    pub fn session_dir_path(&self) -> PathBuf {
        self.git_dir.join("rebase-apply")
    }

    /// A git command rooted at the worktree.
    pub fn git(&self) -> io::Result<Command> {
        let mut cmd = Command::new(git_binary()?);
        cmd.current_dir(&self.worktree);
        Ok(cmd)
    }

    /// Refresh the staging area before the run loop touches it.
    pub fn refresh_index(&self) -> Result<()> {
        let status = self
            .git()?
            .args(["update-index", "-q", "--refresh"])
            .status()?;
        if !status.success() {
            return Err(ApplyError::Fatal("unable to write index file".to_string()));
        }
        Ok(())
    }

    /// Apply a unidiff against the staging area and working tree. A false
    /// return means the patch did not apply; the child's stderr explains.
    pub fn apply_index(&self, patch: &Path) -> Result<bool> {
        let status = self
            .git()?
            .arg("apply")
            .arg("--index")
            .arg(patch)
            .status()?;
        Ok(status.success())
    }

    /// Build a tree object from the staging area.
    pub fn write_tree(&self) -> Result<String> {
        let out = self
            .git()?
            .arg("write-tree")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        if !out.status.success() {
            return Err(ApplyError::Fatal(
                "git write-tree failed to write a tree".to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&out.stdout).trim().to_string())
    }

    /// Resolve HEAD to a commit id; Ok(None) when the history is unborn.
    pub fn head_commit(&self) -> Result<Option<String>> {
        let out = self
            .git()?
            .args(["rev-parse", "--verify", "-q", "HEAD"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()?;
        if !out.status.success() {
            return Ok(None);
        }
        let id = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if id.is_empty() {
            return Ok(None);
        }
        Ok(Some(id))
    }

    /// Create a commit object. The author triple is exported through the
    /// environment and the message is fed through stdin so it stays
    /// binary-safe. The committer comes from the usual environment/config.
    pub fn commit_tree(
        &self,
        tree: &str,
        parent: Option<&str>,
        name: &str,
        email: &str,
        date: &str,
        msg: &[u8],
    ) -> Result<String> {
        // Strict identity: no autofill from the environment.
        if name.trim().is_empty() {
            return Err(ApplyError::Fatal(format!(
                "empty ident name (for <{email}>) not allowed"
            )));
        }
        if email.trim().is_empty() {
            return Err(ApplyError::Fatal(format!(
                "empty ident email (for {name}) not allowed"
            )));
        }

        let mut cmd = self.git()?;
        cmd.arg("commit-tree").arg(tree);
        if let Some(p) = parent {
            cmd.arg("-p").arg(p);
        }
        cmd.env("GIT_AUTHOR_NAME", name);
        cmd.env("GIT_AUTHOR_EMAIL", email);
        if !date.trim().is_empty() {
            cmd.env("GIT_AUTHOR_DATE", date);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        child
            .stdin
            .take()
            .ok_or_else(|| ApplyError::Bug("commit-tree stdin not piped".to_string()))?
            .write_all(msg)?;
        let out = child.wait_with_output()?;
        if !out.status.success() {
            return Err(ApplyError::Fatal(format!(
                "failed to write commit object: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        let id = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if id.is_empty() {
            return Err(ApplyError::Fatal(
                "failed to write commit object: empty id".to_string(),
            ));
        }
        Ok(id)
    }

    /// Advance HEAD from `old` (None for an unborn branch) to `new`,
    /// recording `reflog_msg`. Compare-and-swap: a changed ref underneath
    /// us is a fatal error.
    pub fn update_head(&self, reflog_msg: &str, new: &str, old: Option<&str>) -> Result<()> {
        let mut cmd = self.git()?;
        cmd.arg("update-ref").arg("-m").arg(reflog_msg).arg("HEAD").arg(new);
        if let Some(old) = old {
            cmd.arg(old);
        }
        let out = cmd.stderr(Stdio::piped()).output()?;
        if !out.status.success() {
            return Err(ApplyError::Fatal(format!(
                "failed to update ref HEAD: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        Ok(())
    }

    /// Read a boolean config value, falling back to `default` when unset
    /// or unreadable.
    pub fn config_bool(&self, key: &str, default: bool) -> bool {
        let out = match self.git() {
            Ok(mut cmd) => cmd
                .args(["config", "--bool", "--get", key])
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .output(),
            Err(_) => return default,
        };
        match out {
            Ok(o) if o.status.success() => {
                match String::from_utf8_lossy(&o.stdout).trim() {
                    "true" => true,
                    "false" => false,
                    _ => default,
                }
            }
            _ => default,
        }
    }

    /// Kick off background maintenance after a completed run. Best-effort;
    /// a failure here must not fail the run.
    pub fn gc_auto(&self) {
        if let Ok(mut cmd) = self.git() {
            let _ = cmd.args(["gc", "--auto"]).status();
        }
    }
}

fn rev_parse_path(dir: &Path, flag: &str) -> Result<PathBuf> {
    let out = Command::new(git_binary()?)
        .current_dir(dir)
        .args(["rev-parse", flag])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()?;
    if !out.status.success() {
        return Err(ApplyError::Fatal(
            "not a git repository (or any of the parent directories)".to_string(),
        ));
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if s.is_empty() {
        return Err(ApplyError::Fatal(
            "not a git repository (or any of the parent directories)".to_string(),
        ));
    }
    Ok(PathBuf::from(s))
}
