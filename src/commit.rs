//! Commit driver: turn the already-applied staging area into a commit on
//! the current branch, preserving the patch author's identity.

use std::env;

use crate::errors::Result;
use crate::first_line_lossy;
use crate::repo::Repo;

/// Commit the staged tree with `msg` as the commit message and the given
/// author triple. The parent is the current HEAD commit; an unborn HEAD
/// yields a parentless commit and a stderr notice.
pub fn commit_current(
    repo: &Repo,
    name: &str,
    email: &str,
    date: &str,
    msg: &[u8],
) -> Result<()> {
    let tree = repo.write_tree()?;

    let parent = repo.head_commit()?;
    if parent.is_none() {
        eprintln!("applying to an empty history");
    }

    let commit = repo.commit_tree(&tree, parent.as_deref(), name, email, date, msg)?;

    let action = env::var("GIT_REFLOG_ACTION").unwrap_or_else(|_| "am".to_string());
    let reflog_msg = format!("{}: {}", action, first_line_lossy(msg));
    repo.update_head(&reflog_msg, &commit, parent.as_deref())?;

    tracing::debug!(%commit, "advanced HEAD");
    Ok(())
}
