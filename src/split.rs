//! Mail splitter driver: turn the input mailboxes/Maildirs into numbered
//! single-message files inside the session directory.

use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use crate::format::PatchFormat;
use crate::repo::Repo;
use crate::session::SessionDir;

/// Split `paths` into individual messages named by index, zero-padded to
/// `prec` digits, in the session directory. Returns the highest index
/// written. Any failure (spawn, nonzero exit, unparseable output) is an
/// error; the caller destroys the partially-populated session.
pub fn split_mail(
    format: PatchFormat,
    repo: &Repo,
    session: &SessionDir,
    prec: usize,
    paths: &[PathBuf],
) -> io::Result<u32> {
    match format {
        PatchFormat::Mbox => split_mail_mbox(repo, session, prec, paths),
    }
}

fn split_mail_mbox(
    repo: &Repo,
    session: &SessionDir,
    prec: usize,
    paths: &[PathBuf],
) -> io::Result<u32> {
    let mut cmd = repo.git()?;
    cmd.arg("mailsplit")
        .arg(format!("-d{prec}"))
        .arg(format!("-o{}", session.dir().display()))
        .arg("-b")
        .arg("--");
    // A lone "-" was already normalized away; no paths means the splitter
    // reads the mailbox from our stdin.
    for p in paths {
        cmd.arg(p);
    }
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let out = cmd.output()?;
    if !out.status.success() {
        return Err(io::Error::other(format!(
            "mailsplit exited with {}",
            out.status
        )));
    }

    let stdout = String::from_utf8_lossy(&out.stdout);
    let last: u32 = stdout
        .trim()
        .parse()
        .map_err(|_| io::Error::other(format!("unexpected mailsplit output: {stdout:?}")))?;

    tracing::debug!(last, "mail split into session directory");
    Ok(last)
}
