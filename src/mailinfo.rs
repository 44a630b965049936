//! Per-patch parser: drive the external mail parser over one numbered
//! message and turn its output into a commit message plus author identity.
//!
//! The parser child reads the message on stdin and emits a `Key: value`
//! summary on stdout (captured into the session's `info` file); as side
//! effects it writes the trimmed body to `msg` and the unidiff to `patch`.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::errors::{ApplyError, Result};
use crate::repo::Repo;
use crate::session::SessionDir;

/// Everything extracted from one message.
pub struct ParsedMail {
    pub author_name: String,
    pub author_email: String,
    pub author_date: String,
    /// Composed commit message: subject, blank line, normalized body.
    pub msg: Vec<u8>,
}

/// Accumulated `info` summary. Subject lines concatenate; the identity
/// fields keep only the first value seen.
#[derive(Default)]
pub(crate) struct InfoSummary {
    pub subject: String,
    pub author: String,
    pub email: String,
    pub date: String,
}

pub(crate) fn read_info_summary<R: BufRead>(reader: R) -> io::Result<InfoSummary> {
    let mut info = InfoSummary::default();
    for line in reader.lines() {
        let line = line?;
        if let Some(rest) = line.strip_prefix("Subject: ") {
            if !info.subject.is_empty() {
                info.subject.push('\n');
            }
            info.subject.push_str(rest);
        } else if let Some(rest) = line.strip_prefix("Author: ") {
            if info.author.is_empty() {
                info.author.push_str(rest);
            }
        } else if let Some(rest) = line.strip_prefix("Email: ") {
            if info.email.is_empty() {
                info.email.push_str(rest);
            }
        } else if let Some(rest) = line.strip_prefix("Date: ") {
            if info.date.is_empty() {
                info.date.push_str(rest);
            }
        }
    }
    Ok(info)
}

/// Commit-message whitespace normalization: strip trailing whitespace from
/// every line, drop leading and trailing blank lines, and collapse runs of
/// internal blank lines to a single one. Every emitted line is
/// newline-terminated.
pub fn stripspace(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut pending_blank = false;
    for line in input.split(|&b| b == b'\n') {
        let end = line
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map(|i| i + 1)
            .unwrap_or(0);
        let line = &line[..end];
        if line.is_empty() {
            pending_blank = true;
            continue;
        }
        if pending_blank && !out.is_empty() {
            out.push(b'\n');
        }
        pending_blank = false;
        out.extend_from_slice(line);
        out.push(b'\n');
    }
    out
}

fn is_empty_file(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(m) => Ok(m.len() == 0),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

/// Parse `mail`, leaving `info`, `msg` and `patch` in the session
/// directory. Returns Ok(None) when the message is mail-system metadata
/// that should be skipped without a commit.
pub fn parse_mail(repo: &Repo, session: &SessionDir, mail: &Path) -> Result<Option<ParsedMail>> {
    let stdin = File::open(mail)?;
    let stdout = File::create(session.path_in("info"))?;

    let mut cmd = repo.git()?;
    cmd.arg("mailinfo")
        .arg(session.path_in("msg"))
        .arg(session.path_in("patch"))
        .stdin(stdin)
        .stdout(stdout);

    let status = cmd
        .status()
        .map_err(|_| ApplyError::Fatal("could not parse patch".to_string()))?;
    if !status.success() {
        return Err(ApplyError::Fatal("could not parse patch".to_string()));
    }

    let info = read_info_summary(BufReader::new(File::open(session.path_in("info"))?))?;

    // Skip stray mail-system folder metadata (pine keeps its internal
    // state as a pseudo-message at the start of a folder).
    if info.author == "Mail System Internal Data" {
        tracing::debug!(mail = %mail.display(), "skipping internal folder data");
        return Ok(None);
    }

    if is_empty_file(&session.path_in("patch"))? {
        eprintln!("Patch is empty. Was it split wrong?");
        return Err(ApplyError::EmptyPatch);
    }

    let mut msg = Vec::new();
    msg.extend_from_slice(info.subject.as_bytes());
    msg.extend_from_slice(b"\n\n");
    msg.extend_from_slice(&fs::read(session.path_in("msg"))?);
    let msg = stripspace(&msg);

    Ok(Some(ParsedMail {
        author_name: info.author,
        author_email: info.email,
        author_date: info.date,
        msg,
    }))
}
