//! Patch format detection.
//!
//! Input batches are classified by looking at the first file: a Unix mbox
//! "From " line or an RFC-2822 "From: " header settles it immediately;
//! otherwise the leading lines are probed as mail headers. Directories,
//! stdin and empty path lists default to the mailbox format.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::bytes::Regex;

/// Formats the splitter knows how to take apart. Detection failure is
/// modeled as None rather than a variant, so every PatchFormat value is
/// splittable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatchFormat {
    Mbox,
}

/// RFC-2822 header field names: printable US-ASCII except colon and space.
static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[!-9;-~]+:").unwrap());

/// Read one line, treating both `\n` and `\r\n` as terminators. Returns
/// Ok(false) at EOF. The terminator is not included in `buf`.
pub(crate) fn read_line_crlf<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<bool> {
    buf.clear();
    let n = reader.read_until(b'\n', buf)?;
    if n == 0 {
        return Ok(false);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(true)
}

/// Decide whether the remaining lines look like a piece of RFC-2822 mail:
/// every non-indented line before the first empty line must begin with a
/// valid header field name. `first` is the already-consumed first
/// non-blank line and is probed too.
fn is_mail<R: BufRead>(first: &[u8], reader: &mut R) -> io::Result<bool> {
    if !HEADER_RE.is_match(first) {
        return Ok(false);
    }
    let mut line = Vec::new();
    while read_line_crlf(reader, &mut line)? {
        if line.is_empty() {
            break; // end of header
        }
        // Indented folded lines belong to the previous header
        if line[0] == b' ' || line[0] == b'\t' {
            continue;
        }
        if !HEADER_RE.is_match(&line) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Attempt to detect the patch format of the batch in `paths`. Returns
/// Ok(None) when detection fails; the caller turns that into a fatal
/// error.
pub fn detect_patch_format(paths: &[impl AsRef<Path>]) -> io::Result<Option<PatchFormat>> {
    // Stdin and directories default to mbox
    let first = match paths.first() {
        None => return Ok(Some(PatchFormat::Mbox)),
        Some(p) => p.as_ref(),
    };
    if first == Path::new("-") || first.is_dir() {
        return Ok(Some(PatchFormat::Mbox));
    }

    // Otherwise check the first few lines of the first patch, starting
    // from the first non-blank line.
    let mut reader = BufReader::new(File::open(first)?);
    let mut l1 = Vec::new();
    while read_line_crlf(&mut reader, &mut l1)? {
        if !l1.is_empty() {
            break;
        }
    }

    if l1.starts_with(b"From ") || l1.starts_with(b"From: ") {
        return Ok(Some(PatchFormat::Mbox));
    }

    if !l1.is_empty() && is_mail(&l1, &mut reader)? {
        return Ok(Some(PatchFormat::Mbox));
    }

    Ok(None)
}
