//! Error mapping guide:
//! - Every unrecoverable failure maps to exit code 128 (I/O errors, parse
//!   failures, repository mutation failures, invariant violations).
//! - Exit code 1 is reserved for option-parsing errors and is produced in
//!   main, never through ApplyError.
//! - PatchFailed and EmptyPatch print their diagnostics at the failure site
//!   and leave the session directory on disk for a re-run.

use std::io;

#[derive(Debug)]
pub enum ApplyError {
    Io(io::Error),
    /// Unrecoverable failure with a user-facing message.
    Fatal(String),
    /// Internal invariant violation; rendered with a BUG prefix.
    Bug(String),
    /// The current patch did not apply. The message has already been
    /// printed; the session stays Armed so the user can fix up and re-run.
    PatchFailed,
    /// The splitter produced an empty patch body. The message has already
    /// been printed; the session stays Armed.
    EmptyPatch,
}

pub type Result<T> = std::result::Result<T, ApplyError>;

impl From<io::Error> for ApplyError {
    fn from(e: io::Error) -> Self {
        ApplyError::Io(e)
    }
}

/// Convert an ApplyError to a process exit code. All error outcomes of a
/// patch-application run are unrecoverable-or-resumable and exit 128.
pub fn exit_code_for_apply_error(_e: &ApplyError) -> u8 {
    128
}

/// Render a user-facing line for an ApplyError, or None when the failure
/// site already printed its diagnostics.
pub fn display_for_apply_error(e: &ApplyError) -> Option<String> {
    match e {
        ApplyError::Io(ioe) => Some(ioe.to_string()),
        ApplyError::Fatal(s) => Some(s.clone()),
        ApplyError::Bug(s) => Some(format!("BUG: {s}")),
        ApplyError::PatchFailed | ApplyError::EmptyPatch => None,
    }
}
