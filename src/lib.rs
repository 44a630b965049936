//! mailpatch: apply a queue of email-formatted patches onto the current
//! branch, one commit per patch, preserving original authorship.
//!
//! The work is resumable: per-patch state is persisted in a session
//! directory inside the git directory, every transition is crash-safe,
//! and re-invoking the command continues where an interrupted run left
//! off. The mail splitter, mail parser and patch applier are external
//! `git` plumbing tools driven as subprocesses; this crate owns the state
//! machine that sequences them.

pub mod author;
pub mod color;
pub mod commit;
pub mod errors;
pub mod format;
pub mod lock;
pub mod mailinfo;
pub mod repo;
pub mod session;
pub mod split;
pub mod state;
mod telemetry;

pub use author::{decode_author_script, encode_author_script, sq_dequote, sq_quote};
pub use color::{
    color_enabled_stderr, color_enabled_stdout, log_error_stderr, log_info_stderr, paint,
    set_color_mode, ColorMode,
};
pub use errors::{display_for_apply_error, exit_code_for_apply_error, ApplyError, Result};
pub use format::{detect_patch_format, PatchFormat};
pub use lock::{acquire_lock_at, SessionLock};
pub use mailinfo::stripspace;
pub use repo::{git_binary, Repo};
pub use session::SessionDir;
pub use state::{ApplyState, MSGNUM_PREC};
pub use telemetry::telemetry_init;

/// First line of a message buffer, lossily decoded for display.
pub fn first_line_lossy(msg: &[u8]) -> String {
    let line = msg.split(|&b| b == b'\n').next().unwrap_or_default();
    String::from_utf8_lossy(line).into_owned()
}
