use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

mod cli;

use crate::cli::Cli;
use mailpatch::{
    acquire_lock_at, color_enabled_stderr, display_for_apply_error, exit_code_for_apply_error,
    log_error_stderr, ApplyError, ApplyState, PatchFormat, Repo,
};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are not errors; everything else is an
            // option-parsing failure and exits 1.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    mailpatch::telemetry_init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(msg) = display_for_apply_error(&e) {
                log_error_stderr(color_enabled_stderr(), &msg);
            }
            ExitCode::from(exit_code_for_apply_error(&e))
        }
    }
}

fn run(cli: &Cli) -> mailpatch::Result<()> {
    let cwd = env::current_dir()?;
    let repo = Repo::discover(&cwd)?;

    // One running instance per repository; the guard removes the lock
    // file when the process exits, on success and failure alike.
    let _lock = acquire_lock_at(&repo.git_dir().join("mailpatch.lock"))
        .map_err(|e| ApplyError::Fatal(e.to_string()))?;

    let mut state = ApplyState::new(repo.session_dir_path());

    if state.in_progress() {
        state.load()?;
    } else {
        let paths = resolve_input_paths(&cli.paths, &cwd);
        let format = cli.patch_format.map(PatchFormat::from);
        state.setup(&repo, format, &paths)?;
    }

    state.run(&repo)
}

/// Resolve the positional inputs before the session starts: relative paths
/// are anchored at the invocation working directory (the run loop itself
/// executes from the worktree root), and a lone `-` collapses to the empty
/// list, meaning standard input.
fn resolve_input_paths(paths: &[PathBuf], cwd: &std::path::Path) -> Vec<PathBuf> {
    if paths.len() == 1 && paths[0] == std::path::Path::new("-") {
        return Vec::new();
    }
    paths
        .iter()
        .map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                cwd.join(p)
            }
        })
        .collect()
}
