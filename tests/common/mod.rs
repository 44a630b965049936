#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// True when a usable git binary is on PATH. Tests that drive real
/// repositories skip with a note when it is absent.
pub fn git_available() -> bool {
    mailpatch::git_binary().is_ok()
}

/// Run git in `repo`, asserting success, and return trimmed stdout.
pub fn git_out(repo: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .current_dir(repo)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Initialize a scratch repository with a committer identity configured.
/// Global/system git config is masked so host settings (signing, hooks,
/// templates) cannot leak into the scratch repos or the subprocesses the
/// library spawns from this test binary.
pub fn init_repo(dir: &Path) {
    std::env::set_var("GIT_CONFIG_GLOBAL", "/dev/null");
    std::env::set_var("GIT_CONFIG_SYSTEM", "/dev/null");
    git_out(dir, &["init", "-q", "-b", "main"]);
    git_out(dir, &["config", "user.name", "Tester"]);
    git_out(dir, &["config", "user.email", "tester@local"]);
    // Keep the scratch repos quiet and self-contained
    git_out(dir, &["config", "gc.auto", "0"]);
}

/// Create an initial commit so HEAD exists.
pub fn seed_commit(dir: &Path) {
    std::fs::write(dir.join(".seed"), "seed\n").expect("write seed");
    git_out(dir, &["add", ".seed"]);
    git_out(dir, &["commit", "-q", "-m", "initial"]);
}

/// One mbox message whose patch creates `filename` with `content`.
/// `content` must be a single newline-terminated line. The diff carries no
/// `index` line; git apply does not need one to create a file.
pub fn mbox_add_file_message(
    subject: &str,
    author: &str,
    email: &str,
    date: &str,
    filename: &str,
    content: &str,
    body: &str,
) -> String {
    assert!(content.ends_with('\n') && content.matches('\n').count() == 1);
    let line = content.trim_end_matches('\n');
    format!(
        "From 1234567890abcdef1234567890abcdef12345678 Mon Sep 17 00:00:00 2001\n\
From: {author} <{email}>\n\
Date: {date}\n\
Subject: [PATCH] {subject}\n\
\n\
{body}---\n\
 {filename} | 1 +\n\
 1 file changed, 1 insertion(+)\n\
\n\
diff --git a/{filename} b/{filename}\n\
new file mode 100644\n\
--- /dev/null\n\
+++ b/{filename}\n\
@@ -0,0 +1 @@\n\
+{line}\n"
    )
}

/// A message with headers but no diff at all; the splitter accepts it and
/// the parser produces an empty patch body.
pub fn mbox_empty_patch_message(subject: &str) -> String {
    format!(
        "From 1234567890abcdef1234567890abcdef12345678 Mon Sep 17 00:00:00 2001\n\
From: Ada <ada@x>\n\
Date: Wed, 1 Jan 2020 00:00:00 +0000\n\
Subject: [PATCH] {subject}\n\
\n\
only prose, no patch\n"
    )
}

/// Build a repository + mbox pair and return (tempdir, repo path, mbox path).
pub fn repo_with_mbox(messages: &[String]) -> (tempfile::TempDir, PathBuf, PathBuf) {
    let td = tempfile::tempdir().expect("tmpdir");
    let repo = td.path().join("repo");
    std::fs::create_dir(&repo).expect("mkdir repo");
    init_repo(&repo);
    let mbox = td.path().join("input.mbox");
    std::fs::write(&mbox, messages.concat()).expect("write mbox");
    (td, repo, mbox)
}

/// Apply the whole mbox through the library state machine.
pub fn run_apply(repo: &Path, mbox: &Path) -> mailpatch::Result<()> {
    let r = mailpatch::Repo::discover(repo)?;
    let mut state = mailpatch::ApplyState::new(r.session_dir_path());
    state.setup(&r, None, &[mbox.to_path_buf()])?;
    state.run(&r)
}
