//! Maildir inputs are treated uniformly with mbox by the splitter.

mod common;

use common::*;

#[test]
fn test_maildir_directory_applies() {
    if !git_available() {
        eprintln!("skipping: git not found in PATH");
        return;
    }

    let (_td, repo, _mbox) = repo_with_mbox(&[]);
    seed_commit(&repo);

    // A minimal Maildir: cur/new/tmp with one message in new/. Maildir
    // messages are bare RFC-2822, no mbox "From " line.
    let maildir = repo.parent().unwrap().join("inbox");
    for sub in ["cur", "new", "tmp"] {
        std::fs::create_dir_all(maildir.join(sub)).unwrap();
    }
    let msg = mbox_add_file_message(
        "Add foo",
        "Ada",
        "ada@x",
        "Wed, 1 Jan 2020 00:00:00 +0000",
        "foo",
        "hello\n",
        "",
    );
    let bare = msg
        .split_once('\n')
        .map(|(_, rest)| rest)
        .unwrap()
        .to_string();
    std::fs::write(maildir.join("new").join("1000000000.M1P1.host"), bare).unwrap();

    let r = mailpatch::Repo::discover(&repo).unwrap();
    let mut state = mailpatch::ApplyState::new(r.session_dir_path());
    state.setup(&r, None, &[maildir]).expect("setup failed");
    state.run(&r).expect("run failed");

    assert_eq!(git_out(&repo, &["log", "-1", "--format=%s"]), "Add foo");
    assert!(repo.join("foo").exists());
}
