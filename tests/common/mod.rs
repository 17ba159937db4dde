//! Shared fixtures for probetree CLI tests.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;

/// `root/{a.txt, b/{c.txt}}` inside a fresh temp dir.
pub fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    dir.child("a.txt").touch().unwrap();
    dir.child("b").create_dir_all().unwrap();
    dir.child("b/c.txt").touch().unwrap();
    dir
}

/// The binary with its working directory set to `cwd` and a quiet logger.
pub fn probetree(cwd: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("probetree").unwrap();
    cmd.current_dir(cwd.path()).env_remove("RUST_LOG");
    cmd
}

/// Expected plain output of `sample_tree` below `root`.
pub fn sample_listing(root: &str) -> String {
    format!("{root}\n├── a.txt\n└── b\n    └── c.txt\n")
}
