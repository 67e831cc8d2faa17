use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;
use walkdir::WalkDir;

pub fn fixture(rel_path: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(rel_path)
}

/// Copy `tests/fixtures/<name>` into a fresh temporary directory.
pub fn copy_fixture(name: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let source = fixture(name);
    for entry in WalkDir::new(&source) {
        let entry = entry.unwrap_or_else(|err| panic!("walk {}: {err}", source.display()));
        let relative = entry
            .path()
            .strip_prefix(&source)
            .unwrap_or_else(|err| panic!("strip prefix: {err}"));
        let target = dir.path().join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .unwrap_or_else(|err| panic!("create dir {}: {err}", target.display()));
        } else {
            fs::copy(entry.path(), &target)
                .unwrap_or_else(|err| panic!("copy {}: {err}", entry.path().display()));
        }
    }
    dir
}

// Only the CLI tests spawn the binary.
#[allow(dead_code)]
pub fn natbind_cmd() -> Command {
    let mut cmd = Command::cargo_bin("natbind").unwrap_or_else(|err| panic!("natbind binary: {err}"));
    for key in [
        "NATBIND_LOG_FORMAT",
        "NATBIND_LOG_LEVEL",
        "NATBIND_ERROR_FORMAT",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

#[allow(dead_code)]
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}
