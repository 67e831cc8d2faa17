use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::report::WriteOutcome;
use crate::error::Result;

/// Write `text` to `dir/file_name` atomically, leaving identical files untouched.
///
/// The content goes to a temporary file in `dir` first, which is then persisted over the
/// target, so readers never observe a half-written unit.
pub(crate) fn write_unit(dir: &Path, file_name: &str, text: &str) -> Result<(PathBuf, WriteOutcome)> {
    fs::create_dir_all(dir)?;
    let target = dir.join(file_name);
    if fs::read(&target).is_ok_and(|existing| existing == text.as_bytes()) {
        return Ok((target, WriteOutcome::Unchanged));
    }
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(text.as_bytes())?;
    temp.flush()?;
    temp.persist(&target).map_err(|err| err.error)?;
    Ok((target, WriteOutcome::Written))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let (path, first) = write_unit(dir.path(), "sample.rs", "pub const A: i32 = 1;\n").unwrap();
        assert_eq!(first, WriteOutcome::Written);
        let (_, second) = write_unit(dir.path(), "sample.rs", "pub const A: i32 = 1;\n").unwrap();
        assert_eq!(second, WriteOutcome::Unchanged);
        let (_, third) = write_unit(dir.path(), "sample.rs", "pub const A: i32 = 2;\n").unwrap();
        assert_eq!(third, WriteOutcome::Written);
        assert_eq!(fs::read_to_string(path).unwrap(), "pub const A: i32 = 2;\n");
    }

    #[test]
    fn creates_missing_directories_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("gen/bindings");
        write_unit(&nested, "Sample.h", "#define A 1\n").unwrap();
        let names: Vec<_> = fs::read_dir(&nested)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["Sample.h".to_string()]);
    }
}
