//! File read/write tools.

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use super::resolve;

pub fn read_file(workdir: &Path, path: &str) -> String {
    let full = resolve(workdir, path);
    match fs::read_to_string(&full) {
        Ok(contents) => {
            debug!(path = %full.display(), bytes = contents.len(), "read file");
            contents
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            format!("Error: File not found at {path}")
        }
        Err(e) => format!("Error reading file: {e}"),
    }
}

/// Create or truncate `path`, creating missing parent directories.
pub fn write_file(workdir: &Path, path: &str, content: &str) -> String {
    let full = resolve(workdir, path);
    let result = full
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| fs::write(&full, content));
    match result {
        Ok(()) => {
            debug!(path = %full.display(), bytes = content.len(), "wrote file");
            format!("File written successfully to {path}")
        }
        Err(e) => format!("Error writing file: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_path() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            read_file(temp.path(), "nope.txt"),
            "Error: File not found at nope.txt"
        );
    }

    #[test]
    fn write_creates_parents_then_read_returns_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert_eq!(
            write_file(temp.path(), "out/data.csv", "a,b\n1,2"),
            "File written successfully to out/data.csv"
        );
        assert_eq!(read_file(temp.path(), "out/data.csv"), "a,b\n1,2");
    }

    #[test]
    fn write_truncates_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("f.txt"), "long original text").expect("seed");
        write_file(temp.path(), "f.txt", "short");
        assert_eq!(read_file(temp.path(), "f.txt"), "short");
    }

    #[test]
    fn reading_a_directory_is_a_read_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("dir")).expect("mkdir");
        assert!(read_file(temp.path(), "dir").starts_with("Error reading file: "));
    }
}
