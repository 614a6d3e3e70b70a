//! Terminal rendering, notifications and save-path prompting.

use std::ffi::OsStr;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use exchange_client::{ExchangeError, PathProvider, RemoteFileEntry};

/// Write a user-facing notification to stderr.
pub fn notify(title: &str, message: &str) {
    eprintln!("{}: {}", title, message);
}

pub fn notify_error(err: &ExchangeError) {
    notify(err.title(), &err.to_string());
}

/// Render the listing as a name / size / last-modified table.
pub fn format_listing(entries: &[RemoteFileEntry]) -> String {
    if entries.is_empty() {
        return "No files.\n".to_string();
    }

    let width = entries
        .iter()
        .map(|e| e.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let mut out = format!(
        "{:<width$}  {:>12}  {}\n",
        "NAME",
        "SIZE",
        "LAST MODIFIED",
        width = width
    );
    for entry in entries {
        out.push_str(&format!(
            "{:<width$}  {:>12}  {}\n",
            entry.name,
            entry.size,
            entry.last_modified,
            width = width
        ));
    }
    out
}

pub fn print_listing(entries: &[RemoteFileEntry]) {
    print!("{}", format_listing(entries));
}

/// Final component of a remote name, or `None` if it has none (`..`, `/`).
/// A remote name only ever becomes a file name, never a path.
pub fn local_file_name(suggested: &str) -> Option<&OsStr> {
    Path::new(suggested).file_name()
}

/// Read one save-path answer from `input`.
///
/// End of input cancels; an empty answer accepts the suggested name in the
/// current directory.
pub fn read_save_path(input: &mut impl BufRead, suggested: &str) -> Option<PathBuf> {
    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            let answer = line.trim();
            if answer.is_empty() {
                local_file_name(suggested).map(PathBuf::from)
            } else {
                Some(PathBuf::from(answer))
            }
        }
    }
}

/// Asks on the terminal where to save a download.
pub struct PromptPath;

impl PathProvider for PromptPath {
    fn save_path(&self, suggested_name: &str) -> Option<PathBuf> {
        eprint!("Save as [{}]: ", suggested_name);
        let _ = io::stderr().flush();
        read_save_path(&mut io::stdin().lock(), suggested_name)
    }
}

/// Saves to a fixed path. A directory receives the suggested name.
pub struct OutputPath(pub PathBuf);

impl OutputPath {
    fn resolve(path: &Path, suggested_name: &str) -> Option<PathBuf> {
        if path.is_dir() {
            local_file_name(suggested_name).map(|name| path.join(name))
        } else {
            Some(path.to_path_buf())
        }
    }
}

impl PathProvider for OutputPath {
    fn save_path(&self, suggested_name: &str) -> Option<PathBuf> {
        Self::resolve(&self.0, suggested_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn entry(name: &str, size: u64) -> RemoteFileEntry {
        RemoteFileEntry {
            name: name.to_string(),
            size,
            last_modified: "2024-06-01T08:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_format_empty_listing() {
        assert_eq!(format_listing(&[]), "No files.\n");
    }

    #[test]
    fn test_format_listing_rows() {
        let out = format_listing(&[entry("Archive.zip", 2048), entry("report.pdf", 10)]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("NAME"));
        assert!(lines[1].starts_with("Archive.zip"));
        assert!(lines[1].contains("2048"));
        assert!(lines[2].ends_with("2024-06-01T08:00:00Z"));
    }

    #[test]
    fn test_read_save_path_default() {
        let mut input = Cursor::new("\n");
        assert_eq!(
            read_save_path(&mut input, "doc.pdf"),
            Some(PathBuf::from("doc.pdf"))
        );
    }

    #[test]
    fn test_read_save_path_answer() {
        let mut input = Cursor::new("  /tmp/out.pdf \n");
        assert_eq!(
            read_save_path(&mut input, "doc.pdf"),
            Some(PathBuf::from("/tmp/out.pdf"))
        );
    }

    #[test]
    fn test_read_save_path_eof_cancels() {
        let mut input = Cursor::new("");
        assert_eq!(read_save_path(&mut input, "doc.pdf"), None);
    }

    #[test]
    fn test_output_path_directory_gets_suggested_name() {
        let dir = TempDir::new().unwrap();
        let provider = OutputPath(dir.path().to_path_buf());
        assert_eq!(
            provider.save_path("doc.pdf"),
            Some(dir.path().join("doc.pdf"))
        );
    }

    #[test]
    fn test_output_path_directory_keeps_remote_name_inside() {
        let dir = TempDir::new().unwrap();
        let provider = OutputPath(dir.path().to_path_buf());
        assert_eq!(
            provider.save_path("/etc/evil.conf"),
            Some(dir.path().join("evil.conf"))
        );
        assert_eq!(
            provider.save_path("../../evil"),
            Some(dir.path().join("evil"))
        );
        assert_eq!(provider.save_path(".."), None);
    }

    #[test]
    fn test_read_save_path_default_strips_directories() {
        let mut input = Cursor::new("\n");
        assert_eq!(
            read_save_path(&mut input, "../secrets/doc.pdf"),
            Some(PathBuf::from("doc.pdf"))
        );
        let mut input = Cursor::new("\n");
        assert_eq!(read_save_path(&mut input, "/"), None);
    }

    #[test]
    fn test_output_path_file_is_used_as_is() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("renamed.pdf");
        let provider = OutputPath(target.clone());
        assert_eq!(provider.save_path("doc.pdf"), Some(target));
    }
}
