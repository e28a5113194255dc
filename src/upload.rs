//! Upload validation and storage.
//!
//! A filename passes validation iff its suffix after the last `.` is in
//! [`ALLOWED_EXTENSIONS`] (case-insensitive). Stored names are sanitized
//! before they touch the filesystem, so a hostile `filename` part can never
//! escape the upload directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// File extensions accepted by the upload routes.
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["txt", "pdf", "doc", "docx", "jpg", "jpeg", "png"];

/// Returns true iff `filename` contains a `.` and the lowercase suffix after
/// the last `.` is an allowed extension.
pub fn is_allowed(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Returns the lowercase extension of a filename, if any.
pub fn extension(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Sanitizes a client-supplied filename for on-disk storage.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; every other character
/// (including path separators) becomes `_`. Leading dots are stripped so the
/// result can never be a hidden file or a relative traversal component.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']).to_string();
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed
    }
}

/// Persists uploaded files under a configured directory.
///
/// Writes are overwrite-on-collision: two uploads with the same sanitized
/// name race and the last write wins, matching the documented semantics.
#[derive(Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the upload directory (and any scratch dirs) if absent.
    /// Idempotent; called once at process startup.
    pub fn ensure_dirs(upload_dir: &Path, temp_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(upload_dir)
            .with_context(|| format!("Failed to create upload dir: {}", upload_dir.display()))?;
        std::fs::create_dir_all(temp_dir)
            .with_context(|| format!("Failed to create temp dir: {}", temp_dir.display()))?;
        Ok(())
    }

    /// Writes `bytes` under the sanitized `desired_name`, returning the
    /// final stored name and its full path.
    pub async fn save(&self, desired_name: &str, bytes: &[u8]) -> Result<(String, PathBuf)> {
        let name = sanitize_filename(desired_name);
        let path = self.dir.join(&name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write upload: {}", path.display()))?;
        Ok((name, path))
    }

    /// Like [`save`](Self::save), but prefixes the stored name. Used for
    /// syllabus materials (`syllabus_<name>`).
    pub async fn save_with_prefix(
        &self,
        prefix: &str,
        desired_name: &str,
        bytes: &[u8],
    ) -> Result<(String, PathBuf)> {
        let name = sanitize_filename(desired_name);
        let stored = format!("{}{}", prefix, name);
        let path = self.dir.join(&stored);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write upload: {}", path.display()))?;
        Ok((name, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_known_extensions_case_insensitive() {
        assert!(is_allowed("notes.txt"));
        assert!(is_allowed("notes.TXT"));
        assert!(is_allowed("photo.JPEG"));
        assert!(is_allowed("syllabus.pdf"));
        assert!(is_allowed("essay.docx"));
    }

    #[test]
    fn rejects_unknown_extensions() {
        assert!(!is_allowed("virus.exe"));
        assert!(!is_allowed("archive.tar.gz"));
        assert!(!is_allowed("script.sh"));
    }

    #[test]
    fn rejects_missing_extension() {
        assert!(!is_allowed("noext"));
        assert!(!is_allowed(""));
    }

    #[test]
    fn only_last_suffix_counts() {
        assert!(is_allowed("report.exe.pdf"));
        assert!(!is_allowed("report.pdf.exe"));
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("/tmp/x.txt"), "tmp_x.txt");
        assert_eq!(sanitize_filename("a b c.pdf"), "a_b_c.pdf");
    }

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("notes-2024_final.txt"), "notes-2024_final.txt");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_filename(""), "unnamed");
        assert_eq!(sanitize_filename("..."), "unnamed");
        assert_eq!(sanitize_filename("///"), "unnamed");
    }

    #[tokio::test]
    async fn save_writes_sanitized_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = UploadStore::new(tmp.path());
        let (name, path) = store.save("my notes.txt", b"hello").await.unwrap();
        assert_eq!(name, "my_notes.txt");
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn save_with_prefix_returns_unprefixed_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = UploadStore::new(tmp.path());
        let (name, path) = store
            .save_with_prefix("syllabus_", "bio.txt", b"cells")
            .await
            .unwrap();
        assert_eq!(name, "bio.txt");
        assert!(path.ends_with("syllabus_bio.txt"));
        assert!(path.exists());
    }
}
