/// Attachment file storage
///
/// Files are addressed by string keys of the form `<owner_id>/<stored_filename>`.
/// The owner is always the task's owner, so a shared user downloading an
/// attachment resolves the same key as the owner.
///
/// # Example
///
/// ```no_run
/// use taskdeck_shared::storage::{object_key, stored_filename, AttachmentStore, LocalDiskStore};
/// use bytes::Bytes;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = LocalDiskStore::new("uploads");
/// let owner = Uuid::new_v4();
/// let name = stored_filename("report.pdf", chrono::Utc::now())?;
///
/// store.put(&object_key(owner, &name), Bytes::from_static(b"%PDF")).await?;
/// # Ok(())
/// # }
/// ```

mod local;

pub use local::LocalDiskStore;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// File extensions accepted for upload (compared case-insensitively)
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "png", "jpg", "jpeg", "gif", "doc", "docx", "xls", "xlsx", "ppt", "pptx",
    "csv", "zip",
];

/// Default upload ceiling (16 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Error type for attachment storage
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("store error: {0}")]
    Internal(String),
}

/// A store for attachment bytes keyed by `<owner>/<filename>` paths
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Write (create or overwrite) a file.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), StoreError>;

    /// Read a file. Returns `StoreError::NotFound` if absent.
    async fn get(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Delete a file. No-op if absent.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Delete everything under a prefix (one owner's directory). No-op if absent.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), StoreError>;
}

/// Key of a stored file inside its owner's directory
pub fn object_key(owner: Uuid, stored_filename: &str) -> String {
    format!("{owner}/{stored_filename}")
}

/// Key prefix covering all of an owner's files
pub fn owner_prefix(owner: Uuid) -> String {
    owner.to_string()
}

/// Lowercased extension of `filename`, if any
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Checks the extension against [`ALLOWED_EXTENSIONS`]
pub fn is_allowed_file(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Reduces a client-supplied filename to a safe single path component
///
/// Directory parts are dropped, whitespace becomes `_`, and anything outside
/// ASCII letters, digits, `.`, `-`, `_` is removed. Leading dots and
/// underscores are stripped so the result is never hidden or relative.
///
/// # Example
///
/// ```
/// use taskdeck_shared::storage::sanitize_filename;
///
/// assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
/// assert_eq!(sanitize_filename("My Report (final).pdf"), "My_Report_final.pdf");
/// ```
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Builds the on-disk name `<sanitized_stem>_<YYYYMMDDHHMMSS_micro>.<ext>`
///
/// # Errors
///
/// Returns a message if the name is empty or its extension is not allowed
pub fn stored_filename(original: &str, now: DateTime<Utc>) -> Result<String, String> {
    if original.trim().is_empty() {
        return Err("No file selected".to_string());
    }

    if !is_allowed_file(original) {
        return Err(format!(
            "File type not allowed. Allowed types: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ));
    }

    let sanitized = sanitize_filename(original);
    let (stem, ext) = match sanitized.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            (stem.to_string(), ext.to_ascii_lowercase())
        }
        // Nothing usable survived sanitizing; keep the validated extension
        _ => (
            "file".to_string(),
            file_extension(original).unwrap_or_default(),
        ),
    };

    Ok(format!(
        "{}_{}.{}",
        stem,
        now.format("%Y%m%d%H%M%S_%6f"),
        ext
    ))
}

/// Rejects keys that could escape the store root
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key
            .split('/')
            .any(|part| part.is_empty() || part == "." || part == "..");

    if bad {
        return Err(StoreError::InvalidKey(key.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 14, 5, 9).unwrap()
            + chrono::Duration::microseconds(42)
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.PDF"), Some("pdf".to_string()));
        assert_eq!(file_extension("archive.tar.zip"), Some("zip".to_string()));
        assert_eq!(file_extension("noext"), None);
        assert_eq!(file_extension(".hidden"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_is_allowed_file() {
        assert!(is_allowed_file("notes.txt"));
        assert!(is_allowed_file("photo.JPEG"));
        assert!(!is_allowed_file("script.sh"));
        assert!(!is_allowed_file("binary.exe"));
        assert!(!is_allowed_file("README"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("simple.txt"), "simple.txt");
        assert_eq!(sanitize_filename("C:\\Users\\me\\doc.docx"), "doc.docx");
        assert_eq!(sanitize_filename("../secret.txt"), "secret.txt");
        assert_eq!(sanitize_filename("..."), "");
        assert_eq!(sanitize_filename("résumé.pdf"), "rsum.pdf");
    }

    #[test]
    fn test_stored_filename_format() {
        let name = stored_filename("Quarterly Report.PDF", fixed_time()).unwrap();
        assert_eq!(name, "Quarterly_Report_20250310140509_000042.pdf");
    }

    #[test]
    fn test_stored_filename_falls_back_to_generic_stem() {
        let name = stored_filename("日本.png", fixed_time()).unwrap();
        assert_eq!(name, "file_20250310140509_000042.png");
    }

    #[test]
    fn test_stored_filename_rejects_bad_input() {
        assert_eq!(stored_filename("", fixed_time()).unwrap_err(), "No file selected");
        assert!(stored_filename("malware.exe", fixed_time())
            .unwrap_err()
            .starts_with("File type not allowed"));
    }

    #[test]
    fn test_object_key() {
        let owner = Uuid::nil();
        assert_eq!(
            object_key(owner, "a_1.txt"),
            "00000000-0000-0000-0000-000000000000/a_1.txt"
        );
        assert_eq!(owner_prefix(owner), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("owner/file.txt").is_ok());
        assert!(validate_key("owner").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("owner/../other/file").is_err());
        assert!(validate_key("owner//file").is_err());
    }
}
