//! Text file serving pipeline
//!
//! The validation and safe-path-resolution sequence: filename extraction,
//! extension allow-listing, canonical containment, and UTF-8 file reads.
//! Carries no HTTP types so it can be tested without a running server.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::http::mime;
use crate::logger;

/// Why a file request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeError {
    /// `filename` query parameter absent or empty
    MissingParameter,
    /// Extension outside the allow-list
    InvalidExtension,
    /// Resolved path escapes the base directory
    AccessDenied,
    /// No regular file at the validated path
    NotFound,
    /// Read failure whose detail must stay out of the response
    Internal,
}

impl ServeError {
    /// HTTP status code this failure maps to
    pub const fn status(self) -> u16 {
        match self {
            Self::MissingParameter | Self::InvalidExtension => 400,
            Self::AccessDenied => 403,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }

    /// Fixed client-facing message, never carries internal detail
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingParameter => "Missing filename parameter.",
            Self::InvalidExtension => {
                "Invalid file extension; only .txt and .html are allowed."
            }
            Self::AccessDenied => "Access denied.",
            Self::NotFound => "File not found in directory.",
            Self::Internal => "Internal server error.",
        }
    }
}

/// A successfully loaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedFile {
    pub content: String,
    pub content_type: &'static str,
}

/// Validate `filename` and read the matching file under `base_dir`.
///
/// `base_dir` must already be canonical; it is resolved once at startup.
/// Every gate fails fast, and every failure kind maps onto exactly one
/// status code and message.
pub async fn serve(base_dir: &Path, filename: Option<&str>) -> Result<ServedFile, ServeError> {
    let filename = match filename {
        Some(name) if !name.is_empty() => name,
        _ => return Err(ServeError::MissingParameter),
    };

    let content_type = allowed_content_type(filename).ok_or(ServeError::InvalidExtension)?;

    let path = resolve_contained(base_dir, filename).await?;
    let content = read_text_file(&path).await?;

    Ok(ServedFile {
        content,
        content_type,
    })
}

/// Map the filename's extension (after the last `.`, lower-cased) through
/// the allow-list. A filename without a `.` has no extension.
fn allowed_content_type(filename: &str) -> Option<&'static str> {
    let (_, extension) = filename.rsplit_once('.')?;
    mime::content_type_for(&extension.to_ascii_lowercase())
}

/// Resolve `filename` against `base_dir` and verify containment.
///
/// Containment is checked on the lexically resolved candidate first, so a
/// traversal pointing at a path that does not exist is still refused, then
/// on the filesystem-canonical form, so a symlink cannot lead outside
/// `base_dir`.
async fn resolve_contained(base_dir: &Path, filename: &str) -> Result<PathBuf, ServeError> {
    let candidate = lexical_resolve(&base_dir.join(filename));
    if !candidate.starts_with(base_dir) {
        return Err(ServeError::AccessDenied);
    }

    match fs::canonicalize(&candidate).await {
        Ok(canonical) if canonical.starts_with(base_dir) => Ok(canonical),
        Ok(_) => Err(ServeError::AccessDenied),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ServeError::NotFound),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to resolve '{}': {e}",
                candidate.display()
            ));
            Err(ServeError::Internal)
        }
    }
}

/// Resolve `.` and `..` segments without touching the filesystem
fn lexical_resolve(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => resolved.push(name),
            Component::ParentDir => {
                resolved.pop();
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => resolved.push(component.as_os_str()),
        }
    }
    resolved
}

/// Read a validated path as UTF-8 text
async fn read_text_file(path: &Path) -> Result<String, ServeError> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(ServeError::NotFound),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ServeError::NotFound),
        Err(e) => {
            logger::log_error(&format!("Failed to stat '{}': {e}", path.display()));
            return Err(ServeError::Internal);
        }
    }

    match fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ServeError::NotFound),
        Err(e) => {
            logger::log_error(&format!("Failed to read '{}': {e}", path.display()));
            Err(ServeError::Internal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_content_type() {
        assert_eq!(allowed_content_type("report.txt"), Some("text/plain"));
        assert_eq!(allowed_content_type("page.html"), Some("text/html"));
        assert_eq!(allowed_content_type("REPORT.TXT"), Some("text/plain"));
        assert_eq!(allowed_content_type("notes.md"), None);
        assert_eq!(allowed_content_type("archive.tar.gz"), None);
        assert_eq!(allowed_content_type("no_extension"), None);
        assert_eq!(allowed_content_type("trailing."), None);
    }

    #[test]
    fn test_extension_after_last_dot() {
        assert_eq!(allowed_content_type("release.notes.txt"), Some("text/plain"));
        assert_eq!(allowed_content_type("page.html.bak"), None);
    }

    #[test]
    fn test_lexical_resolve_keeps_plain_paths() {
        let resolved = lexical_resolve(Path::new("/srv/files/report.txt"));
        assert_eq!(resolved, PathBuf::from("/srv/files/report.txt"));
    }

    #[test]
    fn test_lexical_resolve_collapses_segments() {
        let resolved = lexical_resolve(Path::new("/srv/files/./sub/../report.txt"));
        assert_eq!(resolved, PathBuf::from("/srv/files/report.txt"));
    }

    #[test]
    fn test_lexical_resolve_escapes_are_visible() {
        let resolved = lexical_resolve(Path::new("/srv/files/../../etc/passwd.txt"));
        assert_eq!(resolved, PathBuf::from("/etc/passwd.txt"));
        assert!(!resolved.starts_with("/srv/files"));
    }

    #[test]
    fn test_lexical_resolve_clamps_at_root() {
        let resolved = lexical_resolve(Path::new("/../../etc.txt"));
        assert_eq!(resolved, PathBuf::from("/etc.txt"));
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ServeError::MissingParameter.status(), 400);
        assert_eq!(ServeError::InvalidExtension.status(), 400);
        assert_eq!(ServeError::AccessDenied.status(), 403);
        assert_eq!(ServeError::NotFound.status(), 404);
        assert_eq!(ServeError::Internal.status(), 500);
    }

    #[test]
    fn test_error_messages_are_generic() {
        for err in [
            ServeError::MissingParameter,
            ServeError::InvalidExtension,
            ServeError::AccessDenied,
            ServeError::NotFound,
            ServeError::Internal,
        ] {
            assert!(!err.message().contains('/'));
            assert!(!err.message().is_empty());
        }
    }
}
