//! Content-type allow-list module
//!
//! Maps an allowed file extension to its Content-Type. Absence from the map
//! means the extension is refused, so the return type is `Option` rather
//! than a catch-all default.

/// Content-Type for an allowed extension, `None` for everything else
///
/// The caller is expected to lower-case the extension first.
///
/// # Examples
/// ```
/// use textserve::http::mime::content_type_for;
/// assert_eq!(content_type_for("html"), Some("text/html"));
/// assert_eq!(content_type_for("txt"), Some("text/plain"));
/// assert_eq!(content_type_for("exe"), None);
/// ```
pub fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension {
        "html" => Some("text/html"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_types() {
        assert_eq!(content_type_for("txt"), Some("text/plain"));
        assert_eq!(content_type_for("html"), Some("text/html"));
    }

    #[test]
    fn test_disallowed_extensions() {
        assert_eq!(content_type_for("htm"), None);
        assert_eq!(content_type_for("md"), None);
        assert_eq!(content_type_for("js"), None);
        assert_eq!(content_type_for("exe"), None);
        assert_eq!(content_type_for(""), None);
    }

    #[test]
    fn test_upper_case_is_not_matched_here() {
        // Lower-casing happens at the extraction site.
        assert_eq!(content_type_for("TXT"), None);
        assert_eq!(content_type_for("Html"), None);
    }
}
