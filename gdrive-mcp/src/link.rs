//! Drive share-link parsing.
//!
//! The Drive API wants bare file IDs, but users paste share links. Two link
//! shapes exist in the wild: the path form `.../d/<id>/...` and the query
//! form `...?id=<id>`. The path form is canonical and checked first.

use crate::{DriveError, Result};
use regex::Regex;
use std::sync::OnceLock;

static PATH_ID_REGEX: OnceLock<Regex> = OnceLock::new();
static QUERY_ID_REGEX: OnceLock<Regex> = OnceLock::new();

fn path_id_regex() -> &'static Regex {
    PATH_ID_REGEX.get_or_init(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("Invalid regex pattern"))
}

fn query_id_regex() -> &'static Regex {
    QUERY_ID_REGEX.get_or_init(|| Regex::new(r"id=([a-zA-Z0-9_-]+)").expect("Invalid regex pattern"))
}

/// Extract the file ID embedded in a Drive share URL.
///
/// Pure string operation, no network access. Fails with
/// [`DriveError::MalformedReference`] when neither link shape matches.
///
/// # Example
///
/// ```
/// use gdrive_mcp::link::extract_file_id;
///
/// let id = extract_file_id("https://drive.google.com/file/d/1AbC23_-xyz/view").unwrap();
/// assert_eq!(id, "1AbC23_-xyz");
/// ```
pub fn extract_file_id(url: &str) -> Result<String> {
    if let Some(caps) = path_id_regex().captures(url) {
        return Ok(caps[1].to_string());
    }
    if let Some(caps) = query_id_regex().captures(url) {
        return Ok(caps[1].to_string());
    }
    Err(DriveError::MalformedReference(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_form() {
        let id = extract_file_id("https://drive.google.com/file/d/1AbC23_-xyz/view").unwrap();
        assert_eq!(id, "1AbC23_-xyz");
    }

    #[test]
    fn test_query_form() {
        let id = extract_file_id("https://drive.google.com/open?id=9ZqW_88").unwrap();
        assert_eq!(id, "9ZqW_88");
    }

    #[test]
    fn test_path_form_wins_when_both_present() {
        let id = extract_file_id("https://drive.google.com/file/d/pathId/view?id=queryId").unwrap();
        assert_eq!(id, "pathId");
    }

    #[test]
    fn test_no_id() {
        let err = extract_file_id("https://example.com/nofile").unwrap_err();
        assert!(matches!(err, DriveError::MalformedReference(_)));
    }

    #[test]
    fn test_id_alphabet() {
        let id = extract_file_id("https://drive.google.com/d/a-b_C9/edit").unwrap();
        assert_eq!(id, "a-b_C9");
    }
}
