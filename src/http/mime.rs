//! Content-type lookup by file extension.

/// Returned for files with no extension or an unknown one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const TABLE: &[(&str, &str)] = &[
    ("htm", "text/html"),
    ("html", "text/html"),
    ("txt", "text/plain"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("css", "text/css"),
    ("js", "application/javascript"),
];

/// Maps an extension (with or without the leading dot) to a content type.
///
/// Matching is case-insensitive, so `"JPG"` and `".jpg"` both give
/// `image/jpeg`.
///
/// ```
/// # use pofo_httpd::http::mime::from_extension;
/// assert_eq!(from_extension(".HTM"), "text/html");
/// assert_eq!(from_extension("zip"), "application/octet-stream");
/// ```
pub fn from_extension(ext: &str) -> &'static str {
    let ext = ext.strip_prefix('.').unwrap_or(ext);

    TABLE
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|(_, content_type)| *content_type)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Content type for a file name, keyed on the text after its last dot.
pub fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.') {
        Some((_, ext)) => from_extension(ext),
        None => DEFAULT_CONTENT_TYPE,
    }
}
