//! URL helper functions

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Turn a request URI path into the requested post path
///
/// Leading slashes are stripped first, then the rest is percent-decoded.
/// Invalid UTF-8 sequences are replaced rather than rejected.
///
/// # Examples
/// ```ignore
/// request_path("//notes/hello%20world") // -> "notes/hello world"
/// ```
pub fn request_path(uri_path: &str) -> String {
    let trimmed = uri_path.trim_start_matches('/');
    percent_decode_str(trimmed).decode_utf8_lossy().into_owned()
}

/// Link to a post from its identifier
///
/// # Examples
/// ```ignore
/// post_href("notes/hello world") // -> "/notes/hello%20world"
/// ```
pub fn post_href(identifier: &str) -> String {
    let encoded: Vec<String> = identifier
        .split('/')
        .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
        .collect();
    format!("/{}", encoded.join("/"))
}
