//! URL helpers for request classification.

use url::Url;

/// Whether two URLs share scheme, host and port.
pub fn is_same_origin(url: &Url, origin: &Url) -> bool {
    url.origin() == origin.origin()
}

/// Lower-cased extension of the last path segment, or an empty string.
///
/// `/styles/app.CSS` yields `css`; `/introduction` and `/` yield `""`.
/// Query strings and fragments never contribute.
pub fn path_extension(url: &Url) -> String {
    let last_segment = url.path().rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}
