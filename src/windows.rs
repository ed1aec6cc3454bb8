use std::borrow::Cow;

/// Rewrites `\` separators to `/` on Windows
///
/// Globs are always matched against forward-slash paths, so both patterns
/// and walked paths pass through here before they meet a matcher.
#[cfg(windows)]
pub fn to_forward_slashes(s: &str) -> Cow<'_, str> {
    if s.contains('\\') {
        Cow::Owned(s.replace('\\', "/"))
    } else {
        Cow::Borrowed(s)
    }
}

/// No-op on platforms where `/` is already the only separator
#[cfg(not(windows))]
pub fn to_forward_slashes(s: &str) -> Cow<'_, str> {
    Cow::Borrowed(s)
}

/// Whether a forward-slash path starts at a filesystem root
#[cfg(windows)]
pub fn is_absolute(s: &str) -> bool {
    let bytes = s.as_bytes();
    s.starts_with('/') || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Whether a forward-slash path starts at a filesystem root
#[cfg(not(windows))]
pub fn is_absolute(s: &str) -> bool {
    s.starts_with('/')
}
