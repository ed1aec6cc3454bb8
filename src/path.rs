//! Pattern path normalization
//!
//! Patterns are handled as forward-slash strings rather than `Path`s because
//! they contain glob syntax that must survive joining untouched. Only the
//! static directory prefix of a pattern ever becomes a real path.

use crate::windows;
use camino::Utf8Path;

/// Characters with glob meaning that a literal path must escape
const GLOB_CHARS: &[char] = &['*', '?', '[', ']', '{', '}', '(', ')', '!', '+', '@', '|'];

/// Resolves a pattern to an absolute pattern
///
/// Relative patterns are joined onto `cwd`. A pattern starting with `/` is
/// re-rooted under `root` when one is given. `.` and `..` segments are
/// resolved lexically, and the glob characters of `cwd`/`root` are escaped
/// so that the directory name is matched literally.
pub fn to_absolute_glob(pattern: &str, cwd: &Utf8Path, root: Option<&Utf8Path>) -> String {
    let pattern = windows::to_forward_slashes(pattern);
    let mut body: &str = &pattern;
    while let Some(rest) = body.strip_prefix("./") {
        body = rest;
    }
    if body == "." {
        body = "";
    }

    let joined = match root {
        Some(root) if body.starts_with('/') => {
            format!("{}{}", escape(root.as_str()), body)
        }
        _ if windows::is_absolute(body) => body.to_string(),
        _ if body.is_empty() => escape(cwd.as_str()),
        _ => format!("{}/{}", escape(cwd.as_str()), body),
    };

    normalize(&joined)
}

/// Returns the longest leading directory of a pattern that holds no glob syntax
///
/// The result is unescaped, so it can be used as a real directory. A pattern
/// without glob syntax yields its containing directory.
pub fn glob_parent(pattern: &str) -> String {
    let pattern = windows::to_forward_slashes(pattern);
    let segments: Vec<&str> = pattern.split('/').collect();

    let last = segments.len().saturating_sub(1);
    let end = segments
        .iter()
        .position(|segment| is_glob(segment))
        .map_or(last, |first_glob| first_glob.min(last));

    let parent = segments[..end].join("/");
    if parent.is_empty() {
        if pattern.starts_with('/') {
            "/".to_string()
        } else {
            ".".to_string()
        }
    } else {
        unescape(&parent)
    }
}

/// Whether a single pattern segment contains unescaped glob syntax
pub fn is_glob(segment: &str) -> bool {
    let mut chars = segment.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if cfg!(not(windows)) => {
                chars.next();
            }
            '*' | '?' | '[' | '{' | '(' => return true,
            '!' | '+' | '@' if chars.peek() == Some(&'(') => return true,
            _ => {}
        }
    }
    false
}

/// Escapes glob characters so the text is matched literally
#[cfg(not(windows))]
pub fn escape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if c == '\\' || GLOB_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Backslash is a separator on Windows, so literal glob characters are wrapped
/// in a one-character class instead.
#[cfg(windows)]
pub fn escape(literal: &str) -> String {
    let literal = windows::to_forward_slashes(literal);
    let mut out = String::with_capacity(literal.len());
    for c in literal.chars() {
        if GLOB_CHARS.contains(&c) && c != '!' {
            out.push('[');
            out.push(c);
            out.push(']');
        } else {
            out.push(c);
        }
    }
    out
}

/// Removes glob escapes, turning a static pattern into a plain path
pub fn unescape(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if cfg!(not(windows)) => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' if cfg!(windows) => {
                // "[x]" wraps a single literal character
                let mut ahead = chars.clone();
                match (ahead.next(), ahead.next()) {
                    (Some(inner), Some(']')) => {
                        out.push(inner);
                        chars = ahead;
                    }
                    _ => out.push(c),
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Resolves `.` and `..` segments and collapses repeated separators
///
/// A trailing separator is preserved since it restricts a pattern to
/// directories. `..` never climbs above the first segment of an absolute
/// pattern.
fn normalize(pattern: &str) -> String {
    let absolute = pattern.starts_with('/');
    let trailing = pattern.len() > 1 && pattern.ends_with('/');

    let mut stack: Vec<&str> = Vec::new();
    for segment in pattern.split('/') {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&last) if last != ".." && !last.ends_with(':') => {
                    stack.pop();
                }
                _ if absolute => {}
                _ => stack.push(".."),
            },
            other => stack.push(other),
        }
    }

    let mut out = String::with_capacity(pattern.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&stack.join("/"));
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}
