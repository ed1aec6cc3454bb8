use crate::error::EngineError;

/// Maximum number of expansions to prevent DoS attacks
const MAX_EXPANSIONS: usize = 1000;
/// Maximum nesting depth to prevent stack overflow
const MAX_DEPTH: usize = 10;

/// Expands brace patterns in a glob
///
/// Supports nested braces, comma alternatives and numeric or single-letter
/// ranges (`{1..3}`, `{a..c}`). A brace group without a comma or range, such
/// as `{a}`, is kept literally. Characters escaped with `\` never open or
/// close a group.
///
/// # Errors
///
/// Returns `EngineError::BraceExpansionDepth` if braces nest deeper than the limit
/// Returns `EngineError::BraceExpansionCount` if the expansion grows too large
pub fn expand(input: &str) -> Result<Vec<String>, EngineError> {
    if nesting_depth(input) > MAX_DEPTH {
        return Err(EngineError::BraceExpansionDepth);
    }
    let out = expand_inner(input)?;
    if out.len() > MAX_EXPANSIONS {
        return Err(EngineError::BraceExpansionCount);
    }
    Ok(out)
}

fn expand_inner(input: &str) -> Result<Vec<String>, EngineError> {
    let Some((st, en, items)) = find_group(input) else {
        return Ok(vec![input.to_string()]);
    };

    let before = &input[..st];
    let after = &input[en + 1..];
    let suffixes = expand_inner(after)?;

    let mut out = Vec::new();
    for it in items {
        for mid in expand_inner(&it)? {
            for suf in &suffixes {
                out.push(format!("{}{}{}", before, mid, suf));
                if out.len() > MAX_EXPANSIONS {
                    return Err(EngineError::BraceExpansionCount);
                }
            }
        }
    }
    Ok(out)
}

/// Deepest nesting of unescaped braces
fn nesting_depth(s: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                chars.next();
            }
            '{' => {
                depth += 1;
                max = max.max(depth);
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

/// Finds the leftmost brace group that actually expands
///
/// Returns the byte offsets of the opening and closing brace together with
/// the alternatives of the group.
fn find_group(s: &str) -> Option<(usize, usize, Vec<String>)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'{' => {
                if let Some(en) = matching_close(s, i) {
                    let inner = &s[i + 1..en];
                    if let Some(items) = alternatives(inner) {
                        return Some((i, en, items));
                    }
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

fn matching_close(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Splits the inside of a group into alternatives, or `None` if it is literal
fn alternatives(inner: &str) -> Option<Vec<String>> {
    if let Some(range) = parse_range(inner) {
        return Some(range);
    }

    let mut items = Vec::new();
    let mut buf = String::new();
    let mut depth = 0usize;
    let mut chars = inner.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                buf.push(ch);
                if let Some(next) = chars.next() {
                    buf.push(next);
                }
            }
            ',' if depth == 0 => items.push(std::mem::take(&mut buf)),
            '{' => {
                depth += 1;
                buf.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                buf.push(ch);
            }
            _ => buf.push(ch),
        }
    }
    items.push(buf);

    if items.len() < 2 {
        None
    } else {
        Some(items)
    }
}

/// Parses a numeric or single-letter range (e.g. "1..3", "a..c")
fn parse_range(s: &str) -> Option<Vec<String>> {
    let (a, b) = s.split_once("..")?;

    if let (Ok(a), Ok(b)) = (a.parse::<i64>(), b.parse::<i64>()) {
        let len = a.abs_diff(b) as usize + 1;
        if len > MAX_EXPANSIONS {
            // Let the caller trip the expansion limit without materialising it.
            return Some(vec![String::new(); MAX_EXPANSIONS + 1]);
        }
        let values: Vec<String> = if a <= b {
            (a..=b).map(|v| v.to_string()).collect()
        } else {
            (b..=a).rev().map(|v| v.to_string()).collect()
        };
        return Some(values);
    }

    let mut ac = a.chars();
    let mut bc = b.chars();
    match (ac.next(), ac.next(), bc.next(), bc.next()) {
        (Some(x), None, Some(y), None) if x.is_ascii_alphabetic() && y.is_ascii_alphabetic() => {
            let (lo, hi) = (x.min(y) as u8, x.max(y) as u8);
            let mut values: Vec<String> = (lo..=hi).map(|c| (c as char).to_string()).collect();
            if x > y {
                values.reverse();
            }
            Some(values)
        }
        _ => None,
    }
}
