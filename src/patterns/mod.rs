pub mod brace;
pub mod cache;
pub mod micromatch;

use crate::error::EngineError;
use crate::path;
use camino::Utf8Path;
use globset::GlobSet;

/// A dot-prefixed segment below the walk root
#[derive(Clone, Debug)]
struct DotSegment {
    set: GlobSet,
    /// Position below the walk root, counted from 1
    depth: usize,
    /// `**` segments before it; each may stand for zero or more directories
    globstars: usize,
}

impl DotSegment {
    fn admits(&self, name: &str, depth: usize) -> bool {
        let reachable = if self.globstars == 0 {
            depth == self.depth
        } else {
            depth + self.globstars >= self.depth
        };
        reachable && self.set.is_match(name)
    }
}

/// One pattern compiled for matching against absolute paths
///
/// Braces are expanded up front; every alternative is compiled either into
/// the globset or, when it uses extglob groups, into a regex.
#[derive(Clone, Debug)]
pub struct CompiledGlob {
    pub set: GlobSet,
    pub regexes: Vec<regex::Regex>,
    alternatives: Vec<String>,
    literal: Option<String>,
    dot_segments: Vec<DotSegment>,
    dirs_only: bool,
}

impl CompiledGlob {
    /// Compiles a pattern into a matcher
    ///
    /// A trailing `/` restricts the pattern to directories. A trailing `/**`
    /// also matches the directory it hangs off.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Syntax` for invalid glob syntax and the brace or
    /// regex limit errors for patterns that expand too far.
    pub fn compile(pattern: &str, case_sensitive: bool) -> Result<Self, EngineError> {
        let dirs_only = pattern.len() > 1 && pattern.ends_with('/');
        let pattern = if dirs_only {
            pattern.trim_end_matches('/')
        } else {
            pattern
        };

        let alternatives = brace::expand(pattern)?;
        let mut globs = Vec::new();
        let mut regexes = Vec::new();

        for alternative in matchable(&alternatives) {
            if micromatch::has_extglob(alternative) {
                let regex_pattern = micromatch::micromatch_to_regex(alternative, case_sensitive)?;
                regexes.push(cache::get_or_compile_regex(&regex_pattern)?);
            } else {
                globs.push(alternative.to_string());
            }
        }

        let set = if globs.is_empty() {
            GlobSet::empty()
        } else {
            cache::get_or_compile_glob(&globs, case_sensitive)?
        };

        let literal = match alternatives.as_slice() {
            [only] if !has_magic(only) => Some(path::unescape(only)),
            _ => None,
        };

        let root_depth = segments(&path::glob_parent(pattern)).count();
        let dot_segments = Self::dot_segments(&alternatives, root_depth, case_sensitive)?;

        Ok(Self {
            set,
            regexes,
            alternatives,
            literal,
            dot_segments,
            dirs_only,
        })
    }

    /// Segments below the walk root that explicitly start with a dot
    fn dot_segments(
        alternatives: &[String],
        root_depth: usize,
        case_sensitive: bool,
    ) -> Result<Vec<DotSegment>, EngineError> {
        let mut found = Vec::new();
        for alternative in alternatives {
            let mut globstars = 0;
            for (i, segment) in segments(alternative).skip(root_depth).enumerate() {
                if segment == "**" {
                    globstars += 1;
                    continue;
                }
                if !segment.starts_with('.')
                    || segment == "."
                    || segment == ".."
                    || micromatch::has_extglob(segment)
                {
                    continue;
                }
                found.push(DotSegment {
                    set: cache::get_or_compile_glob(&[segment.to_string()], case_sensitive)?,
                    depth: i + 1,
                    globstars,
                });
            }
        }
        Ok(found)
    }

    /// Checks if an absolute forward-slash path matches any alternative
    pub fn is_match(&self, path: &Utf8Path) -> bool {
        let path_str = path.as_str();

        // First check globset (usually faster)
        if !self.set.is_empty() && self.set.is_match(path_str) {
            return true;
        }

        self.regexes.iter().any(|re| re.is_match(path_str))
    }

    /// True when the pattern denotes exactly one literal path
    pub fn is_singular(&self) -> bool {
        self.literal.is_some()
    }

    /// The unescaped path of a singular pattern
    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    /// Brace-expanded alternatives, still escaped
    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    /// Whether any alternative can descend an unbounded number of directories
    pub fn is_recursive(&self) -> bool {
        self.alternatives.iter().any(|alt| alt.contains("**"))
    }

    /// Whether only directories can match
    pub fn dirs_only(&self) -> bool {
        self.dirs_only
    }

    /// Whether a hidden name `depth` levels below the walk root is named
    /// explicitly by a pattern segment at that position
    pub fn allows_hidden(&self, name: &str, depth: usize) -> bool {
        self.dot_segments
            .iter()
            .any(|segment| segment.admits(name, depth))
    }
}

fn segments(pattern: &str) -> impl Iterator<Item = &str> {
    pattern.split('/').filter(|segment| !segment.is_empty())
}

/// Alternatives to match against, plus `X` for every `X/**`
///
/// A trailing globstar may stand for no directory at all.
fn matchable(alternatives: &[String]) -> Vec<&str> {
    let mut out: Vec<&str> = Vec::with_capacity(alternatives.len());
    for alternative in alternatives {
        out.push(alternative);
        if let Some(dir) = alternative.strip_suffix("/**") {
            if !dir.is_empty() {
                out.push(dir);
            }
        }
    }
    out.sort_unstable();
    out.dedup();
    out
}

/// Whether a brace-free pattern contains wildcard syntax
pub fn has_magic(pattern: &str) -> bool {
    if micromatch::has_extglob(pattern) {
        return true;
    }
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if cfg!(not(windows)) => {
                chars.next();
            }
            '*' | '?' | '[' => return true,
            _ => {}
        }
    }
    false
}

/// Hit, miss and eviction counters of the glob and regex compile caches
pub fn cache_metrics() -> (cache::CacheMetrics, cache::CacheMetrics) {
    (cache::glob_cache_metrics(), cache::regex_cache_metrics())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_are_singular() {
        let glob = CompiledGlob::compile("/a/b/c.txt", true).unwrap();
        assert!(glob.is_singular());
        assert_eq!(glob.literal(), Some("/a/b/c.txt"));
    }

    #[test]
    fn wildcards_and_braces_are_not_singular() {
        for pattern in ["/a/*.txt", "/a/{b,c}.txt", "/a/file?.txt", "/a/+(x|y)"] {
            let glob = CompiledGlob::compile(pattern, true).unwrap();
            assert!(!glob.is_singular(), "{pattern} should not be singular");
        }
    }

    #[cfg(not(windows))]
    #[test]
    fn escaped_wildcards_stay_literal() {
        let glob = CompiledGlob::compile(r"/a/\*.txt", true).unwrap();
        assert_eq!(glob.literal(), Some("/a/*.txt"));
    }

    #[test]
    fn star_does_not_cross_directories() {
        let glob = CompiledGlob::compile("/a/*.js", true).unwrap();
        assert!(glob.is_match(Utf8Path::new("/a/x.js")));
        assert!(!glob.is_match(Utf8Path::new("/a/b/x.js")));
    }

    #[test]
    fn extglob_alternatives_use_regex() {
        let glob = CompiledGlob::compile("/a/+(x|y).js", true).unwrap();
        assert_eq!(glob.regexes.len(), 1);
        assert!(glob.is_match(Utf8Path::new("/a/xyx.js")));
        assert!(!glob.is_match(Utf8Path::new("/a/z.js")));
    }

    #[test]
    fn trailing_slash_restricts_to_directories() {
        let glob = CompiledGlob::compile("/a/*/", true).unwrap();
        assert!(glob.dirs_only());
        assert!(glob.is_match(Utf8Path::new("/a/b")));
    }

    #[test]
    fn dotted_segments_admit_hidden_names_at_their_depth() {
        let glob = CompiledGlob::compile("/a/*/.config/*", true).unwrap();
        assert!(glob.allows_hidden(".config", 2));
        assert!(!glob.allows_hidden(".config", 1));
        assert!(!glob.allows_hidden(".config", 3));
        assert!(!glob.allows_hidden(".git", 2));
    }

    #[test]
    fn dotted_segments_after_globstar_float() {
        let glob = CompiledGlob::compile("/a/**/.git/config", true).unwrap();
        assert!(glob.allows_hidden(".git", 1));
        assert!(glob.allows_hidden(".git", 4));
    }

    #[test]
    fn static_prefix_does_not_admit_hidden_names() {
        let glob = CompiledGlob::compile("/home/.work/**/*.txt", true).unwrap();
        assert!(!glob.allows_hidden(".work", 1));
        assert!(!glob.allows_hidden(".work", 2));
    }

    #[test]
    fn trailing_globstar_matches_its_directory() {
        let glob = CompiledGlob::compile("/a/**", true).unwrap();
        assert!(glob.is_match(Utf8Path::new("/a")));
        assert!(glob.is_match(Utf8Path::new("/a/b/c")));
        assert!(!glob.is_match(Utf8Path::new("/ab")));
        assert_eq!(glob.alternatives(), ["/a/**"]);
    }

    #[test]
    fn case_insensitive_matching() {
        let glob = CompiledGlob::compile("/a/*.TXT", false).unwrap();
        assert!(glob.is_match(Utf8Path::new("/A/readme.txt")));
    }
}
