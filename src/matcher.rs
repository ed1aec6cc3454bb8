//! Matcher adapter
//!
//! Expands one absolute pattern against the filesystem. The result is a plain
//! blocking iterator; the async layer drives it from Tokio's blocking pool.

use crate::{
    error::EngineError, options::MatchOptions, path, patterns::CompiledGlob, windows,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, io};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// An exclusion pattern, optionally able to prune whole directories
#[derive(Debug)]
struct Ignore {
    glob: CompiledGlob,
    /// Set for patterns ending in `/**`: matches the directory itself
    prune: Option<CompiledGlob>,
}

impl Ignore {
    fn compile(pattern: &str, case_sensitive: bool) -> Result<Self, EngineError> {
        let glob = CompiledGlob::compile(pattern, case_sensitive)?;
        let prune = match pattern.strip_suffix("/**") {
            Some(dir) if !dir.is_empty() => Some(CompiledGlob::compile(dir, case_sensitive)?),
            _ => None,
        };
        Ok(Self { glob, prune })
    }
}

/// A compiled pattern plus the options it is expanded with
#[derive(Debug)]
pub struct Matcher {
    pattern: String,
    glob: CompiledGlob,
    ignore: Vec<Ignore>,
    opts: MatchOptions,
    walk_root: Utf8PathBuf,
}

impl Matcher {
    /// Compiles a pattern and its `ignore` list
    ///
    /// A relative pattern is resolved against `opts.cwd` first.
    ///
    /// # Errors
    ///
    /// Returns an `EngineError` if the pattern or any ignore pattern is malformed
    pub fn new(pattern: &str, opts: MatchOptions) -> Result<Self, EngineError> {
        let pattern = if windows::is_absolute(pattern) {
            pattern.to_string()
        } else {
            path::to_absolute_glob(pattern, &opts.cwd, None)
        };

        let glob = CompiledGlob::compile(&pattern, opts.case_sensitive)?;
        let ignore = opts
            .ignore
            .iter()
            .map(|p| Ignore::compile(p, opts.case_sensitive))
            .collect::<Result<Vec<_>, _>>()?;
        let walk_root = Utf8PathBuf::from(path::glob_parent(&pattern));

        Ok(Self {
            pattern,
            glob,
            ignore,
            opts,
            walk_root,
        })
    }

    /// The absolute pattern being matched
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True when the pattern denotes exactly one literal path
    pub fn is_singular(&self) -> bool {
        self.glob.is_singular()
    }

    /// Starts expanding the pattern
    pub fn matches(self) -> Matches {
        Matches {
            matcher: self,
            state: State::Pending,
            matched: false,
        }
    }

    fn is_ignored(&self, path: &Utf8Path) -> bool {
        self.ignore.iter().any(|ignore| ignore.glob.is_match(path))
    }

    fn prunes(&self, dir: &Utf8Path) -> bool {
        self.ignore
            .iter()
            .filter_map(|ignore| ignore.prune.as_ref())
            .any(|prune| prune.is_match(dir))
    }

    /// How deep below the walk root a match can possibly be
    fn depth_limit(&self) -> Option<usize> {
        let pattern_depth = if self.glob.is_recursive() {
            None
        } else {
            let root_depth = segment_count(self.walk_root.as_str());
            self.glob
                .alternatives()
                .iter()
                .map(|alt| segment_count(alt).saturating_sub(root_depth))
                .max()
        };

        match (pattern_depth, self.opts.max_depth) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Reports a filesystem problem that does not end the walk
    fn report(&self, err: &dyn std::fmt::Display) {
        if self.opts.silent {
            debug!(pattern = %self.pattern, "skipping unreadable entry: {err}");
        } else {
            warn!(pattern = %self.pattern, "skipping unreadable entry: {err}");
        }
    }
}

fn segment_count(pattern: &str) -> usize {
    pattern.split('/').filter(|s| !s.is_empty()).count()
}

enum State {
    Pending,
    Literal,
    Walking(walkdir::IntoIter),
    Done,
}

/// Lazy sequence of matched absolute paths for one pattern
///
/// Each item is a match event; an `Err` is the terminal error event and
/// exhaustion is the end event.
pub struct Matches {
    matcher: Matcher,
    state: State,
    matched: bool,
}

impl Matches {
    fn open(&self) -> Result<State, EngineError> {
        if self.matcher.glob.literal().is_some() {
            return Ok(State::Literal);
        }

        let root = &self.matcher.walk_root;
        match fs::metadata(root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Ok(State::Done),
            Err(e) if is_missing(root, &e) => {
                trace!(root = %root, "walk root does not exist");
                return Ok(State::Done);
            }
            Err(e) => return Err(EngineError::Io(e)),
        }

        // Depth 0 is the walk root itself, reachable through a trailing `/**`.
        let mut walk = WalkDir::new(root)
            .follow_links(self.matcher.opts.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.matcher.depth_limit() {
            walk = walk.max_depth(depth);
        }
        Ok(State::Walking(walk.into_iter()))
    }

    fn check_literal(&self) -> Option<Result<Utf8PathBuf, EngineError>> {
        let literal = Utf8PathBuf::from(self.matcher.glob.literal()?);
        let meta = match fs::symlink_metadata(&literal) {
            Ok(meta) => meta,
            Err(e) if is_missing(&literal, &e) => return None,
            Err(e) if self.matcher.opts.strict => return Some(Err(EngineError::Io(e))),
            Err(e) => {
                self.matcher.report(&e);
                return None;
            }
        };

        if self.matcher.glob.dirs_only() && !(meta.is_dir() || literal.is_dir()) {
            return None;
        }
        if self.matcher.is_ignored(&literal) {
            return None;
        }
        Some(Ok(literal))
    }

    fn next_walked(
        &self,
        walk: &mut walkdir::IntoIter,
    ) -> Option<Result<Utf8PathBuf, EngineError>> {
        let matcher = &self.matcher;
        loop {
            let entry = match walk.next()? {
                Ok(entry) => entry,
                Err(err) if matcher.opts.strict => return Some(Err(err.into())),
                Err(err) => {
                    matcher.report(&err);
                    continue;
                }
            };

            let is_dir = entry.file_type().is_dir();
            let depth = entry.depth();
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                debug!(path = ?entry.path(), "skipping non-UTF-8 path");
                if is_dir {
                    walk.skip_current_dir();
                }
                continue;
            };
            let candidate = windows::to_forward_slashes(path.as_str());
            let candidate = Utf8Path::new(&*candidate);

            if !matcher.opts.dot && depth > 0 {
                let name = candidate.file_name().unwrap_or_default();
                if name.starts_with('.') && !matcher.glob.allows_hidden(name, depth) {
                    if is_dir {
                        walk.skip_current_dir();
                    }
                    continue;
                }
            }

            if is_dir && matcher.prunes(candidate) {
                trace!(dir = %candidate, "pruning ignored directory");
                walk.skip_current_dir();
                continue;
            }

            if matcher.glob.dirs_only() && !is_dir {
                continue;
            }
            if !matcher.glob.is_match(candidate) || matcher.is_ignored(candidate) {
                continue;
            }

            return Some(Ok(path.to_path_buf()));
        }
    }

    /// Emits the pattern itself when `nonull` is set and nothing matched
    fn finish(&mut self) -> Option<Result<Utf8PathBuf, EngineError>> {
        self.state = State::Done;
        if !self.matched && self.matcher.opts.nonull {
            self.matched = true;
            return Some(Ok(Utf8PathBuf::from(&self.matcher.pattern)));
        }
        None
    }
}

impl Iterator for Matches {
    type Item = Result<Utf8PathBuf, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let item = match std::mem::replace(&mut self.state, State::Done) {
                State::Pending => {
                    match self.open() {
                        Ok(state) => self.state = state,
                        Err(e) => return Some(Err(e)),
                    }
                    if matches!(self.state, State::Done) {
                        return self.finish();
                    }
                    continue;
                }
                State::Literal => self.check_literal(),
                State::Walking(mut walk) => {
                    let item = self.next_walked(&mut walk);
                    if matches!(item, Some(Ok(_))) {
                        self.state = State::Walking(walk);
                    }
                    item
                }
                State::Done => return None,
            };

            return match item {
                Some(Ok(path)) => {
                    self.matched = true;
                    Some(Ok(path))
                }
                Some(Err(e)) => Some(Err(e)),
                None => self.finish(),
            };
        }
    }
}

/// Whether an error means "nothing there" rather than a real failure
fn is_missing(path: &Utf8Path, err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::NotFound
        || path.ancestors().skip(1).any(|dir| dir.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{create_dir_all, File};
    use tempfile::tempdir;

    fn opts(cwd: &Utf8Path) -> MatchOptions {
        MatchOptions {
            cwd: cwd.to_path_buf(),
            dot: false,
            silent: true,
            nonull: false,
            strict: false,
            follow_symlinks: false,
            case_sensitive: true,
            max_depth: None,
            ignore: Vec::new(),
        }
    }

    fn names(root: &Utf8Path, matches: Matches) -> Vec<String> {
        matches
            .map(|m| {
                m.unwrap()
                    .strip_prefix(root)
                    .unwrap()
                    .as_str()
                    .replace('\\', "/")
            })
            .collect()
    }

    fn fixture() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        create_dir_all(root.join("src/nested")).unwrap();
        create_dir_all(root.join(".hidden")).unwrap();
        File::create(root.join("src/a.js")).unwrap();
        File::create(root.join("src/b.js")).unwrap();
        File::create(root.join("src/nested/c.js")).unwrap();
        File::create(root.join("src/.d.js")).unwrap();
        File::create(root.join(".hidden/e.js")).unwrap();
        (dir, root)
    }

    #[test]
    fn matches_in_sorted_order() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new("src/*.js", opts(&root)).unwrap();
        assert_eq!(names(&root, matcher.matches()), vec!["src/a.js", "src/b.js"]);
    }

    #[test]
    fn globstar_descends_but_skips_dotfiles() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new("**/*.js", opts(&root)).unwrap();
        assert_eq!(
            names(&root, matcher.matches()),
            vec!["src/a.js", "src/b.js", "src/nested/c.js"]
        );
    }

    #[test]
    fn dot_option_includes_hidden_entries() {
        let (_dir, root) = fixture();
        let mut o = opts(&root);
        o.dot = true;
        let matcher = Matcher::new("**/*.js", o).unwrap();
        assert_eq!(
            names(&root, matcher.matches()),
            vec![".hidden/e.js", "src/.d.js", "src/a.js", "src/b.js", "src/nested/c.js"]
        );
    }

    #[test]
    fn explicit_dot_segment_is_matched() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new(".hidden/*.js", opts(&root)).unwrap();
        assert_eq!(names(&root, matcher.matches()), vec![".hidden/e.js"]);
    }

    #[test]
    fn ignore_excludes_and_prunes() {
        let (_dir, root) = fixture();
        let mut o = opts(&root);
        o.ignore = vec![
            format!("{}/src/nested/**", root),
            format!("{}/src/b.js", root),
        ];
        let matcher = Matcher::new("**/*.js", o).unwrap();
        assert_eq!(names(&root, matcher.matches()), vec!["src/a.js"]);
    }

    #[test]
    fn literal_patterns_stat_instead_of_walking() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new("src/a.js", opts(&root)).unwrap();
        assert!(matcher.is_singular());
        assert_eq!(names(&root, matcher.matches()), vec!["src/a.js"]);

        let missing = Matcher::new("src/zzz.js", opts(&root)).unwrap();
        assert_eq!(missing.matches().count(), 0);
    }

    #[test]
    fn nonull_emits_the_pattern() {
        let (_dir, root) = fixture();
        let mut o = opts(&root);
        o.nonull = true;
        let matcher = Matcher::new("src/*.rs", o).unwrap();
        let pattern = matcher.pattern().to_string();
        let found: Vec<_> = matcher.matches().map(Result::unwrap).collect();
        assert_eq!(found, vec![Utf8PathBuf::from(pattern)]);
    }

    #[test]
    fn missing_walk_root_is_empty() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new("nope/**/*.js", opts(&root)).unwrap();
        assert_eq!(matcher.matches().count(), 0);
    }

    #[test]
    fn trailing_slash_only_matches_directories() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new("src/*/", opts(&root)).unwrap();
        assert_eq!(names(&root, matcher.matches()), vec!["src/nested"]);
    }

    #[test]
    fn depth_is_bounded_without_globstar() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new("src/*", opts(&root)).unwrap();
        assert_eq!(matcher.depth_limit(), Some(1));
        assert_eq!(
            names(&root, matcher.matches()),
            vec!["src/a.js", "src/b.js", "src/nested"]
        );
    }

    #[test]
    fn trailing_globstar_includes_its_directory() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new("src/**", opts(&root)).unwrap();
        assert_eq!(
            names(&root, matcher.matches()),
            vec!["src", "src/a.js", "src/b.js", "src/nested", "src/nested/c.js"]
        );
    }

    #[test]
    fn hidden_walk_root_is_not_filtered() {
        let (_dir, root) = fixture();
        let matcher = Matcher::new(".hidden/**", opts(&root)).unwrap();
        assert_eq!(
            names(&root, matcher.matches()),
            vec![".hidden", ".hidden/e.js"]
        );
    }

    #[test]
    fn hidden_cwd_does_not_admit_nested_namesakes() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().join(".work")).unwrap();
        create_dir_all(root.join("sub/.work")).unwrap();
        File::create(root.join("sub/ok.txt")).unwrap();
        File::create(root.join("sub/.work/secret.txt")).unwrap();

        let matcher = Matcher::new("**/*.txt", opts(&root)).unwrap();
        assert_eq!(names(&root, matcher.matches()), vec!["sub/ok.txt"]);
    }

    #[test]
    fn malformed_pattern_fails_to_compile() {
        let (_dir, root) = fixture();
        let err = Matcher::new("src/[a.js", opts(&root)).unwrap_err();
        assert!(matches!(err, EngineError::Syntax(_)));
    }
}
