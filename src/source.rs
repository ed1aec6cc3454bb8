use crate::{
    error::GlobError,
    matcher::{Matcher, Matches},
    options::{MatchOptions, ResolvedOptions},
    path,
};
use camino::Utf8PathBuf;
use tracing::debug;

/// A matched filesystem entry
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entry {
    /// Working directory the patterns were resolved against
    pub cwd: Utf8PathBuf,
    /// Directory downstream consumers compute relative paths from
    pub base: Utf8PathBuf,
    /// Absolute path of the match
    pub path: Utf8PathBuf,
}

impl Entry {
    /// Path relative to `base`, when `path` lies under it
    pub fn relative(&self) -> Option<&camino::Utf8Path> {
        self.path.strip_prefix(&self.base).ok()
    }
}

/// One positive pattern with its scoped exclusions, ready to be expanded
#[derive(Clone, Debug)]
pub struct PatternSource {
    glob: String,
    base: Utf8PathBuf,
    cwd: Utf8PathBuf,
    allow_empty: bool,
    match_opts: MatchOptions,
}

impl PatternSource {
    /// Normalizes the pattern and derives its base and matcher options
    ///
    /// `negatives` must already be absolute.
    pub fn new(glob: &str, negatives: Vec<String>, opts: &ResolvedOptions) -> Self {
        let glob = path::to_absolute_glob(glob, &opts.cwd, opts.root.as_deref());
        let base = match &opts.base {
            Some(base) => base.clone(),
            None => base_of(&glob),
        };

        Self {
            base,
            cwd: opts.cwd.clone(),
            allow_empty: opts.allow_empty,
            match_opts: MatchOptions::derive(opts, negatives),
            glob,
        }
    }

    /// The absolute pattern
    pub fn glob(&self) -> &str {
        &self.glob
    }

    /// The base every entry of this source carries
    pub fn base(&self) -> &Utf8PathBuf {
        &self.base
    }

    /// The exclusion patterns handed to the matcher
    pub fn ignore(&self) -> &[String] {
        &self.match_opts.ignore
    }

    /// Lazily expands the pattern into entries
    ///
    /// Compilation happens on the first call to `next`, so a malformed
    /// pattern surfaces as the stream's error rather than up front.
    pub fn entries(self) -> Entries {
        Entries {
            state: State::Pending(self.match_opts),
            glob: self.glob,
            base: self.base,
            cwd: self.cwd,
            allow_empty: self.allow_empty,
            found: false,
        }
    }
}

/// Static parent directory of a pattern with a trailing separator
fn base_of(glob: &str) -> Utf8PathBuf {
    let mut parent = path::glob_parent(glob);
    if !parent.ends_with('/') {
        parent.push('/');
    }
    Utf8PathBuf::from(parent)
}

enum State {
    Pending(MatchOptions),
    Matching { matches: Matches, singular: bool },
    Done,
}

/// Lazy, forward-only sequence of entries for one positive pattern
///
/// Ends after the first error.
pub struct Entries {
    state: State,
    glob: String,
    base: Utf8PathBuf,
    cwd: Utf8PathBuf,
    allow_empty: bool,
    found: bool,
}

impl Iterator for Entries {
    type Item = Result<Entry, GlobError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, State::Done) {
                State::Pending(opts) => match Matcher::new(&self.glob, opts) {
                    Ok(matcher) => {
                        self.state = State::Matching {
                            singular: matcher.is_singular(),
                            matches: matcher.matches(),
                        };
                    }
                    Err(e) => return Some(Err(GlobError::engine(self.glob.clone(), e))),
                },
                State::Matching {
                    mut matches,
                    singular,
                } => {
                    return match matches.next() {
                        Some(Ok(path)) => {
                            self.found = true;
                            self.state = State::Matching { matches, singular };
                            Some(Ok(Entry {
                                cwd: self.cwd.clone(),
                                base: self.base.clone(),
                                path,
                            }))
                        }
                        Some(Err(e)) => Some(Err(GlobError::engine(self.glob.clone(), e))),
                        None if !self.allow_empty && !self.found && singular => {
                            debug!(glob = %self.glob, "singular glob matched nothing");
                            Some(Err(GlobError::NoMatch(self.glob.clone())))
                        }
                        None => None,
                    };
                }
                State::Done => return None,
            }
        }
    }
}
