use crate::error::GlobError;
use camino::Utf8PathBuf;

/// Default number of entries buffered per pattern before its matcher pauses
const DEFAULT_HIGH_WATER_MARK: usize = 16;

/// Configuration options for a glob invocation
///
/// Every field has a default, so `GlobOptions::default()` is a valid option
/// set. Use [`GlobOptionsBuilder`] for fluent configuration.
#[derive(Clone, Debug)]
pub struct GlobOptions {
    /// Directory relative patterns are resolved against (process cwd if unset)
    pub cwd: Option<Utf8PathBuf>,

    /// Whether wildcards match names starting with a dot
    pub dot: bool,

    /// Whether directory read warnings are kept out of the `warn` level
    pub silent: bool,

    /// Emit the pattern itself when it matches nothing
    pub nonull: bool,

    /// Use `cwd` as the base of every entry
    pub cwdbase: bool,

    /// Base of every entry, used verbatim
    pub base: Option<Utf8PathBuf>,

    /// Do not fail singular patterns that match nothing
    pub allow_empty: bool,

    /// Directory that patterns starting with `/` are resolved under
    pub root: Option<Utf8PathBuf>,

    /// Turn unreadable directories below the walk root into errors
    pub strict: bool,

    /// Whether to follow symbolic links during traversal
    pub follow_symlinks: bool,

    /// Whether to use case-sensitive matching
    pub case_sensitive: bool,

    /// Maximum directory depth below a pattern's parent directory
    pub max_depth: Option<usize>,

    /// Entries buffered per pattern before its matcher waits for the consumer
    pub high_water_mark: usize,
}

impl Default for GlobOptions {
    fn default() -> Self {
        Self {
            cwd: None,
            dot: false,
            silent: true,
            nonull: false,
            cwdbase: false,
            base: None,
            allow_empty: false,
            root: None,
            strict: false,
            follow_symlinks: false,
            case_sensitive: cfg!(not(windows)), // Case-insensitive by default on Windows
            max_depth: None,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

impl GlobOptions {
    /// Fills in the working directory and applies `cwdbase`
    ///
    /// This is the only place the process working directory is read.
    ///
    /// # Errors
    ///
    /// Returns `GlobError::Io` if the current directory cannot be read and
    /// `GlobError::NonUtf8Path` if it is not valid UTF-8.
    pub fn resolve(&self) -> Result<ResolvedOptions, GlobError> {
        let cwd = match &self.cwd {
            Some(cwd) if cwd.is_absolute() => cwd.clone(),
            Some(cwd) => current_dir()?.join(cwd),
            None => current_dir()?,
        };

        let base = if self.cwdbase {
            Some(cwd.clone())
        } else {
            self.base.clone()
        };

        Ok(ResolvedOptions {
            cwd,
            base,
            root: self.root.clone(),
            dot: self.dot,
            silent: self.silent,
            nonull: self.nonull,
            allow_empty: self.allow_empty,
            strict: self.strict,
            follow_symlinks: self.follow_symlinks,
            case_sensitive: self.case_sensitive,
            max_depth: self.max_depth,
            high_water_mark: self.high_water_mark.max(1),
        })
    }
}

fn current_dir() -> Result<Utf8PathBuf, GlobError> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::from_path_buf(cwd).map_err(GlobError::NonUtf8Path)
}

/// Option set with every default filled in, fixed for one invocation
#[derive(Clone, Debug)]
pub struct ResolvedOptions {
    pub cwd: Utf8PathBuf,
    pub base: Option<Utf8PathBuf>,
    pub root: Option<Utf8PathBuf>,
    pub dot: bool,
    pub silent: bool,
    pub nonull: bool,
    pub allow_empty: bool,
    pub strict: bool,
    pub follow_symlinks: bool,
    pub case_sensitive: bool,
    pub max_depth: Option<usize>,
    pub high_water_mark: usize,
}

/// Options handed to the matcher for a single positive pattern
///
/// Derived from [`ResolvedOptions`] with the pattern's own `ignore` list.
/// `root` only affects normalization and is not carried over.
#[derive(Clone, Debug)]
pub struct MatchOptions {
    pub cwd: Utf8PathBuf,
    pub dot: bool,
    pub silent: bool,
    pub nonull: bool,
    pub strict: bool,
    pub follow_symlinks: bool,
    pub case_sensitive: bool,
    pub max_depth: Option<usize>,
    pub ignore: Vec<String>,
}

impl MatchOptions {
    /// Shallow copy of the invocation options with an `ignore` list
    pub fn derive(opts: &ResolvedOptions, ignore: Vec<String>) -> Self {
        Self {
            cwd: opts.cwd.clone(),
            dot: opts.dot,
            silent: opts.silent,
            nonull: opts.nonull,
            strict: opts.strict,
            follow_symlinks: opts.follow_symlinks,
            case_sensitive: opts.case_sensitive,
            max_depth: opts.max_depth,
            ignore,
        }
    }
}

/// Builder for GlobOptions for fluent configuration
pub struct GlobOptionsBuilder(GlobOptions);

impl Default for GlobOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobOptionsBuilder {
    /// Creates a new builder with default options
    pub fn new() -> Self {
        Self(GlobOptions::default())
    }

    /// Sets the working directory
    pub fn cwd(mut self, cwd: impl Into<Utf8PathBuf>) -> Self {
        self.0.cwd = Some(cwd.into());
        self
    }

    /// Sets whether wildcards match dotfiles
    pub fn dot(mut self, v: bool) -> Self {
        self.0.dot = v;
        self
    }

    /// Sets whether matcher warnings are demoted to debug
    pub fn silent(mut self, v: bool) -> Self {
        self.0.silent = v;
        self
    }

    /// Sets whether an unmatched pattern is emitted as-is
    pub fn nonull(mut self, v: bool) -> Self {
        self.0.nonull = v;
        self
    }

    /// Sets whether every entry's base is the working directory
    pub fn cwdbase(mut self, v: bool) -> Self {
        self.0.cwdbase = v;
        self
    }

    /// Sets an explicit base for every entry
    pub fn base(mut self, base: impl Into<Utf8PathBuf>) -> Self {
        self.0.base = Some(base.into());
        self
    }

    /// Sets whether singular patterns may match nothing
    pub fn allow_empty(mut self, v: bool) -> Self {
        self.0.allow_empty = v;
        self
    }

    /// Sets the directory `/`-prefixed patterns are resolved under
    pub fn root(mut self, root: impl Into<Utf8PathBuf>) -> Self {
        self.0.root = Some(root.into());
        self
    }

    /// Sets whether unreadable directories fail the stream
    pub fn strict(mut self, v: bool) -> Self {
        self.0.strict = v;
        self
    }

    /// Sets whether to follow symbolic links
    pub fn follow_symlinks(mut self, v: bool) -> Self {
        self.0.follow_symlinks = v;
        self
    }

    /// Sets case-sensitive matching behavior
    pub fn case_sensitive(mut self, v: bool) -> Self {
        self.0.case_sensitive = v;
        self
    }

    /// Sets the maximum directory depth to traverse
    pub fn max_depth(mut self, d: usize) -> Self {
        self.0.max_depth = Some(d);
        self
    }

    /// Sets how many entries each pattern may buffer ahead of the consumer
    pub fn high_water_mark(mut self, v: usize) -> Self {
        self.0.high_water_mark = v;
        self
    }

    /// Builds the final GlobOptions instance
    pub fn build(self) -> GlobOptions {
        self.0
    }
}
