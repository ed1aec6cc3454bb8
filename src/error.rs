use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors surfaced to callers of the entry point and its streams
///
/// `InvalidPattern`, `MissingPositive`, `Io`, `NonUtf8Path` and `Runtime`
/// are raised synchronously, before any matching starts. `NoMatch` and
/// `Engine` arrive as the terminal item of a stream.
#[derive(Error, Debug)]
pub enum GlobError {
    /// A pattern element could not be used as a glob
    #[error("Invalid glob at index {index}: {reason}")]
    InvalidPattern { index: usize, reason: String },

    /// Every pattern was a negation
    #[error("Missing positive glob")]
    MissingPositive,

    /// A singular literal pattern matched nothing and empty results were not allowed
    #[error("File not found with singular glob: {0}")]
    NoMatch(String),

    /// The matcher failed while expanding a pattern
    #[error("Failed to match glob {pattern}: {source}")]
    Engine {
        pattern: String,
        #[source]
        source: EngineError,
    },

    /// I/O error while resolving the working directory
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Working directory or base is not valid UTF-8
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),

    /// The async entry point was called outside a Tokio runtime
    #[cfg(feature = "async")]
    #[error("No Tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

impl GlobError {
    /// Wraps a matcher failure with the pattern it happened on
    pub fn engine(pattern: impl Into<String>, source: EngineError) -> Self {
        GlobError::Engine {
            pattern: pattern.into(),
            source,
        }
    }
}

/// Failures of the pattern engine itself
///
/// These are always reported through [`GlobError::Engine`] so the caller
/// knows which pattern triggered them.
#[derive(Error, Debug)]
pub enum EngineError {
    /// I/O error from filesystem operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid pattern syntax
    #[error("Invalid pattern: {0}")]
    Syntax(String),

    /// Walkdir traversal error
    #[error("Walkdir error: {0}")]
    Walkdir(#[from] walkdir::Error),

    /// Brace expansion exceeded maximum depth
    #[error("Brace expansion exceeded maximum depth")]
    BraceExpansionDepth,

    /// Brace expansion exceeded maximum number of expansions
    #[error("Brace expansion exceeded maximum expansions")]
    BraceExpansionCount,

    /// Regex pattern too complex or too long
    #[error("Regex pattern too complex or long")]
    RegexTooComplex,

    /// The blocking task driving the matcher died
    #[error("Matcher task failed: {0}")]
    Task(String),
}

impl From<globset::Error> for EngineError {
    fn from(e: globset::Error) -> Self {
        EngineError::Syntax(e.to_string())
    }
}
