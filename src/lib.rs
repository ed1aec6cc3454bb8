// lib.rs
#![forbid(unsafe_code)]

#[cfg(feature = "async")]
pub mod async_glob;
pub mod classify;
pub mod error;
pub mod matcher;
pub mod options;
pub mod path;
pub mod patterns;
pub mod source;
pub mod sync;
pub mod windows;

#[cfg(feature = "async")]
pub use crate::async_glob::EntryStream;
pub use crate::classify::IntoGlobs;
pub use crate::error::{EngineError, GlobError};
pub use crate::options::{GlobOptions, GlobOptionsBuilder};
pub use crate::source::Entry;
pub use crate::sync::EntryIter;

/// Main facade for the globstream library
///
/// Both entry points take a single pattern or an ordered list of patterns.
/// Patterns starting with `!` exclude matches from the positive patterns
/// declared before them. Validation happens before any matching starts.
pub struct GlobStream;

impl GlobStream {
    /// Creates a stream of entries matching the patterns
    ///
    /// Every positive pattern's matcher starts right away on Tokio's
    /// blocking pool; entries arrive as they are found. Each pattern buffers
    /// at most `high_water_mark` entries ahead of the consumer.
    ///
    /// # Errors
    ///
    /// Fails synchronously with `GlobError::InvalidPattern`,
    /// `GlobError::MissingPositive`, a working-directory error, or
    /// `GlobError::Runtime` when no Tokio runtime is running. Matching
    /// failures arrive as the stream's last item instead.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use futures::TryStreamExt;
    /// use globstream::{GlobOptions, GlobStream};
    ///
    /// # async fn run() -> Result<(), globstream::GlobError> {
    /// let mut entries = GlobStream::create(
    ///     ["src/**/*.rs", "!src/generated/**", "Cargo.toml"],
    ///     GlobOptions::default(),
    /// )?;
    /// while let Some(entry) = entries.try_next().await? {
    ///     println!("{}", entry.path);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "async")]
    pub fn create(globs: impl IntoGlobs, opts: GlobOptions) -> Result<EntryStream, GlobError> {
        let classification = classify::classify(globs.into_globs())?;
        let opts = opts.resolve()?;
        async_glob::glob_stream(&classification, &opts)
    }

    /// Expands the patterns on the calling thread
    ///
    /// Same semantics as [`GlobStream::create`], except that positive
    /// patterns are expanded one after the other.
    ///
    /// # Errors
    ///
    /// Fails with `GlobError::InvalidPattern`, `GlobError::MissingPositive`
    /// or a working-directory error before anything is matched.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use globstream::{GlobOptions, GlobStream};
    ///
    /// let entries = GlobStream::sync("*.txt", GlobOptions::default()).unwrap();
    /// for entry in entries {
    ///     println!("{}", entry.unwrap().path);
    /// }
    /// ```
    pub fn sync(globs: impl IntoGlobs, opts: GlobOptions) -> Result<EntryIter, GlobError> {
        let classification = classify::classify(globs.into_globs())?;
        let opts = opts.resolve()?;
        Ok(sync::glob_sync(&classification, &opts))
    }
}
