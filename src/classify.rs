use crate::{error::GlobError, options::ResolvedOptions, path, source::PatternSource};
use std::ffi::{OsStr, OsString};

/// Marker that turns a pattern into an exclusion
const NEGATION: char = '!';

/// Conversion of the caller's pattern argument into an ordered list
///
/// Implemented for a single pattern (`&str`, `String`) and for ordered
/// collections of anything that can be viewed as an `OsStr`.
pub trait IntoGlobs {
    fn into_globs(self) -> Vec<OsString>;
}

impl IntoGlobs for &str {
    fn into_globs(self) -> Vec<OsString> {
        vec![OsString::from(self)]
    }
}

impl IntoGlobs for String {
    fn into_globs(self) -> Vec<OsString> {
        vec![OsString::from(self)]
    }
}

impl IntoGlobs for &String {
    fn into_globs(self) -> Vec<OsString> {
        vec![OsString::from(self)]
    }
}

impl<S: AsRef<OsStr>> IntoGlobs for Vec<S> {
    fn into_globs(self) -> Vec<OsString> {
        self.iter().map(|s| s.as_ref().to_os_string()).collect()
    }
}

impl<S: AsRef<OsStr>> IntoGlobs for &[S] {
    fn into_globs(self) -> Vec<OsString> {
        self.iter().map(|s| s.as_ref().to_os_string()).collect()
    }
}

impl<S: AsRef<OsStr>, const N: usize> IntoGlobs for [S; N] {
    fn into_globs(self) -> Vec<OsString> {
        self.iter().map(|s| s.as_ref().to_os_string()).collect()
    }
}

impl<S: AsRef<OsStr>, const N: usize> IntoGlobs for &[S; N] {
    fn into_globs(self) -> Vec<OsString> {
        self.iter().map(|s| s.as_ref().to_os_string()).collect()
    }
}

/// A pattern together with its position in the caller's list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedGlob {
    pub index: usize,
    pub glob: String,
}

/// A pattern tagged with its polarity
///
/// Negative patterns keep their `!` until they are scoped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Positive(IndexedGlob),
    Negative(IndexedGlob),
}

impl Classified {
    /// Classifies one raw pattern
    ///
    /// # Errors
    ///
    /// Returns `GlobError::InvalidPattern` when the pattern is not valid
    /// UTF-8 or is a `!` with nothing after it. The empty pattern is positive
    /// and resolves to the working directory.
    pub fn parse(index: usize, raw: &OsStr) -> Result<Self, GlobError> {
        let glob = raw.to_str().ok_or_else(|| GlobError::InvalidPattern {
            index,
            reason: "pattern is not valid UTF-8".into(),
        })?;

        let indexed = IndexedGlob {
            index,
            glob: glob.to_string(),
        };
        match glob.strip_prefix(NEGATION) {
            Some("") => Err(GlobError::InvalidPattern {
                index,
                reason: "negation has no pattern".into(),
            }),
            Some(_) => Ok(Classified::Negative(indexed)),
            None => Ok(Classified::Positive(indexed)),
        }
    }
}

/// The caller's patterns split by polarity, each keeping its original index
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classification {
    pub positives: Vec<IndexedGlob>,
    pub negatives: Vec<IndexedGlob>,
}

/// Splits an ordered list of patterns into positives and negatives
///
/// # Errors
///
/// Returns `GlobError::InvalidPattern` for the first unusable element and
/// `GlobError::MissingPositive` when no positive pattern remains.
pub fn classify<I, S>(globs: I) -> Result<Classification, GlobError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut classification = Classification::default();

    for (index, raw) in globs.into_iter().enumerate() {
        match Classified::parse(index, raw.as_ref())? {
            Classified::Positive(glob) => classification.positives.push(glob),
            Classified::Negative(glob) => classification.negatives.push(glob),
        }
    }

    if classification.positives.is_empty() {
        return Err(GlobError::MissingPositive);
    }
    Ok(classification)
}

impl Classification {
    /// Negative patterns declared after `index`, without their `!`
    pub fn negatives_after(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.negatives
            .iter()
            .filter(move |negative| negative.index > index)
            .map(|negative| &negative.glob[NEGATION.len_utf8()..])
    }

    /// Absolute exclusion patterns for the positive pattern at `index`
    ///
    /// Normalized with the same `cwd` and `root` as positive patterns.
    pub fn scoped_negatives(&self, index: usize, opts: &ResolvedOptions) -> Vec<String> {
        self.negatives_after(index)
            .map(|negative| path::to_absolute_glob(negative, &opts.cwd, opts.root.as_deref()))
            .collect()
    }

    /// One source per positive pattern, in declaration order
    pub fn sources(&self, opts: &ResolvedOptions) -> Vec<PatternSource> {
        self.positives
            .iter()
            .map(|positive| {
                PatternSource::new(
                    &positive.glob,
                    self.scoped_negatives(positive.index, opts),
                    opts,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GlobOptionsBuilder;
    use rstest::rstest;

    #[test]
    fn keeps_original_indexes() {
        let classification = classify(["a/**/*.js", "!a/vendor/**", "b/**/*.js"]).unwrap();
        assert_eq!(
            classification.positives,
            vec![
                IndexedGlob {
                    index: 0,
                    glob: "a/**/*.js".into()
                },
                IndexedGlob {
                    index: 2,
                    glob: "b/**/*.js".into()
                },
            ]
        );
        assert_eq!(classification.negatives[0].index, 1);
    }

    #[test]
    fn negation_only_applies_to_earlier_positives() {
        let classification = classify(["a/**/*.js", "!a/vendor/**", "b/**/*.js"]).unwrap();
        assert_eq!(
            classification.negatives_after(0).collect::<Vec<_>>(),
            vec!["a/vendor/**"]
        );
        assert!(classification.negatives_after(2).next().is_none());
    }

    #[test]
    fn negation_before_positive_is_ignored() {
        let classification = classify(["!*.md", "*"]).unwrap();
        assert!(classification.negatives_after(1).next().is_none());
    }

    #[rstest]
    #[case(Vec::<&str>::new())]
    #[case(vec!["!only-negative"])]
    #[case(vec!["!a", "!b"])]
    fn requires_a_positive(#[case] globs: Vec<&str>) {
        assert!(matches!(classify(globs), Err(GlobError::MissingPositive)));
    }

    #[test]
    fn empty_pattern_is_positive() {
        let classification = classify(["", "!*.md"]).unwrap();
        assert_eq!(classification.positives[0].glob, "");
        assert_eq!(classification.negatives[0].index, 1);
    }

    #[rstest]
    #[case(vec!["!"], 0)]
    #[case(vec!["*.js", "!"], 1)]
    fn rejects_bare_negation(#[case] globs: Vec<&str>, #[case] bad: usize) {
        match classify(globs) {
            Err(GlobError::InvalidPattern { index, .. }) => assert_eq!(index, bad),
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn rejects_non_utf8_patterns() {
        use std::os::unix::ffi::OsStrExt;

        let bad = OsStr::from_bytes(&[0x66, 0x6f, 0xff]);
        match classify([bad]) {
            Err(GlobError::InvalidPattern { index, .. }) => assert_eq!(index, 0),
            other => panic!("expected InvalidPattern, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn scoped_negatives_are_absolute_and_rooted() {
        let opts = GlobOptionsBuilder::new()
            .cwd("/work")
            .root("/srv")
            .build()
            .resolve()
            .unwrap();
        let classification = classify(["**/*.js", "!vendor/**", "!/static/*.js"]).unwrap();
        assert_eq!(
            classification.scoped_negatives(0, &opts),
            vec!["/work/vendor/**".to_string(), "/srv/static/*.js".to_string()]
        );
    }

    #[test]
    fn single_patterns_convert_to_lists() {
        assert_eq!("*.js".into_globs(), vec![OsString::from("*.js")]);
        assert_eq!(String::from("a").into_globs().len(), 1);
        assert_eq!(["a", "b"].into_globs().len(), 2);
    }
}
