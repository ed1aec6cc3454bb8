use crate::{
    classify::Classification,
    error::GlobError,
    options::ResolvedOptions,
    source::{Entries, Entry, PatternSource},
};
use camino::Utf8PathBuf;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Blocking sequence of deduplicated entries
///
/// Positive patterns are expanded one after the other in declaration order.
/// The sequence ends after the first error.
pub struct EntryIter {
    pending: std::vec::IntoIter<PatternSource>,
    current: Option<Entries>,
    seen: Option<HashSet<Utf8PathBuf>>,
    done: bool,
}

impl Iterator for EntryIter {
    type Item = Result<Entry, GlobError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            if self.current.is_none() {
                let source = self.pending.next()?;
                trace!(glob = %source.glob(), "expanding glob");
                self.current = Some(source.entries());
            }
            let current = self.current.as_mut()?;

            match current.next() {
                Some(Ok(entry)) => {
                    if let Some(seen) = &mut self.seen {
                        if !seen.insert(entry.path.clone()) {
                            trace!(path = %entry.path, "dropping duplicate entry");
                            continue;
                        }
                    }
                    return Some(Ok(entry));
                }
                Some(Err(err)) => {
                    self.done = true;
                    return Some(Err(err));
                }
                None => self.current = None,
            }
        }
    }
}

/// Expands classified patterns without an async runtime
///
/// A single positive pattern is returned as-is; several are chained and
/// deduplicated by path.
pub fn glob_sync(classification: &Classification, opts: &ResolvedOptions) -> EntryIter {
    let sources = classification.sources(opts);
    debug!(
        positives = classification.positives.len(),
        negatives = classification.negatives.len(),
        "starting blocking glob"
    );

    let seen = (sources.len() > 1).then(HashSet::new);
    EntryIter {
        pending: sources.into_iter(),
        current: None,
        seen,
        done: false,
    }
}
