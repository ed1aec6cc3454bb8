#[cfg(feature = "async")]
use crate::{
    classify::Classification,
    error::{EngineError, GlobError},
    options::ResolvedOptions,
    source::{Entry, PatternSource},
};
#[cfg(feature = "async")]
use async_stream::stream;
#[cfg(feature = "async")]
use camino::Utf8PathBuf;
#[cfg(feature = "async")]
use futures::{stream::select_all, Stream, StreamExt};
#[cfg(feature = "async")]
use std::{
    collections::HashSet,
    pin::Pin,
    task::{Context, Poll},
};
#[cfg(feature = "async")]
use tokio::{runtime::Handle, sync::mpsc};
#[cfg(feature = "async")]
use tracing::{debug, trace};

#[cfg(feature = "async")]
type BoxEntryStream = Pin<Box<dyn Stream<Item = Result<Entry, GlobError>> + Send>>;

#[cfg(feature = "async")]
/// Stream of matched entries returned by the async entry point
///
/// Yields `Ok` entries until the patterns are exhausted, or a single `Err`
/// after which it ends. Dropping it stops the matchers at their next send.
pub struct EntryStream {
    inner: BoxEntryStream,
}

#[cfg(feature = "async")]
impl Stream for EntryStream {
    type Item = Result<Entry, GlobError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(feature = "async")]
/// Runs one pattern's matcher on the blocking pool behind a bounded channel
///
/// The matcher starts immediately. It blocks once `capacity` entries are
/// waiting for the consumer, and stops when the receiving side is dropped.
fn spawn_source(source: PatternSource, capacity: usize, handle: &Handle) -> BoxEntryStream {
    let (tx, mut rx) = mpsc::channel(capacity);
    let glob = source.glob().to_string();
    debug!(glob = %glob, ignore = ?source.ignore(), "starting matcher");

    let task = handle.spawn_blocking(move || {
        for item in source.entries() {
            if tx.blocking_send(item).is_err() {
                trace!("consumer dropped, stopping matcher");
                break;
            }
        }
    });

    Box::pin(stream! {
        while let Some(item) = rx.recv().await {
            yield item;
        }
        // The sender is gone; surface a crashed matcher instead of ending quietly.
        if let Err(e) = task.await {
            yield Err(GlobError::engine(glob, EngineError::Task(e.to_string())));
        }
    })
}

#[cfg(feature = "async")]
/// Fans several entry streams into one
///
/// Entries of one source keep their order; sources interleave as their
/// entries become ready. The first error is forwarded and ends the stream.
pub fn merge<S>(sources: impl IntoIterator<Item = S>) -> impl Stream<Item = Result<Entry, GlobError>>
where
    S: Stream<Item = Result<Entry, GlobError>> + Unpin,
{
    let mut merged = select_all(sources);
    stream! {
        while let Some(item) = merged.next().await {
            match item {
                Ok(entry) => yield Ok(entry),
                Err(err) => {
                    yield Err(err);
                    break;
                }
            }
        }
    }
}

#[cfg(feature = "async")]
/// Drops entries whose path was already emitted
pub fn unique<S>(entries: S) -> impl Stream<Item = Result<Entry, GlobError>>
where
    S: Stream<Item = Result<Entry, GlobError>>,
{
    stream! {
        let mut seen: HashSet<Utf8PathBuf> = HashSet::new();
        futures::pin_mut!(entries);
        while let Some(item) = entries.next().await {
            match item {
                Ok(entry) if !seen.insert(entry.path.clone()) => {
                    trace!(path = %entry.path, "dropping duplicate entry");
                }
                other => yield other,
            }
        }
    }
}

#[cfg(feature = "async")]
/// Starts every positive pattern's matcher and combines their output
///
/// With one positive pattern its stream is returned directly; otherwise
/// the streams are merged and deduplicated by path.
///
/// # Errors
///
/// Returns `GlobError::Runtime` when called outside a Tokio runtime
pub fn glob_stream(
    classification: &Classification,
    opts: &ResolvedOptions,
) -> Result<EntryStream, GlobError> {
    let handle = Handle::try_current()?;
    let mut sources = classification.sources(opts);
    debug!(
        positives = classification.positives.len(),
        negatives = classification.negatives.len(),
        "starting glob stream"
    );

    let inner = if sources.len() == 1 {
        let source = sources.remove(0);
        spawn_source(source, opts.high_water_mark, &handle)
    } else {
        let streams: Vec<BoxEntryStream> = sources
            .into_iter()
            .map(|source| spawn_source(source, opts.high_water_mark, &handle))
            .collect();
        Box::pin(unique(merge(streams)))
    };

    Ok(EntryStream { inner })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{stream, TryStreamExt};

    fn entry(path: &str) -> Result<Entry, GlobError> {
        Ok(Entry {
            cwd: "/".into(),
            base: "/".into(),
            path: path.into(),
        })
    }

    fn paths(entries: Vec<Entry>) -> Vec<String> {
        entries.into_iter().map(|e| e.path.into_string()).collect()
    }

    #[tokio::test]
    async fn merge_keeps_per_source_order() {
        let a = stream::iter(vec![entry("/a1"), entry("/a2"), entry("/a3")]);
        let b = stream::iter(vec![entry("/b1"), entry("/b2")]);
        let merged: Vec<Entry> = merge(vec![a, b]).try_collect().await.unwrap();
        let merged = paths(merged);

        assert_eq!(merged.len(), 5);
        let a_only: Vec<_> = merged.iter().filter(|p| p.starts_with("/a")).collect();
        let b_only: Vec<_> = merged.iter().filter(|p| p.starts_with("/b")).collect();
        assert_eq!(a_only, vec!["/a1", "/a2", "/a3"]);
        assert_eq!(b_only, vec!["/b1", "/b2"]);
    }

    #[tokio::test]
    async fn merge_stops_at_first_error() {
        let failing = stream::iter(vec![Err(GlobError::NoMatch("/x".into())), entry("/after")]);
        let items: Vec<_> = merge(vec![failing]).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(GlobError::NoMatch(_))));
    }

    #[tokio::test]
    async fn unique_keeps_first_occurrence() {
        let input = stream::iter(vec![entry("/a"), entry("/b"), entry("/a"), entry("/c")]);
        let output: Vec<Entry> = unique(input).try_collect().await.unwrap();
        assert_eq!(paths(output), vec!["/a", "/b", "/c"]);
    }

    #[test]
    fn requires_a_runtime() {
        let classification = crate::classify::classify(["*.rs"]).unwrap();
        let opts = crate::GlobOptions::default().resolve().unwrap();
        assert!(matches!(
            glob_stream(&classification, &opts),
            Err(GlobError::Runtime(_))
        ));
    }
}
