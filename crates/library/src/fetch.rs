//! Bounded-concurrency metadata retrieval.

use crate::FileList;
use crate::error::{ErrorKind, Result};
use async_stream::stream;
use exn::{OptionExt, ResultExt};
use futures::{Stream, StreamExt};
use sheaf_asyncutils::Bounded;
use sheaf_cache::CacheStore;
use sheaf_config::FetchConfig;
use sheaf_storage::{FileEntry, Metadata, ProbeHandle};
use std::collections::HashMap;
use std::pin::pin;
use tracing::instrument;

/// How a fetch is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Maximum probes in flight; `1` probes sequentially.
    pub concurrency: usize,
    /// Abort on the first failed probe instead of recording it on the entry.
    pub stop_on_error: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchOptions {
    fn from(config: &FetchConfig) -> Self {
        Self { concurrency: config.concurrency, stop_on_error: config.stop_on_error }
    }
}

impl FetchOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }
}

/// Probes finished so far, out of the probes this call will make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Events emitted by [`fetch_stream`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once, with the number of probes.
/// 2. [`Probed`](Self::Probed) once per entry, in completion order.
/// 3. [`Complete`](Self::Complete) exactly once.
///
/// An error terminates the stream early, in which case
/// [`Complete`](Self::Complete) is never emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Started(usize),
    /// The entry at `index` has been probed; `metadata` is either resolved
    /// or carries the failure reason.
    Probed { index: usize, metadata: Metadata, progress: Progress },
    Complete,
}

/// Streams one probe per entry through `probe`, at most
/// `options.concurrency` at a time.
///
/// Every entry needs a bound URL; otherwise the stream fails with
/// [`Unbound`](ErrorKind::Unbound) before anything is probed. Under
/// `stop_on_error` the first failure stops new probes from starting, lets the
/// in-flight ones finish (their results are dropped) and then fails with
/// [`FetchAborted`](ErrorKind::FetchAborted).
pub fn fetch_stream<'a>(
    probe: &'a ProbeHandle,
    entries: &'a [FileEntry],
    options: FetchOptions,
) -> impl Stream<Item = Result<FetchEvent>> + 'a {
    stream!({
        let total = entries.len();
        yield Ok(FetchEvent::Started(total));

        let locations = match entries
            .iter()
            .map(|entry| entry.url().ok_or_raise(|| ErrorKind::Unbound(entry.filename().unwrap_or_default().to_string())))
            .collect::<Result<Vec<&str>>>()
        {
            Ok(locations) => locations,
            Err(e) => {
                yield Err(e);
                return;
            },
        };

        let jobs = locations.into_iter().enumerate().map(|(index, location)| async move {
            (index, probe.probe(location).await)
        });
        let mut pool = pin!(Bounded::new(jobs, options.concurrency));
        let mut completed = 0;
        let mut aborted = None;
        while let Some((index, outcome)) = pool.next().await {
            completed += 1;
            if aborted.is_some() {
                continue;
            }
            let progress = Progress { completed, total };
            match outcome {
                Ok(meta) => yield Ok(FetchEvent::Probed { index, metadata: meta.into(), progress }),
                Err(err) if options.stop_on_error => {
                    tracing::warn!(probe = probe.name(), error = %*err, in_flight = pool.in_flight(), "aborting fetch");
                    pool.as_mut().halt();
                    aborted = Some((index, err));
                },
                Err(err) => {
                    tracing::debug!(probe = probe.name(), error = %*err, "probe failed");
                    let metadata = Metadata::error((*err).to_string());
                    yield Ok(FetchEvent::Probed { index, metadata, progress });
                },
            }
        }

        if let Some((index, err)) = aborted {
            let filename = entries[index].filename().unwrap_or_default().to_string();
            let reason = (*err).to_string();
            yield Err(err.raise(ErrorKind::FetchAborted { filename, reason }));
            return;
        }
        yield Ok(FetchEvent::Complete);
    })
}

/// Probes every entry and returns them with metadata filled in, in input
/// order. `progress` is called after each probe.
///
/// Failed probes are recorded as [`Status::Error`](sheaf_storage::Status)
/// unless `options.stop_on_error` is set.
#[instrument(skip_all, fields(probe = probe.name(), entries = entries.len(), concurrency = options.concurrency))]
pub async fn fetch(
    probe: &ProbeHandle,
    entries: &[FileEntry],
    options: FetchOptions,
    mut progress: impl FnMut(Progress),
) -> Result<Vec<FileEntry>> {
    // One write-once slot per entry; only this task touches them.
    let mut slots: Vec<Option<Metadata>> = vec![None; entries.len()];
    let mut events = pin!(fetch_stream(probe, entries, options));
    while let Some(event) = events.next().await {
        match event? {
            FetchEvent::Started(_) | FetchEvent::Complete => {},
            FetchEvent::Probed { index, metadata, progress: p } => {
                debug_assert!(slots[index].is_none(), "entry {index} probed twice");
                slots[index] = Some(metadata);
                progress(p);
            },
        }
    }
    let failed = slots.iter().flatten().filter(|m| !m.is_ok()).count();
    tracing::info!(resolved = entries.len() - failed, failed, "fetch complete");
    Ok(entries
        .iter()
        .zip(slots)
        .map(|(entry, slot)| FileEntry { metadata: slot.unwrap_or_else(|| entry.metadata.clone()), ..entry.clone() })
        .collect())
}

impl FileList {
    /// Resolves metadata for every entry that is not already `ok`.
    ///
    /// Resolved entries are left untouched and never probed again. The list
    /// must be fully expanded and bound to a directory.
    pub async fn fetch(&self, probe: &ProbeHandle, options: FetchOptions, progress: impl FnMut(Progress)) -> Result<Self> {
        self.ensure_complete()?;
        let pending: Vec<usize> = (0..self.entries.len()).filter(|&i| !self.entries[i].is_ok()).collect();
        if pending.is_empty() {
            return Ok(self.clone());
        }
        let targets: Vec<FileEntry> = pending.iter().map(|&i| self.entries[i].clone()).collect();
        let resolved = fetch(probe, &targets, options, progress).await?;

        let mut entries = self.entries.clone();
        for (index, entry) in pending.into_iter().zip(resolved) {
            entries[index] = entry;
        }
        Ok(self.with_entries(entries))
    }

    /// Fetches what is missing and writes the result to `store`.
    ///
    /// An existing cache for the same template is consulted first: entries it
    /// has as `ok` are taken from it by filename, so re-runs only probe new or
    /// previously failed entries. A cache for a different template fails with
    /// [`TemplateMismatch`](ErrorKind::TemplateMismatch); a corrupt one with
    /// [`Cache`](ErrorKind::Cache). Nothing is written if the fetch aborts.
    #[instrument(skip_all, fields(path = %store.path().display(), entries = self.entries.len()))]
    pub async fn cache(
        &self,
        store: &CacheStore,
        probe: &ProbeHandle,
        options: FetchOptions,
        progress: impl FnMut(Progress),
    ) -> Result<Self> {
        self.ensure_complete()?;
        let mut list = self.clone();
        if let Some(snapshot) = store.load_if_exists().or_raise(|| ErrorKind::Cache)? {
            if snapshot.template != self.template {
                exn::bail!(ErrorKind::TemplateMismatch {
                    left: self.template.pattern().to_string(),
                    right: snapshot.template.pattern().to_string(),
                });
            }
            let known: HashMap<&str, &Metadata> = snapshot
                .entries
                .iter()
                .filter(|entry| entry.is_ok())
                .filter_map(|entry| Some((entry.filename()?, &entry.metadata)))
                .collect();
            let mut reused = 0;
            for entry in &mut list.entries {
                if !entry.is_ok()
                    && let Some(metadata) = entry.filename().and_then(|name| known.get(name))
                {
                    entry.metadata = (*metadata).clone();
                    reused += 1;
                }
            }
            tracing::info!(reused, "reusing cached metadata");
        }
        let list = list.fetch(probe, options, progress).await?;
        store.save(&list.snapshot()).or_raise(|| ErrorKind::Cache)?;
        Ok(list)
    }
}
