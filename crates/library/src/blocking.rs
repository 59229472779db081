//! Synchronous entry points for callers without an async runtime.
//!
//! Each call builds a current-thread runtime and blocks until every in-flight
//! probe has finished. Do not call these from inside a runtime.

use crate::error::{ErrorKind, Result};
use crate::{FetchOptions, FileList, Progress};
use exn::ResultExt;
use sheaf_cache::CacheStore;
use sheaf_storage::ProbeHandle;
use std::future::Future;

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .or_raise(|| ErrorKind::Runtime)?;
    Ok(runtime.block_on(future))
}

/// Blocking form of [`FileList::fetch`].
pub fn fetch(list: &FileList, probe: &ProbeHandle, options: FetchOptions, progress: impl FnMut(Progress)) -> Result<FileList> {
    block_on(list.fetch(probe, options, progress))?
}

/// Blocking form of [`FileList::cache`].
pub fn cache(
    list: &FileList,
    store: &CacheStore,
    probe: &ProbeHandle,
    options: FetchOptions,
    progress: impl FnMut(Progress),
) -> Result<FileList> {
    block_on(list.cache(store, probe, options, progress))?
}
