//! Stream helpers for running futures with a concurrency ceiling.

use futures::stream::{FusedStream, FuturesUnordered};
use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project_lite::pin_project! {
    /// Runs futures from a lazy iterator, at most `limit` at a time.
    ///
    /// Futures are started in iterator order; a new one is pulled only when a
    /// running one completes (pop-n-push, FIFO). Outputs are yielded in
    /// completion order, so callers that care about position should carry an
    /// index in the output.
    ///
    /// Once [`halt`](Self::halt) is called no further futures are pulled from
    /// the iterator, but the ones already running are still polled to
    /// completion and yielded.
    ///
    /// ```
    /// use futures::StreamExt;
    /// use sheaf_asyncutils::Bounded;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let jobs = (0..10u32).map(|n| async move { n * 2 });
    /// let mut outputs: Vec<u32> = Bounded::new(jobs, 3).collect().await;
    /// outputs.sort();
    /// assert_eq!(outputs, (0..10).map(|n| n * 2).collect::<Vec<_>>());
    /// # }
    /// ```
    #[must_use = "streams do nothing unless polled"]
    pub struct Bounded<I: Iterator> {
        pending: I,
        running: FuturesUnordered<I::Item>,
        limit: usize,
        halted: bool,
    }
}

impl<I> Bounded<I>
where
    I: Iterator,
    I::Item: Future,
{
    /// A `limit` of zero is treated as one.
    pub fn new(futures: impl IntoIterator<IntoIter = I>, limit: usize) -> Self {
        Self {
            pending: futures.into_iter(),
            running: FuturesUnordered::new(),
            limit: limit.max(1),
            halted: false,
        }
    }

    /// Stop pulling new futures; in-flight ones keep running.
    pub fn halt(self: Pin<&mut Self>) {
        *self.project().halted = true;
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Number of futures currently in flight.
    pub fn in_flight(&self) -> usize {
        self.running.len()
    }
}

impl<I> Stream for Bounded<I>
where
    I: Iterator,
    I::Item: Future,
{
    type Item = <I::Item as Future>::Output;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if !*this.halted {
            while this.running.len() < *this.limit {
                match this.pending.next() {
                    Some(future) => this.running.push(future),
                    None => break,
                }
            }
        }
        // An empty set with nothing left to pull means we are done.
        this.running.poll_next_unpin(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.halted {
            return (self.running.len(), Some(self.running.len()));
        }
        let (lower, upper) = self.pending.size_hint();
        (self.running.len() + lower, upper.map(|u| u + self.running.len()))
    }
}

impl<I> FusedStream for Bounded<I>
where
    I: Iterator,
    I::Item: Future,
{
    fn is_terminated(&self) -> bool {
        self.running.is_empty() && (self.halted || self.pending.size_hint().1 == Some(0))
    }
}
