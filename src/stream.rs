//! Batched streaming of paginated result sets.
//!
//! Measurement stores answer offset/limit queries; pulling a large series
//! means issuing the same query page by page until a page comes back empty.
//! [`BatchStream`] drives that loop against any [`BatchSource`], and
//! [`Lookahead`] overlaps fetching with consumption by running the producer
//! on a background thread behind a bounded channel.

use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use log::debug;

/// Rows requested per page unless overridden.
pub const DEFAULT_BATCH_SIZE: u64 = 50_000;

/// Prefetched items held for the consumer unless overridden.
pub const DEFAULT_LOOKAHEAD: usize = 2;

/// A paginated source of rows, addressed by offset and limit.
///
/// Implementations wrap whatever answers `LIMIT {limit} OFFSET {offset}`
/// style queries; the toolkit stays agnostic of the store behind it. Any
/// `FnMut(u64, u64) -> Result<Vec<T>, E>` closure is a source.
pub trait BatchSource {
    type Item;
    type Error;

    /// Fetches one page. An empty page means the source is exhausted.
    fn fetch(&mut self, offset: u64, limit: u64) -> Result<Vec<Self::Item>, Self::Error>;
}

impl<T, E, F> BatchSource for F
where
    F: FnMut(u64, u64) -> Result<Vec<T>, E>,
{
    type Item = T;
    type Error = E;

    fn fetch(&mut self, offset: u64, limit: u64) -> Result<Vec<T>, E> {
        self(offset, limit)
    }
}

/// Iterator over the pages of a [`BatchSource`].
///
/// The offset advances by the configured batch size after every page; the
/// stream ends at the first empty page, or after yielding the first error.
#[derive(Debug)]
pub struct BatchStream<S> {
    source: S,
    batch_size: u64,
    offset: u64,
    done: bool,
}

impl<S: BatchSource> BatchStream<S> {
    /// Streams `source` with [`DEFAULT_BATCH_SIZE`].
    pub fn new(source: S) -> Self {
        Self::with_batch_size(source, DEFAULT_BATCH_SIZE)
    }

    /// Streams `source` with an explicit page size.
    pub fn with_batch_size(source: S, batch_size: u64) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
            offset: 0,
            done: false,
        }
    }

    /// Flattens the stream into individual rows.
    ///
    /// A fetch error is yielded once, in place, and ends the stream.
    pub fn rows(self) -> impl Iterator<Item = Result<S::Item, S::Error>> {
        self.flat_map(|page| match page {
            Ok(items) => items.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        })
    }
}

impl<S: BatchSource> Iterator for BatchStream<S> {
    type Item = Result<Vec<S::Item>, S::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let before = Instant::now();
        let result = self.source.fetch(self.offset, self.batch_size);
        debug!(
            "page at offset {} fetched in {:.3}s",
            self.offset,
            before.elapsed().as_secs_f64()
        );
        match result {
            Ok(page) if page.is_empty() => {
                self.done = true;
                None
            }
            Ok(page) => {
                self.offset += self.batch_size;
                Some(Ok(page))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Bounded read-ahead over any iterator.
///
/// The inner iterator runs on a background thread and stays at most
/// `lookahead` items ahead of the consumer, so production and consumption
/// overlap without unbounded buffering. Items arrive in order. Dropping the
/// `Lookahead` early disconnects the channel and joins the producer.
#[derive(Debug)]
pub struct Lookahead<T> {
    receiver: Option<mpsc::Receiver<T>>,
    producer: Option<thread::JoinHandle<()>>,
}

impl<T: Send + 'static> Lookahead<T> {
    /// Starts prefetching with [`DEFAULT_LOOKAHEAD`] items of read-ahead.
    pub fn new<I>(inner: I) -> Self
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        Self::with_lookahead(inner, DEFAULT_LOOKAHEAD)
    }

    /// Starts prefetching with an explicit read-ahead depth.
    pub fn with_lookahead<I>(inner: I, lookahead: usize) -> Self
    where
        I: Iterator<Item = T> + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(lookahead.max(1));
        let producer = thread::spawn(move || {
            for item in inner {
                // A send error means the consumer is gone; stop producing.
                if sender.send(item).is_err() {
                    break;
                }
            }
        });
        Self {
            receiver: Some(receiver),
            producer: Some(producer),
        }
    }
}

impl<T> Iterator for Lookahead<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let receiver = self.receiver.as_ref()?;
        let before = Instant::now();
        let item = receiver.recv().ok();
        debug!(
            "waited {:.3}s for prefetched item",
            before.elapsed().as_secs_f64()
        );
        if item.is_none() {
            self.receiver = None;
        }
        item
    }
}

impl<T> Drop for Lookahead<T> {
    fn drop(&mut self) {
        // Disconnect before joining so a producer blocked on a full channel
        // observes the hangup and exits.
        self.receiver = None;
        if let Some(producer) = self.producer.take() {
            let _ = producer.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn vec_source(data: Vec<i32>) -> impl FnMut(u64, u64) -> Result<Vec<i32>, String> {
        move |offset, limit| {
            let start = (offset as usize).min(data.len());
            let end = (offset as usize + limit as usize).min(data.len());
            Ok(data[start..end].to_vec())
        }
    }

    #[test]
    fn stream_pages_until_empty_page() {
        let stream = BatchStream::with_batch_size(vec_source(vec![0, 1, 2, 3, 4]), 2);
        let pages: Vec<Vec<i32>> = stream.map(|p| p.expect("no errors")).collect();
        assert_eq!(pages, vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn rows_flatten_pages_in_order() {
        let stream = BatchStream::with_batch_size(vec_source((0..7).collect()), 3);
        let rows: Vec<i32> = stream.rows().map(|r| r.expect("no errors")).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn empty_source_yields_no_pages() {
        let mut stream = BatchStream::new(vec_source(Vec::new()));
        assert!(stream.next().is_none());
        // Exhaustion is sticky.
        assert!(stream.next().is_none());
    }

    #[test]
    fn offset_advances_by_batch_size() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&calls);
        let source = move |offset: u64, limit: u64| -> Result<Vec<i32>, String> {
            seen.borrow_mut().push((offset, limit));
            if offset >= 4 { Ok(Vec::new()) } else { Ok(vec![0, 0]) }
        };
        let stream = BatchStream::with_batch_size(source, 2);
        assert_eq!(stream.count(), 2);
        assert_eq!(*calls.borrow(), vec![(0, 2), (2, 2), (4, 2)]);
    }

    #[test]
    fn error_is_yielded_once_and_ends_stream() {
        let mut attempts = 0;
        let source = move |_offset: u64, _limit: u64| -> Result<Vec<i32>, String> {
            attempts += 1;
            if attempts == 1 {
                Ok(vec![1, 2])
            } else {
                Err("connection lost".to_string())
            }
        };
        let mut rows = BatchStream::with_batch_size(source, 2).rows();
        assert_eq!(rows.next(), Some(Ok(1)));
        assert_eq!(rows.next(), Some(Ok(2)));
        assert_eq!(rows.next(), Some(Err("connection lost".to_string())));
        assert!(rows.next().is_none());
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let stream = BatchStream::with_batch_size(vec_source(vec![7]), 0);
        let rows: Vec<i32> = stream.rows().map(|r| r.expect("no errors")).collect();
        assert_eq!(rows, vec![7]);
    }

    #[test]
    fn lookahead_preserves_order() {
        let items: Vec<u32> = Lookahead::new(0..100).collect();
        let expected: Vec<u32> = (0..100).collect();
        assert_eq!(items, expected);
    }

    #[test]
    fn lookahead_over_empty_iterator_ends_immediately() {
        let mut prefetched = Lookahead::new(std::iter::empty::<u32>());
        assert!(prefetched.next().is_none());
        assert!(prefetched.next().is_none());
    }

    #[test]
    fn dropping_lookahead_early_joins_the_producer() {
        let mut prefetched = Lookahead::with_lookahead(0..1_000_000u64, 1);
        assert_eq!(prefetched.next(), Some(0));
        // Must not deadlock against a producer blocked on the full channel.
        drop(prefetched);
    }

    #[test]
    fn lookahead_composes_with_batch_stream() {
        let rows = BatchStream::with_batch_size(vec_source((0..50).collect()), 8)
            .rows()
            .map(|r| r.expect("no errors"));
        let prefetched: Vec<i32> = Lookahead::with_lookahead(rows, 4).collect();
        assert_eq!(prefetched, (0..50).collect::<Vec<i32>>());
    }
}
