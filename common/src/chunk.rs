//! Fixed-size partitioning of work lists
//!
//! Both parallel phases (matching and copying) split their input into contiguous chunks and
//! dispatch one task per chunk. A chunk remembers where it came from so log lines and failures
//! can be traced back to a position in the original list.
//!
//! # Trailing chunk
//!
//! The remainder after the last full chunk is always emitted as a final chunk, even when it is
//! empty. An empty input therefore produces one empty chunk, and an input whose length is an
//! exact multiple of the chunk size produces one extra empty chunk at the end. Dispatching an
//! empty chunk is a no-op, and the chunk count reported in the logs includes it.
//!
//! ```
//! use common::chunk::partition;
//! use std::num::NonZeroUsize;
//!
//! let chunks = partition(vec![1, 2, 3, 4], NonZeroUsize::new(2).unwrap());
//! assert_eq!(chunks.len(), 3);
//! assert!(chunks[2].is_empty());
//! ```

use std::num::NonZeroUsize;

/// A contiguous run of items cut out of a larger list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<T> {
    /// index of the first item in the original list
    pub start: usize,
    pub items: Vec<T>,
}

impl<T> Chunk<T> {
    fn new(start: usize, capacity: usize) -> Self {
        Self {
            start,
            items: Vec::with_capacity(capacity),
        }
    }

    /// Index range of this chunk in the original list.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> IntoIterator for Chunk<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Split `items` into chunks of `size`, keeping order.
///
/// Every chunk except the last holds exactly `size` items. The last chunk holds the remainder
/// and may be empty (see the module docs).
pub fn partition<T>(items: Vec<T>, size: NonZeroUsize) -> Vec<Chunk<T>> {
    let size = size.get();
    let mut chunks = Vec::with_capacity(items.len() / size + 1);
    let mut current = Chunk::new(0, size);
    for (idx, item) in items.into_iter().enumerate() {
        current.items.push(item);
        // close right after the size-th, 2*size-th, ... element
        if (idx + 1) % size == 0 {
            let next = Chunk::new(idx + 1, size);
            chunks.push(std::mem::replace(&mut current, next));
        }
    }
    chunks.push(current);
    chunks
}

/// Number of items across all chunks.
pub fn total_len<T>(chunks: &[Chunk<T>]) -> usize {
    chunks.iter().map(Chunk::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn empty_input_yields_one_empty_chunk() {
        let chunks = partition(Vec::<u32>::new(), size(3));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
        assert_eq!(chunks[0].range(), 0..0);
    }

    #[test]
    fn remainder_goes_to_last_chunk() {
        let chunks = partition((0..7).collect(), size(3));
        let lens: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(lens, vec![3, 3, 1]);
        assert_eq!(chunks[1].range(), 3..6);
        assert_eq!(chunks[2].items, vec![6]);
    }

    #[test]
    fn exact_multiple_adds_empty_trailing_chunk() {
        let chunks = partition((0..6).collect(), size(3));
        let lens: Vec<usize> = chunks.iter().map(Chunk::len).collect();
        assert_eq!(lens, vec![3, 3, 0]);
        assert_eq!(chunks[2].start, 6);
    }

    #[test]
    fn size_one_puts_every_item_in_own_chunk() {
        let chunks = partition(vec!["a", "b"], size(1));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].items, vec!["a"]);
        assert_eq!(chunks[1].items, vec!["b"]);
        assert!(chunks[2].is_empty());
    }

    #[test]
    fn size_larger_than_input() {
        let chunks = partition(vec![1, 2], size(25));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].items, vec![1, 2]);
    }

    proptest! {
        #[test]
        fn concatenation_reproduces_input(
            items in proptest::collection::vec(any::<u16>(), 0..200),
            n in 1usize..40,
        ) {
            let chunks = partition(items.clone(), size(n));
            prop_assert_eq!(total_len(&chunks), items.len());
            let mut next_start = 0;
            for chunk in &chunks {
                prop_assert_eq!(chunk.start, next_start);
                next_start = chunk.range().end;
            }
            for chunk in &chunks[..chunks.len() - 1] {
                prop_assert_eq!(chunk.len(), n);
            }
            let last = chunks.last().unwrap();
            prop_assert!(last.len() < n);
            let joined: Vec<u16> = chunks.into_iter().flatten().collect();
            prop_assert_eq!(joined, items);
        }
    }
}
