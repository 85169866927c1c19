//! Growable arrays backing the compact node store.

use std::ops::{Index, IndexMut, Range};

use crate::Result;

mod realloc;
mod stacked;

pub use realloc::ReallocVec;
pub use stacked::StackedVec;

/// Largest number of elements a single growth step adds, and the block length
/// of [`StackedVec`].
pub const DEFAULT_MAX_GROW: usize = 131_072;

/// A growable sequence with fallible growth.
///
/// Every operation that may allocate reports allocation failure as
/// [`Error::OutOfMemory`](crate::Error::OutOfMemory) and leaves the array
/// untouched. Indexing out of bounds panics, `get` is the checked accessor.
pub trait GrowableArray<T>: Index<usize, Output = T> + IndexMut<usize, Output = T> {
    fn new() -> Self
    where
        Self: Sized;

    fn from_vec(items: Vec<T>) -> Self
    where
        Self: Sized;

    fn len(&self) -> usize;

    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    fn get(&self, index: usize) -> Option<&T>;

    fn get_mut(&mut self, index: usize) -> Option<&mut T>;

    fn push(&mut self, item: T) -> Result<()>;

    fn pop(&mut self) -> Option<T>;

    fn insert(&mut self, index: usize, item: T) -> Result<()>;

    fn insert_many<I>(&mut self, index: usize, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        Self: Sized;

    fn remove(&mut self, index: usize) -> T;

    fn remove_range(&mut self, range: Range<usize>);

    fn truncate(&mut self, len: usize);

    fn swap(&mut self, a: usize, b: usize);

    /// Makes room for at least `capacity` elements in total.
    fn reserve(&mut self, capacity: usize) -> Result<()>;

    /// Releases memory, keeping room for at least `max(len, min_capacity)`.
    fn shrink_to(&mut self, min_capacity: usize);

    fn resize_default(&mut self, len: usize) -> Result<()>
    where
        T: Default;
}

/// Selects the array type a compact store keeps its nodes in.
pub trait ArrayKind {
    type Array<T>: GrowableArray<T>;
}

/// Nodes in a [`ReallocVec`]: contiguous, relocated on growth.
#[derive(Debug, Clone, Copy, Default)]
pub struct Realloc;

/// Nodes in a [`StackedVec`]: fixed blocks, never relocated once a block is full.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stacked;

impl ArrayKind for Realloc {
    type Array<T> = ReallocVec<T>;
}

impl ArrayKind for Stacked {
    type Array<T> = StackedVec<T>;
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn exercise<A: GrowableArray<u32>>(mut a: A) {
        for i in 0..100 {
            a.push(i).unwrap();
        }
        assert_eq!(100, a.len());
        assert_eq!(Some(&42), a.get(42));
        assert_eq!(None, a.get(100));

        a.insert(0, 1000).unwrap();
        a.insert(101, 1001).unwrap();
        assert_eq!(1000, a[0]);
        assert_eq!(0, a[1]);
        assert_eq!(1001, a[101]);

        assert_eq!(1000, a.remove(0));
        assert_eq!(Some(1001), a.pop());
        a.remove_range(10..90);
        let rest: Vec<u32> = (0..a.len()).map(|i| a[i]).collect();
        let expected: Vec<u32> = (0..10).chain(90..100).collect();
        assert_eq!(expected, rest);

        a.insert_many(5, [7, 7, 7]).unwrap();
        assert_eq!(23, a.len());
        assert_eq!([4, 7, 7, 7, 5], [a[4], a[5], a[6], a[7], a[8]]);

        a.swap(0, 22);
        assert_eq!(99, a[0]);
        assert_eq!(0, a[22]);

        a.resize_default(30).unwrap();
        assert_eq!(0, a[29]);
        a.truncate(3);
        assert_eq!(3, a.len());

        a.reserve(500).unwrap();
        assert_eq!(true, a.capacity() >= 500);
        a.shrink_to(0);
        assert_eq!(true, a.capacity() >= 3);
        assert_eq!([99, 1, 2], [a[0], a[1], a[2]]);
    }

    #[test]
    fn realloc_contract() {
        exercise(ReallocVec::<u32>::with_max_grow(8));
        exercise(ReallocVec::<u32>::new());
    }

    #[test]
    fn stacked_contract() {
        exercise(StackedVec::<u32>::with_block_len(8));
        exercise(StackedVec::<u32>::with_block_len(1));
        exercise(StackedVec::<u32>::new());
    }
}
