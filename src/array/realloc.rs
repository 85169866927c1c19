use std::ops::{Deref, DerefMut, Index, IndexMut, Range};

use super::{DEFAULT_MAX_GROW, GrowableArray};
use crate::{Error, Result};

/// A contiguous array whose growth steps are capped.
///
/// When full, capacity grows by `min(capacity, max_grow)`: doubling while the
/// array is small, then linear steps of `max_grow` elements so a large array
/// never needs twice its size during a reallocation.
#[derive(Debug, Clone)]
pub struct ReallocVec<T> {
    items: Vec<T>,
    max_grow: usize,
}

impl<T> Default for ReallocVec<T> {
    fn default() -> Self {
        ReallocVec::new()
    }
}

impl<T> ReallocVec<T> {
    pub fn new() -> Self {
        Self::with_max_grow(DEFAULT_MAX_GROW)
    }

    /// A `max_grow` of zero selects the default.
    pub fn with_max_grow(max_grow: usize) -> Self {
        ReallocVec {
            items: Vec::new(),
            max_grow: if max_grow == 0 {
                DEFAULT_MAX_GROW
            } else {
                max_grow
            },
        }
    }

    pub fn max_grow(&self) -> usize {
        self.max_grow
    }

    pub fn set_max_grow(&mut self, max_grow: usize) {
        self.max_grow = if max_grow == 0 {
            DEFAULT_MAX_GROW
        } else {
            max_grow
        };
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Makes room for `needed` elements, growing by at most one step beyond it.
    fn grow_for(&mut self, needed: usize) -> Result<()> {
        let capacity = self.items.capacity();
        if needed <= capacity {
            return Ok(());
        }
        let step = capacity.clamp(1, self.max_grow);
        let target = capacity.saturating_add(step).max(needed);
        self.items
            .try_reserve_exact(target - self.items.len())
            .map_err(|_| Error::OutOfMemory)?;
        log::trace!(
            "realloc array grew from {} to {} elements",
            capacity,
            self.items.capacity()
        );
        Ok(())
    }
}

impl<T> Deref for ReallocVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> DerefMut for ReallocVec<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T> Index<usize> for ReallocVec<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for ReallocVec<T> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<T> GrowableArray<T> for ReallocVec<T> {
    fn new() -> Self {
        Self::with_max_grow(DEFAULT_MAX_GROW)
    }

    fn from_vec(items: Vec<T>) -> Self {
        ReallocVec {
            items,
            max_grow: DEFAULT_MAX_GROW,
        }
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    fn capacity(&self) -> usize {
        self.items.capacity()
    }

    #[inline(always)]
    fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline(always)]
    fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    fn push(&mut self, item: T) -> Result<()> {
        self.grow_for(self.items.len() + 1)?;
        self.items.push(item);
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    fn insert(&mut self, index: usize, item: T) -> Result<()> {
        assert!(index <= self.items.len(), "insertion index out of bounds");
        self.grow_for(self.items.len() + 1)?;
        self.items.insert(index, item);
        Ok(())
    }

    fn insert_many<I>(&mut self, index: usize, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        assert!(index <= self.items.len(), "insertion index out of bounds");
        let mut incoming = Vec::new();
        for item in items {
            incoming.try_reserve(1).map_err(|_| Error::OutOfMemory)?;
            incoming.push(item);
        }
        self.grow_for(self.items.len() + incoming.len())?;
        self.items.splice(index..index, incoming);
        Ok(())
    }

    fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    fn remove_range(&mut self, range: Range<usize>) {
        self.items.drain(range);
    }

    fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.items.swap(a, b);
    }

    fn reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity > self.items.capacity() {
            self.items
                .try_reserve_exact(capacity - self.items.len())
                .map_err(|_| Error::OutOfMemory)?;
        }
        Ok(())
    }

    fn shrink_to(&mut self, min_capacity: usize) {
        self.items.shrink_to(min_capacity);
    }

    fn resize_default(&mut self, len: usize) -> Result<()>
    where
        T: Default,
    {
        if len > self.items.len() {
            self.grow_for(len)?;
            self.items.resize_with(len, T::default);
        } else {
            self.items.truncate(len);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn growth_is_capped() {
        let mut v = ReallocVec::with_max_grow(4);
        let mut capacities = Vec::new();
        for i in 0..20u8 {
            v.push(i).unwrap();
            if capacities.last() != Some(&v.capacity()) {
                capacities.push(v.capacity());
            }
        }
        // 1, 2, 4, 8 by doubling, then steps of four.
        assert_eq!(true, capacities.windows(2).all(|w| w[1] - w[0] <= 4));
        assert_eq!(true, v.capacity() >= 20);
        assert_eq!(20, v.len());
    }

    #[test]
    fn zero_selects_default() {
        let mut v = ReallocVec::<u8>::with_max_grow(0);
        assert_eq!(DEFAULT_MAX_GROW, v.max_grow());
        v.set_max_grow(16);
        assert_eq!(16, v.max_grow());
    }

    #[test]
    fn slices() {
        let mut v = ReallocVec::new();
        v.resize_default(4).unwrap();
        v.as_mut_slice()[2] = 7u64;
        assert_eq!(&[0, 0, 7, 0], v.as_slice());
        assert_eq!(7, v.iter().sum::<u64>());
    }
}
