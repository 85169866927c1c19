use std::ops::{Index, IndexMut, Range};

use super::{DEFAULT_MAX_GROW, GrowableArray};
use crate::{Error, Result};

/// A segmented array: a stack of blocks of `block_len` elements.
///
/// Only the first block grows by reallocation (doubling up to `block_len`);
/// every later block is allocated at full size, so elements past the first
/// block never move when the array grows. Element `i` lives at
/// `blocks[i / block_len][i % block_len]`.
#[derive(Debug, Clone)]
pub struct StackedVec<T> {
    blocks: Vec<Vec<T>>,
    len: usize,
    block_len: usize,
}

impl<T> Default for StackedVec<T> {
    fn default() -> Self {
        StackedVec::new()
    }
}

impl<T> StackedVec<T> {
    pub fn new() -> Self {
        Self::with_block_len(DEFAULT_MAX_GROW)
    }

    /// A `block_len` of zero selects the default.
    pub fn with_block_len(block_len: usize) -> Self {
        StackedVec {
            blocks: Vec::new(),
            len: 0,
            block_len: if block_len == 0 {
                DEFAULT_MAX_GROW
            } else {
                block_len
            },
        }
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    #[inline(always)]
    fn locate(&self, index: usize) -> (usize, usize) {
        (index / self.block_len, index % self.block_len)
    }

    fn new_block(&mut self, capacity: usize) -> Result<()> {
        let mut block = Vec::new();
        block
            .try_reserve_exact(capacity)
            .map_err(|_| Error::OutOfMemory)?;
        self.blocks
            .try_reserve(1)
            .map_err(|_| Error::OutOfMemory)?;
        self.blocks.push(block);
        Ok(())
    }

    /// Makes sure slot `len` can be written without moving later blocks.
    fn ensure_slot(&mut self) -> Result<()> {
        let (block, _) = self.locate(self.len);
        if block == self.blocks.len() {
            let capacity = if block == 0 { 1 } else { self.block_len };
            return self.new_block(capacity);
        }
        if block == 0 {
            let first = &mut self.blocks[0];
            if first.len() == first.capacity() {
                let target = (first.capacity() * 2).clamp(1, self.block_len);
                let old = first.capacity();
                first
                    .try_reserve_exact(target - first.len())
                    .map_err(|_| Error::OutOfMemory)?;
                log::trace!("stacked array first block grew from {old} to {target} elements");
            }
        }
        Ok(())
    }

    fn reverse(&mut self, mut lo: usize, mut hi: usize) {
        while lo + 1 < hi {
            hi -= 1;
            self.swap(lo, hi);
            lo += 1;
        }
    }

    /// Moves `[start, mid)` behind `[mid, end)`.
    fn rotate(&mut self, start: usize, mid: usize, end: usize) {
        self.reverse(start, mid);
        self.reverse(mid, end);
        self.reverse(start, end);
    }
}

impl<T> Index<usize> for StackedVec<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, index: usize) -> &T {
        assert!(index < self.len, "index out of bounds");
        let (block, offset) = self.locate(index);
        &self.blocks[block][offset]
    }
}

impl<T> IndexMut<usize> for StackedVec<T> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut T {
        assert!(index < self.len, "index out of bounds");
        let (block, offset) = self.locate(index);
        &mut self.blocks[block][offset]
    }
}

impl<T> GrowableArray<T> for StackedVec<T> {
    fn new() -> Self {
        Self::with_block_len(DEFAULT_MAX_GROW)
    }

    fn from_vec(items: Vec<T>) -> Self {
        let mut stacked = Self::with_block_len(DEFAULT_MAX_GROW);
        let len = items.len();
        let mut items = items.into_iter();
        while stacked.len < len {
            let capacity = if stacked.blocks.is_empty() {
                len.min(stacked.block_len)
            } else {
                stacked.block_len
            };
            let mut block = Vec::with_capacity(capacity);
            block.extend(items.by_ref().take(stacked.block_len));
            stacked.len += block.len();
            stacked.blocks.push(block);
        }
        stacked
    }

    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }

    fn capacity(&self) -> usize {
        match self.blocks.first() {
            None => 0,
            Some(first) => {
                first.capacity().min(self.block_len) + (self.blocks.len() - 1) * self.block_len
            }
        }
    }

    fn get(&self, index: usize) -> Option<&T> {
        if index < self.len {
            Some(&self[index])
        } else {
            None
        }
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len {
            Some(&mut self[index])
        } else {
            None
        }
    }

    fn push(&mut self, item: T) -> Result<()> {
        self.ensure_slot()?;
        let (block, _) = self.locate(self.len);
        self.blocks[block].push(item);
        self.len += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        let (block, _) = self.locate(self.len);
        self.blocks[block].pop()
    }

    fn insert(&mut self, index: usize, item: T) -> Result<()> {
        assert!(index <= self.len, "insertion index out of bounds");
        self.push(item)?;
        let mut at = self.len - 1;
        while at > index {
            self.swap(at, at - 1);
            at -= 1;
        }
        Ok(())
    }

    fn insert_many<I>(&mut self, index: usize, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        assert!(index <= self.len, "insertion index out of bounds");
        let old_len = self.len;
        for item in items {
            if let Err(e) = self.push(item) {
                self.truncate(old_len);
                return Err(e);
            }
        }
        self.rotate(index, old_len, self.len);
        Ok(())
    }

    fn remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "removal index out of bounds");
        for at in index..self.len - 1 {
            self.swap(at, at + 1);
        }
        match self.pop() {
            Some(item) => item,
            None => unreachable!(),
        }
    }

    fn remove_range(&mut self, range: Range<usize>) {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "removal range out of bounds"
        );
        let count = range.end - range.start;
        self.rotate(range.start, range.end, self.len);
        self.truncate(self.len - count);
    }

    fn truncate(&mut self, len: usize) {
        while self.len > len {
            self.pop();
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        assert!(a < self.len && b < self.len, "index out of bounds");
        let (ba, oa) = self.locate(a);
        let (bb, ob) = self.locate(b);
        if ba == bb {
            self.blocks[ba].swap(oa, ob);
            return;
        }
        let (lo, lo_off, hi, hi_off) = if ba < bb {
            (ba, oa, bb, ob)
        } else {
            (bb, ob, ba, oa)
        };
        let (head, tail) = self.blocks.split_at_mut(hi);
        std::mem::swap(&mut head[lo][lo_off], &mut tail[0][hi_off]);
    }

    fn reserve(&mut self, capacity: usize) -> Result<()> {
        if capacity <= self.capacity() {
            return Ok(());
        }
        if self.blocks.is_empty() {
            self.new_block(capacity.min(self.block_len))?;
        }
        let want = capacity.min(self.block_len);
        let first = &mut self.blocks[0];
        if first.capacity() < want {
            first
                .try_reserve_exact(want - first.len())
                .map_err(|_| Error::OutOfMemory)?;
        }
        while self.capacity() < capacity {
            self.new_block(self.block_len)?;
        }
        Ok(())
    }

    fn shrink_to(&mut self, min_capacity: usize) {
        let keep = self.len.max(min_capacity);
        let blocks = keep.div_ceil(self.block_len);
        self.blocks.truncate(blocks);
        if blocks == 1 {
            self.blocks[0].shrink_to(keep);
        }
    }

    fn resize_default(&mut self, len: usize) -> Result<()>
    where
        T: Default,
    {
        if len > self.len {
            self.reserve(len)?;
            while self.len < len {
                self.push(T::default())?;
            }
        } else {
            self.truncate(len);
        }
        Ok(())
    }
}
