use std::{fmt::Debug, hash::Hash};

use super::NodeStore;
use crate::{
    Color, Error, Result,
    array::{ArrayKind, GrowableArray, Realloc, ReallocVec},
    weight::Weight,
};

/// An unsigned integer naming a slot in a [`CompactStore`].
///
/// The top bit of a stored parent index is the node's color, so a store can
/// address at most `INVALID` slots, two of which are the sentinels.
pub trait NodeIndex: Copy + Eq + Ord + Hash + Debug {
    const RED_BIT: Self;
    /// The largest index below the color bit; also the slot count limit.
    const INVALID: Self;
    /// Stored as the parent of a deleted slot.
    const DELETED: Self;
    const ROOT: Self;
    const NIL: Self;

    fn from_usize(index: usize) -> Self;

    fn to_usize(self) -> usize;

    fn is_red_flagged(self) -> bool;

    fn with_red_flag(self, red: bool) -> Self;

    fn unflagged(self) -> Self;
}

macro_rules! node_index {
    ($($t:ty),*) => {$(
        impl NodeIndex for $t {
            const RED_BIT: Self = 1 << (<$t>::BITS - 1);
            const INVALID: Self = Self::RED_BIT - 1;
            const DELETED: Self = <$t>::MAX;
            const ROOT: Self = 0;
            const NIL: Self = 1;

            #[inline(always)]
            fn from_usize(index: usize) -> Self {
                debug_assert!(index <= Self::INVALID as usize);
                index as $t
            }

            #[inline(always)]
            fn to_usize(self) -> usize {
                self as usize
            }

            #[inline(always)]
            fn is_red_flagged(self) -> bool {
                (self & Self::RED_BIT) != 0
            }

            #[inline(always)]
            fn with_red_flag(self, red: bool) -> Self {
                if red {
                    self | Self::RED_BIT
                } else {
                    self & !Self::RED_BIT
                }
            }

            #[inline(always)]
            fn unflagged(self) -> Self {
                self & !Self::RED_BIT
            }
        }
    )*};
}

node_index!(u16, u32, u64, usize);

/// A node slot. Deleted slots keep `parent == DELETED` and thread the free
/// list through `left` (older) and `right` (newer).
#[derive(Debug, Clone)]
pub struct CompactNode<K, V, I> {
    parent: I,
    left: I,
    right: I,
    entry: Option<(K, V)>,
}

impl<K, V, I: NodeIndex> CompactNode<K, V, I> {
    fn sentinel() -> Self {
        CompactNode {
            parent: I::NIL,
            left: I::NIL,
            right: I::NIL,
            entry: None,
        }
    }

    #[inline(always)]
    fn is_deleted(&self) -> bool {
        self.parent == I::DELETED
    }
}

/// Nodes in one growable array, linked by integer index.
///
/// Erased nodes become tombstones on a free list and are reused last-in
/// first-out; [`CompactStore::shrink_to_fit`] moves live nodes into the holes
/// and gives the memory back. Sums live in a parallel array, `components`
/// values per slot.
pub struct CompactStore<K, V, W, I = u32, A: ArrayKind = Realloc> {
    nodes: A::Array<CompactNode<K, V, I>>,
    sums: ReallocVec<W>,
    components: usize,
    free_head: I,
    deleted: usize,
}

impl<K, V, W, I, A> CompactStore<K, V, W, I, A>
where
    W: Weight,
    I: NodeIndex,
    A: ArrayKind,
{
    #[inline(always)]
    fn slot(&self, node: I) -> &CompactNode<K, V, I> {
        &self.nodes[node.to_usize()]
    }

    #[inline(always)]
    fn slot_mut(&mut self, node: I) -> &mut CompactNode<K, V, I> {
        &mut self.nodes[node.to_usize()]
    }

    fn reset_sentinels(&mut self) {
        *self.slot_mut(I::ROOT) = CompactNode::sentinel();
        *self.slot_mut(I::NIL) = CompactNode::sentinel();
    }

    /// Tombstones waiting on the free list.
    pub fn deleted_nodes(&self) -> usize {
        self.deleted
    }

    /// Elements the node array can hold without growing.
    pub fn capacity(&self) -> usize {
        self.nodes.capacity().saturating_sub(2)
    }

    /// Makes room for `len` elements in total.
    pub fn reserve(&mut self, len: usize) -> Result<()> {
        let slots = len.min(self.max_len()) + 2;
        self.nodes.reserve(slots)?;
        self.sums.reserve(slots * self.components)
    }

    /// Moves live nodes into deleted slots until no tombstone is left, then
    /// releases the unused memory.
    ///
    /// Handles of moved nodes change, so nothing may hold one across this call.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        let reclaimed = self.deleted;
        if reclaimed > 0 {
            log::debug!("compacting {reclaimed} deleted nodes");
        }
        while self.free_head != I::INVALID {
            let last = self.nodes.len() - 1;
            if last < 2 {
                return Err(Error::Corrupted("free list outlives its nodes"));
            }
            let last = I::from_usize(last);
            if self.slot(last).is_deleted() {
                self.unlink_free(last);
            } else {
                let hole = self.free_head;
                if hole == last {
                    return Err(Error::Corrupted("free list head is a live node"));
                }
                self.unlink_free(hole);
                self.move_node(last, hole)?;
            }
            self.nodes.pop();
            self.sums.truncate(last.to_usize() * self.components);
            self.deleted = self
                .deleted
                .checked_sub(1)
                .ok_or(Error::Corrupted("deleted count out of sync"))?;
        }
        self.nodes.shrink_to(self.nodes.len());
        self.sums.shrink_to(self.sums.len());
        if reclaimed > 0 {
            log::debug!(
                "compaction done, {} slots in use",
                self.nodes.len()
            );
        }
        Ok(())
    }

    fn unlink_free(&mut self, node: I) {
        let (older, newer) = {
            let slot = self.slot(node);
            (slot.left, slot.right)
        };
        if older != I::INVALID {
            self.slot_mut(older).right = newer;
        }
        if newer != I::INVALID {
            self.slot_mut(newer).left = older;
        }
        if self.free_head == node {
            self.free_head = older;
        }
    }

    /// Moves the node in the last slot `from` into the vacant slot `to` and
    /// repoints its neighbours at the new index. `from` is left vacant.
    fn move_node(&mut self, from: I, to: I) -> Result<()> {
        let parent = self.slot(from).parent.unflagged();
        if parent == I::INVALID || parent == I::NIL || from == I::ROOT || from == I::NIL {
            return Err(Error::Corrupted("moved node has no parent"));
        }
        let node = std::mem::replace(self.slot_mut(from), CompactNode::sentinel());
        let (left, right) = (node.left, node.right);
        *self.slot_mut(to) = node;

        let c = self.components;
        let (src, dst) = (from.to_usize() * c, to.to_usize() * c);
        self.sums.as_mut_slice().copy_within(src..src + c, dst);

        if self.slot(parent).left == from {
            self.slot_mut(parent).left = to;
        } else if self.slot(parent).right == from {
            self.slot_mut(parent).right = to;
        } else {
            return Err(Error::Corrupted("parent does not link the moved node"));
        }
        for child in [left, right] {
            if child == I::NIL {
                continue;
            }
            if self.parent(child) != from {
                return Err(Error::Corrupted("child does not link back to the moved node"));
            }
            self.set_parent(child, to);
        }
        Ok(())
    }
}

impl<K, V, W, I, A> NodeStore<K, V> for CompactStore<K, V, W, I, A>
where
    W: Weight,
    I: NodeIndex,
    A: ArrayKind,
{
    type Handle = I;
    type Weight = W;

    fn with_components(components: usize) -> Self {
        CompactStore {
            nodes: GrowableArray::from_vec(vec![CompactNode::sentinel(), CompactNode::sentinel()]),
            sums: ReallocVec::from_vec(vec![W::zero(); 2 * components]),
            components,
            free_head: I::INVALID,
            deleted: 0,
        }
    }

    #[inline(always)]
    fn components(&self) -> usize {
        self.components
    }

    #[inline(always)]
    fn root(&self) -> I {
        I::ROOT
    }

    #[inline(always)]
    fn nil(&self) -> I {
        I::NIL
    }

    #[inline(always)]
    fn invalid(&self) -> I {
        I::INVALID
    }

    fn max_len(&self) -> usize {
        I::INVALID.to_usize() - 2
    }

    fn new_node(&mut self, key: K, value: V) -> Result<I> {
        let node = CompactNode {
            parent: I::NIL.with_red_flag(true),
            left: I::NIL,
            right: I::NIL,
            entry: Some((key, value)),
        };
        if self.free_head != I::INVALID {
            if self.deleted == 0 {
                return Err(Error::Corrupted("free list without deleted nodes"));
            }
            let reused = self.free_head;
            self.unlink_free(reused);
            self.deleted -= 1;
            *self.slot_mut(reused) = node;
            self.sum_mut(reused).fill(W::zero());
            return Ok(reused);
        }
        let index = self.nodes.len();
        if index >= I::INVALID.to_usize() {
            log::warn!("compact store is full at {} elements", self.max_len());
            return Err(Error::CapacityExceeded {
                max: self.max_len(),
            });
        }
        self.nodes.push(node)?;
        if let Err(e) = self.sums.resize_default((index + 1) * self.components) {
            self.nodes.pop();
            return Err(e);
        }
        Ok(I::from_usize(index))
    }

    fn free_node(&mut self, node: I) -> (K, V) {
        let head = self.free_head;
        let slot = self.slot_mut(node);
        let entry = slot.entry.take().expect("sentinels are never freed");
        slot.parent = I::DELETED;
        slot.left = head;
        slot.right = I::INVALID;
        if head != I::INVALID {
            self.slot_mut(head).right = node;
        }
        self.free_head = node;
        self.deleted += 1;
        entry
    }

    fn clear_tree(&mut self) {
        self.nodes.truncate(2);
        self.sums.truncate(2 * self.components);
        self.reset_sentinels();
        self.free_head = I::INVALID;
        self.deleted = 0;
        self.nodes.shrink_to(2);
        self.sums.shrink_to(2 * self.components);
        log::trace!("compact store cleared");
    }

    #[inline(always)]
    fn entry(&self, node: I) -> (&K, &V) {
        let (key, value) = self
            .slot(node)
            .entry
            .as_ref()
            .expect("sentinels carry no entry");
        (key, value)
    }

    #[inline(always)]
    fn key(&self, node: I) -> &K {
        self.entry(node).0
    }

    #[inline(always)]
    fn value(&self, node: I) -> &V {
        self.entry(node).1
    }

    fn replace_value(&mut self, node: I, value: V) -> V {
        let entry = self
            .slot_mut(node)
            .entry
            .as_mut()
            .expect("sentinels carry no entry");
        std::mem::replace(&mut entry.1, value)
    }

    #[inline(always)]
    fn parent(&self, node: I) -> I {
        self.slot(node).parent.unflagged()
    }

    #[inline(always)]
    fn left(&self, node: I) -> I {
        self.slot(node).left
    }

    #[inline(always)]
    fn right(&self, node: I) -> I {
        self.slot(node).right
    }

    #[inline(always)]
    fn set_parent(&mut self, node: I, parent: I) {
        debug_assert!(parent <= I::INVALID);
        let slot = self.slot_mut(node);
        slot.parent = parent.with_red_flag(slot.parent.is_red_flagged());
    }

    #[inline(always)]
    fn set_left(&mut self, node: I, left: I) {
        self.slot_mut(node).left = left;
    }

    #[inline(always)]
    fn set_right(&mut self, node: I, right: I) {
        self.slot_mut(node).right = right;
    }

    #[inline(always)]
    fn color(&self, node: I) -> Color {
        if self.slot(node).parent.is_red_flagged() {
            Color::Red
        } else {
            Color::Black
        }
    }

    #[inline(always)]
    fn set_color(&mut self, node: I, color: Color) {
        let slot = self.slot_mut(node);
        slot.parent = slot.parent.with_red_flag(color == Color::Red);
    }

    #[inline(always)]
    fn sum(&self, node: I) -> &[W] {
        let at = node.to_usize() * self.components;
        &self.sums.as_slice()[at..at + self.components]
    }

    #[inline(always)]
    fn sum_mut(&mut self, node: I) -> &mut [W] {
        let at = node.to_usize() * self.components;
        &mut self.sums.as_mut_slice()[at..at + self.components]
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::array::Stacked;
    use pretty_assertions::assert_eq;

    type Store = CompactStore<u32, (), u32, u16>;

    /// Chains keys as right children under the root, each summing itself.
    fn chain(store: &mut Store, keys: &[u32]) -> Vec<u16> {
        let nil = store.nil();
        let mut parent = store.root();
        let mut handles = Vec::new();
        for &k in keys {
            let n = store.new_node(k, ()).unwrap();
            store.set_left(n, nil);
            store.set_right(n, nil);
            store.set_parent(n, parent);
            store.set_right(parent, n);
            store.sum_mut(n)[0] = k;
            handles.push(n);
            parent = n;
        }
        handles
    }

    #[test]
    fn index_limits() {
        assert_eq!(0x8000, u16::RED_BIT);
        assert_eq!(0x7fff, u16::INVALID);
        assert_eq!(0xffff, u16::DELETED);
        assert_eq!(32765, Store::with_components(1).max_len());
        assert_eq!(true, 5u16.with_red_flag(true).is_red_flagged());
        assert_eq!(5, 5u16.with_red_flag(true).unflagged());
    }

    #[test]
    fn free_list_is_lifo() {
        let mut store = Store::with_components(1);
        let h = chain(&mut store, &[10, 20, 30, 40]);
        let nil = store.nil();
        store.set_right(h[2], nil);
        store.set_right(h[1], nil);
        store.free_node(h[3]);
        store.free_node(h[2]);
        assert_eq!(2, store.deleted_nodes());

        assert_eq!(h[2], store.new_node(50, ()).unwrap());
        assert_eq!(h[3], store.new_node(60, ()).unwrap());
        assert_eq!(0, store.deleted_nodes());
        assert_eq!(6, store.new_node(70, ()).unwrap());
        assert_eq!(&[0], store.sum(h[2]));
    }

    #[test]
    fn compaction_moves_tail_into_holes() {
        let mut store = Store::with_components(1);
        let h = chain(&mut store, &[1, 2, 3, 4, 5]);
        // Unlink 2 and 3 from the middle of the chain: 1 -> 4 -> 5.
        store.set_right(h[0], h[3]);
        store.set_parent(h[3], h[0]);
        store.free_node(h[1]);
        store.free_node(h[2]);

        store.shrink_to_fit().unwrap();
        assert_eq!(0, store.deleted_nodes());
        assert_eq!(5, store.nodes.len());

        let mut keys = Vec::new();
        let mut sums = Vec::new();
        let mut n = store.right(store.root());
        while n != store.nil() {
            assert_eq!(true, n.to_usize() < 5);
            keys.push(*store.key(n));
            sums.push(store.sum(n)[0]);
            let r = store.right(n);
            if r != store.nil() {
                assert_eq!(n, store.parent(r));
            }
            n = r;
        }
        assert_eq!(vec![1, 4, 5], keys);
        assert_eq!(vec![1, 4, 5], sums);
    }

    #[test]
    fn compaction_drops_trailing_tombstones() {
        let mut store = Store::with_components(1);
        let h = chain(&mut store, &[1, 2, 3]);
        store.set_right(h[0], store.nil());
        store.free_node(h[2]);
        store.free_node(h[1]);
        store.shrink_to_fit().unwrap();
        assert_eq!(3, store.nodes.len());
        assert_eq!(3, store.sums.len());
        assert_eq!(1, *store.key(store.right(store.root())));
    }

    #[test]
    fn capacity_exceeded() {
        let mut store = Store::with_components(1);
        for k in 0..store.max_len() as u32 {
            store.new_node(k, ()).unwrap();
        }
        assert_eq!(
            Err(Error::CapacityExceeded { max: 32765 }),
            store.new_node(0, ())
        );
    }

    #[test]
    fn stacked_backend() {
        let mut store = CompactStore::<String, (), u64, u32, Stacked>::with_components(2);
        let n = store.new_node("k".to_string(), ()).unwrap();
        store.sum_mut(n).copy_from_slice(&[3, 4]);
        assert_eq!(&[3, 4], store.sum(n));
        assert_eq!(2, n);
        store.reserve(1000).unwrap();
        assert_eq!(true, store.capacity() >= 1000);
    }
}
