use std::fmt;

use compare::Compare;

use crate::{
    Error, Result,
    node::NodeStore,
    root::Root,
    weight::{Weight, WeightFn},
};

/// A read-only position in a tree: an element or the past-the-end slot.
///
/// Moving past the last element lands on the end; moving back from the end
/// lands on the last element. Besides ordered stepping, a cursor can walk the
/// tree's shape (`left`, `right`, `parent`) and read cached subtree sums,
/// which is enough to build custom searches over the weights.
pub struct Cursor<'a, K, V, F, S, C, const MULTI: bool>
where
    S: NodeStore<K, V>,
{
    pub(crate) root: &'a Root<K, V, F, S, C, MULTI>,
    pub(crate) node: S::Handle,
}

impl<K, V, F, S, C, const MULTI: bool> Clone for Cursor<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, F, S, C, const MULTI: bool> Copy for Cursor<'_, K, V, F, S, C, MULTI> where
    S: NodeStore<K, V>
{
}

impl<K, V, F, S, C, const MULTI: bool> PartialEq for Cursor<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
{
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.root, other.root) && self.node == other.node
    }
}

impl<K, V, F, S, C, const MULTI: bool> fmt::Debug for Cursor<'_, K, V, F, S, C, MULTI>
where
    K: fmt::Debug,
    V: fmt::Debug,
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.entry()).finish()
    }
}

impl<'a, K, V, F, S, C, const MULTI: bool> Cursor<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    pub(crate) fn new(root: &'a Root<K, V, F, S, C, MULTI>, node: S::Handle) -> Self {
        Cursor { root, node }
    }

    fn at(&self, node: S::Handle) -> Option<Self> {
        if node == self.root.nil() || node == self.root.store.root() {
            None
        } else {
            Some(Cursor::new(self.root, node))
        }
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        self.node == self.root.nil()
    }

    pub fn entry(&self) -> Option<(&'a K, &'a V)> {
        if self.is_end() {
            None
        } else {
            Some(self.root.store.entry(self.node))
        }
    }

    pub fn key(&self) -> Option<&'a K> {
        self.entry().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.entry().map(|(_, v)| v)
    }

    pub fn move_next(&mut self) {
        self.node = self.root.next(self.node);
    }

    pub fn move_prev(&mut self) {
        self.node = self.root.prev(self.node);
    }

    /// Total weight of the elements before this position; the whole tree's
    /// weight at the end.
    pub fn sum_before(&self) -> Result<Vec<S::Weight>> {
        let mut out = vec![S::Weight::zero(); self.root.store.components()];
        self.sum_before_into(&mut out)?;
        Ok(out)
    }

    pub fn sum_before_into(&self, out: &mut [S::Weight]) -> Result<()> {
        self.root.sum_before_node(self.node, out)
    }

    /// First component of [`Cursor::sum_before`]; the position on a counting
    /// tree.
    pub fn rank(&self) -> Result<S::Weight> {
        let mut out = self.root.weight_buf();
        self.sum_before_into(&mut out)?;
        Ok(out[0])
    }

    /// Weight of the element under the cursor.
    pub fn weight(&self) -> Option<Vec<S::Weight>> {
        if self.is_end() {
            None
        } else {
            Some(self.root.weight_of(self.node).to_vec())
        }
    }

    /// Cached total weight of the subtree rooted here.
    pub fn subtree_sum(&self) -> Option<&'a [S::Weight]> {
        if self.is_end() {
            None
        } else {
            Some(self.root.store.sum(self.node))
        }
    }

    /// The real root of the tree, for top-down searches.
    pub fn tree_root(&self) -> Option<Self> {
        self.at(self.root.top())
    }

    pub fn left(&self) -> Option<Self> {
        if self.is_end() {
            return None;
        }
        self.at(self.root.store.left(self.node))
    }

    pub fn right(&self) -> Option<Self> {
        if self.is_end() {
            return None;
        }
        self.at(self.root.store.right(self.node))
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_end() {
            return None;
        }
        self.at(self.root.store.parent(self.node))
    }
}

/// A position that can change the tree around it.
///
/// Values can only be replaced through [`CursorMut::set_value`], which keeps
/// the cached sums in step.
pub struct CursorMut<'a, K, V, F, S, C, const MULTI: bool>
where
    S: NodeStore<K, V>,
{
    pub(crate) root: &'a mut Root<K, V, F, S, C, MULTI>,
    pub(crate) node: S::Handle,
}

impl<'a, K, V, F, S, C, const MULTI: bool> CursorMut<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    pub(crate) fn new(root: &'a mut Root<K, V, F, S, C, MULTI>, node: S::Handle) -> Self {
        CursorMut { root, node }
    }

    pub fn as_cursor(&self) -> Cursor<'_, K, V, F, S, C, MULTI> {
        Cursor::new(self.root, self.node)
    }

    pub fn is_end(&self) -> bool {
        self.node == self.root.nil()
    }

    pub fn entry(&self) -> Option<(&K, &V)> {
        if self.is_end() {
            None
        } else {
            Some(self.root.store.entry(self.node))
        }
    }

    pub fn key(&self) -> Option<&K> {
        self.entry().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&V> {
        self.entry().map(|(_, v)| v)
    }

    pub fn move_next(&mut self) {
        self.node = self.root.next(self.node);
    }

    pub fn move_prev(&mut self) {
        self.node = self.root.prev(self.node);
    }

    /// Removes the element under the cursor and moves to its successor.
    /// Returns `None` at the end.
    pub fn remove_current(&mut self) -> Result<Option<(K, V)>> {
        if self.is_end() {
            return Ok(None);
        }
        let (next, entry) = self.root.erase(self.node)?;
        self.node = next;
        Ok(Some(entry))
    }

    /// Replaces the value under the cursor, returning the old one.
    pub fn set_value(&mut self, value: V) -> Result<V> {
        if self.is_end() {
            return Err(Error::KeyNotFound);
        }
        self.root.update_value(self.node, value)
    }
}

impl<K, V, F, S, C, const MULTI: bool> CursorMut<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
    C: Compare<K>,
{
    /// Inserts using the cursor as a hint: the new element goes right
    /// before it when the order allows, otherwise wherever it belongs. The
    /// cursor does not move. Returns whether the key was new.
    pub fn insert_before(&mut self, key: K, value: V) -> Result<bool> {
        let (_, fresh) = self.root.insert_hint(self.node, key, value)?;
        Ok(fresh)
    }
}

#[cfg(test)]
mod test {
    use crate::{RankMap, RankSet};
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_walks_both_ways() {
        let set: RankSet<u32> = [3, 1, 2].into_iter().collect();
        let mut cursor = set.cursor_end();
        assert_eq!(true, cursor.is_end());
        assert_eq!(None, cursor.key());
        cursor.move_next();
        assert_eq!(true, cursor.is_end());
        cursor.move_prev();
        assert_eq!(Some(&3), cursor.key());
        cursor.move_prev();
        cursor.move_prev();
        assert_eq!(Some(&1), cursor.key());
        cursor.move_prev();
        assert_eq!(true, cursor.is_end());
    }

    #[test]
    fn structure_accessors() {
        let set: RankSet<u32> = (0..31).collect();
        let top = set.cursor_end().tree_root().unwrap();
        assert_eq!(None, top.parent());
        assert_eq!(Some(&[31usize][..]), top.subtree_sum());
        let left = top.left().unwrap();
        assert_eq!(top, left.parent().unwrap());
        let (l, r) = (
            left.subtree_sum().unwrap()[0],
            top.right().unwrap().subtree_sum().unwrap()[0],
        );
        assert_eq!(30, l + r);
        assert_eq!(Some(vec![1]), top.weight());
        assert_eq!(Ok(l), top.rank());
    }

    #[test]
    fn remove_and_insert_through_cursor() {
        let mut map: RankMap<u32, &str> = RankMap::default();
        for (k, v) in [(1, "a"), (2, "b"), (3, "c"), (5, "e")] {
            map.insert(k, v).unwrap();
        }
        let mut cursor = map.find_mut(&2);
        assert_eq!(Some((2, "b")), cursor.remove_current().unwrap());
        assert_eq!(Some(&3), cursor.key());
        assert_eq!(Ok("c"), cursor.set_value("C"));
        cursor.move_next();
        assert_eq!(true, cursor.insert_before(4, "d").unwrap());
        assert_eq!(false, cursor.insert_before(3, "x").unwrap());
        assert_eq!(Some(&5), cursor.key());
        assert_eq!(Ok(3), cursor.as_cursor().rank());
        cursor.move_next();
        assert_eq!(Ok(None), cursor.remove_current());
        assert_eq!(Err(crate::Error::KeyNotFound), cursor.set_value("z"));

        let all: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(vec![(1, "a"), (3, "C"), (4, "d"), (5, "e")], all);
        map.check_tree(0.0).unwrap();
    }
}
