use std::{
    cmp::Ordering,
    fmt,
    ops::{Bound, RangeBounds},
};

use compare::{Compare, Natural};

use crate::{
    Cursor, CursorMut, Error, Iter, Result,
    array::ArrayKind,
    node::{CompactStore, NodeIndex, NodeStore},
    root::Root,
    weight::{Weight, WeightFn},
};

/// An ordered map whose entries carry weights.
///
/// `F` weighs each entry, `S` stores the nodes, `C` orders the keys. With
/// `MULTI` set, equal keys are kept in insertion order instead of being
/// rejected. The type aliases at the crate root name the usual
/// configurations.
///
/// Values can be read freely but only replaced through
/// [`Tree::update_value`] or [`CursorMut::set_value`], so the cached sums
/// always match the entries.
pub struct Tree<K, V, F, S, C, const MULTI: bool> {
    pub(crate) root: Root<K, V, F, S, C, MULTI>,
}

impl<K, V, F, S, const MULTI: bool> Tree<K, V, F, S, Natural<K>, MULTI>
where
    K: Ord,
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    /// Creates an empty tree ordered by `K: Ord`.
    ///
    /// # Examples
    ///
    /// ```
    /// use weighted_rbtree::{FnWeight, WeightedMap};
    ///
    /// let mut stock: WeightedMap<&str, u32, _> = WeightedMap::new(FnWeight::new(|_: &&str, n: &u32| *n));
    /// stock.insert("apples", 3).unwrap();
    /// stock.insert("pears", 5).unwrap();
    /// assert_eq!(stock.total(), vec![8]);
    /// ```
    pub fn new(weigh: F) -> Self {
        Self::with_comparator(weigh, compare::natural())
    }
}

impl<K, V, F, S, const MULTI: bool> Default for Tree<K, V, F, S, Natural<K>, MULTI>
where
    K: Ord,
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight> + Default,
{
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<K, V, F, S, C, const MULTI: bool> Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    pub fn with_comparator(weigh: F, cmp: C) -> Self {
        Tree {
            root: Root::new(weigh, cmp),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.root.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most elements the node store can hold.
    pub fn max_len(&self) -> usize {
        self.root.store.max_len()
    }

    /// Weight components per entry.
    pub fn components(&self) -> usize {
        self.root.store.components()
    }

    pub fn weight_fn(&self) -> &F {
        &self.root.weigh
    }

    pub fn comparator(&self) -> &C {
        &self.root.cmp
    }

    pub fn clear(&mut self) {
        self.root.clear();
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        self.cursor_first().entry()
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        Cursor::new(&self.root, self.root.last()).entry()
    }

    pub fn pop_first(&mut self) -> Result<Option<(K, V)>> {
        self.cursor_first_mut().remove_current()
    }

    pub fn pop_last(&mut self) -> Result<Option<(K, V)>> {
        let last = self.root.last();
        CursorMut::new(&mut self.root, last).remove_current()
    }

    /// The first element, or the end when empty.
    pub fn cursor_first(&self) -> Cursor<'_, K, V, F, S, C, MULTI> {
        Cursor::new(&self.root, self.root.first())
    }

    /// The past-the-end position. Stepping back from it reaches the last
    /// element.
    pub fn cursor_end(&self) -> Cursor<'_, K, V, F, S, C, MULTI> {
        Cursor::new(&self.root, self.root.nil())
    }

    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, K, V, F, S, C, MULTI> {
        let first = self.root.first();
        CursorMut::new(&mut self.root, first)
    }

    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, K, V, F, S, C, MULTI> {
        let nil = self.root.nil();
        CursorMut::new(&mut self.root, nil)
    }

    pub fn iter(&self) -> Iter<'_, K, V, F, S, C, MULTI> {
        Iter::new(&self.root, self.root.first(), self.root.last(), self.len())
    }

    /// Removes every entry for which `f` returns `false`, in key order.
    ///
    /// # Examples
    ///
    /// ```
    /// use weighted_rbtree::RankMap;
    ///
    /// let mut map: RankMap<i32, i32> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0).unwrap();
    /// assert!(map.into_iter().eq(vec![(0, 0), (2, 20), (4, 40), (6, 60)]));
    /// ```
    pub fn retain<P>(&mut self, mut f: P) -> Result<()>
    where
        P: FnMut(&K, &V) -> bool,
    {
        let nil = self.root.nil();
        let mut node = self.root.first();
        while node != nil {
            let (key, value) = self.root.store.entry(node);
            if f(key, value) {
                node = self.root.next(node);
            } else {
                node = self.root.erase(node)?.0;
            }
        }
        Ok(())
    }

    /// Total weight of the whole tree.
    pub fn total(&self) -> Vec<S::Weight> {
        let mut out = vec![S::Weight::zero(); self.components()];
        self.root.total(&mut out);
        out
    }

    /// [`Tree::total`] into a caller buffer of `components()` values.
    pub fn total_into(&self, out: &mut [S::Weight]) {
        self.root.total(out);
    }

    /// The first element whose running total of `component`, itself
    /// included, exceeds `target`; the end when none does.
    ///
    /// Weights in `component` must not be negative.
    ///
    /// # Panics
    ///
    /// Panics if `component >= self.components()`.
    pub fn select(
        &self,
        component: usize,
        target: S::Weight,
    ) -> Result<Cursor<'_, K, V, F, S, C, MULTI>> {
        let node = self.root.select(component, target)?;
        Ok(Cursor::new(&self.root, node))
    }

    /// The element at position `index` by the first weight component; on a
    /// counting tree, the `index`-th element in order.
    pub fn nth(&self, index: S::Weight) -> Option<(&K, &V)> {
        self.select(0, index).ok()?.entry()
    }
}

impl<K, V, F, S, C, const MULTI: bool> Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
    C: Compare<K>,
{
    /// Inserts an entry, building the node in place. Returns `false` without
    /// touching the tree when a unique tree already holds the key.
    ///
    /// Fails when a weight sum would overflow or the store is full; the tree
    /// is unchanged then.
    pub fn insert(&mut self, key: K, value: V) -> Result<bool> {
        let (_, fresh) = self.root.insert(key, value)?;
        Ok(fresh)
    }

    /// Validates ordering, coloring and, for `epsilon >= 0`, every cached
    /// sum. Integral weights must match exactly, floating point weights
    /// within `epsilon`.
    pub fn check_tree(&self, epsilon: f64) -> Result<()> {
        self.root.check_tree(epsilon)
    }
}

impl<K, V, F, S, C, const MULTI: bool> Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    pub fn contains<Q: ?Sized>(&self, key: &Q) -> bool
    where
        C: Compare<Q, K>,
    {
        self.root.find(key) != self.root.nil()
    }

    /// Number of entries equal to `key`; at most one on a unique tree.
    pub fn count<Q: ?Sized>(&self, key: &Q) -> usize
    where
        C: Compare<Q, K>,
    {
        if !MULTI {
            return usize::from(self.contains(key));
        }
        self.equal_range(key).len()
    }

    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&V>
    where
        C: Compare<Q, K>,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value<Q: ?Sized>(&self, key: &Q) -> Option<(&K, &V)>
    where
        C: Compare<Q, K>,
    {
        self.find(key).entry()
    }

    /// Like [`Tree::get`], failing with [`Error::KeyNotFound`].
    pub fn at<Q: ?Sized>(&self, key: &Q) -> Result<&V>
    where
        C: Compare<Q, K>,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// The entry for `key`, the first of its equals on a multi tree, or the
    /// end.
    pub fn find<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, K, V, F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        Cursor::new(&self.root, self.root.find(key))
    }

    pub fn find_mut<Q: ?Sized>(&mut self, key: &Q) -> CursorMut<'_, K, V, F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        let node = self.root.find(key);
        CursorMut::new(&mut self.root, node)
    }

    /// The first entry not less than `key`.
    pub fn lower_bound<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, K, V, F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        Cursor::new(&self.root, self.root.lower_bound(key))
    }

    pub fn lower_bound_mut<Q: ?Sized>(&mut self, key: &Q) -> CursorMut<'_, K, V, F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        let node = self.root.lower_bound(key);
        CursorMut::new(&mut self.root, node)
    }

    /// The first entry greater than `key`.
    pub fn upper_bound<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, K, V, F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        Cursor::new(&self.root, self.root.upper_bound(key))
    }

    pub fn upper_bound_mut<Q: ?Sized>(&mut self, key: &Q) -> CursorMut<'_, K, V, F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        let node = self.root.upper_bound(key);
        CursorMut::new(&mut self.root, node)
    }

    /// Every entry equal to `key`, in insertion order.
    pub fn equal_range<Q: ?Sized>(&self, key: &Q) -> Iter<'_, K, V, F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        self.range((Bound::Included(key), Bound::Included(key)))
    }

    /// Entries within `range`, in order. A range whose start lies after its
    /// end is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use weighted_rbtree::RankMap;
    ///
    /// let map: RankMap<u32, char> = [(1, 'a'), (2, 'b'), (3, 'c'), (4, 'd')].into_iter().collect();
    /// let inner: Vec<_> = map.range(2..4).map(|(_, v)| *v).collect();
    /// assert_eq!(inner, ['b', 'c']);
    /// assert_eq!(map.range(3..=1).count(), 0);
    /// ```
    pub fn range<Q: ?Sized, R>(&self, range: R) -> Iter<'_, K, V, F, S, C, MULTI>
    where
        C: Compare<Q, K>,
        R: RangeBounds<Q>,
    {
        let (front, end, len) = self.span(&range);
        let back = if len == 0 {
            self.root.nil()
        } else {
            self.root.prev(end)
        };
        Iter::new(&self.root, front, back, len)
    }

    /// First node of `range`, the node right after it and the number of
    /// nodes in between.
    fn span<Q: ?Sized, R>(&self, range: &R) -> (S::Handle, S::Handle, usize)
    where
        C: Compare<Q, K>,
        R: RangeBounds<Q>,
    {
        let nil = self.root.nil();
        let front = match range.start_bound() {
            Bound::Included(key) => self.root.lower_bound(key),
            Bound::Excluded(key) => self.root.upper_bound(key),
            Bound::Unbounded => self.root.first(),
        };
        let end = match range.end_bound() {
            Bound::Included(key) => self.root.upper_bound(key),
            Bound::Excluded(key) => self.root.lower_bound(key),
            Bound::Unbounded => nil,
        };
        // Everything before `front` is below the start bound, so an end
        // there means the bounds are inverted.
        let inverted = end != nil
            && match range.start_bound() {
                Bound::Included(key) => {
                    self.root.cmp.compare(key, self.root.store.key(end)) == Ordering::Greater
                }
                Bound::Excluded(key) => {
                    self.root.cmp.compare(key, self.root.store.key(end)) != Ordering::Less
                }
                Bound::Unbounded => false,
            };
        if inverted {
            return (nil, nil, 0);
        }
        let mut len = 0;
        let mut node = front;
        while node != end && node != nil {
            len += 1;
            node = self.root.next(node);
        }
        (front, end, len)
    }

    /// Removes every entry equal to `key` and returns how many there were.
    pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> Result<usize>
    where
        C: Compare<Q, K>,
    {
        self.remove_range((Bound::Included(key), Bound::Included(key)))
    }

    /// Removes the entry for `key`, the first of its equals on a multi tree.
    pub fn remove_entry<Q: ?Sized>(&mut self, key: &Q) -> Result<Option<(K, V)>>
    where
        C: Compare<Q, K>,
    {
        self.find_mut(key).remove_current()
    }

    /// Removes the entries within `range` and returns how many there were.
    pub fn remove_range<Q: ?Sized, R>(&mut self, range: R) -> Result<usize>
    where
        C: Compare<Q, K>,
        R: RangeBounds<Q>,
    {
        let (mut node, end, len) = self.span(&range);
        for _ in 0..len {
            node = self.root.erase(node)?.0;
        }
        debug_assert!(node == end);
        Ok(len)
    }

    /// Replaces the value of `key`, the first of its equals on a multi
    /// tree, and returns the old one. Sums are recomputed from that entry
    /// up; when they do not fit the old value stays.
    pub fn update_value<Q: ?Sized>(&mut self, key: &Q, value: V) -> Result<V>
    where
        C: Compare<Q, K>,
    {
        self.find_mut(key).set_value(value)
    }

    /// Total weight of the entries ordered strictly before `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use weighted_rbtree::{Powers, WeightedSet};
    ///
    /// let mut squares: WeightedSet<u32, Powers> = WeightedSet::new(Powers::new([1.0, 2.0]));
    /// for k in 1..=4 {
    ///     squares.insert(k).unwrap();
    /// }
    /// assert_eq!(squares.sum_before(&4).unwrap(), vec![6.0, 14.0]);
    /// ```
    pub fn sum_before<Q: ?Sized>(&self, key: &Q) -> Result<Vec<S::Weight>>
    where
        C: Compare<Q, K>,
    {
        let mut out = vec![S::Weight::zero(); self.components()];
        self.root.sum_before(key, &mut out)?;
        Ok(out)
    }

    /// [`Tree::sum_before`] into a caller buffer of `components()` values.
    pub fn sum_before_into<Q: ?Sized>(&self, key: &Q, out: &mut [S::Weight]) -> Result<()>
    where
        C: Compare<Q, K>,
    {
        self.root.sum_before(key, out)
    }

    /// First component of [`Tree::sum_before`]; the rank of `key` on a
    /// counting tree.
    pub fn rank<Q: ?Sized>(&self, key: &Q) -> Result<S::Weight>
    where
        C: Compare<Q, K>,
    {
        let mut out = self.root.weight_buf();
        self.root.sum_before(key, &mut out)?;
        Ok(out[0])
    }
}

impl<K, V, F, W, I, A, C, const MULTI: bool> Tree<K, V, F, CompactStore<K, V, W, I, A>, C, MULTI>
where
    W: Weight,
    I: NodeIndex,
    A: ArrayKind,
    F: WeightFn<K, V, Output = W>,
{
    /// Moves live nodes into the slots of erased ones and releases the
    /// spare memory.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        self.root.store.shrink_to_fit()
    }

    /// Erased slots waiting for reuse or [`Tree::shrink_to_fit`].
    pub fn deleted_nodes(&self) -> usize {
        self.root.store.deleted_nodes()
    }

    pub fn capacity(&self) -> usize {
        self.root.store.capacity()
    }

    /// Makes room for `len` elements in total.
    pub fn reserve(&mut self, len: usize) -> Result<()> {
        self.root.store.reserve(len)
    }
}

impl<K, V, F, S, C, const MULTI: bool> fmt::Debug for Tree<K, V, F, S, C, MULTI>
where
    K: fmt::Debug,
    V: fmt::Debug,
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        CompactMap, CompactRankMultiSet, CompactRankSet, Error, FnWeight, RankMap, RankMultiMap,
        RankMultiSet, RankSet, WeightedMap,
    };

    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;
    use std::ops::Bound;
    use rand::{SeedableRng, seq::SliceRandom};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn tree_ctor_works() {
        let tree = RankMap::<usize, String>::default();
        assert_eq!(None, tree.first());
        assert_eq!(false, tree.contains(&42));
        assert_eq!(vec![0], tree.total());
        tree.check_tree(0.0).unwrap();
    }

    #[test]
    fn first_and_last() {
        let mut tree = RankMap::<usize, String>::default();
        assert_eq!(None, tree.first());
        assert_eq!(None, tree.last());

        let forty_two = "forty two".to_string();
        tree.insert(42, forty_two.clone()).unwrap();
        assert_eq!(Some((&42, &forty_two)), tree.first());
        assert_eq!(Some((&42, &forty_two)), tree.last());

        let zero = "zero".to_string();
        let hundo = "hundo".to_string();
        tree.insert(0, zero.clone()).unwrap();
        tree.insert(100, hundo.clone()).unwrap();
        assert_eq!(Some((&0, &zero)), tree.first());
        assert_eq!(Some((&100, &hundo)), tree.last());
    }

    #[test]
    fn insert_same_key_keeps_the_first() {
        let mut tree = RankMap::<usize, &str>::default();
        assert_eq!(Ok(true), tree.insert(42, "forty two"));
        assert_eq!(Ok(false), tree.insert(42, "42"));
        assert_eq!(1, tree.len());
        assert_eq!(Some(&"forty two"), tree.get(&42));
    }

    #[test]
    fn at_and_update_value() {
        let weigh = FnWeight::new(|_: &u32, v: &u64| *v);
        let mut tree: WeightedMap<u32, u64, _> = WeightedMap::new(weigh);
        for k in 0..10 {
            tree.insert(k, u64::from(k)).unwrap();
        }
        assert_eq!(Ok(&3), tree.at(&3));
        assert_eq!(Err(Error::KeyNotFound), tree.at(&30));
        assert_eq!(vec![45], tree.total());

        assert_eq!(Ok(3), tree.update_value(&3, 103));
        assert_eq!(vec![145], tree.total());
        assert_eq!(Ok(vec![110]), tree.sum_before(&5));
        assert_eq!(Err(Error::KeyNotFound), tree.update_value(&30, 1));
        tree.check_tree(0.0).unwrap();
    }

    #[test]
    fn pop_both_ends() {
        let mut tree: RankMap<u32, u32> = (0..5).map(|k| (k, k * k)).collect();
        assert_eq!(Ok(Some((0, 0))), tree.pop_first());
        assert_eq!(Ok(Some((4, 16))), tree.pop_last());
        assert_eq!(3, tree.len());
        tree.check_tree(0.0).unwrap();
        tree.clear();
        assert_eq!(Ok(None), tree.pop_first());
        assert_eq!(Ok(None), tree.pop_last());
    }

    fn keys<'a>(it: impl Iterator<Item = (&'a u32, &'a ())>) -> Vec<u32> {
        it.map(|(k, _)| *k).collect()
    }

    #[test]
    fn ranges() {
        let mut tree: RankMap<u32, ()> = (0..20).map(|k| (k * 5, ())).collect();
        assert_eq!(vec![10, 15], keys(tree.range(10..20)));
        assert_eq!(vec![10, 15, 20], keys(tree.range(10..=20)));
        assert_eq!(vec![15, 20], keys(tree.range(11..21)));
        assert_eq!(vec![0, 5], keys(tree.range(..10)));
        assert_eq!(vec![90, 95], keys(tree.range(88..)));
        assert_eq!(Vec::<u32>::new(), keys(tree.range(40..20)));
        assert_eq!(Vec::<u32>::new(), keys(tree.range(41..44)));
        assert_eq!(vec![20, 15, 10], keys(tree.range(10..=20).rev()));
        assert_eq!(3, tree.range(10..=20).len());

        assert_eq!(Ok(0), tree.remove_range(40..20));
        assert_eq!(20, tree.len());
        assert_eq!(Ok(4), tree.remove_range(10..30));
        assert_eq!(vec![0, 5, 30], keys(tree.range(..31)));
        tree.check_tree(0.0).unwrap();
        assert_eq!(Ok(16), tree.remove_range::<u32, _>(..));
        assert_eq!(true, tree.is_empty());
    }

    #[test]
    fn retain_keeps_sums() {
        let mut tree: RankMap<u32, u32> = (0..100).map(|k| (k, k)).collect();
        tree.retain(|k, _| k % 3 == 0).unwrap();
        assert_eq!(34, tree.len());
        assert_eq!(vec![34], tree.total());
        assert_eq!(Ok(11), tree.rank(&33));
        tree.check_tree(0.0).unwrap();
    }

    #[test]
    fn select_and_nth() {
        let tree: RankSet<u32> = (0..50).map(|k| k * 2).collect();
        for i in 0..50 {
            assert_eq!(Some(&(i as u32 * 2)), tree.nth(i));
        }
        assert_eq!(None, tree.nth(50));
        assert_eq!(true, tree.select(0, 50).unwrap().is_end());
    }

    // Scenario: every insert keeps the tree valid and ranks exact.
    #[test]
    fn ranks_after_each_insert() {
        let mut tree = RankSet::<u32>::default();
        let mut inserted = Vec::new();
        for k in [5, 3, 8, 1, 4, 7, 9, 2, 6, 0] {
            tree.insert(k).unwrap();
            inserted.push(k);
            tree.check_tree(0.0).unwrap();
            for x in 0..=10 {
                let smaller = inserted.iter().filter(|&&i| i < x).count();
                assert_eq!(Ok(smaller), tree.rank(&x));
            }
        }
    }

    // Scenario: duplicates count and keep their order.
    #[test]
    fn duplicates_in_a_multi_tree() {
        let mut tree = RankMultiMap::<u32, char>::default();
        for (k, v) in [(7, 'a'), (1, 'x'), (7, 'b'), (9, 'y'), (7, 'c')] {
            tree.insert(k, v).unwrap();
        }
        assert_eq!(3, tree.count(&7));
        assert_eq!(Ok(Some((7, 'a'))), tree.remove_entry(&7));
        assert_eq!(2, tree.count(&7));
        assert_eq!(4, tree.len());
        let sevens: Vec<_> = tree.equal_range(&7).map(|(_, v)| *v).collect();
        assert_eq!(vec!['b', 'c'], sevens);
        tree.check_tree(0.0).unwrap();

        let mut set = RankMultiSet::<u32>::default();
        for k in [7, 7, 7] {
            set.insert(k).unwrap();
        }
        assert_eq!(Ok(3), set.remove(&7));
        assert_eq!(0, set.len());
    }

    // Scenario: random build and teardown.
    #[test]
    fn random_insert_then_erase_all() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        let mut keys: Vec<u32> = (0..10_000).map(|k| k * 7).collect();
        keys.shuffle(&mut rng);

        let mut tree = RankSet::<u32>::default();
        for &k in &keys {
            assert_eq!(Ok(true), tree.insert(k));
        }
        assert_eq!(10_000, tree.len());
        tree.check_tree(0.0).unwrap();

        keys.shuffle(&mut rng);
        for k in &keys {
            assert_eq!(Ok(1), tree.remove(k));
            tree.check_tree(0.0).unwrap();
        }
        assert_eq!(0, tree.len());
        tree.check_tree(0.0).unwrap();
    }

    #[test]
    fn random_churn_checks_every_step() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut keys: Vec<u32> = (0..600).collect();
        keys.shuffle(&mut rng);
        let mut tree = CompactRankSet::<u32>::default();
        for &k in &keys {
            tree.insert(k).unwrap();
            tree.check_tree(0.0).unwrap();
        }
        keys.shuffle(&mut rng);
        for k in &keys {
            assert_eq!(Ok(1), tree.remove(k));
            tree.check_tree(0.0).unwrap();
        }
        assert_eq!(true, tree.is_empty());
    }

    // Scenario: erasing an absent key.
    #[test]
    fn erase_missing_key() {
        let mut tree: RankSet<u32> = [1, 2, 3].into_iter().collect();
        tree.insert(10).unwrap();
        assert_eq!(Ok(1), tree.remove(&10));
        assert_eq!(Ok(0), tree.remove(&10));
        assert_eq!(vec![1, 2, 3], tree.iter().copied().collect::<Vec<_>>());
        assert_eq!(vec![3], tree.total());
        tree.check_tree(0.0).unwrap();
    }

    #[test]
    fn removing_the_last_element() {
        let mut tree: RankSet<u32> = [7].into_iter().collect();
        assert_eq!(Ok(1), tree.remove(&7));
        assert_eq!(true, tree.is_empty());
        assert_eq!(vec![0], tree.total());
        tree.check_tree(0.0).unwrap();
        assert_eq!(Ok(true), tree.insert(8));
        assert_eq!(Ok(Some(8)), tree.pop_last());
        tree.check_tree(0.0).unwrap();

        let mut compact: CompactRankSet<u32> = [7, 3].into_iter().collect();
        assert_eq!(Ok(Some(3)), compact.pop_first());
        assert_eq!(Ok(Some(7)), compact.pop_first());
        assert_eq!(0, compact.len());
        assert_eq!(Ok(None), compact.pop_first());
        compact.check_tree(0.0).unwrap();
        assert_eq!(Ok(true), compact.insert(1));
        assert_eq!(Ok(1), compact.remove_range::<u32, _>(..));
        compact.check_tree(0.0).unwrap();
    }

    #[test]
    fn inverted_ranges_are_empty() {
        let tree: RankMultiSet<u32> = [1, 2, 2, 3, 5, 8].into_iter().collect();
        assert_eq!(0, tree.range(5..2).count());
        assert_eq!(0, tree.range(3..=2).count());
        assert_eq!(0, tree.range((Bound::Excluded(2), Bound::Excluded(2))).count());
        assert_eq!(0, tree.range((Bound::Excluded(2), Bound::Included(2))).count());
        assert_eq!(vec![&2, &2], tree.range(2..=2).collect::<Vec<_>>());
        assert_eq!(vec![&3], tree.range((Bound::Excluded(2), Bound::Included(3))).collect::<Vec<_>>());
        assert_eq!(0, tree.range(9..).count());
        assert_eq!(0, tree.range(..0).count());
    }

    // Scenario: an 8-bit weight saturates at 255 elements.
    #[test]
    fn weight_overflow_is_an_error() {
        let mut tree = RankSet::<u32, u8>::default();
        for k in 0..255 {
            tree.insert(k).unwrap();
        }
        assert_eq!(vec![255u8], tree.total());
        assert_eq!(Err(Error::Overflow), tree.insert(255));
        assert_eq!(255, tree.len());
        assert_eq!(false, tree.contains(&255));
        tree.check_tree(0.0).unwrap();

        // Erasing makes room again.
        assert_eq!(Ok(1), tree.remove(&0));
        assert_eq!(Ok(true), tree.insert(255));
        tree.check_tree(0.0).unwrap();
    }

    #[test]
    fn compact_maintenance() {
        let mut tree = CompactMap::<u32, u32, crate::Count>::default();
        tree.reserve(64).unwrap();
        assert_eq!(true, tree.capacity() >= 64);
        for k in 0..64 {
            tree.insert(k, k).unwrap();
        }
        assert_eq!(Ok(32), tree.remove_range(16..48));
        assert_eq!(32, tree.deleted_nodes());
        tree.shrink_to_fit().unwrap();
        assert_eq!(0, tree.deleted_nodes());
        assert_eq!(32, tree.len());
        assert_eq!(Ok(16), tree.rank(&48));
        tree.check_tree(0.0).unwrap();
    }

    // Scenario: a 16-bit index runs out at 2^15 - 3 elements.
    #[test]
    fn compact_capacity_is_an_error() {
        let mut tree = CompactRankMultiSet::<u8, u32, u16>::default();
        let max = tree.max_len();
        assert_eq!((1 << 15) - 3, max);
        for i in 0..max {
            tree.insert((i % 256) as u8).unwrap();
        }
        assert_eq!(Err(Error::CapacityExceeded { max }), tree.insert(0));
        assert_eq!(max, tree.len());
        tree.check_tree(0.0).unwrap();

        tree.pop_first().unwrap();
        assert_eq!(Ok(true), tree.insert(0));
    }

    #[quickcheck]
    fn behaves_like_a_sorted_vec(ops: Vec<(bool, u8)>) -> bool {
        let mut tree = RankMultiSet::<u8>::default();
        let mut model: Vec<u8> = Vec::new();
        for (insert, k) in ops {
            if insert {
                tree.insert(k).unwrap();
                let at = model.partition_point(|&m| m <= k);
                model.insert(at, k);
            } else {
                let removed = tree.remove(&k).unwrap();
                let before = model.len();
                model.retain(|&m| m != k);
                if removed != before - model.len() {
                    return false;
                }
            }
        }
        let ranks_ok = (0..=255u8).all(|k| tree.rank(&k) == Ok(model.partition_point(|&m| m < k)));
        tree.check_tree(0.0).is_ok()
            && ranks_ok
            && tree.iter().copied().eq(model.iter().copied())
    }
}
