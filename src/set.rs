use std::{fmt, ops::RangeBounds};

use compare::{Compare, Natural};

use crate::{
    Cursor, CursorMut, Keys, Result, Tree,
    array::ArrayKind,
    node::{CompactStore, NodeIndex, NodeStore},
    weight::{Weight, WeightFn},
};

/// An ordered set of weighted keys, a [`Tree`] without values.
pub struct Set<K, F, S, C, const MULTI: bool> {
    pub(crate) tree: Tree<K, (), F, S, C, MULTI>,
}

impl<K, F, S, const MULTI: bool> Set<K, F, S, Natural<K>, MULTI>
where
    K: Ord,
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight>,
{
    pub fn new(weigh: F) -> Self {
        Self { tree: Tree::new(weigh) }
    }
}

impl<K, F, S, const MULTI: bool> Default for Set<K, F, S, Natural<K>, MULTI>
where
    K: Ord,
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight> + Default,
{
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<K, F, S, C, const MULTI: bool> Set<K, F, S, C, MULTI>
where
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight>,
{
    pub fn with_comparator(weigh: F, cmp: C) -> Self {
        Self {
            tree: Tree::with_comparator(weigh, cmp),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.tree.max_len()
    }

    pub fn components(&self) -> usize {
        self.tree.components()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn first(&self) -> Option<&K> {
        self.tree.first().map(|(k, _)| k)
    }

    pub fn last(&self) -> Option<&K> {
        self.tree.last().map(|(k, _)| k)
    }

    pub fn pop_first(&mut self) -> Result<Option<K>> {
        Ok(self.tree.pop_first()?.map(|(k, _)| k))
    }

    pub fn pop_last(&mut self) -> Result<Option<K>> {
        Ok(self.tree.pop_last()?.map(|(k, _)| k))
    }

    pub fn cursor_first(&self) -> Cursor<'_, K, (), F, S, C, MULTI> {
        self.tree.cursor_first()
    }

    pub fn cursor_end(&self) -> Cursor<'_, K, (), F, S, C, MULTI> {
        self.tree.cursor_end()
    }

    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, K, (), F, S, C, MULTI> {
        self.tree.cursor_first_mut()
    }

    pub fn cursor_end_mut(&mut self) -> CursorMut<'_, K, (), F, S, C, MULTI> {
        self.tree.cursor_end_mut()
    }

    /// Gets an iterator over the keys, in sorted order.
    pub fn iter(&self) -> Keys<'_, K, (), F, S, C, MULTI> {
        self.tree.keys()
    }

    pub fn retain<P>(&mut self, mut f: P) -> Result<()>
    where
        P: FnMut(&K) -> bool,
    {
        self.tree.retain(|k, _| f(k))
    }

    pub fn total(&self) -> Vec<S::Weight> {
        self.tree.total()
    }

    pub fn total_into(&self, out: &mut [S::Weight]) {
        self.tree.total_into(out);
    }

    /// See [`Tree::select`].
    pub fn select(
        &self,
        component: usize,
        target: S::Weight,
    ) -> Result<Cursor<'_, K, (), F, S, C, MULTI>> {
        self.tree.select(component, target)
    }

    pub fn nth(&self, index: S::Weight) -> Option<&K> {
        self.tree.nth(index).map(|(k, _)| k)
    }
}

impl<K, F, S, C, const MULTI: bool> Set<K, F, S, C, MULTI>
where
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight>,
    C: Compare<K>,
{
    /// Returns whether the key was added; unique sets keep the key they
    /// already hold.
    pub fn insert(&mut self, key: K) -> Result<bool> {
        self.tree.insert(key, ())
    }

    /// Like [`Tree::try_extend`].
    pub fn try_extend<I: IntoIterator<Item = K>>(&mut self, iter: I) -> Result<()> {
        self.tree.try_extend(iter.into_iter().map(|k| (k, ())))
    }

    pub fn check_tree(&self, epsilon: f64) -> Result<()> {
        self.tree.check_tree(epsilon)
    }
}

impl<K, F, S, C, const MULTI: bool> Set<K, F, S, C, MULTI>
where
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight>,
{
    pub fn contains<Q: ?Sized>(&self, key: &Q) -> bool
    where
        C: Compare<Q, K>,
    {
        self.tree.contains(key)
    }

    pub fn count<Q: ?Sized>(&self, key: &Q) -> usize
    where
        C: Compare<Q, K>,
    {
        self.tree.count(key)
    }

    pub fn get<Q: ?Sized>(&self, key: &Q) -> Option<&K>
    where
        C: Compare<Q, K>,
    {
        self.tree.get_key_value(key).map(|(k, _)| k)
    }

    pub fn find<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, K, (), F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        self.tree.find(key)
    }

    pub fn find_mut<Q: ?Sized>(&mut self, key: &Q) -> CursorMut<'_, K, (), F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        self.tree.find_mut(key)
    }

    pub fn lower_bound<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, K, (), F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        self.tree.lower_bound(key)
    }

    pub fn upper_bound<Q: ?Sized>(&self, key: &Q) -> Cursor<'_, K, (), F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        self.tree.upper_bound(key)
    }

    pub fn equal_range<Q: ?Sized>(&self, key: &Q) -> Keys<'_, K, (), F, S, C, MULTI>
    where
        C: Compare<Q, K>,
    {
        Keys::from(self.tree.equal_range(key))
    }

    pub fn range<Q: ?Sized, R>(&self, range: R) -> Keys<'_, K, (), F, S, C, MULTI>
    where
        C: Compare<Q, K>,
        R: RangeBounds<Q>,
    {
        Keys::from(self.tree.range(range))
    }

    /// Removes every key equal to `key` and returns how many there were.
    pub fn remove<Q: ?Sized>(&mut self, key: &Q) -> Result<usize>
    where
        C: Compare<Q, K>,
    {
        self.tree.remove(key)
    }

    /// Removes and returns one key equal to `key`, the first inserted on a
    /// multi set.
    pub fn take<Q: ?Sized>(&mut self, key: &Q) -> Result<Option<K>>
    where
        C: Compare<Q, K>,
    {
        Ok(self.tree.remove_entry(key)?.map(|(k, _)| k))
    }

    pub fn remove_range<Q: ?Sized, R>(&mut self, range: R) -> Result<usize>
    where
        C: Compare<Q, K>,
        R: RangeBounds<Q>,
    {
        self.tree.remove_range(range)
    }

    pub fn sum_before<Q: ?Sized>(&self, key: &Q) -> Result<Vec<S::Weight>>
    where
        C: Compare<Q, K>,
    {
        self.tree.sum_before(key)
    }

    pub fn sum_before_into<Q: ?Sized>(&self, key: &Q, out: &mut [S::Weight]) -> Result<()>
    where
        C: Compare<Q, K>,
    {
        self.tree.sum_before_into(key, out)
    }

    pub fn rank<Q: ?Sized>(&self, key: &Q) -> Result<S::Weight>
    where
        C: Compare<Q, K>,
    {
        self.tree.rank(key)
    }
}

impl<K, F, W, I, A, C, const MULTI: bool> Set<K, F, CompactStore<K, (), W, I, A>, C, MULTI>
where
    W: Weight,
    I: NodeIndex,
    A: ArrayKind,
    F: WeightFn<K, (), Output = W>,
{
    /// See [`Tree::shrink_to_fit`].
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        self.tree.shrink_to_fit()
    }

    pub fn deleted_nodes(&self) -> usize {
        self.tree.deleted_nodes()
    }

    pub fn capacity(&self) -> usize {
        self.tree.capacity()
    }

    pub fn reserve(&mut self, len: usize) -> Result<()> {
        self.tree.reserve(len)
    }
}

impl<K, F, S, C, const MULTI: bool> fmt::Debug for Set<K, F, S, C, MULTI>
where
    K: fmt::Debug,
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        CompactRankSet, Count, FnWeight, Powers, RankMultiSet, RankSet, ScaledPowers, Set,
        WeightedMap, WeightedSet, array::Stacked, node::CompactStore,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn set_basics() {
        let mut set = RankSet::<u32>::default();
        assert_eq!(true, set.is_empty());
        assert_eq!(Ok(true), set.insert(3));
        assert_eq!(Ok(true), set.insert(1));
        assert_eq!(Ok(false), set.insert(3));
        assert_eq!(2, set.len());
        assert_eq!(Some(&1), set.first());
        assert_eq!(Some(&3), set.last());
        assert_eq!(Some(&3), set.get(&3));
        assert_eq!(None, set.get(&2));
        assert_eq!(Some(&3), set.lower_bound(&2).key());
        assert_eq!(true, set.upper_bound(&3).is_end());
        assert_eq!(Ok(Some(3)), set.take(&3));
        assert_eq!(Ok(Some(1)), set.pop_last());
        assert_eq!(Ok(None), set.pop_first());
        set.check_tree(0.0).unwrap();
    }

    #[test]
    fn set_debug() {
        let set: RankSet<u32> = [2, 1].into_iter().collect();
        assert_eq!("{1, 2}", format!("{set:?}"));
    }

    #[test]
    fn multiset_ranges() {
        let set: RankMultiSet<u32> = [4, 1, 4, 2, 4, 9].into_iter().collect();
        assert_eq!(3, set.count(&4));
        assert_eq!(3, set.equal_range(&4).count());
        assert_eq!(vec![&2, &4, &4, &4], set.range(2..9).collect::<Vec<_>>());
        assert_eq!(Ok(2), set.rank(&4));
        assert_eq!(Ok(5), set.rank(&5));
        assert_eq!(Some(&4), set.nth(4));
        assert_eq!(Some(&9), set.nth(5));
    }

    #[test]
    fn power_sums() {
        let mut set: WeightedSet<u32, Powers> = WeightedSet::new(Powers::new([0.0, 1.0, 2.0]));
        set.try_extend(1..=100).unwrap();
        assert_eq!(vec![100.0, 5050.0, 338_350.0], set.total());
        assert_eq!(Ok(vec![10.0, 55.0, 385.0]), set.sum_before(&11));
        set.retain(|k| k % 2 == 0).unwrap();
        assert_eq!(vec![50.0, 2550.0, 171_700.0], set.total());
        set.check_tree(1e-6).unwrap();
    }

    #[test]
    fn scaled_power_sums() {
        let mut map: WeightedMap<u32, u32, ScaledPowers> =
            WeightedMap::new(ScaledPowers::new([0.0, 1.0]));
        // A multiset of keys stored as key => multiplicity.
        for (k, n) in [(1, 3), (2, 1), (5, 2)] {
            map.insert(k, n).unwrap();
        }
        assert_eq!(vec![6.0, 15.0], map.total());
        assert_eq!(Ok(3), map.update_value(&1, 1));
        assert_eq!(vec![4.0, 13.0], map.total());
        map.check_tree(1e-9).unwrap();
    }

    #[test]
    fn float_sums_within_epsilon() {
        let weigh = FnWeight::new(|k: &u32, _: &()| 0.1 * f64::from(*k));
        let mut set: WeightedSet<u32, _> = WeightedSet::new(weigh);
        set.try_extend(0..1000).unwrap();
        set.remove_range(100..900).unwrap();
        set.check_tree(1e-6).unwrap();
        let total = set.total()[0];
        assert_eq!(true, (total - 0.1 * 99_900.0).abs() < 1e-6);
    }

    #[test]
    fn compact_sets_on_both_backends() {
        let mut realloc = CompactRankSet::<u32, usize, u16>::default();
        let mut stacked: Set<u32, Count, CompactStore<u32, (), usize, u32, Stacked>, _, false> =
            Set::default();
        for k in (0..2000).rev() {
            realloc.insert(k).unwrap();
            stacked.insert(k).unwrap();
        }
        assert_eq!(Ok(1000), realloc.remove_range(500..1500));
        assert_eq!(Ok(1000), stacked.remove_range(500..1500));
        assert_eq!(1000, realloc.deleted_nodes());
        assert_eq!(1000, stacked.deleted_nodes());
        realloc.shrink_to_fit().unwrap();
        stacked.shrink_to_fit().unwrap();
        assert_eq!(0, realloc.deleted_nodes());
        realloc.check_tree(0.0).unwrap();
        stacked.check_tree(0.0).unwrap();
        assert_eq!(
            realloc.iter().collect::<Vec<_>>(),
            stacked.iter().collect::<Vec<_>>()
        );
        assert_eq!(Ok(500), stacked.rank(&1500));
    }
}
