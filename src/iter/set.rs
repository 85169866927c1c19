use compare::{Compare, Natural};

use crate::{IntoKeys, Keys, Set, node::NodeStore, weight::WeightFn};

impl<'a, K, F, S, C, const MULTI: bool> IntoIterator for &'a Set<K, F, S, C, MULTI>
where
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight>,
{
    type Item = &'a K;
    type IntoIter = Keys<'a, K, (), F, S, C, MULTI>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, F, S, C, const MULTI: bool> IntoIterator for Set<K, F, S, C, MULTI>
where
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight>,
{
    type Item = K;
    type IntoIter = IntoKeys<K, ()>;

    /// Gets an owning iterator over the keys, sorted.
    fn into_iter(self) -> IntoKeys<K, ()> {
        self.tree.into_keys()
    }
}

impl<K, F, S, C, const MULTI: bool> Extend<K> for Set<K, F, S, C, MULTI>
where
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight>,
    C: Compare<K>,
{
    /// # Panics
    ///
    /// Panics if an insertion fails; see [`Set::try_extend`].
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.tree.extend(iter.into_iter().map(|k| (k, ())));
    }
}

impl<K: Ord, F, S, const MULTI: bool> FromIterator<K> for Set<K, F, S, Natural<K>, MULTI>
where
    S: NodeStore<K, ()>,
    F: WeightFn<K, (), Output = S::Weight> + Default,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Set::default();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod test {
    use crate::RankSet;
    use pretty_assertions::assert_eq;

    #[test]
    fn collect_and_consume() {
        let set: RankSet<u32> = [5, 3, 9, 3].into_iter().collect();
        assert_eq!(3, set.len());
        assert_eq!(vec![&3, &5, &9], (&set).into_iter().collect::<Vec<_>>());
        assert_eq!(vec![9, 5, 3], set.into_iter().rev().collect::<Vec<_>>());
    }

    #[test]
    fn extend_keeps_one_of_each() {
        let mut set: RankSet<u32> = (0..10).collect();
        set.extend(5..15);
        assert_eq!(15, set.len());
        assert_eq!(Ok(10), set.rank(&10));
        set.check_tree(0.0).unwrap();
    }
}
