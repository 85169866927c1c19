use std::{iter::FusedIterator, vec};

use compare::{Compare, Natural};

use crate::{Tree, node::NodeStore, root::Root, weight::WeightFn};

impl<K, V, F, S, C, const MULTI: bool> Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    /// Gets an iterator over the keys of the map, in sorted order.
    ///
    /// # Examples
    ///
    /// ```
    /// use weighted_rbtree::RankMap;
    ///
    /// let mut a: RankMap<i32, &str> = RankMap::default();
    /// a.insert(2, "b").unwrap();
    /// a.insert(1, "a").unwrap();
    ///
    /// let keys: Vec<_> = a.keys().cloned().collect();
    /// assert_eq!(keys, [1, 2]);
    /// ```
    pub fn keys(&self) -> Keys<'_, K, V, F, S, C, MULTI> {
        Keys { inner: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V, F, S, C, MULTI> {
        Values { inner: self.iter() }
    }

    /// Creates a consuming iterator visiting all the keys, in sorted order.
    #[inline]
    pub fn into_keys(self) -> IntoKeys<K, V> {
        IntoKeys {
            inner: self.into_iter(),
        }
    }

    /// Creates a consuming iterator visiting all the values, in order by key.
    #[inline]
    pub fn into_values(self) -> IntoValues<K, V> {
        IntoValues {
            inner: self.into_iter(),
        }
    }
}

/// An iterator over the entries of a [`Tree`], in key order.
///
/// Created by [`Tree::iter`], [`Tree::range`] and [`Tree::equal_range`].
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V, F, S, C, const MULTI: bool>
where
    S: NodeStore<K, V>,
{
    root: &'a Root<K, V, F, S, C, MULTI>,
    front: S::Handle,
    back: S::Handle,
    len: usize,
}

impl<'a, K, V, F, S, C, const MULTI: bool> Iter<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
{
    /// `len` nodes from `front` through `back`.
    pub(crate) fn new(
        root: &'a Root<K, V, F, S, C, MULTI>,
        front: S::Handle,
        back: S::Handle,
        len: usize,
    ) -> Self {
        Iter {
            root,
            front,
            back,
            len,
        }
    }
}

impl<'a, K, V, F, S, C, const MULTI: bool> IntoIterator for &'a Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, F, S, C, MULTI>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, F, S, C, const MULTI: bool> Iterator for Iter<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let node = self.front;
        self.len -= 1;
        self.front = self.root.next(node);
        Some(self.root.store.entry(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }

    fn last(mut self) -> Option<Self::Item> {
        self.next_back()
    }
}

impl<K, V, F, S, C, const MULTI: bool> DoubleEndedIterator for Iter<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let node = self.back;
        self.len -= 1;
        self.back = self.root.prev(node);
        Some(self.root.store.entry(node))
    }
}

impl<K, V, F, S, C, const MULTI: bool> ExactSizeIterator for Iter<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    fn len(&self) -> usize {
        self.len
    }
}

impl<K, V, F, S, C, const MULTI: bool> FusedIterator for Iter<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
}

impl<K, V, F, S, C, const MULTI: bool> Clone for Iter<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
{
    fn clone(&self) -> Self {
        Iter {
            root: self.root,
            front: self.front,
            back: self.back,
            len: self.len,
        }
    }
}

/// An iterator over the keys of a [`Tree`].
///
/// This `struct` is created by the [`keys`] method on [`Tree`].
///
/// [`keys`]: Tree::keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Keys<'a, K, V, F, S, C, const MULTI: bool>
where
    S: NodeStore<K, V>,
{
    inner: Iter<'a, K, V, F, S, C, MULTI>,
}

/// An iterator over the values of a [`Tree`].
///
/// This `struct` is created by the [`values`] method on [`Tree`].
///
/// [`values`]: Tree::values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Values<'a, K, V, F, S, C, const MULTI: bool>
where
    S: NodeStore<K, V>,
{
    inner: Iter<'a, K, V, F, S, C, MULTI>,
}

impl<'a, K, V, F, S, C, const MULTI: bool> From<Iter<'a, K, V, F, S, C, MULTI>>
    for Keys<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
{
    fn from(inner: Iter<'a, K, V, F, S, C, MULTI>) -> Self {
        Keys { inner }
    }
}

impl<'a, K, V, F, S, C, const MULTI: bool> Iterator for Keys<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn last(mut self) -> Option<&'a K> {
        self.next_back()
    }
}

impl<'a, K, V, F, S, C, const MULTI: bool> DoubleEndedIterator for Keys<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    fn next_back(&mut self) -> Option<&'a K> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V, F, S, C, const MULTI: bool> ExactSizeIterator for Keys<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V, F, S, C, const MULTI: bool> FusedIterator for Keys<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
}

impl<K, V, F, S, C, const MULTI: bool> Clone for Keys<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
{
    fn clone(&self) -> Self {
        Keys {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V, F, S, C, const MULTI: bool> Iterator for Values<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn last(mut self) -> Option<&'a V> {
        self.next_back()
    }
}

impl<'a, K, V, F, S, C, const MULTI: bool> DoubleEndedIterator for Values<'a, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, F, S, C, const MULTI: bool> ExactSizeIterator for Values<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V, F, S, C, const MULTI: bool> FusedIterator for Values<'_, K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
}

/// An owning iterator over the entries of a [`Tree`], in key order.
///
/// The tree is emptied up front, so dropping the iterator early is cheap.
pub struct IntoIter<K, V> {
    inner: vec::IntoIter<(K, V)>,
}

impl<K, V, F, S, C, const MULTI: bool> IntoIterator for Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Gets an owning iterator over the entries of the map, sorted by key.
    fn into_iter(mut self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.root.drain_sorted().into_iter(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn last(mut self) -> Option<(K, V)> {
        self.next_back()
    }
}

impl<K, V> DoubleEndedIterator for IntoIter<K, V> {
    fn next_back(&mut self) -> Option<(K, V)> {
        self.inner.next_back()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoIter<K, V> {}

/// An owning iterator over the keys of a [`Tree`].
///
/// This `struct` is created by the [`into_keys`] method on [`Tree`].
///
/// [`into_keys`]: Tree::into_keys
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoKeys<K, V> {
    inner: IntoIter<K, V>,
}

/// An owning iterator over the values of a [`Tree`].
///
/// This `struct` is created by the [`into_values`] method on [`Tree`].
///
/// [`into_values`]: Tree::into_values
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct IntoValues<K, V> {
    inner: IntoIter<K, V>,
}

impl<K, V> Iterator for IntoKeys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoKeys<K, V> {
    fn next_back(&mut self) -> Option<K> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for IntoKeys<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoKeys<K, V> {}

impl<K, V> Iterator for IntoValues<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<V> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for IntoValues<K, V> {
    fn next_back(&mut self) -> Option<V> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for IntoValues<K, V> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<K, V> FusedIterator for IntoValues<K, V> {}

impl<K, V, F, S, C, const MULTI: bool> Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
    C: Compare<K>,
{
    /// Inserts every entry, appending through the end hint so sorted input
    /// takes amortized constant time per entry. Stops at the first error;
    /// entries inserted before it stay.
    pub fn try_extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) -> crate::Result<()> {
        for (k, v) in iter {
            self.cursor_end_mut().insert_before(k, v)?;
        }
        Ok(())
    }
}

impl<K, V, F, S, C, const MULTI: bool> Extend<(K, V)> for Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
    C: Compare<K>,
{
    /// # Panics
    ///
    /// Panics if an insertion fails; see [`Tree::try_extend`].
    #[inline]
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        if let Err(e) = self.try_extend(iter) {
            panic!("cannot extend tree: {e}");
        }
    }
}

impl<K, V, F, S, const MULTI: bool> FromIterator<(K, V)> for Tree<K, V, F, S, Natural<K>, MULTI>
where
    K: Ord,
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight> + Default,
{
    /// # Panics
    ///
    /// Panics if an insertion fails, as [`Extend`] does.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Tree::default();
        tree.extend(iter);
        tree
    }
}
