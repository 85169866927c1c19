use std::cmp::Ordering;

use compare::Compare;
use smallvec::{SmallVec, smallvec};

use super::Root;
use crate::{
    Result,
    node::NodeStore,
    weight::{self, Weight, WeightFn},
};

type WeightOp<W> = fn(W, W) -> Result<W>;

/// Scratch room for one node's weight; spills to the heap past four
/// components.
pub(crate) type WeightBuf<W> = SmallVec<[W; 4]>;

impl<K, V, F, S, C, const MULTI: bool> Root<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    /// The weight of `node` alone.
    pub(crate) fn weight_of(&self, node: S::Handle) -> WeightBuf<S::Weight> {
        let mut weight = self.weight_buf();
        self.weigh_into(node, &mut weight);
        weight
    }

    pub(crate) fn weight_buf(&self) -> WeightBuf<S::Weight> {
        smallvec![S::Weight::zero(); self.store.components()]
    }

    /// Overwrites `out` with the weight of `node`.
    #[inline]
    pub(crate) fn weigh_into(&self, node: S::Handle, out: &mut [S::Weight]) {
        let (key, value) = self.store.entry(node);
        self.weigh.weigh(key, value, out);
    }

    /// Checks that `op(sum, delta)` fits at `node` and every ancestor.
    pub(super) fn check_path(
        &self,
        mut node: S::Handle,
        delta: &[S::Weight],
        op: WeightOp<S::Weight>,
    ) -> Result<()> {
        let root = self.store.root();
        while node != root {
            for (sum, d) in self.store.sum(node).iter().zip(delta) {
                op(*sum, *d)?;
            }
            node = self.store.parent(node);
        }
        Ok(())
    }

    /// Applies `op(sum, delta)` at `node` and every ancestor.
    pub(super) fn apply_path(
        &mut self,
        mut node: S::Handle,
        delta: &[S::Weight],
        op: WeightOp<S::Weight>,
    ) -> Result<()> {
        let root = self.store.root();
        while node != root {
            for (sum, d) in self.store.sum_mut(node).iter_mut().zip(delta) {
                *sum = op(*sum, *d)?;
            }
            node = self.store.parent(node);
        }
        Ok(())
    }

    /// Recomputes the sum of `node` from its children.
    pub(super) fn update_sum(&mut self, node: S::Handle) -> Result<()> {
        let nil = self.nil();
        let mut sum = self.weight_of(node);
        for child in [self.store.left(node), self.store.right(node)] {
            if child != nil {
                weight::add_assign(&mut sum, self.store.sum(child))?;
            }
        }
        self.store.sum_mut(node).copy_from_slice(&sum);
        Ok(())
    }

    /// Recomputes the sums from `node` up to the root. Nothing is written
    /// unless every new sum fits.
    pub(super) fn update_sum_r(&mut self, node: S::Handle) -> Result<()> {
        let (root, nil) = (self.store.root(), self.nil());
        let components = self.store.components();
        if components == 0 {
            return Ok(());
        }
        // New sums, `components` apiece, in path order.
        let mut path: SmallVec<[S::Handle; 32]> = SmallVec::new();
        let mut sums: SmallVec<[S::Weight; 64]> = SmallVec::new();
        let mut current = node;
        while current != root {
            let start = sums.len();
            sums.extend(std::iter::repeat_n(S::Weight::zero(), components));
            let (below, sum) = sums.split_at_mut(start);
            self.weigh_into(current, sum);
            for child in [self.store.left(current), self.store.right(current)] {
                if child == nil {
                    continue;
                }
                if path.last() == Some(&child) {
                    weight::add_assign(sum, &below[start - components..])?;
                } else {
                    weight::add_assign(sum, self.store.sum(child))?;
                }
            }
            path.push(current);
            current = self.store.parent(current);
        }
        for (node, sum) in path.iter().zip(sums.chunks_exact(components)) {
            self.store.sum_mut(*node).copy_from_slice(sum);
        }
        Ok(())
    }

    /// Total weight of every node ordered strictly before `key`.
    pub(crate) fn sum_before<Q: ?Sized>(&self, key: &Q, out: &mut [S::Weight]) -> Result<()>
    where
        C: Compare<Q, K>,
    {
        let nil = self.nil();
        out.fill(S::Weight::zero());
        let mut weight = self.weight_buf();
        let mut node = self.top();
        while node != nil {
            if self.cmp.compare(key, self.store.key(node)) == Ordering::Greater {
                let left = self.store.left(node);
                if left != nil {
                    weight::add_assign(out, self.store.sum(left))?;
                }
                self.weigh_into(node, &mut weight);
                weight::add_assign(out, &weight)?;
                node = self.store.right(node);
            } else {
                node = self.store.left(node);
            }
        }
        Ok(())
    }

    /// Total weight of every node before `node`; all of them for `nil`.
    pub(crate) fn sum_before_node(&self, node: S::Handle, out: &mut [S::Weight]) -> Result<()> {
        let (root, nil) = (self.store.root(), self.nil());
        if node == nil {
            self.total(out);
            return Ok(());
        }
        out.fill(S::Weight::zero());
        let left = self.store.left(node);
        if left != nil {
            out.copy_from_slice(self.store.sum(left));
        }
        let mut weight = self.weight_buf();
        let mut current = node;
        loop {
            let parent = self.store.parent(current);
            if parent == root {
                return Ok(());
            }
            if self.store.right(parent) == current {
                let left = self.store.left(parent);
                if left != nil {
                    weight::add_assign(out, self.store.sum(left))?;
                }
                self.weigh_into(parent, &mut weight);
                weight::add_assign(out, &weight)?;
            }
            current = parent;
        }
    }

    /// Total weight of the tree, read off the real root.
    pub(crate) fn total(&self, out: &mut [S::Weight]) {
        let top = self.top();
        if top == self.nil() {
            out.fill(S::Weight::zero());
        } else {
            out.copy_from_slice(self.store.sum(top));
        }
    }

    /// The first node whose inclusive running total of `component` exceeds
    /// `target`, or `nil` when the whole tree does not.
    ///
    /// Assumes non-negative weights in `component`.
    pub(crate) fn select(&self, component: usize, target: S::Weight) -> Result<S::Handle> {
        let nil = self.nil();
        let mut node = self.top();
        let mut seen = S::Weight::zero();
        let mut weight = self.weight_buf();
        while node != nil {
            let left = self.store.left(node);
            if left != nil {
                let through_left = weight::add(seen, self.store.sum(left)[component])?;
                if target < through_left {
                    node = left;
                    continue;
                }
                seen = through_left;
            }
            self.weigh_into(node, &mut weight);
            let through_node = weight::add(seen, weight[component])?;
            if target < through_node {
                return Ok(node);
            }
            seen = through_node;
            node = self.store.right(node);
        }
        Ok(nil)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        Error,
        node::{NodeStore, PtrStore},
        root::Root,
        weight::{Count, FnWeight, Powers},
    };
    use compare::Natural;
    use pretty_assertions::assert_eq;

    type Rank = Root<u32, (), Count<u32>, PtrStore<u32, (), u32>, Natural<u32>, false>;

    fn rank(keys: impl IntoIterator<Item = u32>) -> Rank {
        let mut root = Root::new(Count::new(), compare::natural());
        for k in keys {
            root.insert(k, ()).unwrap();
        }
        root
    }

    #[test]
    fn sum_before_counts_smaller_keys() {
        let root = rank([50, 10, 40, 20, 30]);
        let mut out = [0];
        for (k, expected) in [(0, 0), (10, 0), (11, 1), (30, 2), (45, 4), (99, 5)] {
            root.sum_before(&k, &mut out).unwrap();
            assert_eq!([expected], out);
        }
    }

    #[test]
    fn sum_before_node_matches_position() {
        let root = rank((0..200).rev());
        let mut out = [0];
        let mut node = root.first();
        let mut i = 0;
        while node != root.nil() {
            root.sum_before_node(node, &mut out).unwrap();
            assert_eq!([i], out);
            node = root.next(node);
            i += 1;
        }
        root.sum_before_node(root.nil(), &mut out).unwrap();
        assert_eq!([200], out);
    }

    #[test]
    fn select_finds_nth() {
        let root = rank((0..100).map(|k| k * 3));
        for i in 0..100 {
            let node = root.select(0, i).unwrap();
            assert_eq!(&(i * 3), root.store.key(node));
        }
        assert_eq!(root.nil(), root.select(0, 100).unwrap());
    }

    #[test]
    fn vector_weights() {
        let mut root: Root<u32, (), Powers<f64>, PtrStore<u32, (), f64>, Natural<u32>, false> =
            Root::new(Powers::new([0.0, 1.0, 2.0]), compare::natural());
        for k in 1..=10 {
            root.insert(k, ()).unwrap();
        }
        let mut out = [0.0; 3];
        root.total(&mut out);
        assert_eq!([10.0, 55.0, 385.0], out);
        root.sum_before(&4, &mut out).unwrap();
        assert_eq!([3.0, 6.0, 14.0], out);
        root.check_tree(1e-9).unwrap();
    }

    #[test]
    fn value_update_recomputes_sums() {
        let weigh = FnWeight::new(|_: &u32, v: &u8| *v);
        let mut root: Root<u32, u8, _, PtrStore<u32, u8, u8>, Natural<u32>, false> =
            Root::new(weigh, compare::natural());
        for k in 0..10 {
            root.insert(k, 10).unwrap();
        }
        let node = root.find(&5);
        assert_eq!(Ok(10), root.update_value(node, 100));
        let mut out = [0];
        root.total(&mut out);
        assert_eq!([190], out);
        root.check_tree(0.0).unwrap();

        // 190 - 100 + 200 does not fit in a u8; nothing changes.
        assert_eq!(Err(Error::Overflow), root.update_value(node, 200));
        assert_eq!(&100, root.store.value(node));
        root.total(&mut out);
        assert_eq!([190], out);
        root.check_tree(0.0).unwrap();
    }
}
