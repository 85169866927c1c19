mod set;
mod tree;

use std::ops::Index;

use compare::Compare;

use crate::{Tree, node::NodeStore, weight::WeightFn};

pub use tree::{IntoIter, IntoKeys, IntoValues, Iter, Keys, Values};

impl<K, Q: ?Sized, V, F, S, C, const MULTI: bool> Index<&Q> for Tree<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
    C: Compare<Q, K>,
{
    type Output = V;

    /// Returns a reference to the value corresponding to the supplied key.
    ///
    /// # Panics
    ///
    /// Panics if the key is not present in the `Tree`.
    #[inline]
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}
