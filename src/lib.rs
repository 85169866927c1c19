//! Red-black trees whose nodes carry weights, with every node caching the
//! sum of the weights in its subtree.
//!
//! The cached sums answer "how much weighs everything before this key" in
//! logarithmic time. With [`Count`] as the weight that is the rank of a key;
//! with [`Powers`] it is a running sum of powers of the keys, and any other
//! [`WeightFn`] plugs in the same way.
//!
//! Nodes live either behind pointers ([`PtrStore`]) or in a flat array
//! addressed by small integers ([`CompactStore`]).
//!
//! ```
//! use weighted_rbtree::RankSet;
//!
//! let mut set = RankSet::<u32>::default();
//! for k in [40, 10, 30, 20] {
//!     set.insert(k).unwrap();
//! }
//! assert_eq!(set.rank(&30).unwrap(), 2);
//! assert_eq!(set.nth(0), Some(&10));
//! set.check_tree(0.0).unwrap();
//! ```
//!
//! Structural rebalancing is translated from the linux kernel's
//! implementation of red-black trees.
pub mod array;
mod cursor;
mod error;
mod iter;
mod node;
mod root;
mod set;
mod tree;
pub mod weight;

pub use compare::{Compare, Natural};
pub use cursor::{Cursor, CursorMut};
pub use error::{Error, Result};
pub use iter::{IntoIter, IntoKeys, IntoValues, Iter, Keys, Values};
pub use node::{CompactStore, NodeIndex, PtrStore};
pub use set::Set;
pub use tree::Tree;
pub use weight::{Count, FnWeight, FnWeights, Powers, ScaledPowers, Weight, WeightFn};

use array::Realloc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red = 0,
    Black = 1,
}

/// The weight type `F` produces for `(K, V)` entries.
pub type WeightOf<F, K, V> = <F as WeightFn<K, V>>::Output;

/// Unique keys, pointer-linked nodes.
pub type WeightedMap<K, V, F, C = Natural<K>> =
    Tree<K, V, F, PtrStore<K, V, WeightOf<F, K, V>>, C, false>;
/// Repeated keys in insertion order, pointer-linked nodes.
pub type WeightedMultiMap<K, V, F, C = Natural<K>> =
    Tree<K, V, F, PtrStore<K, V, WeightOf<F, K, V>>, C, true>;
pub type WeightedSet<K, F, C = Natural<K>> = Set<K, F, PtrStore<K, (), WeightOf<F, K, ()>>, C, false>;
pub type WeightedMultiSet<K, F, C = Natural<K>> =
    Set<K, F, PtrStore<K, (), WeightOf<F, K, ()>>, C, true>;

/// Unique keys, nodes in one array addressed by `I`.
pub type CompactMap<K, V, F, I = u32, C = Natural<K>> =
    Tree<K, V, F, CompactStore<K, V, WeightOf<F, K, V>, I, Realloc>, C, false>;
pub type CompactMultiMap<K, V, F, I = u32, C = Natural<K>> =
    Tree<K, V, F, CompactStore<K, V, WeightOf<F, K, V>, I, Realloc>, C, true>;
pub type CompactSet<K, F, I = u32, C = Natural<K>> =
    Set<K, F, CompactStore<K, (), WeightOf<F, K, ()>, I, Realloc>, C, false>;
pub type CompactMultiSet<K, F, I = u32, C = Natural<K>> =
    Set<K, F, CompactStore<K, (), WeightOf<F, K, ()>, I, Realloc>, C, true>;

/// Order statistics: every element weighs one.
pub type RankSet<K, W = usize> = WeightedSet<K, Count<W>>;
pub type RankMultiSet<K, W = usize> = WeightedMultiSet<K, Count<W>>;
pub type RankMap<K, V, W = usize> = WeightedMap<K, V, Count<W>>;
pub type RankMultiMap<K, V, W = usize> = WeightedMultiMap<K, V, Count<W>>;
pub type CompactRankSet<K, W = usize, I = u32> = CompactSet<K, Count<W>, I>;
pub type CompactRankMultiSet<K, W = usize, I = u32> = CompactMultiSet<K, Count<W>, I>;
