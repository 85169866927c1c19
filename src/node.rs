use std::fmt::Debug;

use crate::{Color, Result, weight::Weight};

mod compact;
mod ptr;

pub use compact::{CompactStore, NodeIndex};
pub use ptr::PtrStore;

/// Where the tree keeps its nodes.
///
/// A store owns two sentinels, `root()` and `nil()`, that live as long as the
/// store does. The real tree hangs off `root()`'s right link; `nil()` stands
/// for every missing child and is always black. Link accessors never check
/// tree shape: keeping links consistent is the engine's job.
pub trait NodeStore<K, V> {
    type Handle: Copy + Eq + Debug;
    type Weight: Weight;

    fn with_components(components: usize) -> Self
    where
        Self: Sized;

    /// Weight components kept per node.
    fn components(&self) -> usize;

    fn root(&self) -> Self::Handle;

    fn nil(&self) -> Self::Handle;

    /// A handle that never names a node, distinct from `nil()`.
    fn invalid(&self) -> Self::Handle;

    /// Most elements the store can hold.
    fn max_len(&self) -> usize;

    /// Allocates an unlinked node. Links and sum are unspecified until the
    /// engine sets them.
    fn new_node(&mut self, key: K, value: V) -> Result<Self::Handle>;

    /// Releases a node the engine already unlinked.
    fn free_node(&mut self, node: Self::Handle) -> (K, V);

    /// Releases every node reachable from the root and resets the sentinels.
    fn clear_tree(&mut self);

    fn entry(&self, node: Self::Handle) -> (&K, &V);

    fn key(&self, node: Self::Handle) -> &K;

    fn value(&self, node: Self::Handle) -> &V;

    fn replace_value(&mut self, node: Self::Handle, value: V) -> V;

    fn parent(&self, node: Self::Handle) -> Self::Handle;

    fn left(&self, node: Self::Handle) -> Self::Handle;

    fn right(&self, node: Self::Handle) -> Self::Handle;

    fn set_parent(&mut self, node: Self::Handle, parent: Self::Handle);

    fn set_left(&mut self, node: Self::Handle, left: Self::Handle);

    fn set_right(&mut self, node: Self::Handle, right: Self::Handle);

    fn color(&self, node: Self::Handle) -> Color;

    fn set_color(&mut self, node: Self::Handle, color: Color);

    #[inline(always)]
    fn is_red(&self, node: Self::Handle) -> bool {
        self.color(node) == Color::Red
    }

    #[inline(always)]
    fn is_black(&self, node: Self::Handle) -> bool {
        self.color(node) == Color::Black
    }

    /// Cached subtree sum, `components()` long.
    fn sum(&self, node: Self::Handle) -> &[Self::Weight];

    fn sum_mut(&mut self, node: Self::Handle) -> &mut [Self::Weight];
}
