use std::{fmt, marker::PhantomData, ptr::NonNull, slice};

use super::NodeStore;
use crate::{Color, Error, Result, weight::Weight};

pub type NodePtr<K, V, W> = Option<NonNull<PtrNode<K, V, W>>>;

/// A single-component sum is kept inline, wider ones on the heap.
enum PartialSum<W> {
    Scalar(W),
    Vector(Box<[W]>),
}

impl<W: Weight> PartialSum<W> {
    fn zeroed(components: usize) -> Self {
        if components == 1 {
            PartialSum::Scalar(W::zero())
        } else {
            PartialSum::Vector(vec![W::zero(); components].into_boxed_slice())
        }
    }

    fn try_zeroed(components: usize) -> Result<Self> {
        if components == 1 {
            return Ok(PartialSum::Scalar(W::zero()));
        }
        let mut sum = Vec::new();
        sum.try_reserve_exact(components)
            .map_err(|_| Error::OutOfMemory)?;
        sum.resize(components, W::zero());
        Ok(PartialSum::Vector(sum.into_boxed_slice()))
    }
}

/// A node owning its own heap allocation.
pub struct PtrNode<K, V, W> {
    parent: NodePtr<K, V, W>,
    left: NodePtr<K, V, W>,
    right: NodePtr<K, V, W>,
    color: Color,
    sum: PartialSum<W>,
    /// `None` only for the sentinels.
    entry: Option<(K, V)>,
}

impl<K, V, W> PtrNode<K, V, W> {
    fn new(entry: Option<(K, V)>, sum: PartialSum<W>) -> Self {
        PtrNode {
            parent: None,
            left: None,
            right: None,
            color: Color::Black,
            sum,
            entry,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, W> fmt::Debug for PtrNode<K, V, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entry {
            Some((key, value)) => write!(f, "{:?}::({:?},{:?})", self.color, key, value),
            None => write!(f, "{:?}::sentinel", self.color),
        }
    }
}

/// Nodes allocated one by one and linked by pointers.
pub struct PtrStore<K, V, W> {
    root: NonNull<PtrNode<K, V, W>>,
    nil: NonNull<PtrNode<K, V, W>>,
    components: usize,
    _owns: PhantomData<Box<PtrNode<K, V, W>>>,
}

impl<K, V, W> PtrStore<K, V, W> {
    fn alloc(node: PtrNode<K, V, W>) -> NonNull<PtrNode<K, V, W>> {
        NonNull::from(Box::leak(Box::new(node)))
    }

    #[inline(always)]
    fn node(&self, node: NodePtr<K, V, W>) -> &PtrNode<K, V, W> {
        // SAFETY: handles come from `alloc` and the engine drops every copy of
        // a handle before passing it to `free_node`.
        unsafe { node.expect("invalid node handle").as_ref() }
    }

    #[inline(always)]
    fn node_mut(&mut self, node: NodePtr<K, V, W>) -> &mut PtrNode<K, V, W> {
        let mut node = node.expect("invalid node handle");
        // SAFETY: as in `node`; `&mut self` makes the access exclusive.
        unsafe { node.as_mut() }
    }

    fn reset_sentinels(&mut self) {
        let nil = Some(self.nil);
        for sentinel in [self.nil, self.root] {
            let node = self.node_mut(Some(sentinel));
            node.parent = nil;
            node.left = nil;
            node.right = nil;
            node.color = Color::Black;
        }
    }
}

impl<K, V, W: Weight> NodeStore<K, V> for PtrStore<K, V, W> {
    type Handle = NodePtr<K, V, W>;
    type Weight = W;

    fn with_components(components: usize) -> Self {
        let nil = Self::alloc(PtrNode::new(None, PartialSum::zeroed(components)));
        let root = Self::alloc(PtrNode::new(None, PartialSum::zeroed(components)));
        let mut store = PtrStore {
            root,
            nil,
            components,
            _owns: PhantomData,
        };
        store.reset_sentinels();
        store
    }

    #[inline(always)]
    fn components(&self) -> usize {
        self.components
    }

    #[inline(always)]
    fn root(&self) -> Self::Handle {
        Some(self.root)
    }

    #[inline(always)]
    fn nil(&self) -> Self::Handle {
        Some(self.nil)
    }

    #[inline(always)]
    fn invalid(&self) -> Self::Handle {
        None
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn new_node(&mut self, key: K, value: V) -> Result<Self::Handle> {
        let sum = PartialSum::try_zeroed(self.components)?;
        let mut node = PtrNode::new(Some((key, value)), sum);
        node.color = Color::Red;
        Ok(Some(Self::alloc(node)))
    }

    fn free_node(&mut self, node: Self::Handle) -> (K, V) {
        let node = node.expect("invalid node handle");
        debug_assert!(node != self.root && node != self.nil);
        // SAFETY: `node` was leaked by `alloc` and is no longer linked.
        let node = unsafe { Box::from_raw(node.as_ptr()) };
        node.entry.expect("sentinels are never freed")
    }

    fn clear_tree(&mut self) {
        let nil = Some(self.nil);
        let mut stack = Vec::new();
        let top = self.node(Some(self.root)).right;
        if top != nil {
            stack.push(top);
        }
        while let Some(current) = stack.pop() {
            let node = self.node(current);
            for child in [node.left, node.right] {
                if child != nil {
                    stack.push(child);
                }
            }
            self.free_node(current);
        }
        self.reset_sentinels();
    }

    #[inline(always)]
    fn entry(&self, node: Self::Handle) -> (&K, &V) {
        let (key, value) = self
            .node(node)
            .entry
            .as_ref()
            .expect("sentinels carry no entry");
        (key, value)
    }

    #[inline(always)]
    fn key(&self, node: Self::Handle) -> &K {
        self.entry(node).0
    }

    #[inline(always)]
    fn value(&self, node: Self::Handle) -> &V {
        self.entry(node).1
    }

    fn replace_value(&mut self, node: Self::Handle, value: V) -> V {
        let entry = self
            .node_mut(node)
            .entry
            .as_mut()
            .expect("sentinels carry no entry");
        std::mem::replace(&mut entry.1, value)
    }

    #[inline(always)]
    fn parent(&self, node: Self::Handle) -> Self::Handle {
        self.node(node).parent
    }

    #[inline(always)]
    fn left(&self, node: Self::Handle) -> Self::Handle {
        self.node(node).left
    }

    #[inline(always)]
    fn right(&self, node: Self::Handle) -> Self::Handle {
        self.node(node).right
    }

    #[inline(always)]
    fn set_parent(&mut self, node: Self::Handle, parent: Self::Handle) {
        self.node_mut(node).parent = parent;
    }

    #[inline(always)]
    fn set_left(&mut self, node: Self::Handle, left: Self::Handle) {
        self.node_mut(node).left = left;
    }

    #[inline(always)]
    fn set_right(&mut self, node: Self::Handle, right: Self::Handle) {
        self.node_mut(node).right = right;
    }

    #[inline(always)]
    fn color(&self, node: Self::Handle) -> Color {
        self.node(node).color
    }

    #[inline(always)]
    fn set_color(&mut self, node: Self::Handle, color: Color) {
        self.node_mut(node).color = color;
    }

    #[inline(always)]
    fn sum(&self, node: Self::Handle) -> &[W] {
        match &self.node(node).sum {
            PartialSum::Scalar(w) => slice::from_ref(w),
            PartialSum::Vector(ws) => ws,
        }
    }

    #[inline(always)]
    fn sum_mut(&mut self, node: Self::Handle) -> &mut [W] {
        match &mut self.node_mut(node).sum {
            PartialSum::Scalar(w) => slice::from_mut(w),
            PartialSum::Vector(ws) => ws,
        }
    }
}

impl<K, V, W> Drop for PtrStore<K, V, W> {
    fn drop(&mut self) {
        let nil = Some(self.nil);
        let mut stack = vec![self.node(Some(self.root)).right];
        while let Some(current) = stack.pop() {
            if current == nil {
                continue;
            }
            let node = self.node(current);
            stack.push(node.left);
            stack.push(node.right);
            // SAFETY: every reachable node was leaked by `alloc` exactly once.
            drop(unsafe { Box::from_raw(current.expect("invalid node handle").as_ptr()) });
        }
        // SAFETY: the sentinels are only freed here.
        unsafe {
            drop(Box::from_raw(self.root.as_ptr()));
            drop(Box::from_raw(self.nil.as_ptr()));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalar_sums_are_inline() {
        let mut store = PtrStore::<u8, (), u32>::with_components(1);
        let n = store.new_node(1, ()).unwrap();
        assert_eq!(true, matches!(store.node(n).sum, PartialSum::Scalar(_)));
        store.sum_mut(n)[0] = 7;
        assert_eq!(&[7], store.sum(n));
        assert_eq!((1, ()), store.free_node(n));
    }

    #[test]
    fn vector_sums_are_boxed() {
        let mut store = PtrStore::<u8, (), f64>::with_components(3);
        let n = store.new_node(1, ()).unwrap();
        assert_eq!(true, matches!(store.node(n).sum, PartialSum::Vector(_)));
        assert_eq!(&[0.0, 0.0, 0.0], store.sum(n));
        assert_eq!(Color::Red, store.color(n));
        store.free_node(n);
    }

    #[test]
    fn drop_frees_linked_nodes() {
        use std::rc::Rc;

        let tracker = Rc::new(());
        let mut store = PtrStore::<u8, Rc<()>, u32>::with_components(1);
        let (root, nil) = (store.root(), store.nil());
        let mut parent = root;
        for k in 0..10 {
            let n = store.new_node(k, Rc::clone(&tracker)).unwrap();
            store.set_left(n, nil);
            store.set_right(n, nil);
            store.set_parent(n, parent);
            store.set_right(parent, n);
            parent = n;
        }
        assert_eq!(11, Rc::strong_count(&tracker));
        drop(store);
        assert_eq!(1, Rc::strong_count(&tracker));
    }

    #[test]
    fn debug_shows_color_and_entry() {
        let mut store = PtrStore::<u8, &str, u32>::with_components(1);
        let n = store.new_node(4, "four").unwrap();
        assert_eq!("Red::(4,\"four\")", format!("{:?}", store.node(n)));
        assert_eq!("Black::sentinel", format!("{:?}", store.node(store.nil())));
        store.free_node(n);
    }
}
