use std::{cmp::Ordering, marker::PhantomData};

use compare::Compare;

use crate::{
    Color, Error, Result,
    node::NodeStore,
    weight::{self, WeightFn},
};

mod check;
mod sum;

/// Which link of its parent a node hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Outcome of an insertion search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot<H> {
    /// A free link: the new node becomes this side's child of the handle.
    Vacant(H, Side),
    /// A unique tree already holds an equal key.
    Occupied(H),
}

/// The augmented red-black tree proper.
///
/// Works on handles of an abstract [`NodeStore`]; the facade types translate
/// keys and cursors into calls on this. `MULTI` trees keep equal keys in
/// insertion order.
pub(crate) struct Root<K, V, F, S, C, const MULTI: bool> {
    pub(crate) store: S,
    pub(crate) weigh: F,
    pub(crate) cmp: C,
    len: usize,
    _entries: PhantomData<fn() -> (K, V)>,
}

impl<K, V, F, S, C, const MULTI: bool> Root<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
{
    pub(crate) fn new(weigh: F, cmp: C) -> Self {
        Root {
            store: S::with_components(weigh.components()),
            weigh,
            cmp,
            len: 0,
            _entries: PhantomData,
        }
    }

    #[inline(always)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub(crate) fn nil(&self) -> S::Handle {
        self.store.nil()
    }

    /// The real root, `nil` when empty.
    #[inline(always)]
    pub(crate) fn top(&self) -> S::Handle {
        self.store.right(self.store.root())
    }

    pub(crate) fn first(&self) -> S::Handle {
        let nil = self.nil();
        let mut node = self.top();
        if node == nil {
            return nil;
        }
        while self.store.left(node) != nil {
            node = self.store.left(node);
        }
        node
    }

    pub(crate) fn last(&self) -> S::Handle {
        let nil = self.nil();
        let mut node = self.top();
        if node == nil {
            return nil;
        }
        while self.store.right(node) != nil {
            node = self.store.right(node);
        }
        node
    }

    /// In-order successor; `next(nil) == nil`.
    pub(crate) fn next(&self, node: S::Handle) -> S::Handle {
        let (root, nil) = (self.store.root(), self.nil());
        if node == nil {
            return nil;
        }
        // If we have a right-hand child, go down and then left as far as we
        // can.
        let mut current = self.store.right(node);
        if current != nil {
            while self.store.left(current) != nil {
                current = self.store.left(current);
            }
            return current;
        }
        // [1] Go up the tree while we are a right-hand child; [2] the first
        // parent we reach from its left is the successor.
        current = node;
        loop {
            let parent = self.store.parent(current);
            if parent == root {
                return nil;
            }
            if self.store.left(parent) == current {
                return parent;
            }
            current = parent;
        }
    }

    /// In-order predecessor; `prev(nil) == last()`.
    pub(crate) fn prev(&self, node: S::Handle) -> S::Handle {
        let (root, nil) = (self.store.root(), self.nil());
        if node == nil {
            return self.last();
        }
        let mut current = self.store.left(node);
        if current != nil {
            while self.store.right(current) != nil {
                current = self.store.right(current);
            }
            return current;
        }
        current = node;
        loop {
            let parent = self.store.parent(current);
            if parent == root {
                return nil;
            }
            if self.store.right(parent) == current {
                return parent;
            }
            current = parent;
        }
    }

    #[inline(always)]
    fn side_of(&self, node: S::Handle) -> Side {
        if self.store.left(self.store.parent(node)) == node {
            Side::Left
        } else {
            Side::Right
        }
    }

    #[inline(always)]
    fn sibling(&self, node: S::Handle) -> S::Handle {
        let parent = self.store.parent(node);
        match self.side_of(node) {
            Side::Left => self.store.right(parent),
            Side::Right => self.store.left(parent),
        }
    }

    /// Points whichever link of `parent` held `old` at `new`.
    #[inline(always)]
    fn replace_child(&mut self, parent: S::Handle, old: S::Handle, new: S::Handle) {
        if self.store.left(parent) == old {
            self.store.set_left(parent, new);
        } else {
            self.store.set_right(parent, new);
        }
    }

    /*
     *     x              y
     *    / \            / \
     *   a   y   -->    x   c
     *      / \        / \
     *     b   c      a   b
     */
    fn rotate_left(&mut self, x: S::Handle) -> Result<()> {
        let nil = self.nil();
        let y = self.store.right(x);
        let parent = self.store.parent(x);
        let b = self.store.left(y);
        self.store.set_right(x, b);
        if b != nil {
            self.store.set_parent(b, x);
        }
        self.store.set_parent(y, parent);
        self.replace_child(parent, x, y);
        self.store.set_left(y, x);
        self.store.set_parent(x, y);
        // Only x and y changed subtrees.
        self.update_sum(x)?;
        self.update_sum(y)
    }

    /*
     *       x          y
     *      / \        / \
     *     y   c -->  a   x
     *    / \            / \
     *   a   b          b   c
     */
    fn rotate_right(&mut self, x: S::Handle) -> Result<()> {
        let nil = self.nil();
        let y = self.store.left(x);
        let parent = self.store.parent(x);
        let b = self.store.right(y);
        self.store.set_left(x, b);
        if b != nil {
            self.store.set_parent(b, x);
        }
        self.store.set_parent(y, parent);
        self.replace_child(parent, x, y);
        self.store.set_right(y, x);
        self.store.set_parent(x, y);
        self.update_sum(x)?;
        self.update_sum(y)
    }

    /// Rotates `node` above its parent.
    fn rotate_parent(&mut self, node: S::Handle) -> Result<()> {
        let parent = self.store.parent(node);
        match self.side_of(node) {
            Side::Left => self.rotate_right(parent),
            Side::Right => self.rotate_left(parent),
        }
    }

    pub(crate) fn find<Q: ?Sized>(&self, key: &Q) -> S::Handle
    where
        C: Compare<Q, K>,
    {
        if MULTI {
            // The first of the equal keys.
            let node = self.lower_bound(key);
            return if node != self.nil() && self.is_equal(key, node) {
                node
            } else {
                self.nil()
            };
        }
        let nil = self.nil();
        let mut node = self.top();
        while node != nil {
            match self.cmp.compare(key, self.store.key(node)) {
                Ordering::Less => node = self.store.left(node),
                Ordering::Greater => node = self.store.right(node),
                Ordering::Equal => return node,
            }
        }
        nil
    }

    #[inline(always)]
    pub(crate) fn is_equal<Q: ?Sized>(&self, key: &Q, node: S::Handle) -> bool
    where
        C: Compare<Q, K>,
    {
        self.cmp.compare(key, self.store.key(node)) == Ordering::Equal
    }

    /// First node whose key is not less than `key`.
    pub(crate) fn lower_bound<Q: ?Sized>(&self, key: &Q) -> S::Handle
    where
        C: Compare<Q, K>,
    {
        let nil = self.nil();
        let mut best = nil;
        let mut node = self.top();
        while node != nil {
            if self.cmp.compare(key, self.store.key(node)) == Ordering::Greater {
                node = self.store.right(node);
            } else {
                best = node;
                node = self.store.left(node);
            }
        }
        best
    }

    /// First node whose key is greater than `key`.
    pub(crate) fn upper_bound<Q: ?Sized>(&self, key: &Q) -> S::Handle
    where
        C: Compare<Q, K>,
    {
        let nil = self.nil();
        let mut best = nil;
        let mut node = self.top();
        while node != nil {
            if self.cmp.compare(key, self.store.key(node)) == Ordering::Less {
                best = node;
                node = self.store.left(node);
            } else {
                node = self.store.right(node);
            }
        }
        best
    }

    /// Where `key` goes. Multi trees descend right on equal keys so the new
    /// node lands after its equals.
    pub(crate) fn insert_search(&self, key: &K) -> Slot<S::Handle>
    where
        C: Compare<K>,
    {
        let nil = self.nil();
        let mut node = self.top();
        if node == nil {
            return Slot::Vacant(self.store.root(), Side::Right);
        }
        loop {
            match self.cmp.compare(key, self.store.key(node)) {
                Ordering::Less => {
                    let left = self.store.left(node);
                    if left == nil {
                        return Slot::Vacant(node, Side::Left);
                    }
                    node = left;
                }
                Ordering::Equal if !MULTI => return Slot::Occupied(node),
                _ => {
                    let right = self.store.right(node);
                    if right == nil {
                        return Slot::Vacant(node, Side::Right);
                    }
                    node = right;
                }
            }
        }
    }

    /// Like [`Root::insert_search`], trying the gap just before `hint` first.
    ///
    /// A `nil` hint means the end of the tree, which makes appending sorted
    /// input cheap. Multi trees put a key equal to the hint's right before it.
    pub(crate) fn insert_search_hint(&self, hint: S::Handle, key: &K) -> Result<Slot<S::Handle>>
    where
        C: Compare<K>,
    {
        let nil = self.nil();
        if hint == nil {
            let last = self.last();
            if last == nil {
                return Ok(Slot::Vacant(self.store.root(), Side::Right));
            }
            return Ok(match self.cmp.compare(key, self.store.key(last)) {
                Ordering::Greater => Slot::Vacant(last, Side::Right),
                Ordering::Equal if MULTI => Slot::Vacant(last, Side::Right),
                _ => self.insert_search(key),
            });
        }
        match self.cmp.compare(key, self.store.key(hint)) {
            Ordering::Less => {
                let prev = self.prev(hint);
                if prev != nil {
                    match self.cmp.compare(key, self.store.key(prev)) {
                        Ordering::Less => return Ok(self.insert_search(key)),
                        Ordering::Equal if !MULTI => return Ok(Slot::Occupied(prev)),
                        _ => {}
                    }
                }
                self.between(prev, hint)
            }
            Ordering::Equal if !MULTI => Ok(Slot::Occupied(hint)),
            Ordering::Equal => self.between(self.prev(hint), hint),
            Ordering::Greater if !MULTI => Ok(self.insert_search(key)),
            Ordering::Greater => {
                let next = self.upper_bound(key);
                self.between(self.prev(next), next)
            }
        }
    }

    /// The free link between in-order neighbours `prev` and `next`.
    fn between(&self, prev: S::Handle, next: S::Handle) -> Result<Slot<S::Handle>> {
        let nil = self.nil();
        if next != nil && self.store.left(next) == nil {
            return Ok(Slot::Vacant(next, Side::Left));
        }
        if prev != nil && self.store.right(prev) == nil {
            return Ok(Slot::Vacant(prev, Side::Right));
        }
        Err(Error::Corrupted("adjacent nodes have no free link"))
    }

    /// Inserts at the slot a search returned. Returns the node holding the
    /// key and whether it is new.
    pub(crate) fn insert_at(
        &mut self,
        slot: Slot<S::Handle>,
        key: K,
        value: V,
    ) -> Result<(S::Handle, bool)> {
        let (parent, side) = match slot {
            Slot::Occupied(node) => return Ok((node, false)),
            Slot::Vacant(parent, side) => (parent, side),
        };
        let node = self.store.new_node(key, value)?;
        let weight = self.weight_of(node);
        if let Err(e) = self.check_path(parent, &weight, weight::add) {
            log::debug!("insert rejected: {e}");
            self.store.free_node(node);
            return Err(e);
        }
        self.insert_helper(parent, node, side, &weight)?;
        Ok((node, true))
    }

    pub(crate) fn insert(&mut self, key: K, value: V) -> Result<(S::Handle, bool)>
    where
        C: Compare<K>,
    {
        let slot = self.insert_search(&key);
        self.insert_at(slot, key, value)
    }

    pub(crate) fn insert_hint(
        &mut self,
        hint: S::Handle,
        key: K,
        value: V,
    ) -> Result<(S::Handle, bool)>
    where
        C: Compare<K>,
    {
        let slot = self.insert_search_hint(hint, &key)?;
        self.insert_at(slot, key, value)
    }

    /// Links `node` below `parent`, adds its weight to every ancestor and
    /// rebalances. The caller checked that the additions fit.
    fn insert_helper(
        &mut self,
        parent: S::Handle,
        node: S::Handle,
        side: Side,
        weight: &[S::Weight],
    ) -> Result<()> {
        let nil = self.nil();
        self.store.set_parent(node, parent);
        self.store.set_left(node, nil);
        self.store.set_right(node, nil);
        self.store.set_color(node, Color::Red);
        match side {
            Side::Left => self.store.set_left(parent, node),
            Side::Right => self.store.set_right(parent, node),
        }
        self.store.sum_mut(node).copy_from_slice(weight);
        self.apply_path(parent, weight, weight::add)?;
        self.len += 1;
        self.insert_fixup(node)
    }

    fn insert_fixup(&mut self, mut node: S::Handle) -> Result<()> {
        let root = self.store.root();
        let mut parent = self.store.parent(node);
        loop {
            /*
             * Loop invariant: node is red.
             */
            if parent == root {
                /*
                 * node is the real root: either the first node, or we
                 * recolored our way up in Case 1.
                 */
                self.store.set_color(node, Color::Black);
                return Ok(());
            }
            if self.store.is_black(parent) {
                return Ok(());
            }
            let gparent = self.store.parent(parent);
            if gparent == root {
                self.store.set_color(parent, Color::Black);
                return Ok(());
            }
            let uncle = self.sibling(parent);
            if self.store.is_red(uncle) {
                /*
                 * Case 1 - node's uncle is red (color flips).
                 *
                 *       G            g
                 *      / \          / \
                 *     p   u  -->   P   U
                 *    /            /
                 *   n            n
                 *
                 * g's parent may be red too, so continue at g.
                 */
                self.store.set_color(uncle, Color::Black);
                self.store.set_color(parent, Color::Black);
                self.store.set_color(gparent, Color::Red);
                node = gparent;
                parent = self.store.parent(node);
                continue;
            }
            if self.side_of(node) != self.side_of(parent) {
                /*
                 * Case 2 - node's uncle is black and node sits on the inner
                 * side (rotate at parent).
                 *
                 *      G             G
                 *     / \           / \
                 *    p   U  -->    n   U
                 *     \           /
                 *      n         p
                 */
                self.rotate_parent(node)?;
                std::mem::swap(&mut node, &mut parent);
            }
            /*
             * Case 3 - node's uncle is black and node sits on the outer side
             * (rotate at gparent).
             *
             *        G           P
             *       / \         / \
             *      p   U  -->  n   g
             *     /                 \
             *    n                   U
             */
            self.store.set_color(parent, Color::Black);
            self.store.set_color(gparent, Color::Red);
            return self.rotate_parent(parent);
        }
    }

    /// Removes `node` and returns its in-order successor with the entry.
    ///
    /// A node with two children gives up its place to its successor, which
    /// is unlinked from the bottom of the tree instead. The successor keeps
    /// its handle.
    pub(crate) fn erase(&mut self, node: S::Handle) -> Result<(S::Handle, (K, V))> {
        let nil = self.nil();
        let next = self.next(node);
        let removed = if self.store.left(node) != nil && self.store.right(node) != nil {
            next
        } else {
            node
        };
        let mut child = self.store.left(removed);
        if child == nil {
            child = self.store.right(removed);
        }
        let parent = self.store.parent(removed);

        let weight = self.weight_of(removed);
        if let Err(e) = self.check_path(parent, &weight, weight::sub) {
            log::debug!("erase rejected: {e}");
            return Err(e);
        }

        self.store.set_parent(child, parent);
        self.replace_child(parent, removed, child);
        self.apply_path(parent, &weight, weight::sub)?;

        if self.store.is_black(removed) {
            if child != nil {
                // The only child of a black node is red.
                self.store.set_color(child, Color::Black);
            } else {
                self.erase_fixup(child, parent)?;
            }
        }
        if removed != node {
            self.splice(removed, node)?;
        }
        self.len -= 1;
        let entry = self.store.free_node(node);
        Ok((next, entry))
    }

    /// Puts `x` where `node` is, taking over its links and color.
    fn splice(&mut self, x: S::Handle, node: S::Handle) -> Result<()> {
        let nil = self.nil();
        let (left, right, parent) = (
            self.store.left(node),
            self.store.right(node),
            self.store.parent(node),
        );
        self.store.set_left(x, left);
        self.store.set_right(x, right);
        self.store.set_parent(x, parent);
        self.store.set_color(x, self.store.color(node));
        if self.store.left(parent) == node {
            self.store.set_left(parent, x);
        } else if self.store.right(parent) == node {
            self.store.set_right(parent, x);
        } else {
            return Err(Error::Corrupted("parent does not link its child"));
        }
        if left != nil {
            self.store.set_parent(left, x);
        }
        if right != nil {
            self.store.set_parent(right, x);
        }
        // Every sum from x up still counts node's weight instead of x's.
        self.update_sum_r(x)
    }

    /// Restores the black height after a black leaf left the spot below
    /// `parent` that `node` (nil) now takes.
    fn erase_fixup(&mut self, mut node: S::Handle, mut parent: S::Handle) -> Result<()> {
        let (root, nil) = (self.store.root(), self.nil());
        if parent == root {
            // The last node is gone.
            return Ok(());
        }
        loop {
            let mut sibling = self.store.left(parent);
            if sibling == nil || sibling == node {
                sibling = self.store.right(parent);
            }
            if sibling == nil || sibling == node {
                return Err(Error::Corrupted("black node has no sibling"));
            }
            if self.store.is_red(sibling) {
                /*
                 * Case 1 - sibling is red (rotate at parent).
                 *
                 *     P               S
                 *    / \             / \
                 *   N   s    -->    p   Sr
                 *      / \         / \
                 *     Sl  Sr      N   Sl
                 */
                self.store.set_color(parent, Color::Red);
                self.store.set_color(sibling, Color::Black);
                self.rotate_parent(sibling)?;
                continue;
            }
            let (near, far) = if self.store.right(parent) == sibling {
                (self.store.left(sibling), self.store.right(sibling))
            } else {
                (self.store.right(sibling), self.store.left(sibling))
            };
            if self.store.is_black(near) && self.store.is_black(far) {
                /*
                 * Case 2 - sibling color flip, p absorbs the extra black if
                 * it is red, otherwise the deficit moves up.
                 *
                 *    (p)           (p)
                 *    / \           / \
                 *   N   S    -->  N   s
                 *      / \           / \
                 *     Sl  Sr        Sl  Sr
                 */
                self.store.set_color(sibling, Color::Red);
                if self.store.is_red(parent) {
                    self.store.set_color(parent, Color::Black);
                    return Ok(());
                }
                node = parent;
                parent = self.store.parent(node);
                if parent == root {
                    return Ok(());
                }
                continue;
            }
            if self.store.is_black(far) {
                /*
                 * Case 3 - near nephew is red (rotate at sibling).
                 *
                 *   (p)           (p)
                 *   / \           / \
                 *  N   S    -->  N   sl
                 *     / \             \
                 *    sl  Sr            S
                 *                       \
                 *                        Sr
                 */
                self.store.set_color(sibling, Color::Red);
                self.store.set_color(near, Color::Black);
                self.rotate_parent(near)?;
                continue;
            }
            /*
             * Case 4 - far nephew is red (rotate at parent + color flips).
             *
             *      (p)             (s)
             *      / \             / \
             *     N   S     -->   P   Sr
             *        / \         / \
             *      (sl) sr      N  (sl)
             */
            self.store.set_color(sibling, self.store.color(parent));
            self.store.set_color(parent, Color::Black);
            self.store.set_color(far, Color::Black);
            return self.rotate_parent(sibling);
        }
    }

    /// Replaces the value of `node` and recomputes the sums above it. On
    /// error the old value is kept.
    pub(crate) fn update_value(&mut self, node: S::Handle, value: V) -> Result<V> {
        let old = self.store.replace_value(node, value);
        match self.update_sum_r(node) {
            Ok(()) => Ok(old),
            Err(e) => {
                log::debug!("value update rejected: {e}");
                self.store.replace_value(node, old);
                Err(e)
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.store.clear_tree();
        self.len = 0;
        log::trace!("tree cleared");
    }

    /// Empties the tree, handing back the entries in order.
    pub(crate) fn drain_sorted(&mut self) -> Vec<(K, V)> {
        let nil = self.nil();
        let mut handles = Vec::with_capacity(self.len);
        let mut node = self.first();
        while node != nil {
            handles.push(node);
            node = self.next(node);
        }
        let root = self.store.root();
        self.store.set_right(root, nil);
        let entries = handles
            .into_iter()
            .map(|node| self.store.free_node(node))
            .collect();
        self.clear();
        entries
    }
}
