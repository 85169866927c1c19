use std::cmp::Ordering;

use compare::Compare;

use super::Root;
use crate::{
    Error, Result,
    node::NodeStore,
    weight::{self, Weight, WeightFn},
};

fn invalid(what: &'static str) -> Error {
    log::debug!("check_tree failed: {what}");
    Error::InvalidTree(what)
}

impl<K, V, F, S, C, const MULTI: bool> Root<K, V, F, S, C, MULTI>
where
    S: NodeStore<K, V>,
    F: WeightFn<K, V, Output = S::Weight>,
    C: Compare<K>,
{
    /// Validates links, ordering, coloring and, when `epsilon >= 0`, every
    /// cached sum. Integral sums must match exactly, floating point ones
    /// within `epsilon`.
    pub(crate) fn check_tree(&self, epsilon: f64) -> Result<()> {
        let (root, nil) = (self.store.root(), self.nil());
        if self.store.is_red(nil) {
            return Err(invalid("nil sentinel is red"));
        }
        if self.store.is_red(root) || self.store.left(root) != nil {
            return Err(invalid("root sentinel was modified"));
        }
        let top = self.top();
        if top == nil {
            return if self.len() == 0 {
                Ok(())
            } else {
                Err(invalid("empty tree reports elements"))
            };
        }
        if self.store.parent(top) != root {
            return Err(invalid("root does not link back to the root sentinel"));
        }
        if self.store.is_red(top) {
            return Err(invalid("root is red"));
        }

        let mut count = 0;
        self.check_node(top, epsilon, &mut count)?;
        if count != self.len() {
            return Err(invalid("element count does not match the tree"));
        }

        let mut prev = self.first();
        let mut node = self.next(prev);
        while node != nil {
            match self.cmp.compare(self.store.key(prev), self.store.key(node)) {
                Ordering::Greater => return Err(invalid("keys out of order")),
                Ordering::Equal if !MULTI => return Err(invalid("duplicate key")),
                _ => {}
            }
            prev = node;
            node = self.next(node);
        }
        Ok(())
    }

    /// Returns the black height of the subtree at `node`, nil counting as one.
    fn check_node(&self, node: S::Handle, epsilon: f64, count: &mut usize) -> Result<usize> {
        let (nil, invalid_handle) = (self.nil(), self.store.invalid());
        *count += 1;
        if *count > self.len() {
            return Err(invalid("more nodes than elements, is there a cycle?"));
        }
        let red = self.store.is_red(node);
        let mut heights = [1, 1];
        for (height, child) in heights
            .iter_mut()
            .zip([self.store.left(node), self.store.right(node)])
        {
            if child == invalid_handle {
                return Err(invalid("link to an invalid handle"));
            }
            if child == nil {
                continue;
            }
            if self.store.parent(child) != node {
                return Err(invalid("child does not link back to its parent"));
            }
            if red && self.store.is_red(child) {
                return Err(invalid("red node has a red child"));
            }
            *height = self.check_node(child, epsilon, count)?;
        }
        if heights[0] != heights[1] {
            return Err(invalid("black heights differ"));
        }

        if epsilon >= 0.0 {
            let mut expected = self.weight_of(node);
            for child in [self.store.left(node), self.store.right(node)] {
                if child != nil {
                    weight::add_assign(&mut expected, self.store.sum(child))
                        .map_err(|_| invalid("sum is out of range"))?;
                }
            }
            let matches = expected
                .iter()
                .zip(self.store.sum(node))
                .all(|(e, s)| e.approx_eq(*s, epsilon));
            if !matches {
                return Err(invalid("cached sum does not match"));
            }
        }

        Ok(heights[0] + usize::from(!red))
    }
}
