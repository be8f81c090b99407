// https://en.wikipedia.org/wiki/B-tree
// A B-tree with order m will have a max of m children and thus a max of m-1 keys.

// If K = m-1 is the max num of search keys in a node, we have the following:
// A root node when it is a leaf node: min 0 max K keys, min 0 max 0 children
// A root node when it is an internal node: min 1 max K keys, min 2 max K+1 children
// Any other node: min ceiling(m/2)-1 max K keys, min ceiling(m/2) max m children (if internal)

// NOTE: This uses the Knuth definition of order, which allows for the special case of 2-3 trees

use std::borrow::Borrow;
use std::mem;

use tracing::{debug, trace};

use crate::error::{BTreeResult, InvariantViolation};

mod iter;
mod node;
mod order;

pub use iter::{Iter, Keys, Values};
pub use order::Order;

use node::Node;

/// An ordered map backed by a B-tree of a fixed order.
#[derive(Debug, Clone)]
pub struct BTree<K, V> {
    root: Node<K, V>,
    order: Order,
    len: usize,
}

impl<K, V> BTree<K, V> {
    /// Constructor method for BTree
    ///
    /// Takes in a usize parameter m representing the knuth order of a BTree and fails
    /// with `BTreeError::InvalidOrder` when m is below 3.
    pub fn new(m: usize) -> BTreeResult<Self> {
        Ok(Self::with_order(Order::new(m)?))
    }

    /// Creates an empty tree with an already validated order
    pub fn with_order(order: Order) -> Self {
        debug!(
            order = order.get(),
            max_keys = order.max_keys(),
            min_keys = order.min_keys(),
            "created b-tree"
        );
        BTree {
            root: Node::new(),
            order,
            len: 0,
        }
    }

    pub fn order(&self) -> Order {
        self.order
    }

    /// Number of keys in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of levels, counting the root. An empty tree has height 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let Some(child) = node.children.first() {
            node = child;
            height += 1;
        }
        height
    }

    /// Removes every entry, keeping the order
    pub fn clear(&mut self) {
        self.root = Node::new();
        self.len = 0;
    }

    /// Calls `visit` on every key in ascending order
    pub fn traverse_keys_in_order<F: FnMut(&K)>(&self, mut visit: F) {
        self.root.traverse_keys_in_order(&mut visit);
    }

    /// Returns an ascending iterator over the entries
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root, self.len)
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }
}

impl<K: Ord, V> BTree<K, V> {
    /// Returns the value stored for `key`, if any
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.root.is_empty() {
            return None;
        }
        self.root.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.root.is_empty() {
            return None;
        }
        self.root.get_mut(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Inserts a value for key into the b-tree
    ///
    /// If the key is already present its value is replaced and the old value returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let displaced = self.root.insert(key, value, self.order);
        if displaced.is_none() {
            self.len += 1;
        }

        if self.root.is_too_large(self.order) {
            self.split_root();
        }
        displaced
    }

    /// Splits the overfull root under a new single-key root, growing the tree by a level
    fn split_root(&mut self) {
        let mut old_root = mem::replace(&mut self.root, Node::new());
        let (key, value, sibling) = old_root.split();
        self.root = Node::with_separator(key, value, old_root, sibling);
        trace!(height = self.height(), "split root");
    }

    /// Removes key from the b-tree, returning its value
    ///
    /// Removing a key that is not present does nothing.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.root.is_empty() {
            return None;
        }

        let removed = self.root.remove(key, self.order)?;
        self.len -= 1;

        // Shrink tree if root is empty but has a child
        if self.root.is_empty() {
            if let Some(child) = self.root.children.pop() {
                self.root = child;
                trace!(height = self.height(), "collapsed root");
            }
        }
        Some(removed)
    }

    /// Checks every structural invariant of the tree
    ///
    /// Verifies node occupancy, child counts, uniform leaf depth, strictly ascending
    /// keys and that the tracked length matches the reachable keys.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut leaf_depth = None;
        let reachable = self.root.validate(self.order, 0, true, &mut leaf_depth)?;
        if reachable != self.len {
            return Err(InvariantViolation::KeyCountMismatch {
                tracked: self.len,
                reachable,
            });
        }

        let mut previous: Option<&K> = None;
        for (position, key) in self.keys().enumerate() {
            if previous.is_some_and(|prev| prev >= key) {
                return Err(InvariantViolation::KeysOutOfOrder { position });
            }
            previous = Some(key);
        }
        Ok(())
    }
}

impl<K: Ord, V> Extend<(K, V)> for BTree<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V> IntoIterator for &'a BTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
