use std::borrow::Borrow;
use std::mem;

use super::order::Order;
use crate::error::InvariantViolation;

// A node holds keys in strictly increasing order, a value per key, and either no
// children (leaf) or exactly keys.len() + 1 children (internal). Every key in
// children[i] is greater than keys[i - 1] and less than keys[i].
//
// Nodes never see their parent. A child that overflows or underflows is left as is
// and the parent repairs it once the recursive call returns; the tree repairs the root.

#[derive(Debug, Clone)]
pub(super) struct Node<K, V> {
    pub(super) keys: Vec<K>,
    pub(super) values: Vec<V>,
    pub(super) children: Vec<Node<K, V>>,
}

impl<K, V> Node<K, V> {
    /// Creates an empty leaf node
    pub(super) fn new() -> Self {
        Node {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates an internal node with a single key separating `left` and `right`
    pub(super) fn with_separator(key: K, value: V, left: Node<K, V>, right: Node<K, V>) -> Self {
        Node {
            keys: vec![key],
            values: vec![value],
            children: vec![left, right],
        }
    }

    pub(super) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(super) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(super) fn is_too_large(&self, order: Order) -> bool {
        self.len() > order.max_keys()
    }

    pub(super) fn is_too_small(&self, order: Order) -> bool {
        self.len() < order.min_keys()
    }

    /// Visits every key of the subtree in ascending order
    pub(super) fn traverse_keys_in_order<F: FnMut(&K)>(&self, visit: &mut F) {
        for (i, key) in self.keys.iter().enumerate() {
            if let Some(child) = self.children.get(i) {
                child.traverse_keys_in_order(visit);
            }
            visit(key);
        }
        // Traverse last child if not leaf
        if let Some(last) = self.children.get(self.len()) {
            last.traverse_keys_in_order(visit);
        }
    }

    /// Takes the rightmost half of an overfull node out into a new sibling
    ///
    /// The node is cut at `len / 2` (the left-of-center key for even counts). The key and
    /// value at that index are returned for the parent, the node keeps everything before
    /// it, and the returned sibling receives everything after it.
    pub(super) fn split(&mut self) -> (K, V, Node<K, V>) {
        debug_assert!(self.len() >= 2, "split called on a node with fewer than 2 keys");
        let mid = self.len() / 2;

        // Right half starts at mid, whose first entry moves up
        let mut right_keys = self.keys.split_off(mid);
        let mut right_values = self.values.split_off(mid);
        let middle_key = right_keys.remove(0);
        let middle_value = right_values.remove(0);

        let right_children = if self.is_leaf() {
            Vec::new()
        } else {
            self.children.split_off(mid + 1)
        };

        let sibling = Node {
            keys: right_keys,
            values: right_values,
            children: right_children,
        };
        (middle_key, middle_value, sibling)
    }

    /// Splits the overfull child at `child_idx` and adopts its middle key
    fn split_child(&mut self, child_idx: usize) {
        let (key, value, sibling) = self.children[child_idx].split();

        self.keys.insert(child_idx, key);
        self.values.insert(child_idx, value);
        // New sibling goes directly to the right of the child it came from
        self.children.insert(child_idx + 1, sibling);
    }

    /// Removes the largest entry of the subtree, rebalancing on the way back up
    fn pop_last(&mut self, order: Order) -> Option<(K, V)> {
        if self.is_leaf() {
            let key = self.keys.pop()?;
            let value = self.values.pop()?;
            return Some((key, value));
        }

        let last_idx = self.children.len() - 1;
        let last = self.children[last_idx].pop_last(order)?;
        if self.children[last_idx].is_too_small(order) {
            self.fix(last_idx, order);
        }
        Some(last)
    }

    /// Restores the minimum occupancy of the child at `child_idx`
    ///
    /// Tries, in order: borrowing from the left sibling, borrowing from the right sibling,
    /// merging into the left sibling, merging with the right sibling. Exactly one fires.
    /// A merge takes a key from this node, which may leave it underfull in turn.
    fn fix(&mut self, child_idx: usize, order: Order) {
        let min_keys = order.min_keys();
        let has_left = child_idx > 0;
        let has_right = child_idx + 1 < self.children.len();

        if has_left && self.children[child_idx - 1].len() > min_keys {
            self.borrow_from_left(child_idx);
        } else if has_right && self.children[child_idx + 1].len() > min_keys {
            self.borrow_from_right(child_idx);
        } else if has_left {
            self.merge(child_idx - 1);
        } else {
            self.merge(child_idx);
        }
    }

    /// Rotates the left sibling's last entry through the separator into the child
    ///
    /// Takes a child_idx that represents the underfull (right) child's index
    fn borrow_from_left(&mut self, child_idx: usize) {
        let [left, child] = &mut self.children[child_idx - 1..=child_idx] else {
            return;
        };
        let (Some(key), Some(value)) = (left.keys.pop(), left.values.pop()) else {
            return;
        };

        // The left sibling's last entry replaces the separator, which moves down
        let separator_key = mem::replace(&mut self.keys[child_idx - 1], key);
        let separator_value = mem::replace(&mut self.values[child_idx - 1], value);
        child.keys.insert(0, separator_key);
        child.values.insert(0, separator_value);

        if let Some(grandchild) = left.children.pop() {
            child.children.insert(0, grandchild);
        }
    }

    /// Rotates the right sibling's first entry through the separator into the child
    ///
    /// Takes a child_idx that represents the underfull (left) child's index
    fn borrow_from_right(&mut self, child_idx: usize) {
        let [child, right] = &mut self.children[child_idx..=child_idx + 1] else {
            return;
        };
        let (Some(key), Some(value)) = (
            (!right.keys.is_empty()).then(|| right.keys.remove(0)),
            (!right.values.is_empty()).then(|| right.values.remove(0)),
        ) else {
            return;
        };

        let separator_key = mem::replace(&mut self.keys[child_idx], key);
        let separator_value = mem::replace(&mut self.values[child_idx], value);
        child.keys.push(separator_key);
        child.values.push(separator_value);

        if !right.is_leaf() {
            child.children.push(right.children.remove(0));
        }
    }

    /// Merges the child at `left_idx + 1` and their separator into the child at `left_idx`
    fn merge(&mut self, left_idx: usize) {
        debug_assert!(
            left_idx + 1 < self.children.len(),
            "merge called without a right sibling"
        );
        if left_idx + 1 >= self.children.len() {
            return;
        }

        let separator_key = self.keys.remove(left_idx);
        let separator_value = self.values.remove(left_idx);
        let Node {
            keys,
            values,
            children,
        } = self.children.remove(left_idx + 1);

        let left = &mut self.children[left_idx];
        left.keys.push(separator_key);
        left.keys.extend(keys);
        left.values.push(separator_value);
        left.values.extend(values);
        left.children.extend(children);
    }
}

impl<K: Ord, V> Node<K, V> {
    /// Searches for key in this node's keys
    ///
    /// Returns Ok with the key's index if present, otherwise Err with the index of the
    /// smallest key greater than it, which is also the index of the child to descend into.
    fn search<Q>(&self, key: &Q) -> Result<usize, usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.keys.binary_search_by(|probe| probe.borrow().cmp(key))
    }

    pub(super) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self;
        loop {
            match node.search(key) {
                Ok(idx) => return node.values.get(idx),
                // A leaf has no children, so this ends the search there
                Err(idx) => node = node.children.get(idx)?,
            }
        }
    }

    pub(super) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = self;
        loop {
            match node.search(key) {
                Ok(idx) => return node.values.get_mut(idx),
                Err(idx) => node = node.children.get_mut(idx)?,
            }
        }
    }

    /// Inserts or updates `key`, returning the value it replaced
    ///
    /// New keys always land in a leaf. A child that overflows as a result is split here
    /// after the recursive call returns, so at most one split happens per level.
    pub(super) fn insert(&mut self, key: K, value: V, order: Order) -> Option<V> {
        match self.search(&key) {
            Ok(idx) => Some(mem::replace(&mut self.values[idx], value)),
            Err(idx) if self.is_leaf() => {
                self.keys.insert(idx, key);
                self.values.insert(idx, value);
                None
            }
            Err(idx) => {
                let displaced = self.children[idx].insert(key, value, order);
                if self.children[idx].is_too_large(order) {
                    self.split_child(idx);
                }
                displaced
            }
        }
    }

    /// Removes `key` from the subtree, returning its value
    ///
    /// A key found in an internal node is replaced by its in-order predecessor, which is
    /// then removed from the left child. A missing key leaves the subtree untouched.
    pub(super) fn remove<Q>(&mut self, key: &Q, order: Order) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (child_idx, removed) = match self.search(key) {
            Ok(idx) if self.is_leaf() => {
                self.keys.remove(idx);
                return Some(self.values.remove(idx));
            }
            Ok(idx) => {
                let (pred_key, pred_value) = self.children[idx].pop_last(order)?;
                self.keys[idx] = pred_key;
                (idx, mem::replace(&mut self.values[idx], pred_value))
            }
            Err(idx) => {
                let child = self.children.get_mut(idx)?;
                (idx, child.remove(key, order)?)
            }
        };

        if self.children[child_idx].is_too_small(order) {
            self.fix(child_idx, order);
        }
        Some(removed)
    }

    /// Checks occupancy, child counts and leaf depth for the subtree
    ///
    /// Returns the number of keys in the subtree.
    pub(super) fn validate(
        &self,
        order: Order,
        depth: usize,
        is_root: bool,
        leaf_depth: &mut Option<usize>,
    ) -> Result<usize, InvariantViolation> {
        if self.values.len() != self.len() {
            return Err(InvariantViolation::ValueCount {
                depth,
                keys: self.len(),
                values: self.values.len(),
            });
        }
        if self.is_too_large(order) {
            return Err(InvariantViolation::Overfull {
                depth,
                keys: self.len(),
                max: order.max_keys(),
            });
        }
        if !is_root && self.is_too_small(order) {
            return Err(InvariantViolation::Underfull {
                depth,
                keys: self.len(),
                min: order.min_keys(),
            });
        }

        if self.is_leaf() {
            return match *leaf_depth {
                Some(expected) if expected != depth => Err(InvariantViolation::UnevenLeafDepth {
                    expected,
                    found: depth,
                }),
                _ => {
                    *leaf_depth = Some(depth);
                    Ok(self.len())
                }
            };
        }

        if self.children.len() != self.len() + 1 {
            return Err(InvariantViolation::ChildCount {
                depth,
                keys: self.len(),
                children: self.children.len(),
            });
        }

        let mut count = self.len();
        for child in &self.children {
            count += child.validate(order, depth + 1, false, leaf_depth)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(keys: &[i32]) -> Node<i32, i32> {
        Node {
            keys: keys.to_vec(),
            values: keys.iter().map(|k| k * 10).collect(),
            children: Vec::new(),
        }
    }

    fn internal(keys: &[i32], children: Vec<Node<i32, i32>>) -> Node<i32, i32> {
        Node {
            keys: keys.to_vec(),
            values: keys.iter().map(|k| k * 10).collect(),
            children,
        }
    }

    fn order(m: usize) -> Order {
        Order::new(m).unwrap()
    }

    #[test]
    fn test_leaf_and_internal() {
        let root = internal(&[5], vec![leaf(&[1]), leaf(&[9])]);
        assert!(!root.is_leaf());
        assert!(root.children.iter().all(Node::is_leaf));
        assert_eq!(root.len(), 1);
        assert_eq!(root.children.len(), 2);
        assert!(Node::<i32, i32>::new().is_leaf());
    }

    #[test]
    fn test_get_descends_into_children() {
        let root = internal(&[5, 10], vec![leaf(&[1, 2]), leaf(&[7]), leaf(&[12, 15])]);
        assert_eq!(root.get(&5), Some(&50));
        assert_eq!(root.get(&7), Some(&70));
        assert_eq!(root.get(&15), Some(&150));
        assert_eq!(root.get(&0), None);
        assert_eq!(root.get(&8), None);
        assert_eq!(root.get(&20), None);
    }

    #[test]
    fn test_get_on_empty_leaf() {
        let node: Node<i32, i32> = Node::new();
        assert_eq!(node.get(&1), None);
    }

    #[test]
    fn test_split_odd_leaf() {
        let mut node = leaf(&[1, 2, 3]);
        let (key, value, right) = node.split();
        assert_eq!((key, value), (2, 20));
        assert_eq!(node.keys, vec![1]);
        assert_eq!(right.keys, vec![3]);
        assert_eq!(right.values, vec![30]);
    }

    #[test]
    fn test_split_even_leaf_promotes_left_of_center() {
        // mid = 4 / 2 = 2, so keys[2] goes up
        let mut node = leaf(&[1, 2, 3, 4]);
        let (key, _, right) = node.split();
        assert_eq!(key, 3);
        assert_eq!(node.keys, vec![1, 2]);
        assert_eq!(right.keys, vec![4]);
    }

    #[test]
    fn test_split_internal_moves_trailing_children() {
        let mut node = internal(
            &[10, 20, 30],
            vec![leaf(&[5]), leaf(&[15]), leaf(&[25]), leaf(&[35])],
        );
        let (key, _, right) = node.split();
        assert_eq!(key, 20);
        assert_eq!(node.keys, vec![10]);
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[1].keys, vec![15]);
        assert_eq!(right.keys, vec![30]);
        assert_eq!(right.children.len(), 2);
        assert_eq!(right.children[0].keys, vec![25]);
    }

    #[test]
    fn test_insert_splits_overfull_child() {
        let order = order(3);
        let mut root = internal(&[10], vec![leaf(&[1, 5]), leaf(&[15])]);
        assert_eq!(root.insert(3, 30, order), None);

        assert_eq!(root.keys, vec![3, 10]);
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[0].keys, vec![1]);
        assert_eq!(root.children[1].keys, vec![5]);
        assert_eq!(root.children[2].keys, vec![15]);
    }

    #[test]
    fn test_insert_existing_key_updates_in_place() {
        let order = order(3);
        let mut root = internal(&[10], vec![leaf(&[1, 5]), leaf(&[15])]);
        assert_eq!(root.insert(10, 7, order), Some(100));
        assert_eq!(root.insert(5, 8, order), Some(50));
        assert_eq!(root.get(&10), Some(&7));
        assert_eq!(root.get(&5), Some(&8));
        assert_eq!(root.children[0].keys, vec![1, 5]);
    }

    #[test]
    fn test_remove_borrows_from_left() {
        let order = order(3);
        let mut root = internal(&[10], vec![leaf(&[1, 5]), leaf(&[15])]);
        assert_eq!(root.remove(&15, order), Some(150));

        assert_eq!(root.keys, vec![5]);
        assert_eq!(root.children[0].keys, vec![1]);
        assert_eq!(root.children[1].keys, vec![10]);
        assert_eq!(root.children[1].values, vec![100]);
    }

    #[test]
    fn test_remove_borrows_from_right() {
        let order = order(3);
        let mut root = internal(&[10], vec![leaf(&[1]), leaf(&[15, 20])]);
        assert_eq!(root.remove(&1, order), Some(10));

        assert_eq!(root.keys, vec![15]);
        assert_eq!(root.children[0].keys, vec![10]);
        assert_eq!(root.children[1].keys, vec![20]);
    }

    #[test]
    fn test_remove_merges_into_left() {
        let order = order(3);
        let mut root = internal(&[10, 20], vec![leaf(&[5]), leaf(&[15]), leaf(&[25])]);
        assert_eq!(root.remove(&25, order), Some(250));

        assert_eq!(root.keys, vec![10]);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].keys, vec![15, 20]);
        assert_eq!(root.children[1].values, vec![150, 200]);
    }

    #[test]
    fn test_remove_merges_with_right() {
        let order = order(3);
        let mut root = internal(&[10, 20], vec![leaf(&[5]), leaf(&[15]), leaf(&[25])]);
        assert_eq!(root.remove(&5, order), Some(50));

        assert_eq!(root.keys, vec![20]);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].keys, vec![10, 15]);
        assert_eq!(root.children[1].keys, vec![25]);
    }

    #[test]
    fn test_middle_child_prefers_borrow_from_left() {
        let order = order(3);
        let mut root = internal(
            &[10, 20],
            vec![leaf(&[1, 5]), leaf(&[15]), leaf(&[25, 27])],
        );
        assert_eq!(root.remove(&15, order), Some(150));

        assert_eq!(root.keys, vec![5, 20]);
        assert_eq!(root.values, vec![50, 200]);
        assert_eq!(root.children[0].keys, vec![1]);
        assert_eq!(root.children[1].keys, vec![10]);
        assert_eq!(root.children[2].keys, vec![25, 27]);
    }

    #[test]
    fn test_middle_child_prefers_merge_into_left() {
        let order = order(3);
        let mut root = internal(&[10, 20], vec![leaf(&[5]), leaf(&[15]), leaf(&[25])]);
        assert_eq!(root.remove(&15, order), Some(150));

        assert_eq!(root.keys, vec![20]);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].keys, vec![5, 10]);
        assert_eq!(root.children[0].values, vec![50, 100]);
        assert_eq!(root.children[1].keys, vec![25]);
    }

    #[test]
    fn test_is_empty() {
        assert!(Node::<i32, i32>::new().is_empty());
        assert!(!leaf(&[1]).is_empty());
    }

    #[test]
    fn test_remove_internal_key_uses_predecessor() {
        let order = order(3);
        let mut root = internal(&[10], vec![leaf(&[1, 5]), leaf(&[15])]);
        assert_eq!(root.remove(&10, order), Some(100));

        assert_eq!(root.keys, vec![5]);
        assert_eq!(root.values, vec![50]);
        assert_eq!(root.children[0].keys, vec![1]);
        assert_eq!(root.children[1].keys, vec![15]);
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let order = order(3);
        let mut root = internal(&[10], vec![leaf(&[1, 5]), leaf(&[15])]);
        assert_eq!(root.remove(&7, order), None);
        assert_eq!(root.remove(&100, order), None);

        assert_eq!(root.keys, vec![10]);
        assert_eq!(root.children[0].keys, vec![1, 5]);
        assert_eq!(root.children[1].keys, vec![15]);
    }

    #[test]
    fn test_borrow_from_left_moves_grandchild() {
        let order = order(3);
        // Right subtree is one removal away from underflow; left subtree has a spare key
        let left = internal(&[3, 6], vec![leaf(&[1]), leaf(&[4]), leaf(&[7])]);
        let right = internal(&[15], vec![leaf(&[12]), leaf(&[18])]);
        let mut root = internal(&[10], vec![left, right]);

        assert_eq!(root.remove(&18, order), Some(180));

        assert_eq!(root.keys, vec![6]);
        assert_eq!(root.children[0].keys, vec![3]);
        assert_eq!(root.children[1].keys, vec![10]);
        assert_eq!(root.children[1].children[0].keys, vec![7]);
        assert_eq!(root.children[1].children[1].keys, vec![12, 15]);

        let mut leaf_depth = None;
        assert_eq!(root.validate(order, 0, true, &mut leaf_depth), Ok(8));
    }

    #[test]
    fn test_merge_can_leave_parent_underfull() {
        let order = order(3);
        let left = internal(&[3], vec![leaf(&[1]), leaf(&[4])]);
        let right = internal(&[15], vec![leaf(&[12]), leaf(&[18])]);
        let mut root = internal(&[10], vec![left, right]);

        assert_eq!(root.remove(&1, order), Some(10));

        // Both levels merged; the caller is left to collapse the empty root
        assert!(root.keys.is_empty());
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].keys, vec![10, 15]);
        assert_eq!(root.children[0].children[0].keys, vec![3, 4]);
    }

    #[test]
    fn test_traverse_keys_in_order() {
        let root = internal(&[5, 10], vec![leaf(&[1, 2]), leaf(&[7]), leaf(&[12, 15])]);
        let mut keys = Vec::new();
        root.traverse_keys_in_order(&mut |k| keys.push(*k));
        assert_eq!(keys, vec![1, 2, 5, 7, 10, 12, 15]);
    }

    #[test]
    fn test_validate_detects_violations() {
        let order = order(3);

        let overfull = leaf(&[1, 2, 3]);
        assert!(matches!(
            overfull.validate(order, 0, true, &mut None),
            Err(InvariantViolation::Overfull { .. })
        ));

        let underfull = internal(&[5], vec![leaf(&[]), leaf(&[7])]);
        assert!(matches!(
            underfull.validate(order, 0, true, &mut None),
            Err(InvariantViolation::Underfull { depth: 1, .. })
        ));

        let missing_child = internal(&[5, 9], vec![leaf(&[1]), leaf(&[7])]);
        assert!(matches!(
            missing_child.validate(order, 0, true, &mut None),
            Err(InvariantViolation::ChildCount { .. })
        ));

        let uneven = internal(
            &[5],
            vec![leaf(&[1]), internal(&[8], vec![leaf(&[7]), leaf(&[9])])],
        );
        assert!(matches!(
            uneven.validate(order, 0, true, &mut None),
            Err(InvariantViolation::UnevenLeafDepth { .. })
        ));
    }
}
