//! Error types for the B-tree.
//!
//! `BTreeError` is the only error a caller sees during normal use: it is
//! returned when a tree is constructed with an order that cannot keep nodes
//! balanced. Lookups and removals of absent keys are not errors.
//!
//! `InvariantViolation` is produced only by `BTree::validate` and describes a
//! structural defect in the tree.

use thiserror::Error;

/// Result type for B-tree construction.
pub type BTreeResult<T> = Result<T, BTreeError>;

/// Errors that can occur when building a B-tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BTreeError {
    /// The order is too small to split a full node into two valid halves.
    #[error("invalid order {order}: a b-tree order must be at least {min}")]
    InvalidOrder {
        /// The rejected order.
        order: usize,
        /// Smallest accepted order.
        min: usize,
    },
}

/// A broken structural invariant found while validating a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// A node holds more than `max_keys` keys.
    #[error("node at depth {depth} holds {keys} keys (max: {max})")]
    Overfull { depth: usize, keys: usize, max: usize },

    /// A non-root node holds fewer than `min_keys` keys.
    #[error("node at depth {depth} holds {keys} keys (min: {min})")]
    Underfull { depth: usize, keys: usize, min: usize },

    /// An internal node whose child count is not its key count plus one.
    #[error("node at depth {depth} has {keys} keys but {children} children")]
    ChildCount {
        depth: usize,
        keys: usize,
        children: usize,
    },

    /// Leaves were found at different depths.
    #[error("leaf found at depth {found}, expected {expected}")]
    UnevenLeafDepth { expected: usize, found: usize },

    /// The in-order walk produced a key that is not strictly greater than the
    /// one before it.
    #[error("keys out of order at in-order position {position}")]
    KeysOutOfOrder { position: usize },

    /// A node's value count does not match its key count.
    #[error("node at depth {depth} has {keys} keys but {values} values")]
    ValueCount {
        depth: usize,
        keys: usize,
        values: usize,
    },

    /// The tracked key count differs from the number of reachable keys.
    #[error("tree tracks {tracked} keys but {reachable} are reachable")]
    KeyCountMismatch { tracked: usize, reachable: usize },
}
