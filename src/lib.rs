//! An in-memory ordered map backed by a B-tree of configurable order.
//!
//! ```
//! use ordered_btree::BTree;
//!
//! let mut tree = BTree::new(4)?;
//! for key in [8, 13, 5, 0, 16] {
//!     tree.insert(key, key * 2);
//! }
//! tree.remove(&13);
//!
//! assert_eq!(tree.get(&16), Some(&32));
//! assert_eq!(tree.keys().copied().collect::<Vec<_>>(), vec![0, 5, 8, 16]);
//! # Ok::<(), ordered_btree::BTreeError>(())
//! ```

pub mod b_tree;
pub mod error;

pub use b_tree::{BTree, Iter, Keys, Order, Values};
pub use error::{BTreeError, BTreeResult, InvariantViolation};
