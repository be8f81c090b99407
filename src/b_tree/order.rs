use crate::error::{BTreeError, BTreeResult};

// A B-tree with order m has a max of m children and thus a max of m-1 keys.
// Every non-root node keeps at least ceiling(m/2) children, computed as (m+1)/2,
// and therefore at least ceiling(m/2)-1 keys. The root may hold 0..=m-1 keys.

/// The Knuth order of a B-tree: the maximum number of children of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Order(usize);

impl Order {
    /// Smallest order whose nodes can be split into two valid halves.
    pub const MIN: usize = 3;

    /// Validates `m` as a B-tree order.
    ///
    /// Orders below 3 are rejected: a node of order 2 holds one key, and
    /// splitting an overflowing node of two keys leaves a half with no keys.
    pub fn new(m: usize) -> BTreeResult<Self> {
        if m < Self::MIN {
            return Err(BTreeError::InvalidOrder {
                order: m,
                min: Self::MIN,
            });
        }
        Ok(Self(m))
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn max_children(self) -> usize {
        self.0
    }

    pub fn min_children(self) -> usize {
        (self.0 + 1) / 2
    }

    pub fn max_keys(self) -> usize {
        self.max_children() - 1
    }

    pub fn min_keys(self) -> usize {
        self.min_children() - 1
    }
}

impl TryFrom<usize> for Order {
    type Error = BTreeError;

    fn try_from(m: usize) -> BTreeResult<Self> {
        Self::new(m)
    }
}

impl From<Order> for usize {
    fn from(order: Order) -> Self {
        order.0
    }
}
