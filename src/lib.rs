//! An ordered set of keys implemented with an AVL tree.
//!
//! The tree keeps itself height balanced after every insertion and removal,
//! so lookup, insertion and removal are O(log n) in the worst case.
//! Duplicate keys are not stored: inserting a key that is already present
//! leaves the set unchanged.
//!
//! ```
//! use avl_set::AvlTreeSet;
//!
//! let mut set = AvlTreeSet::new();
//! set.insert(2);
//! set.insert(0);
//! set.insert(1);
//! assert!(set.contains(&1));
//! set.remove(&1);
//! assert!(!set.contains(&1));
//! assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![0, 2]);
//! ```

mod tree;

pub use tree::{AvlTreeSet, Iter};
