#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]

//! An ordered in-memory map backed by a red-black tree that is rebalanced
//! top-down: 4-nodes are split on the way down during insertion and red
//! links are pushed down ahead of the removed node during deletion.

pub mod comparator;
pub mod red_black_tree;
#[cfg(any(test, debug_assertions, feature = "rules_check"))]
pub mod rules;

pub use comparator::{Comparator, Less};
pub use red_black_tree::RedBlackTree;
#[cfg(any(test, debug_assertions, feature = "rules_check"))]
pub use rules::RuleViolation;
