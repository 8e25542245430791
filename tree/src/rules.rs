//! Verification of the red-black rules, used by tests and debug builds.
//!
//! Each check walks the whole tree, so none of this belongs on a hot path.

use core::fmt;

use log::debug;

use crate::comparator::Comparator;
use crate::red_black_tree::{is_red, RawNode, RedBlackTree};

/// The first rule a tree was found to break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleViolation {
    RedRoot,
    RedChildOfRed,
    UnequalBlackHeight { expected: usize, found: usize },
    OutOfOrder,
    LenMismatch { len: usize, nodes: usize },
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RedRoot => f.write_str("root is red"),
            Self::RedChildOfRed => f.write_str("red node has a red child"),
            Self::UnequalBlackHeight { expected, found } => write!(
                f,
                "paths have different black heights: {expected} and {found}"
            ),
            Self::OutOfOrder => f.write_str("keys are not in search tree order"),
            Self::LenMismatch { len, nodes } => {
                write!(f, "tree reports {len} keys but holds {nodes} nodes")
            }
        }
    }
}

impl std::error::Error for RuleViolation {}

impl<K, V, C> RedBlackTree<K, V, C>
where
    C: Comparator<K>,
{
    /// Returns `true` if the tree satisfies all red-black rules.
    pub fn rules_check(&self) -> bool {
        self.check_rules().is_ok()
    }

    /// Checks, in order, that
    /// 1. the root is black,
    /// 2. no red node has a red child,
    /// 3. every path from the root to a missing child has the same number of
    ///    black nodes,
    /// 4. keys are ordered by the comparator,
    /// 5. `len` matches the number of nodes.
    pub fn check_rules(&self) -> Result<(), RuleViolation> {
        let result = self.check_rules_core();
        if let Err(violation) = &result {
            debug!("red-black rules violated: {violation}");
        }
        result
    }

    fn check_rules_core(&self) -> Result<(), RuleViolation> {
        let Some(root) = self.root else {
            return match self.len {
                0 => Ok(()),
                len => Err(RuleViolation::LenMismatch { len, nodes: 0 }),
            };
        };

        unsafe {
            if root.color().is_red() {
                return Err(RuleViolation::RedRoot);
            }
            check_no_red_red(root)?;
            check_black_heights(root, self.len)?;
            let nodes = self.check_order(root)?;
            if nodes != self.len {
                return Err(RuleViolation::LenMismatch {
                    len: self.len,
                    nodes,
                });
            }
        }

        Ok(())
    }

    /// Returns the number of visited nodes.
    unsafe fn check_order(&self, root: RawNode<K, V>) -> Result<usize, RuleViolation> {
        // every node carries the closest ancestors it must sort after and before
        let mut stack = vec![(root, None::<RawNode<K, V>>, None::<RawNode<K, V>>)];
        let mut nodes = 0;
        while let Some((node, lower, upper)) = stack.pop() {
            nodes += 1;
            unsafe {
                let key = node.key();
                let above_lower = lower.map_or(true, |l| self.comparator().less(l.key(), key));
                let below_upper = upper.map_or(true, |u| self.comparator().less(key, u.key()));
                if !above_lower || !below_upper {
                    return Err(RuleViolation::OutOfOrder);
                }

                if let Some(left) = node.left() {
                    stack.push((left, lower, Some(node)));
                }
                if let Some(right) = node.right() {
                    stack.push((right, Some(node), upper));
                }
            }
        }

        Ok(nodes)
    }
}

unsafe fn check_no_red_red<K, V>(root: RawNode<K, V>) -> Result<(), RuleViolation> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        unsafe {
            if node.color().is_red() && (is_red(node.left()) || is_red(node.right())) {
                return Err(RuleViolation::RedChildOfRed);
            }

            stack.extend(node.left());
            stack.extend(node.right());
        }
    }

    Ok(())
}

/// Records the number of black nodes on the path to every missing child and
/// requires all of them to be equal.
unsafe fn check_black_heights<K, V>(root: RawNode<K, V>, len: usize) -> Result<(), RuleViolation> {
    // a tree with n nodes has n + 1 missing children
    let mut heights = Vec::with_capacity(len + 1);
    let mut stack = vec![(root, 1usize)];
    while let Some((node, height)) = stack.pop() {
        for child in unsafe { [node.left(), node.right()] } {
            match child {
                Some(child) => {
                    let black = unsafe { child.color() }.is_black();
                    stack.push((child, height + usize::from(black)));
                }
                None => heights.push(height),
            }
        }
    }

    match heights.windows(2).find(|w| w[0] != w[1]) {
        Some(w) => Err(RuleViolation::UnequalBlackHeight {
            expected: w[0],
            found: w[1],
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::red_black_tree::Color;

    fn tree_of(keys: &[i32]) -> RedBlackTree<i32, i32> {
        let mut tree = RedBlackTree::new();
        for &k in keys {
            assert!(tree.insert(k, k));
        }
        assert_eq!(tree.check_rules(), Ok(()));
        tree
    }

    #[test]
    fn empty_tree_passes() {
        let tree = RedBlackTree::<i32, i32>::new();
        assert!(tree.rules_check());
    }

    #[test]
    fn red_root() {
        let tree = tree_of(&[10, 5, 15]);
        unsafe { tree.root.unwrap().set_color(Color::Red) };
        assert_eq!(tree.check_rules(), Err(RuleViolation::RedRoot));
        assert!(!tree.rules_check());
    }

    #[test]
    fn red_child_of_red() {
        //      10:b
        //     |    |
        //    5:b  15:b
        //    |
        //   3:r
        let tree = tree_of(&[10, 5, 15, 3]);
        unsafe {
            let mut five = tree.root.unwrap().left().unwrap();
            assert_eq!(five.key(), &5);
            assert!(five.left().unwrap().color().is_red());
            five.set_color(Color::Red);
        }
        assert_eq!(tree.check_rules(), Err(RuleViolation::RedChildOfRed));
    }

    #[test]
    fn unequal_black_height() {
        let tree = tree_of(&[10, 5, 15]);
        unsafe {
            let mut left = tree.root.unwrap().left().unwrap();
            assert!(left.color().is_red());
            left.set_color(Color::Black);
        }
        assert!(matches!(
            tree.check_rules(),
            Err(RuleViolation::UnequalBlackHeight { .. })
        ));
    }

    #[test]
    fn out_of_order() {
        let tree = tree_of(&[10, 5, 15]);
        unsafe {
            let mut root = tree.root.unwrap();
            let mut left = root.left().unwrap();
            root.swap_entry(&mut left);
        }
        assert_eq!(tree.check_rules(), Err(RuleViolation::OutOfOrder));
    }

    #[test]
    fn len_mismatch() {
        let mut tree = tree_of(&[1, 2, 3]);
        tree.len = 4;
        assert_eq!(
            tree.check_rules(),
            Err(RuleViolation::LenMismatch { len: 4, nodes: 3 })
        );
        tree.len = 3;
    }

    #[test]
    fn display() {
        assert_eq!(RuleViolation::RedRoot.to_string(), "root is red");
        assert_eq!(
            RuleViolation::UnequalBlackHeight {
                expected: 2,
                found: 3
            }
            .to_string(),
            "paths have different black heights: 2 and 3"
        );
    }
}
