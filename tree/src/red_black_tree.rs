use core::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use log::trace;

use crate::comparator::{Comparator, Less};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Color {
    Red,
    Black,
}

impl Color {
    /// Returns `true` if the color is [`Red`].
    ///
    /// [`Red`]: Color::Red
    #[must_use]
    pub(crate) fn is_red(&self) -> bool {
        matches!(self, Self::Red)
    }

    /// Returns `true` if the color is [`Black`].
    ///
    /// [`Black`]: Color::Black
    #[must_use]
    pub(crate) fn is_black(&self) -> bool {
        matches!(self, Self::Black)
    }
}

pub(crate) struct Node<K, V> {
    key: K,
    value: V,
    color: Color,
    left: Option<RawNode<K, V>>,
    right: Option<RawNode<K, V>>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V, color: Color) -> Self {
        Self {
            key,
            value,
            color,
            left: None,
            right: None,
        }
    }
}

impl<K, V> fmt::Debug for Node<K, V>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("Node");
        f.field("key", &self.key)
            .field("value", &self.value)
            .field("color", &self.color);

        let mut dbg_opt_node = |name: &str, node: &Option<RawNode<K, V>>| match node {
            Some(node) => {
                let node = unsafe { node.as_ref() };
                f.field(name, &(&node.key, &node.color));
            }
            None => {
                f.field(name, &None::<K>);
            }
        };
        dbg_opt_node("left", &self.left);
        dbg_opt_node("right", &self.right);

        f.finish()
    }
}

/// Wrapper around `NonNull<Node<K, V>>` to provide convenient methods in order
/// to make the algorithms of RedBlackTree much more readable.
///
/// Every allocated node is reachable through exactly one `RawNode` stored in
/// the tree: either the root slot or a `left`/`right` slot of its parent.
/// Copies held in local variables are only valid during the call that made
/// them.
#[derive(Debug)]
#[repr(transparent)]
pub(crate) struct RawNode<K, V> {
    ptr: NonNull<Node<K, V>>,
}

impl<K, V> Clone for RawNode<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for RawNode<K, V> {}

impl<K, V> RawNode<K, V> {
    fn from_node(node: Node<K, V>) -> Self {
        Self {
            ptr: NonNull::from(Box::leak(Box::new(node))),
        }
    }

    /// Takes back ownership of the allocation. `self` and every copy of it
    /// must not be used afterwards.
    #[inline]
    unsafe fn into_box(self) -> Box<Node<K, V>> {
        unsafe { Box::from_raw(self.as_ptr()) }
    }

    #[inline]
    fn as_ptr(&self) -> *mut Node<K, V> {
        self.ptr.as_ptr()
    }

    /// Returns `true` if both handles point to the same node.
    #[inline]
    pub(crate) fn is(&self, other: RawNode<K, V>) -> bool {
        self.ptr == other.ptr
    }

    #[inline]
    unsafe fn as_ref<'a>(&self) -> &'a Node<K, V> {
        unsafe { self.ptr.as_ref() }
    }

    #[inline]
    pub(crate) unsafe fn key<'a>(&self) -> &'a K {
        unsafe { &(*self.as_ptr()).key }
    }

    #[inline]
    unsafe fn as_refs<'a>(&self) -> (&'a K, &'a V) {
        let ptr = self.as_ptr();
        unsafe { (&(*ptr).key, &(*ptr).value) }
    }

    #[inline]
    unsafe fn value_mut<'a>(&mut self) -> &'a mut V {
        unsafe { &mut (*self.as_ptr()).value }
    }

    /// Exchanges key and value with `other`, the nodes themselves stay in place.
    #[inline]
    pub(crate) unsafe fn swap_entry(&mut self, other: &mut RawNode<K, V>) {
        debug_assert!(!self.is(*other));
        let (a, b) = (self.as_ptr(), other.as_ptr());
        unsafe {
            mem::swap(&mut (*a).key, &mut (*b).key);
            mem::swap(&mut (*a).value, &mut (*b).value);
        }
    }

    #[inline]
    pub(crate) unsafe fn left(&self) -> Option<RawNode<K, V>> {
        unsafe { (*self.as_ptr()).left }
    }

    #[inline]
    unsafe fn set_left(&mut self, new_left: Option<RawNode<K, V>>) {
        unsafe {
            (*self.as_ptr()).left = new_left;
        }
    }

    #[inline]
    pub(crate) unsafe fn right(&self) -> Option<RawNode<K, V>> {
        unsafe { (*self.as_ptr()).right }
    }

    #[inline]
    unsafe fn set_right(&mut self, new_right: Option<RawNode<K, V>>) {
        unsafe {
            (*self.as_ptr()).right = new_right;
        }
    }

    #[inline]
    pub(crate) unsafe fn color(&self) -> Color {
        unsafe { (*self.as_ptr()).color }
    }

    #[inline]
    pub(crate) unsafe fn set_color(&mut self, new_color: Color) {
        unsafe { (*self.as_ptr()).color = new_color }
    }
}

/// Missing children count as black.
#[inline]
pub(crate) unsafe fn is_red<K, V>(node: Option<RawNode<K, V>>) -> bool {
    node.is_some_and(|n| unsafe { n.color() }.is_red())
}

#[inline]
pub(crate) unsafe fn is_black<K, V>(node: Option<RawNode<K, V>>) -> bool {
    !unsafe { is_red(node) }
}

/// Ordered map backed by a red-black tree.
///
/// Both insertion and deletion rebalance on the way down from the root, so
/// no operation ever walks back up the tree and nodes don't need parent
/// links.
///
/// Keys are ordered by the comparator `C`, see [`Comparator`]. Keys that
/// compare equivalent are the same key: inserting one again is rejected.
pub struct RedBlackTree<K, V, C = Less> {
    pub(crate) root: Option<RawNode<K, V>>,
    pub(crate) len: usize,
    comparator: C,
    marker: PhantomData<Box<Node<K, V>>>,
}

// SAFETY: the tree uniquely owns all of its nodes, as a `Box` based tree would.
unsafe impl<K: Send, V: Send, C: Send> Send for RedBlackTree<K, V, C> {}
unsafe impl<K: Sync, V: Sync, C: Sync> Sync for RedBlackTree<K, V, C> {}

impl<K, V, C> Drop for RedBlackTree<K, V, C> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V, C> fmt::Debug for RedBlackTree<K, V, C>
where
    K: fmt::Debug,
{
    /// Prints the tree level by level, every node as `[key color]` and
    /// every missing child of a printed node as `nil`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Entry<'a, K>(Option<(&'a K, Color)>);

        impl<K: fmt::Debug> fmt::Debug for Entry<'_, K> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.0 {
                    Some((key, Color::Red)) => write!(f, "[{key:?} red]"),
                    Some((key, Color::Black)) => write!(f, "[{key:?} black]"),
                    None => f.write_str("nil"),
                }
            }
        }

        let mut levels = Vec::new();
        let mut current: Vec<Option<RawNode<K, V>>> = vec![self.root];
        while current.iter().any(Option::is_some) {
            let mut level = Vec::with_capacity(current.len());
            let mut next = Vec::with_capacity(current.len() * 2);
            for slot in current {
                match slot {
                    Some(node) => {
                        let node = unsafe { node.as_ref() };
                        level.push(Entry(Some((&node.key, node.color))));
                        next.push(node.left);
                        next.push(node.right);
                    }
                    None => level.push(Entry(None)),
                }
            }
            levels.push(level);
            current = next;
        }

        f.debug_struct("RedBlackTree")
            .field("len", &self.len)
            .field("levels", &levels)
            .finish()
    }
}

impl<K, V> RedBlackTree<K, V, Less>
where
    K: Ord,
{
    pub fn new() -> Self {
        Self::with_comparator(Less)
    }
}

impl<K, V, C> Default for RedBlackTree<K, V, C>
where
    C: Default,
{
    fn default() -> Self {
        Self::with_comparator(C::default())
    }
}

impl<K, V, C> RedBlackTree<K, V, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            root: None,
            len: 0,
            comparator,
            marker: PhantomData,
        }
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Returns the number of keys in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes and drops every node.
    ///
    /// Walks the tree with an explicit stack, so the depth of the tree never
    /// matters for the call stack.
    pub fn clear(&mut self) {
        let Some(root) = self.root.take() else {
            return;
        };
        trace!("clearing {} nodes", self.len);

        // TODO: handle panics in `K::drop` or `V::drop`, the nodes still on
        // the stack are leaked at the moment
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let node = unsafe { node.into_box() };
            stack.extend(node.left);
            stack.extend(node.right);
        }

        self.len = 0;
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let mut x = self.root?;
        while let Some(left) = unsafe { x.left() } {
            x = left;
        }

        Some(unsafe { x.as_refs() })
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let mut x = self.root?;
        while let Some(right) = unsafe { x.right() } {
            x = right;
        }

        Some(unsafe { x.as_refs() })
    }
}

impl<K, V, C> RedBlackTree<K, V, C>
where
    C: Comparator<K>,
{
    #[inline]
    fn less(&self, lhs: &K, rhs: &K) -> bool {
        self.comparator.less(lhs, rhs)
    }

    /// Returns the value stored for `key`.
    pub fn get_value(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.get_raw(key).map(|node| unsafe { node.as_refs() })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_raw(key).map(|mut node| unsafe { node.value_mut() })
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get_raw(key).is_some()
    }

    fn get_raw(&self, key: &K) -> Option<RawNode<K, V>> {
        let mut x = self.root;
        while let Some(node) = x {
            let node_key = unsafe { node.key() };
            if self.less(key, node_key) {
                x = unsafe { node.left() };
            } else if self.less(node_key, key) {
                x = unsafe { node.right() };
            } else {
                return Some(node);
            }
        }

        None
    }

    /// Inserts `key` with `value`.
    ///
    /// Returns `false` and leaves the tree untouched if `key` is already
    /// present; the stored value is not replaced.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        // The descent below recolors and rotates before it reaches the end of
        // the path, so a duplicate must be caught up front.
        if self.contains_key(&key) {
            return false;
        }

        let Some(root) = self.root else {
            self.root = Some(RawNode::from_node(Node::new(key, value, Color::Black)));
            self.len = 1;
            return true;
        };

        unsafe {
            let mut great = None;
            let mut grand = None;
            let mut parent = None;
            let mut node = root;
            loop {
                if is_red(node.left()) && is_red(node.right()) {
                    // After a rotation the ancestors below are stale, but the
                    // next two nodes on the search path are black, so they
                    // are shifted out before another rotation reads them.
                    self.reorient(node, parent, grand, great);
                }

                let next = if self.less(&key, node.key()) {
                    node.left()
                } else {
                    node.right()
                };
                great = grand;
                grand = parent;
                parent = Some(node);
                match next {
                    Some(next) => node = next,
                    None => break,
                }
            }

            let new_node = RawNode::from_node(Node::new(key, value, Color::Red));
            if self.less(new_node.key(), node.key()) {
                node.set_left(Some(new_node));
            } else {
                node.set_right(Some(new_node));
            }
            self.len += 1;

            self.reorient(new_node, parent, grand, great);
        }

        true
    }

    /// Splits the 4-node at `node` and fixes a resulting red-red link.
    unsafe fn reorient(
        &mut self,
        mut node: RawNode<K, V>,
        parent: Option<RawNode<K, V>>,
        grand: Option<RawNode<K, V>>,
        great: Option<RawNode<K, V>>,
    ) {
        //         g:b                 g:b
        //          |                   |
        //    +--- n:b ---+   -->  +-- n:r --+
        //    |           |        |         |
        //   a:r         b:r      a:b       b:b
        unsafe {
            if let Some(mut left) = node.left() {
                left.set_color(Color::Black);
            }
            if let Some(mut right) = node.right() {
                right.set_color(Color::Black);
            }
            if self.root.is_some_and(|root| root.is(node)) {
                return;
            }

            node.set_color(Color::Red);
            let Some(parent) = parent else {
                unreachable!("non-root node without a parent")
            };
            if parent.color().is_black() {
                return;
            }

            // red parent is never the root
            let Some(mut grand) = grand else {
                unreachable!("red node without a parent")
            };
            grand.set_color(Color::Red);

            //          +-- g:r --+                              +---- t:b ----+
            //          |         |                              |             |
            //     +-- p:r --+    u          -->            +- p:r -+       +- g:r -+
            //     |         |                              |       |       |       |
            //     a     +- n:r -+                          a       b       c       u
            //           |       |
            //           b       c
            //
            // zig-zag (shown) rotates n up twice and n becomes the top t,
            // zig-zig rotates p up once and p becomes the top t
            let zig_zag = self.less(parent.key(), grand.key()) != self.less(node.key(), parent.key());
            let mut top = if zig_zag {
                trace!("reorient: double rotation");
                self.rotate(parent, node);
                self.reconnect(Some(grand), node);
                self.rotate(grand, node);
                node
            } else {
                trace!("reorient: single rotation");
                self.rotate(grand, parent);
                parent
            };
            self.reconnect(great, top);
            top.set_color(Color::Black);
        }
    }

    /// Rotates `child` up past `parent`.
    ///
    /// Only moves subtrees between `parent` and `child`, the slot that
    /// pointed to `parent` must be reconnected afterwards.
    unsafe fn rotate(&self, mut parent: RawNode<K, V>, mut child: RawNode<K, V>) {
        //         p                    c
        //         |                    |
        //     +-- p --+            +-- c --+
        //     |       |     -->    |       |
        // +-- c --+   z            x   +-- p --+
        // |       |                    |       |
        // x       y                    y       z
        // and the mirror image for a right child
        unsafe {
            if self.less(child.key(), parent.key()) {
                parent.set_left(child.right());
                child.set_right(Some(parent));
            } else {
                parent.set_right(child.left());
                child.set_left(Some(parent));
            }
        }
    }

    /// Stores `node` in the slot of `parent` that its key belongs to, or
    /// makes it the root if there is no parent.
    unsafe fn reconnect(&mut self, parent: Option<RawNode<K, V>>, node: RawNode<K, V>) {
        match parent {
            Some(mut parent) => unsafe {
                if self.less(node.key(), parent.key()) {
                    parent.set_left(Some(node));
                } else {
                    parent.set_right(Some(node));
                }
            },
            None => self.root = Some(node),
        }
    }

    /// Removes `key` from the tree. Returns `false` if it wasn't present.
    pub fn erase(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        // Like insert, the descent changes the tree before the key is
        // reached. This also covers the empty tree.
        self.get_raw(key)?;
        let mut root = self.root?;

        unsafe {
            if is_black(root.left()) && is_black(root.right()) {
                root.set_color(Color::Red);
            }

            let mut grand = None;
            let mut parent = None;
            let mut node = root;
            // Node holding `key` which has two children. Its entry is
            // exchanged with the in-order predecessor once that is reached.
            let mut target: Option<RawNode<K, V>> = None;
            loop {
                if node.color().is_black() {
                    if let Some(parent) = parent {
                        self.push_red_down(node, parent, grand);
                    }
                }

                let next = match target {
                    Some(mut target) => match node.right() {
                        Some(right) => right,
                        None => {
                            target.swap_entry(&mut node);
                            return Some(self.unlink(node, parent));
                        }
                    },
                    None => {
                        let next = if self.less(key, node.key()) {
                            node.left()
                        } else if self.less(node.key(), key) {
                            node.right()
                        } else if node.left().is_some() && node.right().is_some() {
                            target = Some(node);
                            node.left()
                        } else {
                            return Some(self.unlink(node, parent));
                        };
                        let Some(next) = next else {
                            unreachable!("key is in the tree")
                        };
                        next
                    }
                };

                grand = parent;
                parent = Some(node);
                node = next;
            }
        }
    }

    /// Makes the black `node` red before the descent continues below it.
    ///
    /// `parent` is red here unless the previous step stayed on a black node
    /// because it already had a red child, in which case the sibling is red
    /// and is rotated up first. `node` stays a child of `parent` through
    /// every rotation done here.
    unsafe fn push_red_down(
        &mut self,
        mut node: RawNode<K, V>,
        mut parent: RawNode<K, V>,
        mut grand: Option<RawNode<K, V>>,
    ) {
        unsafe {
            let node_is_left = self.less(node.key(), parent.key());
            let sibling_of = |parent: RawNode<K, V>| {
                if node_is_left {
                    parent.right()
                } else {
                    parent.left()
                }
            };

            let mut sibling = sibling_of(parent);
            if let Some(mut s) = sibling {
                if s.color().is_red() && parent.color().is_black() {
                    //     +--- p:b ---+                  +--- s:b ---+
                    //     |           |                  |           |
                    //    n:b      +- s:r -+    -->   +- p:r -+       b
                    //             |       |          |       |
                    //             a       b         n:b      a
                    trace!("push down: rotating red sibling up");
                    self.rotate(parent, s);
                    self.reconnect(grand, s);
                    s.set_color(Color::Black);
                    parent.set_color(Color::Red);
                    grand = Some(s);
                    sibling = sibling_of(parent);
                }
            }

            if is_red(node.left()) || is_red(node.right()) {
                // Continue on a black node, the next step either lands on
                // the red child or rotates it up as a red sibling.
                return;
            }

            let red_nephew = sibling.and_then(|s| {
                if is_red(s.left()) {
                    s.left()
                } else if is_red(s.right()) {
                    s.right()
                } else {
                    None
                }
            });

            match (sibling, red_nephew) {
                (Some(mut s), Some(mut r)) => {
                    // Borrow from the sibling's 3/4-node.
                    //
                    //     +--- p:r ---+                   +--- t:r ---+
                    //     |           |                   |           |
                    //    n:b      +- s:b -+     -->   +- p:b -+   +- s:b -+
                    //             |       |           |       |   |       |
                    //            r:r      x          n:r      y   z       x
                    //           |   |
                    //           y   z
                    //
                    // inner red child (shown) is rotated up twice and keeps its
                    // color, an outer one makes s the top with s red and r black
                    let top = if node_is_left == self.less(r.key(), s.key()) {
                        trace!("push down: double rotation");
                        self.rotate(s, r);
                        self.reconnect(Some(parent), r);
                        self.rotate(parent, r);
                        r
                    } else {
                        trace!("push down: single rotation");
                        self.rotate(parent, s);
                        s.set_color(Color::Red);
                        r.set_color(Color::Black);
                        s
                    };
                    self.reconnect(grand, top);
                }
                (sibling, _) => {
                    // Merge n, p and s into one 4-node.
                    if let Some(mut s) = sibling {
                        s.set_color(Color::Red);
                    }
                }
            }

            node.set_color(Color::Red);
            parent.set_color(Color::Black);
        }
    }

    /// Unlinks `node`, which has at most one child, and frees it.
    unsafe fn unlink(&mut self, node: RawNode<K, V>, parent: Option<RawNode<K, V>>) -> (K, V) {
        unsafe {
            debug_assert!(node.left().is_none() || node.right().is_none());

            // A lone child is always a red leaf at this point.
            let child = node.left().or(node.right());
            if let Some(mut child) = child {
                child.set_color(Color::Black);
            }

            match parent {
                Some(mut parent) => {
                    if parent.left().is_some_and(|left| left.is(node)) {
                        parent.set_left(child);
                    } else {
                        parent.set_right(child);
                    }
                }
                None => self.root = child,
            }
            if let Some(mut root) = self.root {
                root.set_color(Color::Black);
            }

            self.len -= 1;
            trace!("unlinked node, {} left", self.len);
            let node = node.into_box();
            let Node { key, value, .. } = *node;
            (key, value)
        }
    }
}

impl<K, V, C> Extend<(K, V)> for RedBlackTree<K, V, C>
where
    C: Comparator<K>,
{
    /// Inserts every pair, pairs with a key that is already present are
    /// dropped.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V, C> FromIterator<(K, V)> for RedBlackTree<K, V, C>
where
    C: Comparator<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut tree = Self::default();
        tree.extend(iter);
        tree
    }
}
