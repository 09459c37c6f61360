//! A red-black tree with parent pointers and explicit sentinel leaves.
//!
//! Every node that carries a value owns exactly two children. A missing child is represented by a
//! sentinel: a valueless, always-black node. This keeps the rotation and fixup logic free of
//! "is there a child here?" branching since every value-bearing node has a sibling, an uncle, etc.
//!
//! # Examples
//!
//! ```
//! use rbtree::redblack::Tree;
//!
//! let mut tree = Tree::new();
//!
//! // Nothing in here yet.
//! assert!(!tree.search(&1));
//!
//! assert!(tree.insert(1));
//! assert!(tree.search(&1));
//!
//! // Inserting a value that's already present does nothing.
//! assert!(!tree.insert(1));
//!
//! // Deleting a value returns it.
//! assert_eq!(tree.delete(&1), Some(1));
//! assert!(!tree.search(&1));
//! assert!(tree.is_empty());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use log::{debug, trace};
use thiserror::Error;

/// Which child of its parent a node is. Also used as the direction of a rotation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    Left = 0,
    Right = 1,
}

impl Side {
    fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

/// A violated red-black tree invariant, as reported by [`Tree::check_invariants`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The root node is red.
    #[error("the root is red")]
    RedRoot,
    /// A red node has a red child.
    #[error("a red node at depth {depth} has a red child")]
    RedRedEdge {
        /// Depth of the parent of the offending edge. The root has depth 0.
        depth: usize,
    },
    /// Two paths from the same node down to sentinels pass through different numbers of black
    /// nodes.
    #[error("black-height mismatch at depth {depth}: left is {left}, right is {right}")]
    BlackHeightMismatch {
        /// Depth of the node whose subtrees disagree.
        depth: usize,
        /// Black-height of the left subtree.
        left: usize,
        /// Black-height of the right subtree.
        right: usize,
    },
    /// A value-bearing node without two children or a sentinel that is red or has children.
    #[error("malformed node at depth {depth}")]
    MalformedNode {
        /// Depth of the malformed node.
        depth: usize,
    },
    /// A child's parent link or side tag doesn't point back at the node owning it.
    #[error("broken parent link at depth {depth}")]
    BrokenParentLink {
        /// Depth of the child with the broken link.
        depth: usize,
    },
    /// An in-order walk found two values that aren't strictly ascending.
    #[error("values are not in strictly ascending order")]
    OutOfOrder,
}

/// A red-black tree storing a set of ordered values. This can be used for inserting, searching
/// and deleting values in `O(lg N)` time.
pub struct Tree<T> {
    // A `Link` rather than an inline `Node` so that the tree can be moved around without breaking
    // the children's parent pointers. `None` means the tree is empty; the root is never a
    // sentinel.
    root: Option<Link<T>>,
    _marker: PhantomData<Box<Node<T>>>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Tree<T> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            // SAFETY: We own the root and just detached it from `self` so it can't be freed
            // twice. It was allocated with `Box::new` in `Link::alloc`.
            unsafe { root.free() };
        }
    }
}

// SAFETY: The tree exclusively owns every node reachable from `root`; no `Link` ever escapes it.
// Sending the tree moves all of its `T`s with it.
unsafe impl<T: Send> Send for Tree<T> {}

// SAFETY: Methods taking `&self` only read the node graph, so sharing the tree only shares `&T`s.
unsafe impl<T: Sync> Sync for Tree<T> {}

impl<T> Clone for Tree<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        Self {
            root: self.root.map(|root| root.clone_subtree(None, None)),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Tree<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("root", &self.root_node())
            .finish()
    }
}

impl<T> FromIterator<T> for Tree<T>
where
    T: Ord,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);
        tree
    }
}

impl<T> Extend<T> for Tree<T>
where
    T: Ord,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

/// Where [`Tree::locate`] stopped.
enum Search<T> {
    /// The node holding the value.
    Found(Link<T>),
    /// The sentinel the value would replace if it were inserted. Its parent and side are the
    /// attachment point.
    Vacant(Link<T>),
}

/// A node whose position is one black node short of the black-height of its sibling's subtree.
///
/// This only ever exists inside [`Tree::fix_double_black`]; the node itself is stored as black.
struct DoubleBlack<T>(Link<T>);

impl<T> Tree<T> {
    /// Generate a new, empty `Tree`.
    pub fn new() -> Self {
        Self {
            root: None,
            _marker: PhantomData,
        }
    }

    /// Returns `true` if the tree holds no values.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns whether the tree contains `value`.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::redblack::Tree;
    ///
    /// let tree: Tree<_> = [3, 1, 2].into_iter().collect();
    ///
    /// assert!(tree.search(&2));
    /// assert!(!tree.search(&42));
    /// ```
    pub fn search(&self, value: &T) -> bool
    where
        T: Ord,
    {
        matches!(self.locate(value), Some(Search::Found(_)))
    }

    /// Inserts `value` into the tree. Returns `false` (leaving the tree untouched) if it was
    /// already present.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::redblack::Tree;
    ///
    /// let mut tree = Tree::new();
    ///
    /// assert!(tree.insert(1));
    /// assert!(!tree.insert(1));
    /// assert!(tree.search(&1));
    /// ```
    pub fn insert(&mut self, value: T) -> bool
    where
        T: Ord,
    {
        let inserted = match self.locate(&value) {
            None => {
                debug!("inserting into an empty tree, new value becomes the black root");
                self.root = Some(Link::new_boxed(value, Color::Black, None, None));
                true
            }
            Some(Search::Found(_)) => false,
            Some(Search::Vacant(sentinel)) => {
                sentinel.grow(value);
                self.fix_red_red(sentinel);
                true
            }
        };

        self.assert_invariants_in_tests();
        inserted
    }

    /// Deletes `value` from the tree and returns it. If the tree doesn't contain `value`, nothing
    /// happens and `None` is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::redblack::Tree;
    ///
    /// let mut tree: Tree<_> = (0..10).collect();
    ///
    /// assert_eq!(tree.delete(&4), Some(4));
    /// assert_eq!(tree.delete(&4), None);
    /// assert!(!tree.search(&4));
    /// ```
    pub fn delete(&mut self, value: &T) -> Option<T>
    where
        T: Ord,
    {
        let node = match self.locate(value)? {
            Search::Found(node) => node,
            Search::Vacant(_) => return None,
        };

        // A node with two children trades places (by value) with its successor, which has at most
        // one value-bearing child. The successor's position is then the one actually removed.
        let target = if node.child(Side::Left).is_sentinel() || node.child(Side::Right).is_sentinel()
        {
            node
        } else {
            let successor = node.successor();
            node.swap_values(successor);
            successor
        };

        let removed = self.remove(target);
        self.assert_invariants_in_tests();
        Some(removed)
    }

    /// Checks every red-black invariant and returns the tree's black-height: the number of black
    /// nodes on any path from the root down to a sentinel, counting both ends. An empty tree has a
    /// black-height of 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbtree::redblack::Tree;
    ///
    /// let tree: Tree<_> = (0..100).collect();
    /// assert!(tree.check_invariants().is_ok());
    /// ```
    pub fn check_invariants(&self) -> Result<usize, InvariantViolation>
    where
        T: Ord,
    {
        let Some(root) = self.root_node() else {
            return Ok(0);
        };
        if root.color == Color::Red {
            return Err(InvariantViolation::RedRoot);
        }
        if root.parent.is_some() || root.side.is_some() {
            return Err(InvariantViolation::BrokenParentLink { depth: 0 });
        }

        let mut previous = None;
        root.check(0, &mut previous)
    }

    fn root_node(&self) -> Option<&Node<T>> {
        // SAFETY: The root is owned by `self` so it lives at least as long as this borrow, and
        // nothing mutates it without `&mut self`.
        self.root.map(|root| unsafe { root.node() })
    }

    /// Walks down from the root looking for `value`. Returns `None` only when the tree is empty.
    fn locate(&self, value: &T) -> Option<Search<T>>
    where
        T: Ord,
    {
        let mut current = self.root?;
        loop {
            // SAFETY: The node is owned by `self` and the reference ends with this statement.
            let ordering = unsafe { current.node() }.value.as_ref().map(|v| value.cmp(v));
            match ordering {
                None => return Some(Search::Vacant(current)),
                Some(Ordering::Equal) => return Some(Search::Found(current)),
                Some(Ordering::Less) => current = current.child(Side::Left),
                Some(Ordering::Greater) => current = current.child(Side::Right),
            }
        }
    }

    /// Points `parent`'s child slot on `side` (or the root slot when there is no parent) at `node`.
    fn replace_child(&mut self, parent: Option<Link<T>>, side: Option<Side>, node: Link<T>) {
        match (parent, side) {
            (Some(parent), Some(side)) => parent.set_child(side, node),
            (None, None) => self.root = Some(node),
            _ => unreachable!("A node has a side exactly when it has a parent."),
        }
        node.set_parent(parent, side);
    }

    /// Rotates the subtree rooted at `node` towards `direction`. The child of `node` on the
    /// opposite side is promoted into `node`'s position and `node` becomes its child on
    /// `direction`. Colors are left alone.
    ///
    /// ## Panics
    ///
    /// When the promoted child is a sentinel.
    ///
    /// # Diagram
    ///
    /// Rotating `node` to the left:
    ///
    /// ```text
    ///    Option<parent>          Option<parent>
    ///      /                       /
    ///    node                    child
    ///    /  \                    /   \
    ///   x   child   rotate ->  node   z
    ///       /   \              /  \
    ///      y     z            x    y
    /// ```
    fn rotate(&mut self, node: Link<T>, direction: Side) {
        let child = node.child(direction.opposite());
        assert!(!child.is_sentinel(), "Cannot rotate a sentinel into its parent's position.");
        trace!("rotating {direction:?}");

        let parent = node.parent();
        let side = node.side();

        // `y` in the diagram moves across from the child to the node.
        let inner = child.child(direction);
        node.set_child(direction.opposite(), inner);
        inner.set_parent(Some(node), Some(direction.opposite()));

        child.set_child(direction, node);
        node.set_parent(Some(child), Some(direction));

        self.replace_child(parent, side, child);
    }

    /// Restores the "no red node has a red child" invariant after `node` was inserted as red.
    fn fix_red_red(&mut self, mut node: Link<T>) {
        loop {
            let Some(mut parent) = node.parent() else {
                break;
            };
            if parent.color() == Color::Black {
                break;
            }

            let grandparent = parent
                .parent()
                .expect("A red node is never the root so it has a parent.");
            let parent_side = parent.side().expect("A node with a parent has a side.");
            let uncle = grandparent.child(parent_side.opposite());

            if uncle.color() == Color::Red {
                trace!("insert fixup: red uncle, recoloring and moving up to the grandparent");
                parent.set_color(Color::Black);
                uncle.set_color(Color::Black);
                grandparent.set_color(Color::Red);
                node = grandparent;
                continue;
            }

            // Zig-zag: straighten it out so the new red node is on the outside.
            if node.side() != Some(parent_side) {
                trace!("insert fixup: black uncle, inner child");
                self.rotate(parent, parent_side);
                parent = node;
            }

            trace!("insert fixup: black uncle, outer child");
            self.rotate(grandparent, parent_side.opposite());
            parent.set_color(Color::Black);
            grandparent.set_color(Color::Red);
            break;
        }

        if let Some(root) = self.root {
            root.set_color(Color::Black);
        }
    }

    /// Removes the value held by `node`, which must have at most one value-bearing child, and
    /// repairs the tree.
    fn remove(&mut self, node: Link<T>) -> T {
        let left = node.child(Side::Left);
        let right = node.child(Side::Right);

        match (left.is_sentinel(), right.is_sentinel()) {
            (true, true) if node.parent().is_none() => {
                debug!("deleting the last value, tree is now empty");
                self.root = None;
                // SAFETY: `node` was the root and we just detached it so nothing references it.
                unsafe { node.take_and_free() }
            }
            (true, true) => {
                let color = node.color();
                let value = node.shrink();
                if color == Color::Black {
                    self.fix_double_black(DoubleBlack(node));
                }
                value
            }
            (true, false) | (false, true) => {
                let (child, sentinel) = if left.is_sentinel() {
                    (right, left)
                } else {
                    (left, right)
                };
                assert_eq!(
                    child.color(),
                    Color::Red,
                    "The only value-bearing child of a node must be red."
                );
                trace!("delete: splicing out a node with a single red child");

                self.replace_child(node.parent(), node.side(), child);
                child.set_color(Color::Black);

                node.clear_child(Side::Left);
                node.clear_child(Side::Right);
                // SAFETY: `sentinel` and `node` were just detached from the tree and `node` no
                // longer owns any children so `child` isn't freed with it.
                unsafe {
                    sentinel.free();
                    node.take_and_free()
                }
            }
            (false, false) => unreachable!("Nodes with two children are removed via a successor."),
        }
    }

    /// Resolves the missing black node at the position of `deficit`.
    fn fix_double_black(&mut self, mut deficit: DoubleBlack<T>) {
        loop {
            let node = deficit.0;
            let (Some(parent), Some(side)) = (node.parent(), node.side()) else {
                trace!("delete fixup: deficit reached the root");
                return;
            };

            let sibling = parent.child(side.opposite());
            // The sibling's subtree has a black-height of at least 2 so it can't be a sentinel.
            assert!(!sibling.is_sentinel(), "A double-black node always has a real sibling.");

            if sibling.color() == Color::Red {
                trace!("delete fixup: red sibling");
                self.rotate(parent, side);
                sibling.set_color(Color::Black);
                parent.set_color(Color::Red);
                // The new sibling is black so the next pass ends in one of the terminal cases.
                continue;
            }

            let near = sibling.child(side);
            let far = sibling.child(side.opposite());

            if near.color() == Color::Black && far.color() == Color::Black {
                sibling.set_color(Color::Red);
                if parent.color() == Color::Red {
                    trace!("delete fixup: black sibling without red children, red parent");
                    parent.set_color(Color::Black);
                    return;
                }
                trace!("delete fixup: black sibling without red children, moving up");
                deficit = DoubleBlack(parent);
                continue;
            }

            let (sibling, far) = if far.color() == Color::Red {
                (sibling, far)
            } else {
                trace!("delete fixup: black sibling with a red inner child");
                self.rotate(sibling, side.opposite());
                near.set_color(Color::Black);
                sibling.set_color(Color::Red);
                (near, sibling)
            };

            trace!("delete fixup: black sibling with a red outer child");
            self.rotate(parent, side);
            sibling.set_color(parent.color());
            parent.set_color(Color::Black);
            far.set_color(Color::Black);
            return;
        }
    }

    /// Re-checks the whole tree after every mutation. This is `O(N)` so it only happens in tests.
    fn assert_invariants_in_tests(&self)
    where
        T: Ord,
    {
        if cfg!(test) {
            if let Err(violation) = self.check_invariants() {
                panic!("red-black invariant violated: {violation}");
            }
        }
    }
}

/// A non-owning handle to a node. Whether the handle "owns" its node depends on where it's
/// stored: a tree's root and a node's children own their nodes, a node's parent does not.
///
/// Every `Link` reachable from a [`Tree`] points to a live node allocated by [`Link::alloc`] and
/// owned by that tree. All mutation goes through `&mut Tree` and the accessors below never hand
/// out a `&mut Node`, so a write never overlaps a borrow handed out by [`Link::node`].
struct Link<T>(NonNull<Node<T>>);

impl<T> Clone for Link<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Link<T> {}

impl<T> PartialEq for Link<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Link<T> {
    fn alloc(node: Node<T>) -> Self {
        Link(NonNull::from(Box::leak(Box::new(node))))
    }

    fn new_sentinel(parent: Link<T>, side: Side) -> Self {
        Self::alloc(Node {
            value: None,
            color: Color::Black,
            parent: Some(parent),
            side: Some(side),
            children: [None, None],
        })
    }

    /// Allocates a value-bearing node with two fresh sentinel children.
    fn new_boxed(value: T, color: Color, parent: Option<Link<T>>, side: Option<Side>) -> Self {
        let link = Self::alloc(Node {
            value: Some(value),
            color,
            parent,
            side,
            children: [None, None],
        });
        link.set_child(Side::Left, Self::new_sentinel(link, Side::Left));
        link.set_child(Side::Right, Self::new_sentinel(link, Side::Right));
        link
    }

    /// Borrows the node.
    ///
    /// # Safety
    ///
    /// The caller picks `'a` and must make sure the reference is dead before the node is written
    /// through another `Link` or freed. Tying `'a` to a borrow of the owning [`Tree`] or [`Node`]
    /// (see [`Tree::root_node`] and [`Node::child_node`]) satisfies this.
    unsafe fn node<'a>(self) -> &'a Node<T> {
        self.0.as_ref()
    }

    fn raw(self) -> *mut Node<T> {
        self.0.as_ptr()
    }

    fn is_sentinel(self) -> bool {
        // SAFETY: The reference ends with this statement.
        unsafe { self.node() }.value.is_none()
    }

    fn color(self) -> Color {
        // SAFETY: The reference ends with this statement.
        unsafe { self.node() }.color
    }

    fn set_color(self, color: Color) {
        debug_assert!(
            color == Color::Black || !self.is_sentinel(),
            "Sentinels are always black."
        );
        // SAFETY: See the type-level comment.
        unsafe { (*self.raw()).color = color };
    }

    fn parent(self) -> Option<Link<T>> {
        // SAFETY: The reference ends with this statement.
        unsafe { self.node() }.parent
    }

    fn side(self) -> Option<Side> {
        // SAFETY: The reference ends with this statement.
        unsafe { self.node() }.side
    }

    fn set_parent(self, parent: Option<Link<T>>, side: Option<Side>) {
        // SAFETY: See the type-level comment.
        unsafe {
            (*self.raw()).parent = parent;
            (*self.raw()).side = side;
        }
    }

    /// The child on `side`.
    ///
    /// ## Panics
    ///
    /// When called on a sentinel.
    fn child(self, side: Side) -> Link<T> {
        // SAFETY: The reference ends with this statement.
        unsafe { self.node() }.children[side.index()].expect("Sentinels have no children.")
    }

    fn set_child(self, side: Side, child: Link<T>) {
        // SAFETY: See the type-level comment.
        unsafe { (*self.raw()).children[side.index()] = Some(child) };
    }

    fn clear_child(self, side: Side) {
        // SAFETY: See the type-level comment.
        unsafe { (*self.raw()).children[side.index()] = None };
    }

    /// The leftmost node in this node's right subtree.
    ///
    /// ## Panics
    ///
    /// When the right child is a sentinel.
    fn successor(self) -> Link<T> {
        let mut current = self.child(Side::Right);
        assert!(!current.is_sentinel(), "Successor lookup needs a right child.");
        loop {
            let left = current.child(Side::Left);
            if left.is_sentinel() {
                return current;
            }
            current = left;
        }
    }

    fn swap_values(self, other: Link<T>) {
        assert!(self != other);
        // SAFETY: See the type-level comment. `self` and `other` are different nodes so the two
        // mutable borrows don't overlap.
        unsafe { std::mem::swap(&mut (*self.raw()).value, &mut (*other.raw()).value) };
    }

    /// Turns a sentinel into a red node holding `value` with two fresh sentinel children.
    fn grow(self, value: T) {
        debug_assert!(self.is_sentinel());
        // SAFETY: See the type-level comment.
        unsafe {
            (*self.raw()).value = Some(value);
            (*self.raw()).color = Color::Red;
        }
        self.set_child(Side::Left, Self::new_sentinel(self, Side::Left));
        self.set_child(Side::Right, Self::new_sentinel(self, Side::Right));
    }

    /// Turns a node whose children are both sentinels back into a (black) sentinel, returning its
    /// value.
    fn shrink(self) -> T {
        for side in [Side::Left, Side::Right] {
            let sentinel = self.child(side);
            debug_assert!(sentinel.is_sentinel());
            self.clear_child(side);
            // SAFETY: The sentinel was owned by `self` and we just dropped that edge.
            unsafe { sentinel.free() };
        }
        // SAFETY: See the type-level comment.
        unsafe {
            (*self.raw()).color = Color::Black;
            (*self.raw())
                .value
                .take()
                .expect("Only value-bearing nodes are removed.")
        }
    }

    /// Frees this node and everything it owns.
    ///
    /// # Safety
    ///
    /// The node must have been detached from its owner and must not be referenced afterwards.
    unsafe fn free(self) {
        drop(Box::from_raw(self.raw()));
    }

    /// Frees this node and returns its value.
    ///
    /// # Safety
    ///
    /// Same as [`Link::free`]. The node must also hold a value.
    unsafe fn take_and_free(self) -> T {
        let mut node = Box::from_raw(self.raw());
        node.value
            .take()
            .expect("Only value-bearing nodes are removed.")
    }

    /// Deep copies the subtree rooted at this node, pointing the copy's parent link at `parent`.
    fn clone_subtree(self, parent: Option<Link<T>>, side: Option<Side>) -> Link<T>
    where
        T: Clone,
    {
        // SAFETY: `self` belongs to the tree being cloned, which is borrowed for the whole clone
        // and never written to.
        let source = unsafe { self.node() };
        let copy = Self::alloc(Node {
            value: source.value.clone(),
            color: source.color,
            parent,
            side,
            children: [None, None],
        });

        // If cloning a value further down panics, free everything copied so far.
        let guard = FreeOnUnwind(copy);
        for side in [Side::Left, Side::Right] {
            if let Some(child) = source.children[side.index()] {
                copy.set_child(side, child.clone_subtree(Some(copy), Some(side)));
            }
        }
        std::mem::forget(guard);
        copy
    }
}

/// Owns a partially built copy of a subtree in [`Link::clone_subtree`] until it's complete.
struct FreeOnUnwind<T>(Link<T>);

impl<T> Drop for FreeOnUnwind<T> {
    fn drop(&mut self) {
        // SAFETY: The copy isn't attached to anything yet (its parent only gets a pointer to it
        // once `clone_subtree` returns), so freeing it here can't leave a dangling owner.
        unsafe { self.0.free() };
    }
}

struct Node<T> {
    /// `None` for sentinels.
    value: Option<T>,
    color: Color,
    /// Non-owning. `None` only for the root.
    parent: Option<Link<T>>,
    /// Which child of `parent` this is. `None` only for the root.
    side: Option<Side>,
    /// Owning. Both `Some` for value-bearing nodes, both `None` for sentinels.
    children: [Option<Link<T>>; 2],
}

impl<T> Drop for Node<T> {
    // The tree is balanced so recursion depth is `O(lg N)`.
    fn drop(&mut self) {
        for child in self.children.iter_mut() {
            if let Some(child) = child.take() {
                // SAFETY: Dropping a node never drops its parent and we are the only owner of
                // these children so they won't be dropped twice.
                unsafe { child.free() };
            }
        }
    }
}

impl<T> fmt::Debug for Node<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            None => f.write_str("Sentinel"),
            Some(value) => f
                .debug_struct("Node")
                .field("value", value)
                .field("color", &self.color)
                .field("left", &self.child_node(Side::Left))
                .field("right", &self.child_node(Side::Right))
                .finish(),
        }
    }
}

impl<T> Node<T> {
    fn child_node(&self, side: Side) -> Option<&Node<T>> {
        // SAFETY: Children are owned by `self` so they live at least as long as this borrow, and
        // nothing mutates them without `&mut Tree`.
        self.children[side.index()].map(|child| unsafe { child.node() })
    }

    /// Checks the subtree rooted at this node and returns its black-height. `previous` is the last
    /// value seen by the in-order walk.
    fn check<'a>(
        &'a self,
        depth: usize,
        previous: &mut Option<&'a T>,
    ) -> Result<usize, InvariantViolation>
    where
        T: Ord,
    {
        let Some(value) = &self.value else {
            return match (self.color, self.children) {
                (Color::Black, [None, None]) => Ok(1),
                _ => Err(InvariantViolation::MalformedNode { depth }),
            };
        };
        let (Some(left), Some(right)) = (self.child_node(Side::Left), self.child_node(Side::Right))
        else {
            return Err(InvariantViolation::MalformedNode { depth });
        };

        let mut heights = [0; 2];
        for (side, child) in [(Side::Left, left), (Side::Right, right)] {
            if child.side != Some(side)
                || child.parent.map(|p| p.raw() as *const Node<T>) != Some(self as *const _)
            {
                return Err(InvariantViolation::BrokenParentLink { depth: depth + 1 });
            }
            if self.color == Color::Red && child.color == Color::Red {
                return Err(InvariantViolation::RedRedEdge { depth });
            }

            heights[side.index()] = child.check(depth + 1, previous)?;

            if side == Side::Left {
                if previous.map_or(false, |p| p >= value) {
                    return Err(InvariantViolation::OutOfOrder);
                }
                *previous = Some(value);
            }
        }

        let [left, right] = heights;
        if left != right {
            return Err(InvariantViolation::BlackHeightMismatch { depth, left, right });
        }
        Ok(left + usize::from(self.color == Color::Black))
    }
}
