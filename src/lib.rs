//! This crate exposes a red-black tree, a self-balancing Binary Search Tree (BST).
//!
//! ## Binary Search Tree
//!
//! A Binary Search Tree is a data structure supporting operations to insert, find, and delete
//! stored records. Its most important invariants are:
//!
//! 1. For every `Node` in a BST, all the `Node`s in its left subtree have a value less than its
//!    own value.
//! 2. For every `Node` in a BST, all the `Node`s in its right subtree have a value greater than
//!    its own value.
//!
//! Searching takes `O(height)`, so a BST is only as fast as it is short. Inserting values in
//! ascending order into a plain BST degrades it into a linked list.
//!
//! ## Red-Black Tree
//!
//! A red-black tree keeps its height at most `2 * lg(N + 1)` by coloring every node red or black
//! and maintaining:
//!
//! 1. The root is black.
//! 2. A red node never has a red child.
//! 3. Every path from a node down to a leaf passes through the same number of black nodes (its
//!    "black-height").
//!
//! Insertions and deletions break these locally and repair them with recoloring and rotations
//! that walk at most `O(lg N)` levels back up towards the root. See [`redblack`].

#![deny(missing_docs, clippy::clone_on_ref_ptr)]

pub mod redblack;

#[cfg(test)]
mod test;
