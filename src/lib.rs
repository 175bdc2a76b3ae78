//! An in-memory B+tree index.
//!
//! This crate provides [`BpTree`], an ordered index over opaque item handles.
//! All data lives in leaf nodes, which are chained into a forward-linked list
//! in ascending key order, so point operations cost O(log n) and range scans
//! cost O(log n + k) without re-descending the tree.
//!
//! The ordering is injected at construction: either the item type's natural
//! [`Ord`] order, or any [`Comparator`]. Closures qualify, so an order that
//! depends on external state simply captures that state.
//!
//! # Example
//!
//! ```
//! use bptree::BpTree;
//!
//! let mut index = BpTree::new(5)?;
//! index.insert("apple")?;
//! index.insert("banana")?;
//! index.insert("cherry")?;
//!
//! assert_eq!(index.get(&"banana"), Some(&"banana"));
//! assert_eq!(index.get(&"durian"), None);
//!
//! // Range scans are inclusive on both ends.
//! let hits = index.range(&"apple", &"banana")?;
//! assert_eq!(hits, ["apple", "banana"]);
//! # Ok::<(), bptree::Error>(())
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Caller-defined key order** - A comparator is injected at construction and
//!   used for every search, insert, and scan
//! - **Opaque items** - The tree stores handles; it never inspects, deep-copies,
//!   or frees what they refer to
//! - **Explicit allocation failure** - Mutating operations reserve everything they
//!   may need up front and report [`Error::Alloc`] with the tree left untouched
//!
//! # Implementation
//!
//! Nodes live in a slot arena and reference each other by niche-optimized
//! handles; the leaf chain's `next` link is such a handle, never an owner.
//! Each node's key array is allocated to the tree's branching factor at node
//! creation, so steady-state inserts, borrows, and merges never reallocate.
//! Deletion rebalances iteratively over an explicit descent stack, borrowing
//! from a sibling where one has surplus and merging otherwise, cascading as
//! far up as the fill invariant requires.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod compare;
mod error;
mod raw;

pub mod tree;

pub use compare::{Comparator, NaturalOrder};
pub use error::Error;
pub use tree::{BpTree, Iter};
