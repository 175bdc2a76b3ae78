use core::fmt;
use core::iter::FusedIterator;

use alloc::vec::Vec;

use crate::compare::{Comparator, NaturalOrder};
use crate::error::Error;
use crate::raw::{Handle, RawBpTree};

/// An ordered index based on a [B+tree].
///
/// A `BpTree` stores opaque item handles in the order defined by a
/// [`Comparator`] fixed at construction. Each stored item doubles as its own
/// key: the comparator receives items on both sides, and a probe passed to a
/// lookup only has to carry enough of an item for the comparator to extract
/// its key. The tree never inspects, deep-copies, or frees whatever the
/// items refer to; their lifetime is the caller's concern.
///
/// All data lives in leaf nodes, which are chained in ascending key order,
/// so [`range`](BpTree::range) and [`iter`](BpTree::iter) walk forward
/// without re-descending from the root. Internal nodes hold only routing
/// keys. The branching factor (the maximum number of keys per node) is
/// chosen at construction and normalized to at least 3.
///
/// Keys are unique: inserting an item whose key compares equal to a stored
/// one fails with [`Error::Duplicate`] and leaves the existing entry in
/// place.
///
/// It is a logic error for the comparator to change its answers while the
/// tree holds items. The behavior resulting from such a logic error is not
/// specified (lookups may miss, orderings may break) but is memory-safe.
///
/// # Examples
///
/// ```
/// use bptree::BpTree;
///
/// let mut reviews = BpTree::new(5)?;
///
/// reviews.insert("Office Space")?;
/// reviews.insert("Pulp Fiction")?;
/// reviews.insert("The Godfather")?;
///
/// assert!(reviews.contains(&"Pulp Fiction"));
/// assert_eq!(reviews.len(), 3);
///
/// reviews.remove(&"Office Space")?;
/// assert_eq!(reviews.get(&"Office Space"), None);
///
/// for title in reviews.iter() {
///     println!("{title}");
/// }
/// # Ok::<(), bptree::Error>(())
/// ```
///
/// A custom order, including one that depends on external state, is a
/// closure away:
///
/// ```
/// use bptree::BpTree;
///
/// let mut newest_first: BpTree<u32, _> =
///     BpTree::with_comparator(4, |a: &u32, b: &u32| b.cmp(a))?;
/// newest_first.insert(2019)?;
/// newest_first.insert(2024)?;
/// let years: Vec<u32> = newest_first.iter().copied().collect();
/// assert_eq!(years, [2024, 2019]);
/// # Ok::<(), bptree::Error>(())
/// ```
///
/// # Concurrency
///
/// The tree performs no internal synchronization: shared references allow
/// concurrent lookups and scans, and any mutation requires the exclusive
/// access `&mut self` already enforces.
///
/// [B+tree]: https://en.wikipedia.org/wiki/B%2B_tree
pub struct BpTree<T, C = NaturalOrder> {
    raw: RawBpTree<T, C>,
}

impl<T: Clone + Ord> BpTree<T, NaturalOrder> {
    /// Creates an empty tree ordered by `T`'s [`Ord`] implementation.
    ///
    /// `order` is the branching factor, the maximum number of keys per
    /// node, and is normalized to at least 3.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alloc`] if the initial root leaf cannot be
    /// allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTree;
    ///
    /// let tree: BpTree<i32> = BpTree::new(2)?;
    /// assert_eq!(tree.order(), 3);
    /// assert!(tree.is_empty());
    /// # Ok::<(), bptree::Error>(())
    /// ```
    pub fn new(order: usize) -> Result<Self, Error> {
        Self::with_comparator(order, NaturalOrder)
    }
}

impl<T: Clone, C: Comparator<T>> BpTree<T, C> {
    /// Creates an empty tree ordered by `comparator`.
    ///
    /// The comparator must implement a pure total order and keep its answers
    /// stable for the lifetime of the tree. See [`Comparator`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alloc`] if the initial root leaf cannot be
    /// allocated.
    pub fn with_comparator(order: usize, comparator: C) -> Result<Self, Error> {
        Ok(Self {
            raw: RawBpTree::new(order, comparator)?,
        })
    }

    /// Enables or disables `log::debug!` diagnostics for this tree's
    /// structural changes (splits, borrows, merges, root growth and
    /// collapse). Off by default; the library installs no logger.
    #[must_use]
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.raw.set_debug(enabled);
        self
    }

    /// Inserts an item, keyed by itself under the tree's comparator.
    ///
    /// # Errors
    ///
    /// - [`Error::Duplicate`] if an equal key is already stored; the
    ///   existing entry is preserved unchanged.
    /// - [`Error::Alloc`] if node allocation fails; the tree is left exactly
    ///   as it was, with no count change and no split applied.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::{BpTree, Error};
    ///
    /// let mut tree = BpTree::new(4)?;
    /// assert_eq!(tree.insert("dup"), Ok(()));
    /// assert_eq!(tree.insert("dup"), Err(Error::Duplicate));
    /// assert_eq!(tree.len(), 1);
    /// # Ok::<(), bptree::Error>(())
    /// ```
    pub fn insert(&mut self, item: T) -> Result<(), Error> {
        self.raw.insert(item)
    }

    /// Removes the item whose key compares equal to `probe` and returns it.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no stored key compares equal.
    /// - [`Error::Alloc`] if the descent stack cannot grow; the tree is
    ///   untouched.
    /// - [`Error::NoRoot`] if the tree has no root node (unreachable for a
    ///   successfully constructed tree; kept as a defensive check).
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::{BpTree, Error};
    ///
    /// let mut tree = BpTree::new(4)?;
    /// tree.insert(7)?;
    /// assert_eq!(tree.remove(&7), Ok(7));
    /// assert_eq!(tree.remove(&7), Err(Error::NotFound));
    /// # Ok::<(), bptree::Error>(())
    /// ```
    pub fn remove(&mut self, probe: &T) -> Result<T, Error> {
        self.raw.remove(probe)
    }

    /// Returns a reference to the stored item whose key compares equal to
    /// `probe`, or `None`.
    pub fn get(&self, probe: &T) -> Option<&T> {
        self.raw.get(probe)
    }

    /// Returns true if a stored key compares equal to `probe`.
    pub fn contains(&self, probe: &T) -> bool {
        self.get(probe).is_some()
    }

    /// Collects every item with `lo <= key <= hi`, inclusive on both ends,
    /// into a caller-owned buffer in ascending key order.
    ///
    /// When `lo` sorts above `hi` no key can qualify and the buffer comes
    /// back empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Alloc`] if the result buffer cannot grow.
    ///
    /// # Examples
    ///
    /// ```
    /// use bptree::BpTree;
    ///
    /// let mut tree = BpTree::new(5)?;
    /// for fruit in ["apple", "banana", "cherry", "date", "fig", "grape"] {
    ///     tree.insert(fruit)?;
    /// }
    ///
    /// assert_eq!(tree.range(&"banana", &"fig")?, ["banana", "cherry", "date", "fig"]);
    /// assert_eq!(tree.range(&"cherry", &"cherry")?, ["cherry"]);
    /// assert_eq!(tree.range(&"aardvark", &"blueberry")?, ["apple", "banana"]);
    /// # Ok::<(), bptree::Error>(())
    /// ```
    pub fn range(&self, lo: &T, hi: &T) -> Result<Vec<T>, Error> {
        self.raw.range(lo, hi)
    }
}

impl<T, C> BpTree<T, C> {
    /// Returns the number of items stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns true if the tree stores no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of levels, leaves counted. An empty tree is a
    /// single leaf of height 1.
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Returns the branching factor the tree was constructed with, after
    /// normalization.
    #[must_use]
    pub fn order(&self) -> usize {
        self.raw.order()
    }

    /// Returns an iterator over every stored item in ascending key order.
    ///
    /// The iterator walks the leaf chain directly; it allocates nothing and
    /// yields each item in amortized constant time.
    pub fn iter(&self) -> Iter<'_, T, C> {
        Iter {
            raw: &self.raw,
            leaf: self.raw.first_leaf(),
            index: 0,
            remaining: self.raw.len(),
        }
    }
}

impl<T: fmt::Debug, C> fmt::Debug for BpTree<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a, T, C> IntoIterator for &'a BpTree<T, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, C>;

    fn into_iter(self) -> Iter<'a, T, C> {
        self.iter()
    }
}

/// An iterator over the items of a [`BpTree`] in ascending key order.
///
/// Created by [`BpTree::iter`].
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, T, C> {
    raw: &'a RawBpTree<T, C>,
    leaf: Option<Handle>,
    index: usize,
    remaining: usize,
}

impl<'a, T, C> Iterator for Iter<'a, T, C> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        loop {
            let leaf = self.raw.leaf(self.leaf?);
            if self.index < leaf.key_count() {
                let item = leaf.key(self.index);
                self.index += 1;
                self.remaining -= 1;
                return Some(item);
            }
            self.leaf = leaf.next();
            self.index = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, C> ExactSizeIterator for Iter<'_, T, C> {}

impl<T, C> FusedIterator for Iter<'_, T, C> {}
