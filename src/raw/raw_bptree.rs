use alloc::vec::Vec;
use core::cmp::Ordering;

use smallvec::SmallVec;

use crate::compare::Comparator;
use crate::error::Error;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{InternalNode, LeafNode, Node, SearchResult};

/// Smallest accepted branching factor; anything lower is normalized up.
pub(crate) const MIN_ORDER: usize = 3;

/// The core B+tree implementation backing [`BpTree`](crate::BpTree).
pub(crate) struct RawBpTree<T, C> {
    /// Arena owning every node of the tree.
    nodes: Arena<Node<T>>,
    /// Handle to the root node. Always present after construction; kept
    /// optional so a missing root is reported rather than dereferenced.
    root: Option<Handle>,
    /// Maximum number of keys a node may hold (the branching factor).
    order: usize,
    /// Minimum number of keys a non-root node must retain.
    min_keys: usize,
    /// Number of levels, leaves counted. A lone root leaf is height 1.
    height: usize,
    /// Number of items currently stored.
    count: usize,
    /// The injected total order over items.
    comparator: C,
    /// Emit `log::debug!` diagnostics for structural changes.
    debug: bool,
}

/// Frame recorded while descending: an internal node and the child index
/// that was followed out of it.
struct PathElement {
    node: Handle,
    child_index: usize,
}

/// Descent stack. Sixteen inline frames cover any realistic height; deeper
/// trees spill to the heap, reserved up front from the known height.
type Path = SmallVec<[PathElement; 16]>;

/// Every node one insertion might create, allocated before the tree is
/// touched so an allocation failure leaves it bit-for-bit unchanged.
struct SplitPlan<T> {
    right_leaf: LeafNode<T>,
    /// Right halves for full ancestors, bottom-up.
    right_internals: SmallVec<[InternalNode<T>; 2]>,
    /// Replacement root, present when every node on the path is full.
    new_root: Option<InternalNode<T>>,
}

impl<T, C> RawBpTree<T, C> {
    /// Creates an empty tree: a single empty leaf as the root.
    pub(crate) fn new(order: usize, comparator: C) -> Result<Self, Error> {
        let order = order.max(MIN_ORDER);
        let mut nodes = Arena::new();
        nodes.try_reserve(1)?;
        let root = nodes.alloc(Node::Leaf(LeafNode::with_order(order)?));
        Ok(Self {
            nodes,
            root: Some(root),
            order,
            min_keys: order.div_ceil(2),
            height: 1,
            count: 0,
            comparator,
            debug: false,
        })
    }

    pub(crate) fn set_debug(&mut self, enabled: bool) {
        self.debug = enabled;
        if enabled {
            log::debug!("debug logging enabled (order={}, min_keys={})", self.order, self.min_keys);
        }
    }

    /// Returns the number of items stored.
    pub(crate) const fn len(&self) -> usize {
        self.count
    }

    /// Returns the branching factor.
    pub(crate) const fn order(&self) -> usize {
        self.order
    }

    /// Returns the number of levels, leaves counted.
    pub(crate) const fn height(&self) -> usize {
        self.height
    }

    /// Returns the leftmost leaf, the head of the leaf chain.
    pub(crate) fn first_leaf(&self) -> Option<Handle> {
        let mut current = self.root?;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => current = internal.child(0),
                Node::Leaf(_) => return Some(current),
            }
        }
    }

    /// Returns the leaf behind `handle`.
    pub(crate) fn leaf(&self, handle: Handle) -> &LeafNode<T> {
        self.nodes.get(handle).as_leaf()
    }
}

impl<T: Clone, C: Comparator<T>> RawBpTree<T, C> {
    /// Returns the stored item whose key compares equal to `probe`.
    pub(crate) fn get(&self, probe: &T) -> Option<&T> {
        let mut current = self.root?;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    current = internal.child(internal.search_child(probe, &self.comparator));
                }
                Node::Leaf(leaf) => {
                    return match leaf.search(probe, &self.comparator) {
                        SearchResult::Found(index) => Some(leaf.key(index)),
                        SearchResult::NotFound(_) => None,
                    };
                }
            }
        }
    }

    /// Walks from the root to the leaf that owns `probe`'s position,
    /// recording each internal node and the child index followed.
    fn descend_to_leaf(&self, probe: &T) -> Result<(Handle, Path), Error> {
        let Some(root) = self.root else {
            return Err(Error::NoRoot);
        };
        let mut path = Path::new();
        path.try_reserve(self.height.saturating_sub(1))?;
        let mut current = root;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    let child_index = internal.search_child(probe, &self.comparator);
                    path.push(PathElement { node: current, child_index });
                    current = internal.child(child_index);
                }
                Node::Leaf(_) => return Ok((current, path)),
            }
        }
    }

    /// Inserts one item, keyed by itself under the tree's comparator.
    pub(crate) fn insert(&mut self, item: T) -> Result<(), Error> {
        let (leaf_handle, mut path) = self.descend_to_leaf(&item)?;
        let index = match self.nodes.get(leaf_handle).as_leaf().search(&item, &self.comparator) {
            SearchResult::Found(_) => return Err(Error::Duplicate),
            SearchResult::NotFound(index) => index,
        };

        let plan = self.plan_splits(leaf_handle, &path)?;

        self.nodes.get_mut(leaf_handle).as_leaf_mut().insert(index, item);
        if let Some(plan) = plan {
            self.split_and_propagate(leaf_handle, &mut path, plan);
        }
        self.count += 1;
        Ok(())
    }

    /// Pre-allocates every node this insertion may create: the right leaf,
    /// one right internal per full ancestor (bottom-up), and a replacement
    /// root when the whole path is full. Returns `None` while the target
    /// leaf still has room. On failure nothing has been mutated.
    fn plan_splits(&mut self, leaf_handle: Handle, path: &Path) -> Result<Option<SplitPlan<T>>, Error> {
        if self.nodes.get(leaf_handle).as_leaf().key_count() < self.order {
            return Ok(None);
        }

        let mut internal_splits = 0;
        let mut splits_root = true;
        for elem in path.iter().rev() {
            if self.nodes.get(elem.node).as_internal().key_count() == self.order {
                internal_splits += 1;
            } else {
                splits_root = false;
                break;
            }
        }

        match self.build_split_plan(internal_splits, splits_root) {
            Ok(plan) => Ok(Some(plan)),
            Err(error) => {
                if self.debug {
                    log::debug!("insert aborted: could not allocate split nodes");
                }
                Err(error)
            }
        }
    }

    fn build_split_plan(&mut self, internal_splits: usize, splits_root: bool) -> Result<SplitPlan<T>, Error> {
        let right_leaf = LeafNode::with_order(self.order)?;
        let mut right_internals: SmallVec<[InternalNode<T>; 2]> = SmallVec::new();
        right_internals.try_reserve(internal_splits)?;
        for _ in 0..internal_splits {
            right_internals.push(InternalNode::with_order(self.order)?);
        }
        let new_root = if splits_root {
            Some(InternalNode::with_order(self.order)?)
        } else {
            None
        };
        self.nodes.try_reserve(1 + internal_splits + usize::from(splits_root))?;
        Ok(SplitPlan { right_leaf, right_internals, new_root })
    }

    /// Splits the overfull leaf and pushes separators upward, splitting each
    /// ancestor that overflows in turn. Infallible: every node it installs
    /// comes out of the plan.
    fn split_and_propagate(&mut self, leaf_handle: Handle, path: &mut Path, plan: SplitPlan<T>) {
        let SplitPlan { right_leaf, right_internals, new_root } = plan;
        let (mut separator, mut new_child) = self.split_leaf(leaf_handle, right_leaf);
        let mut right_internals = right_internals.into_iter();

        while let Some(elem) = path.pop() {
            let parent = self.nodes.get_mut(elem.node).as_internal_mut();
            parent.insert_entry(elem.child_index, separator, new_child);
            if parent.key_count() <= self.order {
                return;
            }
            let right = right_internals.next().expect("split plan covers every full ancestor");
            (separator, new_child) = self.split_internal(elem.node, right);
        }

        // Every node on the path split, the old root included: grow a level.
        let old_root = self.root.expect("tree keeps its root during insertion");
        let mut root = new_root.expect("split plan includes a replacement root");
        root.set_first_child(old_root);
        root.push_entry(separator, new_child);
        self.root = Some(self.nodes.alloc(Node::Internal(root)));
        self.height += 1;
        if self.debug {
            log::debug!("root split: height is now {}", self.height);
        }
    }

    /// Splits an overfull leaf, linking `right` in as its chain successor.
    /// Returns the promoted separator (the right leaf's first key) and the
    /// right leaf's handle.
    fn split_leaf(&mut self, leaf_handle: Handle, mut right: LeafNode<T>) -> (T, Handle) {
        let split = self.order.div_ceil(2);
        let leaf = self.nodes.get_mut(leaf_handle).as_leaf_mut();
        leaf.split_tail(split, &mut right);
        right.set_next(leaf.next());
        let separator = right.key(0).clone();
        let right_handle = self.nodes.alloc(Node::Leaf(right));
        self.nodes.get_mut(leaf_handle).as_leaf_mut().set_next(Some(right_handle));
        (separator, right_handle)
    }

    /// Splits an overfull internal node. The middle key moves upward and
    /// remains in neither half.
    fn split_internal(&mut self, node_handle: Handle, mut right: InternalNode<T>) -> (T, Handle) {
        let split = self.order.div_ceil(2);
        let node = self.nodes.get_mut(node_handle).as_internal_mut();
        let median = node.split_tail(split, &mut right);
        let right_handle = self.nodes.alloc(Node::Internal(right));
        (median, right_handle)
    }

    /// Removes the item whose key compares equal to `probe` and returns it.
    pub(crate) fn remove(&mut self, probe: &T) -> Result<T, Error> {
        let (leaf_handle, mut path) = self.descend_to_leaf(probe)?;
        let index = match self.nodes.get(leaf_handle).as_leaf().search(probe, &self.comparator) {
            SearchResult::Found(index) => index,
            SearchResult::NotFound(_) => return Err(Error::NotFound),
        };

        // Merges recycle one arena slot per level; reserve the free list up
        // front so the rebalance loop below cannot hit the allocator.
        self.nodes.try_reserve(self.height)?;

        let removed = self.nodes.get_mut(leaf_handle).as_leaf_mut().remove(index);

        // Walk back up while the fill invariant is broken. A borrow settles
        // the level and the loop exits at its parent; a merge shrinks the
        // parent, which may itself underflow, so the loop keeps climbing.
        let mut current = leaf_handle;
        while self.is_underfull(current) {
            let Some(elem) = path.pop() else { break };
            if self.debug {
                log::debug!(
                    "rebalancing: child {} of internal node, {} frames above",
                    elem.child_index,
                    path.len()
                );
            }
            self.rebalance_child(elem.node, elem.child_index);
            current = elem.node;
        }

        self.collapse_root();
        self.count -= 1;
        Ok(removed)
    }

    fn is_underfull(&self, handle: Handle) -> bool {
        self.root != Some(handle) && self.nodes.get(handle).key_count() < self.min_keys
    }

    /// Restores the fill invariant for the child at `child_index` of
    /// `parent_handle`. Borrows from the left sibling when it has surplus,
    /// then from the right; merges when neither can lend.
    fn rebalance_child(&mut self, parent_handle: Handle, child_index: usize) {
        let parent = self.nodes.get(parent_handle).as_internal();
        let child = parent.child(child_index);
        let left = (child_index > 0).then(|| parent.child(child_index - 1));
        let right = (child_index < parent.key_count()).then(|| parent.child(child_index + 1));

        if let Some(left) = left
            && self.nodes.get(left).key_count() > self.min_keys
        {
            self.borrow_from_left(parent_handle, child_index, left, child);
        } else if let Some(right) = right
            && self.nodes.get(right).key_count() > self.min_keys
        {
            self.borrow_from_right(parent_handle, child_index, right, child);
        } else if let Some(left) = left {
            if self.debug {
                log::debug!("merging child {child_index} into its left sibling");
            }
            self.merge_into_left_sibling(parent_handle, child_index, left, child);
        } else {
            // A non-root node always has a sibling on one side or the other.
            let right = right.expect("underfull child has a right sibling");
            if self.debug {
                log::debug!("merging right sibling into child {child_index}");
            }
            self.absorb_right_sibling(parent_handle, child_index, child, right);
        }
    }

    /// Moves the left sibling's greatest entry over to the underfull child.
    fn borrow_from_left(
        &mut self,
        parent_handle: Handle,
        child_index: usize,
        left_handle: Handle,
        child_handle: Handle,
    ) {
        if self.nodes.get(child_handle).is_leaf() {
            let left = self.nodes.get_mut(left_handle).as_leaf_mut();
            let item = left.pop().expect("lending sibling has surplus keys");
            let child = self.nodes.get_mut(child_handle).as_leaf_mut();
            child.push_front(item);
            let separator = child.key(0).clone();
            self.nodes.get_mut(parent_handle).as_internal_mut().set_key(child_index - 1, separator);
        } else {
            // The parent separator rotates down; the sibling's last key
            // rotates up; its last child crosses over.
            let left = self.nodes.get_mut(left_handle).as_internal_mut();
            let (left_key, left_child) = left.pop_entry().expect("lending sibling has surplus keys");
            let parent = self.nodes.get_mut(parent_handle).as_internal_mut();
            let separator = parent.replace_key(child_index - 1, left_key);
            self.nodes.get_mut(child_handle).as_internal_mut().push_front_entry(separator, left_child);
        }
    }

    /// Moves the right sibling's smallest entry over to the underfull child.
    fn borrow_from_right(
        &mut self,
        parent_handle: Handle,
        child_index: usize,
        right_handle: Handle,
        child_handle: Handle,
    ) {
        if self.nodes.get(child_handle).is_leaf() {
            let right = self.nodes.get_mut(right_handle).as_leaf_mut();
            let item = right.pop_front().expect("lending sibling has surplus keys");
            let separator = right.key(0).clone();
            self.nodes.get_mut(child_handle).as_leaf_mut().push(item);
            self.nodes.get_mut(parent_handle).as_internal_mut().set_key(child_index, separator);
        } else {
            let right = self.nodes.get_mut(right_handle).as_internal_mut();
            let (right_key, right_child) = right.pop_front_entry().expect("lending sibling has surplus keys");
            let parent = self.nodes.get_mut(parent_handle).as_internal_mut();
            let separator = parent.replace_key(child_index, right_key);
            self.nodes.get_mut(child_handle).as_internal_mut().push_entry(separator, right_child);
        }
    }

    /// Folds the underfull child into its left sibling and drops its slot
    /// from the parent. The parent loses one separator.
    fn merge_into_left_sibling(
        &mut self,
        parent_handle: Handle,
        child_index: usize,
        left_handle: Handle,
        child_handle: Handle,
    ) {
        let parent = self.nodes.get_mut(parent_handle).as_internal_mut();
        let (separator, removed) = parent.remove_entry(child_index - 1);
        debug_assert_eq!(removed, child_handle);

        match self.nodes.take(child_handle) {
            Node::Leaf(leaf) => {
                self.nodes.get_mut(left_handle).as_leaf_mut().merge_with_right(leaf);
            }
            Node::Internal(internal) => {
                self.nodes.get_mut(left_handle).as_internal_mut().merge_with_right(separator, internal);
            }
        }
    }

    /// Folds the right sibling into the underfull child and drops the
    /// sibling's slot from the parent. The parent loses one separator.
    fn absorb_right_sibling(
        &mut self,
        parent_handle: Handle,
        child_index: usize,
        child_handle: Handle,
        right_handle: Handle,
    ) {
        let parent = self.nodes.get_mut(parent_handle).as_internal_mut();
        let (separator, removed) = parent.remove_entry(child_index);
        debug_assert_eq!(removed, right_handle);

        match self.nodes.take(right_handle) {
            Node::Leaf(leaf) => {
                self.nodes.get_mut(child_handle).as_leaf_mut().merge_with_right(leaf);
            }
            Node::Internal(internal) => {
                self.nodes.get_mut(child_handle).as_internal_mut().merge_with_right(separator, internal);
            }
        }
    }

    /// Replaces an internal root that has run out of separators with its
    /// sole remaining child.
    fn collapse_root(&mut self) {
        let root_handle = self.root.expect("tree keeps its root during deletion");
        if let Node::Internal(root) = self.nodes.get(root_handle)
            && root.key_count() == 0
        {
            let child = root.child(0);
            self.nodes.free(root_handle);
            self.root = Some(child);
            self.height -= 1;
            if self.debug {
                log::debug!("root collapsed: height is now {}", self.height);
            }
        }
    }

    /// Collects clones of every item with `lo <= key <= hi`, in ascending
    /// order. Descends to the leaf that would hold `lo`, then walks the leaf
    /// chain, stopping at the first key above `hi`.
    pub(crate) fn range(&self, lo: &T, hi: &T) -> Result<Vec<T>, Error> {
        let mut results = Vec::new();
        let Some(root) = self.root else {
            return Ok(results);
        };

        let mut current = root;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => {
                    current = internal.child(internal.search_child(lo, &self.comparator));
                }
                Node::Leaf(_) => break,
            }
        }

        let mut leaf_handle = Some(current);
        while let Some(handle) = leaf_handle {
            let leaf = self.nodes.get(handle).as_leaf();
            for index in 0..leaf.key_count() {
                let key = leaf.key(index);
                if self.comparator.compare(key, hi) == Ordering::Greater {
                    // The chain is sorted; nothing further can qualify.
                    return Ok(results);
                }
                if self.comparator.compare(key, lo) != Ordering::Less {
                    results.try_reserve(1)?;
                    results.push(key.clone());
                }
            }
            leaf_handle = leaf.next();
        }
        Ok(results)
    }
}

#[cfg(test)]
impl<T: Clone, C: Comparator<T>> RawBpTree<T, C> {
    /// Checks every structural invariant, panicking with a description of
    /// the first violation. Test-only; used after each step of the
    /// randomized suites.
    pub(crate) fn validate_invariants(&self) {
        let root = self.root.expect("constructed tree always has a root");
        let mut leaves: Vec<Handle> = Vec::new();
        let mut leaf_depth: Option<usize> = None;
        let mut nodes_seen = 0;
        self.validate_node(root, 1, &mut leaf_depth, &mut leaves, &mut nodes_seen);

        assert_eq!(
            leaf_depth.expect("tree has at least one leaf"),
            self.height,
            "leaf depth does not match the recorded height"
        );

        // The chain starts at the leftmost leaf, visits every leaf once in
        // order, and terminates.
        assert_eq!(self.first_leaf(), leaves.first().copied());
        for (i, &handle) in leaves.iter().enumerate() {
            assert_eq!(
                self.nodes.get(handle).as_leaf().next(),
                leaves.get(i + 1).copied(),
                "leaf chain diverges after leaf {i}"
            );
        }

        let total: usize = leaves.iter().map(|&h| self.nodes.get(h).key_count()).sum();
        assert_eq!(total, self.count, "count does not match leaf contents");

        assert_eq!(self.nodes.len(), nodes_seen, "arena holds unreachable nodes");
    }

    /// Validates the subtree at `handle`, returning its (min, max) key span.
    fn validate_node(
        &self,
        handle: Handle,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        leaves: &mut Vec<Handle>,
        nodes_seen: &mut usize,
    ) -> Option<(T, T)> {
        *nodes_seen += 1;
        let is_root = self.root == Some(handle);
        match self.nodes.get(handle) {
            Node::Leaf(leaf) => {
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(expected) => assert_eq!(depth, expected, "leaves sit at different depths"),
                }

                let n = leaf.key_count();
                assert!(n <= self.order, "leaf holds {n} keys, more than the order allows");
                if !is_root {
                    assert!(n >= self.min_keys, "non-root leaf holds {n} keys, fewer than min_keys");
                }
                for i in 1..n {
                    assert_eq!(
                        self.comparator.compare(leaf.key(i - 1), leaf.key(i)),
                        Ordering::Less,
                        "leaf keys are not strictly increasing at index {i}"
                    );
                }

                leaves.push(handle);
                (n > 0).then(|| (leaf.key(0).clone(), leaf.key(n - 1).clone()))
            }
            Node::Internal(internal) => {
                let n = internal.key_count();
                assert_eq!(internal.child_count(), n + 1, "children must outnumber keys by one");
                assert!(n <= self.order, "internal node holds {n} keys, more than the order allows");
                if is_root {
                    assert!(n >= 1, "internal root must hold at least one key");
                } else {
                    assert!(n >= self.min_keys, "non-root internal holds {n} keys, fewer than min_keys");
                }
                for i in 1..n {
                    assert_eq!(
                        self.comparator.compare(internal.key(i - 1), internal.key(i)),
                        Ordering::Less,
                        "internal keys are not strictly increasing at index {i}"
                    );
                }

                let mut span: Option<(T, T)> = None;
                for i in 0..=n {
                    let child_span =
                        self.validate_node(internal.child(i), depth + 1, leaf_depth, leaves, nodes_seen);
                    let (child_min, child_max) = child_span.expect("only a root leaf may be empty");

                    // Routing: child i sorts below keys[i]; child i + 1 sorts
                    // at or above keys[i].
                    if i < n {
                        assert_eq!(
                            self.comparator.compare(&child_max, internal.key(i)),
                            Ordering::Less,
                            "child {i} holds a key at or above its right separator"
                        );
                    }
                    if i > 0 {
                        assert_ne!(
                            self.comparator.compare(&child_min, internal.key(i - 1)),
                            Ordering::Less,
                            "child {i} holds a key below its left separator"
                        );
                    }

                    span = match span {
                        None => Some((child_min, child_max)),
                        Some((min, _)) => Some((min, child_max)),
                    };
                }
                span
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::compare::NaturalOrder;
    use alloc::collections::BTreeSet;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    fn tree(order: usize) -> RawBpTree<i64, NaturalOrder> {
        RawBpTree::new(order, NaturalOrder).unwrap()
    }

    /// Fisher-Yates with an LCG, for deterministic shuffles.
    fn shuffled(n: i64, mut seed: u64) -> Vec<i64> {
        let mut keys: Vec<i64> = (0..n).collect();
        for i in (1..keys.len()).rev() {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            #[allow(clippy::cast_possible_truncation)]
            let j = (seed >> 33) as usize % (i + 1);
            keys.swap(i, j);
        }
        keys
    }

    #[test]
    fn order_is_normalized_to_at_least_three() {
        assert_eq!(tree(0).order(), 3);
        assert_eq!(tree(2).order(), 3);
        assert_eq!(tree(7).order(), 7);
    }

    #[test]
    fn empty_tree_shape() {
        let tree = tree(4);
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.get(&1), None);
        tree.validate_invariants();
    }

    #[test]
    fn duplicate_insert_is_rejected_and_leaves_count_alone() {
        let mut tree = tree(4);
        assert_eq!(tree.insert(7), Ok(()));
        assert_eq!(tree.insert(7), Err(Error::Duplicate));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(&7), Some(&7));
        tree.validate_invariants();
    }

    #[test]
    fn remove_missing_reports_not_found_and_leaves_count_alone() {
        let mut tree = tree(4);
        tree.insert(1).unwrap();
        assert_eq!(tree.remove(&2), Err(Error::NotFound));
        assert_eq!(tree.len(), 1);
        tree.validate_invariants();
    }

    #[test]
    fn height_grows_on_root_split_and_shrinks_on_collapse() {
        let mut tree = tree(3);
        let mut grew_past_two = false;
        for key in 0..64 {
            tree.insert(key).unwrap();
            tree.validate_invariants();
            grew_past_two |= tree.height() > 2;
        }
        assert!(grew_past_two, "64 keys at order 3 must grow at least three levels");

        for key in 0..64 {
            tree.remove(&key).unwrap();
            tree.validate_invariants();
        }
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn sequential_insert_then_sequential_delete() {
        // Ascending inserts produce a chain of right-edge splits; ascending
        // deletes drain the leftmost leaf and exercise leftmost merges.
        let mut tree = tree(4);
        for key in 0..100 {
            tree.insert(key).unwrap();
            tree.validate_invariants();
        }
        for key in 0..100 {
            assert_eq!(tree.remove(&key), Ok(key));
            tree.validate_invariants();
        }
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn shuffled_insert_then_shuffled_delete() {
        let mut tree = tree(4);
        for &key in &shuffled(999, 0xDEC0DE) {
            tree.insert(key).unwrap();
            tree.validate_invariants();
        }
        assert_eq!(tree.len(), 999);

        for &key in &shuffled(999, 0xFACADE) {
            assert_eq!(tree.remove(&key), Ok(key));
            tree.validate_invariants();
        }
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let mut tree = tree(4);
        for key in (0..50).map(|k| k * 2) {
            tree.insert(key).unwrap();
        }
        assert_eq!(tree.range(&10, &16).unwrap(), [10, 12, 14, 16]);
        assert_eq!(tree.range(&9, &17).unwrap(), [10, 12, 14, 16]);
        assert_eq!(tree.range(&16, &10).unwrap(), Vec::<i64>::new());
        tree.validate_invariants();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Replays a random operation sequence against `BTreeSet`, checking
        /// every structural invariant after every step.
        #[test]
        fn random_ops_hold_invariants(
            order in 3usize..=8,
            ops in proptest::collection::vec(op_strategy(), 0..300),
        ) {
            let mut tree: RawBpTree<i64, NaturalOrder> = RawBpTree::new(order, NaturalOrder).unwrap();
            let mut model: BTreeSet<i64> = BTreeSet::new();

            for op in ops {
                match op {
                    Op::Insert(key) => {
                        let expected = if model.insert(key) { Ok(()) } else { Err(Error::Duplicate) };
                        prop_assert_eq!(tree.insert(key), expected, "insert({})", key);
                    }
                    Op::Remove(key) => {
                        let expected = if model.remove(&key) { Ok(key) } else { Err(Error::NotFound) };
                        prop_assert_eq!(tree.remove(&key), expected, "remove({})", key);
                    }
                    Op::Get(key) => {
                        prop_assert_eq!(tree.get(&key).copied(), model.get(&key).copied(), "get({})", key);
                    }
                }
                prop_assert_eq!(tree.len(), model.len());
                tree.validate_invariants();
            }

            let everything = tree.range(&i64::MIN, &i64::MAX).unwrap();
            let expected: Vec<i64> = model.iter().copied().collect();
            prop_assert_eq!(everything, expected, "full-domain range must list the model");
        }

        /// Range results match the model for arbitrary inclusive bounds.
        #[test]
        fn random_ranges_match_model(
            keys in proptest::collection::btree_set(-200i64..200, 0..150),
            lo in -250i64..250,
            hi in -250i64..250,
        ) {
            let mut tree = tree(5);
            for &key in &keys {
                tree.insert(key).unwrap();
            }
            let got = tree.range(&lo, &hi).unwrap();
            let expected: Vec<i64> = keys.iter().copied().filter(|k| (lo..=hi).contains(k)).collect();
            prop_assert_eq!(got, expected);
        }
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i64),
        Remove(i64),
        Get(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        // Keys drawn from a narrow range so inserts collide and deletes hit.
        prop_oneof![
            5 => (-40i64..40).prop_map(Op::Insert),
            4 => (-40i64..40).prop_map(Op::Remove),
            2 => (-40i64..40).prop_map(Op::Get),
        ]
    }
}
