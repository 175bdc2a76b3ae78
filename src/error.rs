use core::fmt;

use alloc::collections::TryReserveError;
use smallvec::CollectionAllocErr;

/// The ways a tree operation can fail.
///
/// Operations report failure through their return value; the tree is never
/// left partially mutated. In particular an insertion that fails with
/// [`Alloc`](Error::Alloc) has not advanced the item count, split any node,
/// or re-linked the leaf chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// The inserted item's key compared equal to a key already stored.
    /// The existing entry is preserved unchanged.
    Duplicate,
    /// No stored key compared equal to the probe.
    NotFound,
    /// The allocator could not provide memory for the operation.
    Alloc,
    /// The tree handle has no root node.
    NoRoot,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Duplicate => f.write_str("key is already present"),
            Error::NotFound => f.write_str("key not found"),
            Error::Alloc => f.write_str("allocation failed"),
            Error::NoRoot => f.write_str("tree has no root node"),
        }
    }
}

impl core::error::Error for Error {}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Error::Alloc
    }
}

impl From<CollectionAllocErr> for Error {
    fn from(_: CollectionAllocErr) -> Self {
        Error::Alloc
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_is_stable() {
        assert_eq!(Error::Duplicate.to_string(), "key is already present");
        assert_eq!(Error::NotFound.to_string(), "key not found");
        assert_eq!(Error::Alloc.to_string(), "allocation failed");
        assert_eq!(Error::NoRoot.to_string(), "tree has no root node");
    }
}
