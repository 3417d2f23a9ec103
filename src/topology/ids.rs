//! `LinkId` and `MeshEdgeId`: strong, zero-cost handles for graph entities
//!
//! Every link in the channel network is addressed by its position in the
//! [`LinkTable`](crate::topology::link_table::LinkTable). The position is
//! stable for the lifetime of the table: links are never removed, only
//! converted to `PrunedStream`, and new links created by splitting are
//! appended. Mesh boundary edges are addressed the same way by their index in
//! the mesh edge list.
//!
//! Both ids are `repr(transparent)` wrappers around `usize` so they can be
//! used as `Vec` indices without conversion cost while keeping the two id
//! spaces from being mixed up.

use std::fmt;

/// Stable index of a link in the link table.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct LinkId(usize);

impl LinkId {
    /// Creates a `LinkId` from a raw table index.
    #[inline]
    pub const fn new(raw: usize) -> Self {
        LinkId(raw)
    }

    /// Returns the table index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LinkId").field(&self.0).finish()
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for LinkId {
    fn from(raw: usize) -> Self {
        LinkId(raw)
    }
}

/// Index of a mesh edge in [`MeshBoundary::edges`](crate::io::MeshBoundary).
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct MeshEdgeId(usize);

impl MeshEdgeId {
    /// Creates a `MeshEdgeId` from a raw edge index.
    #[inline]
    pub const fn new(raw: usize) -> Self {
        MeshEdgeId(raw)
    }

    /// Returns the edge index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for MeshEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MeshEdgeId").field(&self.0).finish()
    }
}

impl fmt::Display for MeshEdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(LinkId, usize);
    assert_eq_size!(MeshEdgeId, usize);
    assert_eq_align!(LinkId, usize);
}
