//! Adjacency entries: a neighboring link or a network boundary sentinel.

use crate::topology::ids::LinkId;
use std::fmt;

/// Marker standing in for a link id at the edge of the network.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Boundary {
    /// No connection. Never stored in an adjacency list: an empty list is the
    /// no-flow state.
    NoFlow,
    /// Water enters from outside the domain (upstream side only).
    Inflow,
    /// Water leaves the domain (downstream side only).
    Outflow,
}

/// One entry of an upstream or downstream list.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Endpoint {
    Link(LinkId),
    Boundary(Boundary),
}

impl Endpoint {
    pub const NO_FLOW: Endpoint = Endpoint::Boundary(Boundary::NoFlow);
    pub const INFLOW: Endpoint = Endpoint::Boundary(Boundary::Inflow);
    pub const OUTFLOW: Endpoint = Endpoint::Boundary(Boundary::Outflow);

    /// The neighboring link, if this entry is not a boundary.
    #[inline]
    pub fn link(self) -> Option<LinkId> {
        match self {
            Endpoint::Link(id) => Some(id),
            Endpoint::Boundary(_) => None,
        }
    }

    #[inline]
    pub fn is_no_flow(self) -> bool {
        self == Self::NO_FLOW
    }
}

impl From<LinkId> for Endpoint {
    fn from(id: LinkId) -> Self {
        Endpoint::Link(id)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Link(id) => write!(f, "link {id}"),
            Endpoint::Boundary(b) => write!(f, "{b:?}"),
        }
    }
}
