//! NetworkError: unified error type for channel-network construction.
//!
//! Every fallible operation in this crate returns `Result<_, NetworkError>`.
//! The run is fail-fast: callers propagate with `?` and abort on the first
//! error. Each variant names the offending link, element, or edge so the
//! diagnostic is actionable without a debugger.

use crate::topology::endpoint::{Boundary, Endpoint};
use crate::topology::ids::{LinkId, MeshEdgeId};
use crate::topology::link::LinkKind;
use thiserror::Error;

/// Coarse classification of a [`NetworkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed header, wrong field count, or unparsable value.
    InputFormat,
    /// A link, node, or edge id that does not exist or is out of range.
    Referential,
    /// A bounded slot (adjacency soft cap, output list width) is full.
    Capacity,
    /// Cycle, violated invariant, or non-reciprocal connection.
    Topology,
    /// Degenerate shape or location where one is disallowed.
    Geometry,
}

/// Unified error type for channel-network operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    // ----- input format -----
    /// Mesh text file could not be parsed.
    #[error("Mesh parse error: {0}")]
    MeshParse(String),
    /// Link identities must be listed as `0..n` in order.
    #[error("Link identity list out of order: expected id {expected}, found {found}")]
    NonSequentialLinkId { expected: usize, found: usize },
    /// Two identities share one reach code.
    #[error("Reach code {code} assigned to both link {first} and link {second}")]
    DuplicateReachCode {
        code: i64,
        first: LinkId,
        second: LinkId,
    },
    /// A record attribute is out of its valid range.
    #[error("Link {link}: invalid {attribute} = {value}")]
    InvalidAttribute {
        link: LinkId,
        attribute: &'static str,
        value: f64,
    },
    /// Waterbody type string or code not recognized.
    #[error("Unknown waterbody type: {0}")]
    UnknownWaterbodyType(String),
    /// Configuration value out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Underlying I/O failure (stringified so the error stays `Clone`).
    #[error("I/O error: {0}")]
    Io(String),

    // ----- referential -----
    /// Link id beyond the end of the link table.
    #[error("Link {link} out of range (table has {len} links)")]
    LinkOutOfRange { link: LinkId, len: usize },
    /// No link carries this reach code.
    #[error("No link with reach code {0}")]
    UnknownReachCode(i64),
    /// Mesh edge id not present in the mesh.
    #[error("Mesh edge {0} does not exist")]
    UnknownMeshEdge(MeshEdgeId),
    /// Mesh edge references a node that does not exist.
    #[error("Mesh edge {edge} references missing node {node}")]
    UnknownMeshNode { edge: MeshEdgeId, node: usize },
    /// Operation requires a different link kind.
    #[error("Link {link} is {found:?}, expected {expected}")]
    WrongLinkKind {
        link: LinkId,
        expected: &'static str,
        found: LinkKind,
    },
    /// A source record tried to type a link twice.
    #[error("Link {link} already typed as {kind:?}")]
    LinkAlreadyTyped { link: LinkId, kind: LinkKind },
    /// Output assembly referenced a link that has no element numbers.
    #[error("Link {0} has no element numbers assigned")]
    ElementsNotNumbered(LinkId),

    // ----- capacity -----
    /// Adjacency soft cap reached.
    #[error("Link {link}: {list} list full (limit {limit})")]
    CapacityExceeded {
        link: LinkId,
        list: &'static str,
        limit: usize,
    },
    /// Fixed-width output list overflowed.
    #[error("Channel element {element}: {found} {list} exceed output limit {limit}")]
    OutputCapacityExceeded {
        element: usize,
        list: &'static str,
        limit: usize,
        found: usize,
    },

    // ----- topology -----
    /// Downstream walk revisited a link.
    #[error("Topology error: downstream cycle through link {link}")]
    CycleDetected { link: LinkId },
    /// Connection listed on one side only.
    #[error("Link {link} lists {neighbor} {direction} but the reverse entry is missing")]
    NonReciprocalConnection {
        link: LinkId,
        neighbor: LinkId,
        direction: &'static str,
    },
    /// Same endpoint listed twice.
    #[error("Link {link} already lists {endpoint}")]
    DuplicateConnection { link: LinkId, endpoint: Endpoint },
    /// A link connected to itself.
    #[error("Link {0} cannot connect to itself")]
    SelfConnection(LinkId),
    /// Boundary sentinel on the wrong side, or a stored no-flow sentinel.
    #[error("Link {link}: boundary {boundary:?} not allowed in {list} list")]
    InvalidBoundary {
        link: LinkId,
        boundary: Boundary,
        list: &'static str,
    },
    /// `disconnect` called on links that are not connected.
    #[error("Links {upstream} -> {downstream} are not connected")]
    NotConnected {
        upstream: LinkId,
        downstream: LinkId,
    },
    /// A live link references an unused or pruned neighbor.
    #[error("Link {link} references {neighbor} which is {neighbor_kind:?}")]
    DanglingConnection {
        link: LinkId,
        neighbor: LinkId,
        neighbor_kind: LinkKind,
    },
    /// Element end locations not strictly increasing.
    #[error("Link {link} element {element}: end {end} does not exceed previous {previous}")]
    ElementOrder {
        link: LinkId,
        element: usize,
        previous: f64,
        end: f64,
    },
    /// Split location falls strictly inside an associated element.
    #[error("Link {link}: cannot split associated element {element} at {location}")]
    SplitInsideAssociatedElement {
        link: LinkId,
        element: usize,
        location: f64,
    },
    /// Any other structural rule violation.
    #[error("Invariant violated on link {link}: {message}")]
    InvariantViolation { link: LinkId, message: String },

    // ----- geometry -----
    /// Shape with too few points, zero length, or zero area.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// Split location not strictly inside the link.
    #[error("Link {link}: split location {location} outside (0, {extent})")]
    InvalidSplitLocation {
        link: LinkId,
        location: f64,
        extent: f64,
    },
    /// Association range collapses to nothing after clamping.
    #[error("Link {link}: edge {edge} range [{location1}, {location2}] is empty")]
    DegenerateAssociation {
        link: LinkId,
        edge: MeshEdgeId,
        location1: f64,
        location2: f64,
    },
    /// NaN or infinite 1D location.
    #[error("Link {link}: non-finite location {location}")]
    NonFiniteLocation { link: LinkId, location: f64 },
}

impl NetworkError {
    /// Classify this error into the five-way taxonomy.
    pub fn kind(&self) -> ErrorKind {
        use NetworkError::*;
        match self {
            MeshParse(_)
            | NonSequentialLinkId { .. }
            | DuplicateReachCode { .. }
            | InvalidAttribute { .. }
            | UnknownWaterbodyType(_)
            | InvalidConfig(_)
            | Io(_) => ErrorKind::InputFormat,
            LinkOutOfRange { .. }
            | UnknownReachCode(_)
            | UnknownMeshEdge(_)
            | UnknownMeshNode { .. }
            | WrongLinkKind { .. }
            | LinkAlreadyTyped { .. }
            | ElementsNotNumbered(_) => ErrorKind::Referential,
            CapacityExceeded { .. } | OutputCapacityExceeded { .. } => ErrorKind::Capacity,
            CycleDetected { .. }
            | NonReciprocalConnection { .. }
            | DuplicateConnection { .. }
            | SelfConnection(_)
            | InvalidBoundary { .. }
            | NotConnected { .. }
            | DanglingConnection { .. }
            | ElementOrder { .. }
            | SplitInsideAssociatedElement { .. }
            | InvariantViolation { .. } => ErrorKind::Topology,
            DegenerateGeometry(_)
            | InvalidSplitLocation { .. }
            | DegenerateAssociation { .. }
            | NonFiniteLocation { .. } => ErrorKind::Geometry,
        }
    }

    pub(crate) fn violation(link: LinkId, message: impl Into<String>) -> Self {
        NetworkError::InvariantViolation {
            link,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(e: std::io::Error) -> Self {
        NetworkError::Io(e.to_string())
    }
}
