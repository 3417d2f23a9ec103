//! Channel-network topology: links, their elements, and the connections
//! between them.
//!
//! This module provides:
//! - [`LinkTable`], the id-indexed array owning every link
//! - [`Link`] and [`LinkElement`], the per-link 1D partition
//! - the connection methods on `LinkTable` (the only code that edits
//!   adjacency lists)
//! - structural validation under an explicit [`InvariantContext`]

pub mod connection;
pub mod element;
pub mod endpoint;
pub mod ids;
pub mod link;
pub mod link_table;
pub mod validation;

pub use element::{ElementTag, LinkElement, Relation};
pub use endpoint::{Boundary, Endpoint};
pub use ids::{LinkId, MeshEdgeId};
pub use link::{Link, LinkKind};
pub use link_table::LinkTable;
pub use validation::{InvariantContext, check_invariants, collect_violations, validate_link};
