#![cfg_attr(docsrs, feature(doc_cfg))]
//! # channel-net
//!
//! channel-net builds a 1D channel network for a hydrologic model from
//! stream and waterbody hydrography and a 2D land-surface triangle mesh. It
//! attaches mesh boundary edges to stream reaches, splices waterbodies into
//! the stream graph, removes reaches the mesh never touches, and lays out
//! numbered channel elements with their channel and mesh neighbors.
//!
//! ## Features
//! - Growable link table with reciprocal upstream/downstream adjacency
//! - Splitting of stream links with location resolution through split history
//! - Mesh-edge association with gap relocation and junction squeezing
//! - Waterbody inflow/outflow classification and linking
//! - Iterative pruning with a pruned-to-surviving reach-code map
//! - Short-link merging, element numbering, and output assembly
//! - Triangle `.node`/`.ele`/`.edge` reader and channel text writer
//!
//! ## Determinism
//!
//! Construction is a single-threaded batch. Links are processed in id order
//! and every walk uses an explicit worklist, so a given input always yields
//! the same network.
//!
//! ## Invariant checking
//! Debug builds, and release builds with the `check-invariants` feature,
//! validate the link table between phases and after each split. Set
//! [`NetworkConfig::check_invariants`](crate::config::NetworkConfig) to do the
//! same at runtime.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! channel-net = "0.1"
//! # features = ["check-invariants"]
//! ```

pub mod algs;
pub mod config;
pub mod debug_invariants;
pub mod geometry;
pub mod io;
pub mod network_error;
pub mod output;
pub mod pipeline;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::associate::{AssociationSummary, associate, associate_mesh_edges};
    pub use crate::algs::prune::{PruneMap, build_prune_map, prune_all, try_prune};
    pub use crate::algs::reachability::{find_downstream_cycle, reaches_downstream, relation_between};
    pub use crate::algs::short_links::fix_short_links;
    pub use crate::algs::split::{LocationBias, resolve_location, split};
    pub use crate::algs::waterbody::{LinkingSummary, link_waterbodies};
    pub use crate::config::{ConnectionLimits, HydraulicGeometry, NetworkConfig, OutputLimits};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::{Point2, Polygon, Polyline};
    pub use crate::io::channel_writer::ChannelWriter;
    pub use crate::io::triangle::TriangleReader;
    pub use crate::io::{
        HydrographySource, InMemoryHydrography, LinkIdentity, MeshBoundary, MeshEdge,
        StreamRecord, StreamWaterbodyIntersection, WaterbodyIntersection, WaterbodyRecord,
        WaterbodyType,
    };
    pub use crate::network_error::{ErrorKind, NetworkError};
    pub use crate::output::{ChannelElement, ChannelNetworkOutput, ChannelNode};
    pub use crate::pipeline::{ChannelNetwork, PipelineSummary, build_channel_network};
    pub use crate::topology::{
        Boundary, Endpoint, InvariantContext, Link, LinkId, LinkKind, LinkTable, MeshEdgeId,
        check_invariants,
    };
}
