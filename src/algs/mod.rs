//! Graph algorithms over the link table.

pub mod associate;
pub mod numbering;
pub mod prune;
pub mod reachability;
pub mod short_links;
pub mod split;
pub mod waterbody;

pub use associate::{associate, associate_mesh_edges};
pub use prune::{PruneMap, build_prune_map, prune_all, try_prune};
pub use split::{LocationBias, resolve_location, split};
pub use waterbody::link_waterbodies;
