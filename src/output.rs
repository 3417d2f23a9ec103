//! Channel network output: nodes, channel elements, and the prune map.
//!
//! Assembly reads a numbered link table (see
//! [`number_elements`](crate::algs::numbering::number_elements)) and lays out
//! one [`ChannelElement`] per output element, in element-number order.

use crate::algs::prune::{PruneMap, build_prune_map};
use crate::config::{NetworkConfig, OutputLimits};
use crate::geometry::Point2;
use crate::io::MeshBoundary;
use crate::network_error::NetworkError;
use crate::topology::element::begin_location;
use crate::topology::endpoint::{Boundary, Endpoint};
use crate::topology::ids::{LinkId, MeshEdgeId};
use crate::topology::link::{Link, LinkKind};
use crate::topology::link_table::LinkTable;
use hashbrown::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelNode {
    pub id: usize,
    pub point: Point2,
}

/// What sits across one end of a channel element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChannelNeighbor {
    Element(usize),
    Boundary(Boundary),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChannelNeighborEntry {
    pub neighbor: ChannelNeighbor,
    /// Water flows from this element to the neighbor.
    pub downstream: bool,
}

/// A mesh triangle bordering a channel element through a shared edge.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MeshNeighbor {
    pub mesh_element: usize,
    pub edge_length: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelElement {
    pub id: usize,
    pub link: LinkId,
    pub kind: LinkKind,
    pub reach_code: i64,
    pub length: f64,
    pub top_width: f64,
    pub bankfull_depth: f64,
    /// Indices into [`ChannelNetworkOutput::nodes`].
    pub vertices: Vec<usize>,
    pub channel_neighbors: Vec<ChannelNeighborEntry>,
    pub mesh_neighbors: Vec<MeshNeighbor>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChannelNetworkOutput {
    pub nodes: Vec<ChannelNode>,
    pub elements: Vec<ChannelElement>,
    pub prune_map: PruneMap,
}

/// Shared-coordinate node list.
#[derive(Default)]
struct NodeTable {
    nodes: Vec<ChannelNode>,
    index: HashMap<(u64, u64), usize>,
}

impl NodeTable {
    fn intern(&mut self, p: Point2) -> usize {
        // adding 0.0 folds -0.0 into +0.0 so both share a key
        let key = ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits());
        let next = self.nodes.len();
        let id = *self.index.entry(key).or_insert(next);
        if id == next {
            self.nodes.push(ChannelNode { id, point: p });
        }
        id
    }
}

/// Build the output from a numbered table.
///
/// # Errors
/// - `ElementsNotNumbered` if a live link, or a neighbor it references,
///   has no element numbers
/// - `OutputCapacityExceeded` if a per-element list is wider than
///   [`OutputLimits`] allows
pub fn assemble_output(
    table: &LinkTable,
    mesh: &MeshBoundary,
    config: &NetworkConfig,
) -> Result<ChannelNetworkOutput, NetworkError> {
    let edge_triangles = mesh.edge_triangles();
    let mut nodes = NodeTable::default();
    let mut elements = Vec::new();

    for (id, link) in table.iter() {
        if !link.kind().is_live() {
            continue;
        }
        let (start, count) = numbering(link, id)?;
        debug_assert_eq!(start, elements.len());
        match link.kind() {
            LinkKind::Stream => stream_elements(
                table,
                id,
                link,
                start,
                count,
                &edge_triangles,
                mesh,
                config,
                &mut nodes,
                &mut elements,
            )?,
            _ => elements.push(waterbody_element(
                table,
                id,
                link,
                start,
                &edge_triangles,
                mesh,
                config,
                &mut nodes,
            )?),
        }
    }

    for e in &elements {
        check_limits(e, &config.output_limits)?;
    }
    let output = ChannelNetworkOutput {
        nodes: nodes.nodes,
        elements,
        prune_map: build_prune_map(table),
    };
    log::info!(
        "assembled {} channel elements, {} nodes, {} pruned reach codes",
        output.elements.len(),
        output.nodes.len(),
        output.prune_map.len()
    );
    Ok(output)
}

fn numbering(link: &Link, id: LinkId) -> Result<(usize, usize), NetworkError> {
    match (link.element_start(), link.number_of_elements()) {
        (Some(start), Some(count)) if count > 0 => Ok((start, count)),
        _ => Err(NetworkError::ElementsNotNumbered(id)),
    }
}

/// Element across the upstream end of a link, seen from downstream.
fn upstream_neighbor(table: &LinkTable, ep: Endpoint) -> Result<ChannelNeighborEntry, NetworkError> {
    let neighbor = match ep {
        Endpoint::Link(u) => {
            let (start, count) = numbering(table.get(u)?, u)?;
            ChannelNeighbor::Element(start + count - 1)
        }
        Endpoint::Boundary(b) => ChannelNeighbor::Boundary(b),
    };
    Ok(ChannelNeighborEntry {
        neighbor,
        downstream: false,
    })
}

/// Element across the downstream end of a link, seen from upstream.
fn downstream_neighbor(
    table: &LinkTable,
    ep: Endpoint,
) -> Result<ChannelNeighborEntry, NetworkError> {
    let neighbor = match ep {
        Endpoint::Link(d) => ChannelNeighbor::Element(numbering(table.get(d)?, d)?.0),
        Endpoint::Boundary(b) => ChannelNeighbor::Boundary(b),
    };
    Ok(ChannelNeighborEntry {
        neighbor,
        downstream: true,
    })
}

fn mesh_neighbors_of(
    edge: MeshEdgeId,
    edge_triangles: &[Vec<usize>],
    mesh: &MeshBoundary,
) -> Result<Vec<MeshNeighbor>, NetworkError> {
    let edge_length = mesh.edge_length(edge)?;
    Ok(edge_triangles
        .get(edge.index())
        .map(|tris| {
            tris.iter()
                .map(|&t| MeshNeighbor {
                    mesh_element: t,
                    edge_length,
                })
                .collect()
        })
        .unwrap_or_default())
}

#[allow(clippy::too_many_arguments)]
fn stream_elements(
    table: &LinkTable,
    id: LinkId,
    link: &Link,
    start: usize,
    count: usize,
    edge_triangles: &[Vec<usize>],
    mesh: &MeshBoundary,
    config: &NetworkConfig,
    nodes: &mut NodeTable,
    out: &mut Vec<ChannelElement>,
) -> Result<(), NetworkError> {
    let origin = table.get(link.origin())?;
    let polyline = origin
        .polyline()
        .ok_or_else(|| NetworkError::violation(link.origin(), "origin has no polyline"))?;
    let length = link.length();
    let piece = length / count as f64;

    // bound mesh edges, bucketed by the output element holding their midpoint
    let mut buckets: Vec<Vec<MeshNeighbor>> = vec![Vec::new(); count];
    let unmoved = link.unmoved_elements();
    for (i, e) in unmoved.iter().enumerate() {
        let Some(edge) = e.edge else { continue };
        let mid = 0.5 * (begin_location(unmoved, i) + e.end_location);
        let k = ((mid / piece) as usize).min(count - 1);
        buckets[k].extend(mesh_neighbors_of(edge, edge_triangles, mesh)?);
    }

    for (k, mesh_neighbors) in buckets.into_iter().enumerate() {
        let from = piece * k as f64;
        let to = if k + 1 == count { length } else { piece * (k + 1) as f64 };
        let offset = link.shape_offset();
        let vertices = polyline
            .vertices_between(offset + from, offset + to)
            .into_iter()
            .map(|p| nodes.intern(p))
            .collect();
        let (top_width, bankfull_depth) = config
            .hydraulic_geometry
            .bankfull(link.contributing_area_at(0.5 * (from + to)));

        let mut channel_neighbors = Vec::new();
        if k == 0 {
            for &ep in link.upstream() {
                channel_neighbors.push(upstream_neighbor(table, ep)?);
            }
        } else {
            channel_neighbors.push(ChannelNeighborEntry {
                neighbor: ChannelNeighbor::Element(start + k - 1),
                downstream: false,
            });
        }
        if k + 1 == count {
            for &ep in link.downstream() {
                channel_neighbors.push(downstream_neighbor(table, ep)?);
            }
        } else {
            channel_neighbors.push(ChannelNeighborEntry {
                neighbor: ChannelNeighbor::Element(start + k + 1),
                downstream: true,
            });
        }

        out.push(ChannelElement {
            id: start + k,
            link: id,
            kind: link.kind(),
            reach_code: link.reach_code(),
            length: to - from,
            top_width,
            bankfull_depth,
            vertices,
            channel_neighbors,
            mesh_neighbors,
        });
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn waterbody_element(
    table: &LinkTable,
    id: LinkId,
    link: &Link,
    start: usize,
    edge_triangles: &[Vec<usize>],
    mesh: &MeshBoundary,
    config: &NetworkConfig,
    nodes: &mut NodeTable,
) -> Result<ChannelElement, NetworkError> {
    let area: f64 = link.polygons().map(|p| p.area()).sum();
    let side = area.sqrt();
    let vertices = link
        .polygons()
        .next()
        .map(|p| p.vertices().iter().map(|&v| nodes.intern(v)).collect())
        .unwrap_or_default();

    let mut channel_neighbors = Vec::with_capacity(link.upstream().len() + link.downstream().len());
    for &ep in link.upstream() {
        channel_neighbors.push(upstream_neighbor(table, ep)?);
    }
    for &ep in link.downstream() {
        channel_neighbors.push(downstream_neighbor(table, ep)?);
    }
    let mut mesh_neighbors = Vec::new();
    for &edge in link.shoreline_edges() {
        mesh_neighbors.extend(mesh_neighbors_of(edge, edge_triangles, mesh)?);
    }

    Ok(ChannelElement {
        id: start,
        link: id,
        kind: link.kind(),
        reach_code: link.reach_code(),
        length: side,
        top_width: side,
        bankfull_depth: config.waterbody_bankfull_depth,
        vertices,
        channel_neighbors,
        mesh_neighbors,
    })
}

fn check_limits(e: &ChannelElement, limits: &OutputLimits) -> Result<(), NetworkError> {
    for (list, found, limit) in [
        ("vertices", e.vertices.len(), limits.max_vertices),
        ("channel neighbors", e.channel_neighbors.len(), limits.max_channel_neighbors),
        ("mesh neighbors", e.mesh_neighbors.len(), limits.max_mesh_neighbors),
    ] {
        if found > limit {
            return Err(NetworkError::OutputCapacityExceeded {
                element: e.id,
                list,
                limit,
                found,
            });
        }
    }
    Ok(())
}
