//! Writer for the channel network text files.
//!
//! # Format
//! - `.chan.node`: a count line, then `id x y` per node.
//! - `.chan.ele`: a header `count max_vertices max_channel_neighbors
//!   max_mesh_neighbors`, then one line per element:
//!   `id kind reach_code length top_width bankfull_depth`
//!   `nv v1..vn  nc (neighbor downstream)..  nm (mesh_element edge_length)..`.
//!   Boundary neighbors are written as [`INFLOW_SENTINEL`] and
//!   [`OUTFLOW_SENTINEL`]; `downstream` is `0` or `1`.
//! - `.chan.prune`: a count line, then `pruned_reach_code target_reach_code`.

use crate::config::OutputLimits;
use crate::network_error::NetworkError;
use crate::output::{ChannelElement, ChannelNeighbor, ChannelNetworkOutput, ChannelNode};
use crate::algs::prune::PruneMap;
use crate::topology::endpoint::Boundary;
use crate::topology::link::LinkKind;
use std::fmt::Write as _;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const INFLOW_SENTINEL: i64 = -1;
pub const OUTFLOW_SENTINEL: i64 = -2;

/// Writer for `.chan.node`, `.chan.ele`, and `.chan.prune` files.
#[derive(Debug, Default, Clone)]
pub struct ChannelWriter {
    pub limits: OutputLimits,
}

fn kind_name(kind: LinkKind) -> &'static str {
    match kind {
        LinkKind::Stream => "stream",
        LinkKind::Waterbody => "waterbody",
        LinkKind::IceMass => "icemass",
        LinkKind::PrunedStream => "pruned",
        LinkKind::Unused => "unused",
    }
}

fn neighbor_code(n: ChannelNeighbor) -> i64 {
    match n {
        ChannelNeighbor::Element(e) => e as i64,
        ChannelNeighbor::Boundary(Boundary::Inflow) => INFLOW_SENTINEL,
        ChannelNeighbor::Boundary(_) => OUTFLOW_SENTINEL,
    }
}

fn element_line(e: &ChannelElement) -> String {
    let mut line = format!(
        "{} {} {} {} {} {}",
        e.id,
        kind_name(e.kind),
        e.reach_code,
        e.length,
        e.top_width,
        e.bankfull_depth
    );
    // writing into a String cannot fail
    let _ = write!(line, " {}", e.vertices.len());
    for v in &e.vertices {
        let _ = write!(line, " {v}");
    }
    let _ = write!(line, " {}", e.channel_neighbors.len());
    for n in &e.channel_neighbors {
        let _ = write!(line, " {} {}", neighbor_code(n.neighbor), u8::from(n.downstream));
    }
    let _ = write!(line, " {}", e.mesh_neighbors.len());
    for m in &e.mesh_neighbors {
        let _ = write!(line, " {} {}", m.mesh_element, m.edge_length);
    }
    line
}

impl ChannelWriter {
    pub fn new(limits: OutputLimits) -> Self {
        Self { limits }
    }

    pub fn write_nodes<W: Write>(&self, writer: W, nodes: &[ChannelNode]) -> Result<(), NetworkError> {
        let mut w = BufWriter::new(writer);
        writeln!(w, "{}", nodes.len())?;
        for n in nodes {
            writeln!(w, "{} {} {}", n.id, n.point.x, n.point.y)?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_elements<W: Write>(
        &self,
        writer: W,
        elements: &[ChannelElement],
    ) -> Result<(), NetworkError> {
        let mut w = BufWriter::new(writer);
        writeln!(
            w,
            "{} {} {} {}",
            elements.len(),
            self.limits.max_vertices,
            self.limits.max_channel_neighbors,
            self.limits.max_mesh_neighbors
        )?;
        for e in elements {
            writeln!(w, "{}", element_line(e))?;
        }
        w.flush()?;
        Ok(())
    }

    pub fn write_prune_map<W: Write>(&self, writer: W, map: &PruneMap) -> Result<(), NetworkError> {
        let mut w = BufWriter::new(writer);
        writeln!(w, "{}", map.len())?;
        for (pruned, target) in map {
            writeln!(w, "{pruned} {target}")?;
        }
        w.flush()?;
        Ok(())
    }

    /// Write `<base>.chan.node`, `<base>.chan.ele`, and `<base>.chan.prune`.
    pub fn write_files(
        &self,
        base: impl AsRef<Path>,
        output: &ChannelNetworkOutput,
    ) -> Result<(), NetworkError> {
        let base = base.as_ref();
        let create = |ext: &str| {
            let mut path = base.as_os_str().to_owned();
            path.push(ext);
            std::fs::File::create(path)
        };
        self.write_nodes(create(".chan.node")?, &output.nodes)?;
        self.write_elements(create(".chan.ele")?, &output.elements)?;
        self.write_prune_map(create(".chan.prune")?, &output.prune_map)?;
        log::info!("wrote channel files for {}", base.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2;
    use crate::output::{ChannelNeighborEntry, MeshNeighbor};
    use crate::topology::ids::LinkId;

    #[test]
    fn element_line_layout() {
        let e = ChannelElement {
            id: 3,
            link: LinkId::new(1),
            kind: LinkKind::Stream,
            reach_code: 42,
            length: 250.0,
            top_width: 2.5,
            bankfull_depth: 0.5,
            vertices: vec![7, 8],
            channel_neighbors: vec![
                ChannelNeighborEntry {
                    neighbor: ChannelNeighbor::Boundary(Boundary::Inflow),
                    downstream: false,
                },
                ChannelNeighborEntry {
                    neighbor: ChannelNeighbor::Element(4),
                    downstream: true,
                },
            ],
            mesh_neighbors: vec![MeshNeighbor {
                mesh_element: 11,
                edge_length: 12.5,
            }],
        };
        assert_eq!(
            element_line(&e),
            "3 stream 42 250 2.5 0.5 2 7 8 2 -1 0 4 1 1 11 12.5"
        );
    }

    #[test]
    fn files_have_count_headers() {
        let writer = ChannelWriter::default();
        let mut buf = Vec::new();
        writer
            .write_nodes(
                &mut buf,
                &[ChannelNode {
                    id: 0,
                    point: Point2::new(1.5, -2.0),
                }],
            )
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1\n0 1.5 -2\n");

        let mut buf = Vec::new();
        writer
            .write_prune_map(&mut buf, &PruneMap::from([(5, 9), (6, 9)]))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "2\n5 9\n6 9\n");

        let mut buf = Vec::new();
        writer.write_elements(&mut buf, &[]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "0 32 16 32\n");
    }
}
