//! Input records, source traits, and text formats.
//!
//! The construction engine never touches files directly. Hydrography arrives
//! through the [`HydrographySource`] trait as fully materialized records and
//! the land-surface mesh as a [`MeshBoundary`]. Text readers and writers for
//! the mesh and the channel output live in the submodules.

pub mod channel_writer;
pub mod triangle;

use crate::geometry::Point2;
use crate::network_error::NetworkError;
use crate::topology::endpoint::Endpoint;
use crate::topology::ids::{LinkId, MeshEdgeId};
use crate::topology::link::LinkKind;
use std::str::FromStr;

/// `(link id, external reach code)` from the link identity list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LinkIdentity {
    pub link: LinkId,
    pub reach_code: i64,
}

/// One stream reach from the stream-network source.
#[derive(Clone, Debug, PartialEq)]
pub struct StreamRecord {
    pub link: LinkId,
    pub polyline: Vec<Point2>,
    pub upstream_contributing_area: f64,
    pub downstream_contributing_area: f64,
    pub stream_order: u32,
    /// Up to two upstream neighbors; absent slots hold `Endpoint::NO_FLOW`.
    pub upstream: [Endpoint; 2],
    pub downstream: Endpoint,
}

/// NHD waterbody feature type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WaterbodyType {
    LakePond,
    SwampMarsh,
    Reservoir,
    IceMass,
    Playa,
}

impl WaterbodyType {
    /// Resolve an NHD `FType` code.
    pub fn from_code(code: i64) -> Result<Self, NetworkError> {
        match code {
            390 => Ok(WaterbodyType::LakePond),
            466 => Ok(WaterbodyType::SwampMarsh),
            436 => Ok(WaterbodyType::Reservoir),
            378 => Ok(WaterbodyType::IceMass),
            361 => Ok(WaterbodyType::Playa),
            other => Err(NetworkError::UnknownWaterbodyType(other.to_string())),
        }
    }

    /// Link kind this waterbody becomes.
    pub fn link_kind(self) -> LinkKind {
        match self {
            WaterbodyType::IceMass => LinkKind::IceMass,
            _ => LinkKind::Waterbody,
        }
    }
}

impl FromStr for WaterbodyType {
    type Err = NetworkError;

    /// Accepts names like `"LakePond"`, `"Lake/Pond"`, `"swamp marsh"`, or a
    /// numeric FType code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<i64>() {
            return Self::from_code(code);
        }
        let key: String = trimmed
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "lakepond" | "lake" | "pond" => Ok(WaterbodyType::LakePond),
            "swampmarsh" | "swamp" | "marsh" => Ok(WaterbodyType::SwampMarsh),
            "reservoir" => Ok(WaterbodyType::Reservoir),
            "icemass" | "glacier" => Ok(WaterbodyType::IceMass),
            "playa" => Ok(WaterbodyType::Playa),
            _ => Err(NetworkError::UnknownWaterbodyType(s.to_string())),
        }
    }
}

/// One waterbody from the waterbody source.
#[derive(Clone, Debug, PartialEq)]
pub struct WaterbodyRecord {
    pub reach_code: i64,
    pub parts: Vec<Vec<Point2>>,
    pub waterbody_type: WaterbodyType,
}

/// A point where a stream crosses a waterbody outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamWaterbodyIntersection {
    pub stream: LinkId,
    pub waterbody_code: i64,
    pub point: Point2,
}

/// A point where two waterbody outlines touch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaterbodyIntersection {
    pub first_code: i64,
    pub second_code: i64,
    pub point: Point2,
}

/// Supplier of hydrography records.
pub trait HydrographySource {
    fn link_identities(&self) -> Result<Vec<LinkIdentity>, NetworkError>;
    fn streams(&self) -> Result<Vec<StreamRecord>, NetworkError>;
    fn waterbodies(&self) -> Result<Vec<WaterbodyRecord>, NetworkError>;
    fn stream_waterbody_intersections(
        &self,
    ) -> Result<Vec<StreamWaterbodyIntersection>, NetworkError>;
    fn waterbody_intersections(&self) -> Result<Vec<WaterbodyIntersection>, NetworkError>;
}

/// Hydrography held in memory, e.g. decoded upstream by a dataset reader.
#[derive(Clone, Debug, Default)]
pub struct InMemoryHydrography {
    pub identities: Vec<LinkIdentity>,
    pub streams: Vec<StreamRecord>,
    pub waterbodies: Vec<WaterbodyRecord>,
    pub stream_waterbody_intersections: Vec<StreamWaterbodyIntersection>,
    pub waterbody_intersections: Vec<WaterbodyIntersection>,
}

impl HydrographySource for InMemoryHydrography {
    fn link_identities(&self) -> Result<Vec<LinkIdentity>, NetworkError> {
        Ok(self.identities.clone())
    }

    fn streams(&self) -> Result<Vec<StreamRecord>, NetworkError> {
        Ok(self.streams.clone())
    }

    fn waterbodies(&self) -> Result<Vec<WaterbodyRecord>, NetworkError> {
        Ok(self.waterbodies.clone())
    }

    fn stream_waterbody_intersections(
        &self,
    ) -> Result<Vec<StreamWaterbodyIntersection>, NetworkError> {
        Ok(self.stream_waterbody_intersections.clone())
    }

    fn waterbody_intersections(&self) -> Result<Vec<WaterbodyIntersection>, NetworkError> {
        Ok(self.waterbody_intersections.clone())
    }
}

/// Boundary code of a mesh edge with no channel.
pub const CODE_INTERIOR: i64 = 0;
/// Boundary code of an edge on the outer mesh boundary.
pub const CODE_BOUNDARY: i64 = 1;
/// First code referring to a channel link: `link = code - CHANNEL_CODE_OFFSET`.
pub const CHANNEL_CODE_OFFSET: i64 = 2;

/// A mesh edge with its boundary code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshEdge {
    pub nodes: [usize; 2],
    pub code: i64,
}

impl MeshEdge {
    /// The channel link this edge borders, if its code denotes one.
    pub fn channel_link(&self) -> Option<LinkId> {
        (self.code >= CHANNEL_CODE_OFFSET)
            .then(|| LinkId::new((self.code - CHANNEL_CODE_OFFSET) as usize))
    }
}

/// The land-surface mesh as far as channel construction needs it: node
/// coordinates, triangles (for mesh-neighbor lookup), and coded edges.
#[derive(Clone, Debug, Default)]
pub struct MeshBoundary {
    pub nodes: Vec<Point2>,
    pub triangles: Vec<[usize; 3]>,
    pub edges: Vec<MeshEdge>,
}

impl MeshBoundary {
    pub fn edge(&self, id: MeshEdgeId) -> Result<&MeshEdge, NetworkError> {
        self.edges
            .get(id.index())
            .ok_or(NetworkError::UnknownMeshEdge(id))
    }

    /// Endpoint coordinates of edge `id`.
    pub fn edge_points(&self, id: MeshEdgeId) -> Result<(Point2, Point2), NetworkError> {
        let edge = self.edge(id)?;
        let node = |n: usize| {
            self.nodes
                .get(n)
                .copied()
                .ok_or(NetworkError::UnknownMeshNode { edge: id, node: n })
        };
        Ok((node(edge.nodes[0])?, node(edge.nodes[1])?))
    }

    pub fn edge_length(&self, id: MeshEdgeId) -> Result<f64, NetworkError> {
        let (a, b) = self.edge_points(id)?;
        Ok(a.distance(b))
    }

    /// Triangles sharing each edge, indexed by edge id.
    pub fn edge_triangles(&self) -> Vec<Vec<usize>> {
        let mut by_nodes: hashbrown::HashMap<(usize, usize), Vec<usize>> =
            hashbrown::HashMap::with_capacity(self.triangles.len() * 3);
        for (t, tri) in self.triangles.iter().enumerate() {
            for k in 0..3 {
                let (a, b) = (tri[k], tri[(k + 1) % 3]);
                by_nodes.entry((a.min(b), a.max(b))).or_default().push(t);
            }
        }
        self.edges
            .iter()
            .map(|e| {
                let key = (e.nodes[0].min(e.nodes[1]), e.nodes[0].max(e.nodes[1]));
                by_nodes.get(&key).cloned().unwrap_or_default()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waterbody_type_from_codes_and_names() {
        assert_eq!(WaterbodyType::from_code(390).unwrap(), WaterbodyType::LakePond);
        assert_eq!(WaterbodyType::from_code(378).unwrap().link_kind(), LinkKind::IceMass);
        assert_eq!("Swamp/Marsh".parse::<WaterbodyType>().unwrap(), WaterbodyType::SwampMarsh);
        assert_eq!(" reservoir ".parse::<WaterbodyType>().unwrap(), WaterbodyType::Reservoir);
        assert_eq!("361".parse::<WaterbodyType>().unwrap(), WaterbodyType::Playa);
        assert!(matches!(
            "estuary".parse::<WaterbodyType>(),
            Err(NetworkError::UnknownWaterbodyType(_))
        ));
    }

    #[test]
    fn channel_codes_map_to_links() {
        let e = MeshEdge { nodes: [0, 1], code: 7 };
        assert_eq!(e.channel_link(), Some(LinkId::new(5)));
        let b = MeshEdge { nodes: [0, 1], code: CODE_BOUNDARY };
        assert_eq!(b.channel_link(), None);
    }

    #[test]
    fn edge_triangles_finds_both_sides() {
        let mesh = MeshBoundary {
            nodes: vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
                Point2::new(1.0, 1.0),
            ],
            triangles: vec![[0, 1, 2], [1, 3, 2]],
            edges: vec![
                MeshEdge { nodes: [2, 1], code: 2 },
                MeshEdge { nodes: [0, 1], code: 1 },
            ],
        };
        let adj = mesh.edge_triangles();
        assert_eq!(adj[0], vec![0, 1]);
        assert_eq!(adj[1], vec![0]);
        assert!((mesh.edge_length(MeshEdgeId::new(0)).unwrap() - 2f64.sqrt()).abs() < 1e-12);
        assert!(mesh.edge(MeshEdgeId::new(5)).is_err());
    }
}
