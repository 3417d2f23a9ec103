//! Link: one stream reach, waterbody, ice mass, or unused placeholder.

use crate::geometry::{Polygon, Polyline, Shape};
use crate::topology::element::LinkElement;
use crate::topology::endpoint::Endpoint;
use crate::topology::ids::{LinkId, MeshEdgeId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum LinkKind {
    Unused,
    Stream,
    PrunedStream,
    Waterbody,
    IceMass,
}

impl LinkKind {
    /// Waterbody or ice mass.
    #[inline]
    pub fn is_waterbody(self) -> bool {
        matches!(self, LinkKind::Waterbody | LinkKind::IceMass)
    }

    /// Kinds that survive into the output.
    #[inline]
    pub fn is_live(self) -> bool {
        matches!(
            self,
            LinkKind::Stream | LinkKind::Waterbody | LinkKind::IceMass
        )
    }
}

/// A graph node of the channel network.
///
/// Adjacency lists and element lists are crate-private: all adjacency edits go
/// through the connection methods on
/// [`LinkTable`](crate::topology::link_table::LinkTable), and element edits
/// through the algorithms in [`crate::algs`].
#[derive(Clone, Debug)]
pub struct Link {
    pub(crate) kind: LinkKind,
    pub(crate) reach_code: i64,
    pub(crate) origin: LinkId,
    pub(crate) shapes: Vec<Shape>,
    pub(crate) shape_offset: f64,
    pub(crate) length: f64,
    pub(crate) upstream_contributing_area: f64,
    pub(crate) downstream_contributing_area: f64,
    pub(crate) stream_order: u32,
    pub(crate) upstream: Vec<Endpoint>,
    pub(crate) downstream: Vec<Endpoint>,
    pub(crate) elements: Vec<LinkElement>,
    pub(crate) shoreline_edges: Vec<MeshEdgeId>,
    pub(crate) former_downstream: Vec<Endpoint>,
    pub(crate) element_start: Option<usize>,
    pub(crate) number_of_elements: Option<usize>,
}

impl Link {
    /// A placeholder created from the identity list.
    pub(crate) fn unused(id: LinkId, reach_code: i64) -> Self {
        Self {
            kind: LinkKind::Unused,
            reach_code,
            origin: id,
            shapes: Vec::new(),
            shape_offset: 0.0,
            length: 0.0,
            upstream_contributing_area: 0.0,
            downstream_contributing_area: 0.0,
            stream_order: 0,
            upstream: Vec::new(),
            downstream: Vec::new(),
            elements: Vec::new(),
            shoreline_edges: Vec::new(),
            former_downstream: Vec::new(),
            element_start: None,
            number_of_elements: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    #[inline]
    pub fn reach_code(&self) -> i64 {
        self.reach_code
    }

    /// The link whose geometry this link's frame is measured on. Equal to the
    /// link's own id unless it was created by a split.
    #[inline]
    pub fn origin(&self) -> LinkId {
        self.origin
    }

    #[inline]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Offset of this link's 1D frame inside the origin polyline.
    #[inline]
    pub fn shape_offset(&self) -> f64 {
        self.shape_offset
    }

    /// Meters of unmoved channel.
    #[inline]
    pub fn length(&self) -> f64 {
        self.length
    }

    #[inline]
    pub fn upstream_contributing_area(&self) -> f64 {
        self.upstream_contributing_area
    }

    #[inline]
    pub fn downstream_contributing_area(&self) -> f64 {
        self.downstream_contributing_area
    }

    #[inline]
    pub fn stream_order(&self) -> u32 {
        self.stream_order
    }

    #[inline]
    pub fn upstream(&self) -> &[Endpoint] {
        &self.upstream
    }

    #[inline]
    pub fn downstream(&self) -> &[Endpoint] {
        &self.downstream
    }

    #[inline]
    pub fn elements(&self) -> &[LinkElement] {
        &self.elements
    }

    #[inline]
    pub fn shoreline_edges(&self) -> &[MeshEdgeId] {
        &self.shoreline_edges
    }

    /// Downstream endpoints at the moment this link was pruned.
    #[inline]
    pub fn former_downstream(&self) -> &[Endpoint] {
        &self.former_downstream
    }

    #[inline]
    pub fn element_start(&self) -> Option<usize> {
        self.element_start
    }

    #[inline]
    pub fn number_of_elements(&self) -> Option<usize> {
        self.number_of_elements
    }

    /// The stream polyline owned by this link, if any.
    pub fn polyline(&self) -> Option<&Polyline> {
        self.shapes.iter().find_map(|s| match s {
            Shape::Polyline(p) => Some(p),
            Shape::Polygon(_) => None,
        })
    }

    /// Waterbody polygon parts owned by this link.
    pub fn polygons(&self) -> impl Iterator<Item = &Polygon> {
        self.shapes.iter().filter_map(|s| match s {
            Shape::Polygon(p) => Some(p),
            Shape::Polyline(_) => None,
        })
    }

    /// Number of leading elements whose channel still belongs to this link.
    ///
    /// Moved elements always form a suffix, so this is the index of the
    /// first moved element.
    pub fn unmoved_count(&self) -> usize {
        self.elements
            .iter()
            .position(|e| e.is_moved())
            .unwrap_or(self.elements.len())
    }

    pub fn unmoved_elements(&self) -> &[LinkElement] {
        &self.elements[..self.unmoved_count()]
    }

    /// End of the last unmoved element (0 when there is none).
    pub fn extent(&self) -> f64 {
        self.unmoved_elements()
            .last()
            .map_or(0.0, |e| e.end_location)
    }

    /// Whether any element is bound to a mesh edge.
    pub fn has_association(&self) -> bool {
        self.elements.iter().any(|e| e.is_associated())
    }

    /// Links listed upstream, skipping boundary sentinels.
    pub fn upstream_links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.upstream.iter().filter_map(|e| e.link())
    }

    /// Links listed downstream, skipping boundary sentinels.
    pub fn downstream_links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.downstream.iter().filter_map(|e| e.link())
    }

    /// Contributing area interpolated linearly at `location` along the frame.
    pub fn contributing_area_at(&self, location: f64) -> f64 {
        if self.length <= 0.0 {
            return self.downstream_contributing_area;
        }
        let t = (location / self.length).clamp(0.0, 1.0);
        self.upstream_contributing_area
            + (self.downstream_contributing_area - self.upstream_contributing_area) * t
    }
}
