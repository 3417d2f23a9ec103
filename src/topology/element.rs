//! Link elements: contiguous 1D sub-segments of a link.
//!
//! A link's elements partition its 1D frame. Element `i` spans
//! `[begin(i), end_location]` where `begin(0) == 0` and
//! `begin(i) == elements[i - 1].end_location`.
//!
//! The payload differs by owning link kind, so it is a sum type:
//! - on a stream, [`ElementTag::Channel`] records whether this segment's
//!   channel was relocated to another link by a split;
//! - on a waterbody, [`ElementTag::Intersection`] records one
//!   stream/waterbody crossing and its classification.

use crate::topology::ids::{LinkId, MeshEdgeId};

/// Position of an intersection record relative to the other records on the
/// same waterbody.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Relation {
    /// Not yet classified, or the same place as another record.
    Coincident,
    /// The stream enters the waterbody here.
    Upstream,
    /// The stream leaves the waterbody here.
    Downstream,
    /// Duplicate or mid-chain record; ignored when linking.
    Unrelated,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ElementTag {
    Channel { moved_to: Option<LinkId> },
    Intersection { stream: LinkId, relation: Relation },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkElement {
    /// End of this sub-segment in meters along the owning link's frame.
    /// For an intersection record: location along the crossing stream.
    pub end_location: f64,
    pub edge: Option<MeshEdgeId>,
    pub tag: ElementTag,
}

impl LinkElement {
    /// An unassociated channel segment.
    pub fn channel(end_location: f64) -> Self {
        Self {
            end_location,
            edge: None,
            tag: ElementTag::Channel { moved_to: None },
        }
    }

    /// A channel segment bound to a mesh edge.
    pub fn associated(end_location: f64, edge: MeshEdgeId) -> Self {
        Self {
            end_location,
            edge: Some(edge),
            tag: ElementTag::Channel { moved_to: None },
        }
    }

    /// Placeholder for a segment whose channel now lives on `to`.
    pub fn moved(end_location: f64, to: LinkId) -> Self {
        Self {
            end_location,
            edge: None,
            tag: ElementTag::Channel { moved_to: Some(to) },
        }
    }

    /// Unclassified waterbody intersection record.
    pub fn intersection(location: f64, stream: LinkId) -> Self {
        Self {
            end_location: location,
            edge: None,
            tag: ElementTag::Intersection {
                stream,
                relation: Relation::Coincident,
            },
        }
    }

    #[inline]
    pub fn moved_to(&self) -> Option<LinkId> {
        match self.tag {
            ElementTag::Channel { moved_to } => moved_to,
            ElementTag::Intersection { .. } => None,
        }
    }

    #[inline]
    pub fn is_moved(&self) -> bool {
        self.moved_to().is_some()
    }

    #[inline]
    pub fn is_associated(&self) -> bool {
        self.edge.is_some()
    }

    /// `(stream, relation)` for an intersection record.
    #[inline]
    pub fn intersection_record(&self) -> Option<(LinkId, Relation)> {
        match self.tag {
            ElementTag::Intersection { stream, relation } => Some((stream, relation)),
            ElementTag::Channel { .. } => None,
        }
    }
}

/// Begin location of element `i` in `elements`.
#[inline]
pub fn begin_location(elements: &[LinkElement], i: usize) -> f64 {
    if i == 0 {
        0.0
    } else {
        elements[i - 1].end_location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_tags() {
        let e = LinkElement::associated(10.0, MeshEdgeId::new(4));
        assert!(e.is_associated());
        assert!(!e.is_moved());
        let m = LinkElement::moved(20.0, LinkId::new(9));
        assert_eq!(m.moved_to(), Some(LinkId::new(9)));
        let i = LinkElement::intersection(5.0, LinkId::new(1));
        assert_eq!(
            i.intersection_record(),
            Some((LinkId::new(1), Relation::Coincident))
        );
        assert_eq!(i.moved_to(), None);
    }

    #[test]
    fn begin_is_previous_end() {
        let els = vec![LinkElement::channel(3.0), LinkElement::channel(8.0)];
        assert_eq!(begin_location(&els, 0), 0.0);
        assert_eq!(begin_location(&els, 1), 3.0);
    }
}
