//! Structural validation of the link table.
//!
//! Checks are read-only. The caller passes an [`InvariantContext`] saying
//! which relaxations apply; there is no global switch.

use crate::algs::reachability::find_downstream_cycle;
use crate::debug_invariants::DebugInvariants;
use crate::geometry::Shape;
use crate::network_error::NetworkError;
use crate::topology::element::ElementTag;
use crate::topology::endpoint::{Boundary, Endpoint};
use crate::topology::ids::LinkId;
use crate::topology::link::{Link, LinkKind};
use crate::topology::link_table::LinkTable;

/// Relative tolerance when comparing a stream's `length` to its element
/// extent.
const LENGTH_TOLERANCE: f64 = 1e-9;

/// Which relaxations a validation call accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvariantContext {
    /// Accept a connection listed on only one side.
    pub allow_non_reciprocal: bool,
    /// Search for downstream cycles (one pass over the whole table).
    pub check_cycles: bool,
}

impl InvariantContext {
    /// Every rule enforced.
    pub fn strict() -> Self {
        Self {
            allow_non_reciprocal: false,
            check_cycles: true,
        }
    }

    /// Every rule except reciprocity.
    pub fn allow_non_reciprocal() -> Self {
        Self {
            allow_non_reciprocal: true,
            ..Self::strict()
        }
    }
}

impl Default for InvariantContext {
    fn default() -> Self {
        Self::strict()
    }
}

/// First violation in the table, if any.
pub fn check_invariants(table: &LinkTable, ctx: &InvariantContext) -> Result<(), NetworkError> {
    for id in table.ids() {
        validate_link(table, id, ctx)?;
    }
    if ctx.check_cycles {
        if let Some(link) = find_downstream_cycle(table) {
            return Err(NetworkError::CycleDetected { link });
        }
    }
    Ok(())
}

/// Every violation in the table, one per offending link at most, plus the
/// cycle check.
pub fn collect_violations(table: &LinkTable, ctx: &InvariantContext) -> Vec<NetworkError> {
    let mut out: Vec<NetworkError> = table
        .ids()
        .filter_map(|id| validate_link(table, id, ctx).err())
        .collect();
    if ctx.check_cycles {
        if let Some(link) = find_downstream_cycle(table) {
            out.push(NetworkError::CycleDetected { link });
        }
    }
    out
}

/// Check every rule that concerns a single link and its immediate neighbors.
pub fn validate_link(
    table: &LinkTable,
    id: LinkId,
    ctx: &InvariantContext,
) -> Result<(), NetworkError> {
    let link = table.get(id)?;
    check_adjacency(table, id, link, true, ctx)?;
    check_adjacency(table, id, link, false, ctx)?;

    match link.kind {
        LinkKind::Unused => {
            if !link.shapes.is_empty() || !link.elements.is_empty() {
                return Err(NetworkError::violation(id, "unused link owns shapes or elements"));
            }
            if !link.upstream.is_empty() || !link.downstream.is_empty() {
                return Err(NetworkError::violation(id, "unused link has connections"));
            }
        }
        LinkKind::PrunedStream => {
            if !link.elements.is_empty() {
                return Err(NetworkError::violation(id, "pruned link still has elements"));
            }
            if !link.upstream.is_empty() || !link.downstream.is_empty() {
                return Err(NetworkError::violation(id, "pruned link still has connections"));
            }
        }
        LinkKind::Stream => check_stream(table, id, link)?,
        LinkKind::Waterbody | LinkKind::IceMass => check_waterbody(table, id, link)?,
    }
    Ok(())
}

fn check_adjacency(
    table: &LinkTable,
    id: LinkId,
    link: &Link,
    upstream: bool,
    ctx: &InvariantContext,
) -> Result<(), NetworkError> {
    let (list, name) = if upstream {
        (&link.upstream, "upstream")
    } else {
        (&link.downstream, "downstream")
    };
    for (i, ep) in list.iter().enumerate() {
        if list[..i].contains(ep) {
            return Err(NetworkError::DuplicateConnection {
                link: id,
                endpoint: *ep,
            });
        }
        match *ep {
            Endpoint::Boundary(b) => {
                let ok = match b {
                    Boundary::NoFlow => false,
                    Boundary::Inflow => upstream,
                    Boundary::Outflow => !upstream,
                };
                if !ok {
                    return Err(NetworkError::InvalidBoundary {
                        link: id,
                        boundary: b,
                        list: name,
                    });
                }
            }
            Endpoint::Link(n) => {
                if n == id {
                    return Err(NetworkError::SelfConnection(id));
                }
                let neighbor = table.get(n)?;
                if link.kind.is_live() && !neighbor.kind.is_live() {
                    return Err(NetworkError::DanglingConnection {
                        link: id,
                        neighbor: n,
                        neighbor_kind: neighbor.kind,
                    });
                }
                let reverse = if upstream {
                    &neighbor.downstream
                } else {
                    &neighbor.upstream
                };
                if !ctx.allow_non_reciprocal && !reverse.contains(&Endpoint::Link(id)) {
                    return Err(NetworkError::NonReciprocalConnection {
                        link: id,
                        neighbor: n,
                        direction: name,
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_stream(table: &LinkTable, id: LinkId, link: &Link) -> Result<(), NetworkError> {
    if link.elements.is_empty() {
        return Err(NetworkError::violation(id, "stream has no elements"));
    }
    let mut previous = 0.0;
    let mut seen_moved = false;
    for (i, e) in link.elements.iter().enumerate() {
        if !e.end_location.is_finite() {
            return Err(NetworkError::NonFiniteLocation {
                link: id,
                location: e.end_location,
            });
        }
        if e.end_location <= previous {
            return Err(NetworkError::ElementOrder {
                link: id,
                element: i,
                previous,
                end: e.end_location,
            });
        }
        previous = e.end_location;
        match e.tag {
            ElementTag::Channel { moved_to: Some(to) } => {
                seen_moved = true;
                if to == id || to.index() >= table.len() {
                    return Err(NetworkError::violation(
                        id,
                        format!("element {i} moved to invalid link {to}"),
                    ));
                }
                if e.edge.is_some() {
                    return Err(NetworkError::violation(
                        id,
                        format!("moved element {i} keeps a mesh edge"),
                    ));
                }
            }
            ElementTag::Channel { moved_to: None } => {
                if seen_moved {
                    return Err(NetworkError::violation(
                        id,
                        format!("unmoved element {i} follows a moved element"),
                    ));
                }
            }
            ElementTag::Intersection { .. } => {
                return Err(NetworkError::violation(
                    id,
                    format!("stream element {i} is an intersection record"),
                ));
            }
        }
    }
    let extent = link.extent();
    if (extent - link.length).abs() > LENGTH_TOLERANCE * link.length.abs().max(1.0) {
        return Err(NetworkError::violation(
            id,
            format!("length {} differs from element extent {extent}", link.length),
        ));
    }

    if link.origin == id {
        let polylines = link
            .shapes
            .iter()
            .filter(|s| matches!(s, Shape::Polyline(_)))
            .count();
        if polylines != 1 || link.shapes.len() != 1 {
            return Err(NetworkError::violation(
                id,
                "original stream must own exactly one polyline",
            ));
        }
        if !(link.upstream_contributing_area > 0.0 && link.downstream_contributing_area > 0.0) {
            return Err(NetworkError::violation(
                id,
                "original stream has non-positive contributing area",
            ));
        }
    } else {
        if !link.shapes.is_empty() {
            return Err(NetworkError::violation(id, "split stream owns shapes"));
        }
        let origin_kind = table.kind(link.origin)?;
        if !matches!(origin_kind, LinkKind::Stream | LinkKind::PrunedStream) {
            return Err(NetworkError::WrongLinkKind {
                link: link.origin,
                expected: "Stream or PrunedStream origin",
                found: origin_kind,
            });
        }
    }
    Ok(())
}

fn check_waterbody(table: &LinkTable, id: LinkId, link: &Link) -> Result<(), NetworkError> {
    if link.polygons().next().is_none() {
        return Err(NetworkError::violation(id, "waterbody has no polygon"));
    }
    for (i, e) in link.elements.iter().enumerate() {
        match e.intersection_record() {
            Some((stream, _)) if stream.index() < table.len() => {}
            Some((stream, _)) => {
                return Err(NetworkError::LinkOutOfRange {
                    link: stream,
                    len: table.len(),
                });
            }
            None => {
                return Err(NetworkError::violation(
                    id,
                    format!("waterbody element {i} is not an intersection record"),
                ));
            }
        }
    }
    Ok(())
}

impl DebugInvariants for LinkTable {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(
            check_invariants(self, &InvariantContext::strict()),
            "LinkTable"
        );
    }

    fn validate_invariants(&self) -> Result<(), NetworkError> {
        check_invariants(self, &InvariantContext::strict())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionLimits;
    use crate::geometry::Point2;
    use crate::io::{LinkIdentity, StreamRecord};
    use crate::topology::element::LinkElement;

    fn table(n: usize) -> LinkTable {
        let ids: Vec<_> = (0..n)
            .map(|i| LinkIdentity {
                link: LinkId::new(i),
                reach_code: i as i64,
            })
            .collect();
        let mut t = LinkTable::from_identities(&ids, ConnectionLimits::default()).unwrap();
        for i in 0..n {
            t.add_stream(&StreamRecord {
                link: LinkId::new(i),
                polyline: vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)],
                upstream_contributing_area: 1.0,
                downstream_contributing_area: 2.0,
                stream_order: 1,
                upstream: [Endpoint::NO_FLOW; 2],
                downstream: Endpoint::NO_FLOW,
            })
            .unwrap();
        }
        t
    }

    fn id(i: usize) -> LinkId {
        LinkId::new(i)
    }

    #[test]
    fn fresh_table_is_valid() {
        let mut t = table(3);
        t.connect(id(0), id(2)).unwrap();
        t.connect(id(1), id(2)).unwrap();
        t.add_downstream(id(2), Endpoint::OUTFLOW).unwrap();
        assert!(check_invariants(&t, &InvariantContext::strict()).is_ok());
        assert!(t.validate_invariants().is_ok());
    }

    #[test]
    fn one_sided_connection_needs_relaxed_context() {
        let mut t = table(2);
        t.add_downstream(id(0), Endpoint::Link(id(1))).unwrap();
        assert!(matches!(
            check_invariants(&t, &InvariantContext::strict()),
            Err(NetworkError::NonReciprocalConnection { .. })
        ));
        assert!(check_invariants(&t, &InvariantContext::allow_non_reciprocal()).is_ok());
    }

    #[test]
    fn cycle_is_reported() {
        let mut t = table(2);
        t.connect(id(0), id(1)).unwrap();
        t.connect(id(1), id(0)).unwrap();
        assert!(matches!(
            check_invariants(&t, &InvariantContext::strict()),
            Err(NetworkError::CycleDetected { .. })
        ));
        let relaxed = InvariantContext {
            check_cycles: false,
            ..InvariantContext::strict()
        };
        assert!(check_invariants(&t, &relaxed).is_ok());
    }

    #[test]
    fn element_order_and_length_checked() {
        let mut t = table(1);
        t.get_mut(id(0)).unwrap().elements =
            vec![LinkElement::channel(60.0), LinkElement::channel(40.0)];
        assert!(matches!(
            validate_link(&t, id(0), &InvariantContext::strict()),
            Err(NetworkError::ElementOrder { element: 1, .. })
        ));
        t.get_mut(id(0)).unwrap().elements = vec![LinkElement::channel(90.0)];
        assert!(matches!(
            validate_link(&t, id(0), &InvariantContext::strict()),
            Err(NetworkError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn moved_elements_must_be_a_suffix() {
        let mut t = table(2);
        t.get_mut(id(0)).unwrap().elements = vec![
            LinkElement::moved(50.0, id(1)),
            LinkElement::channel(100.0),
        ];
        assert!(validate_link(&t, id(0), &InvariantContext::strict()).is_err());
    }

    #[test]
    fn dangling_reference_to_pruned_link() {
        let mut t = table(2);
        t.connect(id(0), id(1)).unwrap();
        t.get_mut(id(0)).unwrap().kind = LinkKind::PrunedStream;
        let all = collect_violations(&t, &InvariantContext::strict());
        assert!(all
            .iter()
            .any(|e| matches!(e, NetworkError::DanglingConnection { .. })));
        // the pruned link itself is also flagged
        assert!(all.len() >= 2);
    }

    #[test]
    fn stored_no_flow_is_rejected() {
        let mut t = table(1);
        t.get_mut(id(0)).unwrap().downstream.push(Endpoint::NO_FLOW);
        assert!(matches!(
            validate_link(&t, id(0), &InvariantContext::strict()),
            Err(NetworkError::InvalidBoundary { .. })
        ));
    }
}
