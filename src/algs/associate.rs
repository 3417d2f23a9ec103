//! Binding mesh boundary edges to 1D ranges along stream links.
//!
//! Each channel-bordering mesh edge gets one element of its link. A free
//! range is carved out directly; a range already (partly) held by other
//! edges is resolved by moving into the largest free gap, or, when there is
//! none, by squeezing the new element in at an element junction.

use crate::algs::split::{LocationBias, resolve_location};
use crate::config::NetworkConfig;
use crate::debug_invariants;
use crate::io::MeshBoundary;
use crate::network_error::NetworkError;
use crate::topology::element::{LinkElement, begin_location};
use crate::topology::ids::{LinkId, MeshEdgeId};
use crate::topology::link::LinkKind;
use crate::topology::link_table::LinkTable;
use crate::topology::validation::{InvariantContext, validate_link};

/// Counts reported by [`associate_mesh_edges`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AssociationSummary {
    /// Edges bound to a stream element.
    pub stream_edges: usize,
    /// Edges recorded as waterbody shoreline.
    pub shoreline_edges: usize,
}

/// Bind `edge` to the range between `location1` and `location2` on stream
/// `link`.
///
/// Locations are swapped into order; equal locations are widened by `nudge`
/// on each side; both are clamped to `[0, extent]`. A link that already
/// carries `edge` is left unchanged.
///
/// # Errors
/// `DegenerateAssociation` if the clamped range is empty,
/// `NonFiniteLocation` for NaN or infinite input.
pub fn associate(
    table: &mut LinkTable,
    link: LinkId,
    location1: f64,
    location2: f64,
    edge: MeshEdgeId,
    nudge: f64,
) -> Result<(), NetworkError> {
    let l = table.expect_stream(link)?;
    for location in [location1, location2] {
        if !location.is_finite() {
            return Err(NetworkError::NonFiniteLocation { link, location });
        }
    }
    if l.elements.iter().any(|e| e.edge == Some(edge)) {
        log::trace!("edge {edge} already on {link}");
        return Ok(());
    }

    let extent = l.extent();
    let (mut lo, mut hi) = if location1 <= location2 {
        (location1, location2)
    } else {
        (location2, location1)
    };
    if lo == hi {
        lo -= nudge;
        hi += nudge;
    }
    lo = lo.clamp(0.0, extent);
    hi = hi.clamp(0.0, extent);
    if hi <= lo {
        return Err(NetworkError::DegenerateAssociation {
            link,
            edge,
            location1,
            location2,
        });
    }

    let count = l.unmoved_count();
    let mut prefix = l.elements[..count].to_vec();
    let (i1, i2) = range_indices(&prefix, lo, hi);
    if prefix[i1..=i2].iter().all(|e| !e.is_associated()) {
        insert_span(&mut prefix, lo, hi, edge);
    } else {
        log::warn!(
            "edge {edge} on {link}: range [{lo:.3}, {hi:.3}] overlaps an associated element"
        );
        match best_gap(&prefix, i1, i2, lo, hi) {
            Some((a, b)) => insert_span(&mut prefix, a, b, edge),
            None => insert_at_junction(&mut prefix, i1, i2, lo, hi, edge),
        }
    }

    table.get_mut(link)?.elements.splice(..count, prefix);
    debug_invariants!(
        validate_link(table, link, &InvariantContext::strict()),
        "associate"
    );
    Ok(())
}

/// Bind every channel-coded mesh edge to its link.
///
/// Edges coded for a stream are projected onto the origin polyline and the
/// range is resolved through split history. Edges coded for a waterbody or
/// ice mass become shoreline edges.
pub fn associate_mesh_edges(
    table: &mut LinkTable,
    mesh: &MeshBoundary,
    config: &NetworkConfig,
) -> Result<AssociationSummary, NetworkError> {
    let mut summary = AssociationSummary::default();
    for (index, mesh_edge) in mesh.edges.iter().enumerate() {
        let Some(link) = mesh_edge.channel_link() else {
            continue;
        };
        let edge = MeshEdgeId::new(index);
        let target = table.get(link)?;
        match target.kind {
            LinkKind::Waterbody | LinkKind::IceMass => {
                table.get_mut(link)?.shoreline_edges.push(edge);
                summary.shoreline_edges += 1;
            }
            LinkKind::Stream => {
                let offset = target.shape_offset;
                let origin = table.get(target.origin)?;
                let polyline = origin.polyline().ok_or_else(|| {
                    NetworkError::violation(target.origin, "origin has no polyline")
                })?;
                let (p1, p2) = mesh.edge_points(edge)?;
                let s1 = polyline.project(p1) - offset;
                let s2 = polyline.project(p2) - offset;
                let mid = 0.5 * (s1 + s2);
                let (resolved, at) = resolve_location(table, link, mid, LocationBias::Start)?;
                let shift = mid - at;
                associate(
                    table,
                    resolved,
                    s1 - shift,
                    s2 - shift,
                    edge,
                    config.coincident_nudge,
                )?;
                summary.stream_edges += 1;
            }
            kind => {
                return Err(NetworkError::WrongLinkKind {
                    link,
                    expected: "Stream, Waterbody, or IceMass",
                    found: kind,
                });
            }
        }
    }
    log::info!(
        "associated {} stream edges and {} shoreline edges",
        summary.stream_edges,
        summary.shoreline_edges
    );
    Ok(summary)
}

/// `(first element ending after lo, first element ending at or after hi)`.
fn range_indices(elements: &[LinkElement], lo: f64, hi: f64) -> (usize, usize) {
    let last = elements.len() - 1;
    (
        elements.partition_point(|e| e.end_location <= lo).min(last),
        elements.partition_point(|e| e.end_location < hi).min(last),
    )
}

/// Replace `[lo, hi]` with one element bound to `edge`. Every element
/// overlapping the range must be unassociated.
fn insert_span(elements: &mut Vec<LinkElement>, lo: f64, hi: f64, edge: MeshEdgeId) {
    let (i1, i2) = range_indices(elements, lo, hi);
    let mut out = Vec::with_capacity(elements.len() + 2);
    out.extend_from_slice(&elements[..i1]);
    if begin_location(elements, i1) < lo {
        out.push(LinkElement {
            end_location: lo,
            ..elements[i1].clone()
        });
    }
    out.push(LinkElement::associated(hi, edge));
    if elements[i2].end_location > hi {
        out.push(elements[i2].clone());
    }
    out.extend_from_slice(&elements[i2 + 1..]);
    *elements = out;
}

/// Longest run of unassociated elements inside `[lo, hi]`, clipped to the
/// range. Ties go to the gap nearest the range midpoint, then the earliest.
fn best_gap(
    elements: &[LinkElement],
    i1: usize,
    i2: usize,
    lo: f64,
    hi: f64,
) -> Option<(f64, f64)> {
    let mid = 0.5 * (lo + hi);
    let mut best: Option<(f64, f64, f64, f64)> = None; // (len, dist, a, b)
    let mut j = i1;
    while j <= i2 {
        if elements[j].is_associated() {
            j += 1;
            continue;
        }
        let start = j;
        while j < i2 && !elements[j + 1].is_associated() {
            j += 1;
        }
        let a = begin_location(elements, start).max(lo);
        let b = elements[j].end_location.min(hi);
        if b > a {
            let len = b - a;
            let dist = (0.5 * (a + b) - mid).abs();
            let better = match best {
                None => true,
                Some((blen, bdist, _, _)) => len > blen || (len == blen && dist < bdist),
            };
            if better {
                best = Some((len, dist, a, b));
            }
        }
        j += 1;
    }
    best.map(|(_, _, a, b)| (a, b))
}

/// Insert an element for `edge` at the element junction inside `[i1, i2]`
/// nearest the range midpoint, shrinking the in-range elements on either
/// side of the junction so the group keeps its span.
fn insert_at_junction(
    elements: &mut Vec<LinkElement>,
    i1: usize,
    i2: usize,
    lo: f64,
    hi: f64,
    edge: MeshEdgeId,
) {
    let mid = 0.5 * (lo + hi);
    // a junction k sits at begin_location(k); k == len is the far end
    let candidates: Vec<usize> = if i2 > i1 {
        (i1 + 1..=i2).collect()
    } else {
        vec![i1, i2 + 1]
    };
    let distance = |k: usize| (begin_location(elements, k) - mid).abs();
    let k = candidates
        .into_iter()
        .min_by(|a, b| distance(*a).total_cmp(&distance(*b)))
        .unwrap_or(i1);

    let left = (k > i1).then(|| k - 1);
    let right = (k <= i2).then_some(k);
    let (first, last) = match (left, right) {
        (Some(l), Some(r)) => (l, r),
        (Some(l), None) => (l, l),
        (None, Some(r)) => (r, r),
        // every candidate junction has an element on at least one side
        (None, None) => return,
    };
    let span_begin = begin_location(elements, first);
    let span_end = elements[last].end_location;
    let total = span_end - span_begin;
    let requested = hi - lo;
    let ratio = total / (total + requested);

    let mut group = Vec::with_capacity(3);
    let mut cursor = span_begin;
    if let Some(l) = left {
        cursor += (elements[l].end_location - begin_location(elements, l)) * ratio;
        group.push(LinkElement {
            end_location: cursor,
            ..elements[l].clone()
        });
    }
    match right {
        Some(r) => {
            cursor += requested * ratio;
            group.push(LinkElement::associated(cursor, edge));
            group.push(LinkElement {
                end_location: span_end,
                ..elements[r].clone()
            });
        }
        None => group.push(LinkElement::associated(span_end, edge)),
    }
    log::debug!(
        "edge {edge} squeezed in at {:.3} (ratio {ratio:.4})",
        begin_location(elements, k)
    );
    elements.splice(first..=last, group);
}
