//! Splitting a stream link in two, and following split history.
//!
//! A split at `at` appends a new stream link that takes over every element
//! beginning at or after `at`. The original keeps those elements as moved
//! placeholders (same end locations, `moved_to = new`) so that locations
//! measured in its original frame can still be resolved with
//! [`resolve_location`].

use crate::debug_invariants;
use crate::network_error::NetworkError;
use crate::topology::element::{LinkElement, begin_location};
use crate::topology::endpoint::Endpoint;
use crate::topology::ids::LinkId;
use crate::topology::link::{Link, LinkKind};
use crate::topology::link_table::LinkTable;
use crate::topology::validation::{InvariantContext, validate_link};

/// Which element a location on an element boundary belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LocationBias {
    /// The element that begins at the location.
    Start,
    /// The element that ends at the location.
    End,
}

/// Split stream `link` at `at` meters and return the new downstream link.
///
/// # Errors
/// - `InvalidSplitLocation` unless `0 < at < extent`
/// - `SplitInsideAssociatedElement` if `at` falls strictly inside an element
///   bound to a mesh edge (snap with [`snap_out_of_associated`] first)
pub fn split(table: &mut LinkTable, link: LinkId, at: f64) -> Result<LinkId, NetworkError> {
    let new_id = LinkId::new(table.len());
    let (new_link, straddle, at) = {
        let original = table.expect_stream(link)?;
        let extent = original.extent();
        if !at.is_finite() {
            return Err(NetworkError::NonFiniteLocation { link, location: at });
        }
        // round `at` so that `at + (length - at)` is exactly `length`
        let at = original.length - (original.length - at);
        if !(at > 0.0 && at < extent) {
            return Err(NetworkError::InvalidSplitLocation {
                link,
                location: at,
                extent,
            });
        }
        let unmoved = original.unmoved_elements();
        // first element ending past `at`; exists because at < extent
        let first = unmoved.partition_point(|e| e.end_location <= at);
        let straddle = begin_location(unmoved, first) < at;
        if straddle && unmoved[first].is_associated() {
            return Err(NetworkError::SplitInsideAssociatedElement {
                link,
                element: first,
                location: at,
            });
        }

        let mut new_link = Link::unused(new_id, original.reach_code);
        new_link.kind = LinkKind::Stream;
        new_link.origin = original.origin;
        new_link.shape_offset = original.shape_offset + at;
        new_link.length = original.length - at;
        new_link.upstream_contributing_area = original.contributing_area_at(at);
        new_link.downstream_contributing_area = original.downstream_contributing_area;
        new_link.stream_order = original.stream_order;
        new_link.elements = unmoved[first..]
            .iter()
            .map(|e| LinkElement {
                end_location: e.end_location - at,
                edge: e.edge,
                tag: e.tag,
            })
            .collect();
        (new_link, straddle.then_some(first), at)
    };
    let area_at = new_link.upstream_contributing_area;
    let pushed = table.push_link(new_link);
    debug_assert_eq!(pushed, new_id);

    {
        let original = table.get_mut(link)?;
        let count = original.unmoved_count();
        let first = original.elements[..count].partition_point(|e| e.end_location <= at);
        for e in &mut original.elements[first..count] {
            *e = LinkElement::moved(e.end_location, new_id);
        }
        if straddle.is_some() {
            original.elements.insert(first, LinkElement::channel(at));
        }
        original.length = at;
        original.downstream_contributing_area = area_at;
    }

    let downstream = table.get(link)?.downstream.clone();
    for ep in downstream {
        match ep {
            Endpoint::Link(d) => {
                table.disconnect(link, d)?;
                table.connect(new_id, d)?;
            }
            Endpoint::Boundary(_) => {
                table.remove_downstream(link, ep)?;
                table.add_downstream(new_id, ep)?;
            }
        }
    }
    table.connect(link, new_id)?;

    log::debug!(
        "split {link} at {at}{}: downstream part is {new_id}",
        if straddle.is_some() { " (inside element)" } else { "" }
    );
    debug_invariants!(validate_link(table, link, &InvariantContext::strict()), "split original");
    debug_invariants!(validate_link(table, new_id, &InvariantContext::strict()), "split new");
    Ok(new_id)
}

/// Map `location`, measured in `link`'s frame at the time it was created,
/// to the link that now holds that channel and the location along it.
///
/// Follows `moved_to` chains; each hop rebases the location to the new
/// link's frame. Locations past the last element clamp to it.
pub fn resolve_location(
    table: &LinkTable,
    link: LinkId,
    location: f64,
    bias: LocationBias,
) -> Result<(LinkId, f64), NetworkError> {
    let (mut link, mut location) = (link, location);
    for _ in 0..=table.len() {
        let elements = &table.get(link)?.elements;
        if elements.is_empty() {
            return Ok((link, location));
        }
        let idx = match bias {
            LocationBias::Start => elements.partition_point(|e| e.end_location <= location),
            LocationBias::End => elements.partition_point(|e| e.end_location < location),
        }
        .min(elements.len() - 1);
        let Some(to) = elements[idx].moved_to() else {
            return Ok((link, location));
        };
        let group_start = elements[..idx]
            .iter()
            .rposition(|e| e.moved_to() != Some(to))
            .map_or(0, |p| p + 1);
        location -= begin_location(elements, group_start);
        link = to;
    }
    Err(NetworkError::CycleDetected { link })
}

/// Move `location` out of the interior of an associated element to the
/// nearer of its boundaries (ties go to the start). Locations elsewhere are
/// returned unchanged.
pub fn snap_out_of_associated(link: &Link, location: f64) -> f64 {
    let unmoved = link.unmoved_elements();
    let idx = unmoved.partition_point(|e| e.end_location <= location);
    let Some(e) = unmoved.get(idx) else {
        return location;
    };
    let begin = begin_location(unmoved, idx);
    if !e.is_associated() || location <= begin {
        return location;
    }
    if location - begin <= e.end_location - location {
        begin
    } else {
        e.end_location
    }
}
