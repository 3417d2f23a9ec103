//! Linking streams and waterbodies at their intersection points.
//!
//! Runs in four passes over the whole table:
//! 1. record every stream/waterbody crossing on the waterbody as an
//!    intersection element (location measured along the stream);
//! 2. classify each record as where the stream enters (`Upstream`) or
//!    leaves (`Downstream`) the waterbody, or as irrelevant (`Unrelated`);
//! 3. rewire the graph at each classified record, splitting streams where a
//!    crossing falls inside them;
//! 4. connect waterbodies that touch each other.

use crate::algs::reachability::{reaches_downstream, relation_between};
use crate::algs::split::{LocationBias, resolve_location, snap_out_of_associated, split};
use crate::io::{StreamWaterbodyIntersection, WaterbodyIntersection};
use crate::network_error::NetworkError;
use crate::topology::element::{ElementTag, LinkElement, Relation};
use crate::topology::endpoint::Endpoint;
use crate::topology::ids::LinkId;
use crate::topology::link::LinkKind;
use crate::topology::link_table::LinkTable;

/// Counts reported by [`link_waterbodies`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkingSummary {
    pub intersections: usize,
    pub inflows: usize,
    pub outflows: usize,
    pub splits: usize,
    pub waterbody_pairs: usize,
}

/// Run all four linking passes.
pub fn link_waterbodies(
    table: &mut LinkTable,
    stream_crossings: &[StreamWaterbodyIntersection],
    waterbody_contacts: &[WaterbodyIntersection],
) -> Result<LinkingSummary, NetworkError> {
    let mut summary = LinkingSummary {
        intersections: record_intersections(table, stream_crossings)?,
        ..Default::default()
    };
    let waterbodies: Vec<LinkId> = table
        .iter()
        .filter(|(_, l)| l.kind().is_waterbody())
        .map(|(id, _)| id)
        .collect();
    for &w in &waterbodies {
        classify_intersections(table, w)?;
    }
    for &w in &waterbodies {
        let records: Vec<(LinkId, f64, Relation)> = table
            .get(w)?
            .elements()
            .iter()
            .filter_map(|e| e.intersection_record().map(|(s, r)| (s, e.end_location, r)))
            .collect();
        for (stream, location, relation) in records {
            let before = table.len();
            match relation {
                Relation::Upstream => summary.inflows += 1,
                Relation::Downstream => summary.outflows += 1,
                Relation::Coincident | Relation::Unrelated => continue,
            }
            link_waterbody_stream_intersection(table, w, stream, location, relation)?;
            summary.splits += table.len() - before;
        }
    }
    summary.waterbody_pairs = link_waterbody_pairs(table, waterbody_contacts)?;
    log::info!(
        "waterbody linking: {} crossings, {} inflows, {} outflows, {} splits, {} waterbody pairs",
        summary.intersections,
        summary.inflows,
        summary.outflows,
        summary.splits,
        summary.waterbody_pairs
    );
    Ok(summary)
}

/// Project each crossing onto its stream and append an unclassified record
/// to the waterbody. Returns the number of records added.
pub fn record_intersections(
    table: &mut LinkTable,
    crossings: &[StreamWaterbodyIntersection],
) -> Result<usize, NetworkError> {
    for x in crossings {
        let waterbody = table.link_by_reach_code(x.waterbody_code)?;
        table.expect_waterbody(waterbody)?;
        let stream = table.expect_stream(x.stream)?;
        let origin = table.get(stream.origin())?;
        let polyline = origin
            .polyline()
            .ok_or_else(|| NetworkError::violation(stream.origin(), "origin has no polyline"))?;
        let location = polyline.project(x.point) - stream.shape_offset();
        table
            .get_mut(waterbody)?
            .elements
            .push(LinkElement::intersection(location, x.stream));
    }
    Ok(crossings.len())
}

/// Classify every record on waterbody `w`.
///
/// A record that coincides with an earlier one is `Unrelated`. Otherwise it
/// is `Downstream` when no other record lies downstream of it, `Upstream`
/// when none lies upstream of it, and `Unrelated` in between.
pub fn classify_intersections(table: &mut LinkTable, w: LinkId) -> Result<(), NetworkError> {
    let records: Vec<(LinkId, f64)> = table
        .expect_waterbody(w)?
        .elements()
        .iter()
        .filter_map(|e| e.intersection_record().map(|(s, _)| (s, e.end_location)))
        .collect();
    let mut positions = Vec::with_capacity(records.len());
    for &(stream, location) in &records {
        positions.push(resolve_location(table, stream, location, LocationBias::Start)?);
    }

    let mut relations = Vec::with_capacity(records.len());
    for (i, &here) in positions.iter().enumerate() {
        let mut duplicate = false;
        let (mut has_downstream, mut has_upstream) = (false, false);
        for (j, &other) in positions.iter().enumerate() {
            if i == j {
                continue;
            }
            match relation_between(table, here, other)? {
                Relation::Coincident => duplicate |= j < i,
                Relation::Upstream => has_downstream = true,
                Relation::Downstream => has_upstream = true,
                Relation::Unrelated => {}
            }
        }
        relations.push(if duplicate {
            Relation::Unrelated
        } else if !has_downstream {
            Relation::Downstream
        } else if !has_upstream {
            Relation::Upstream
        } else {
            Relation::Unrelated
        });
    }

    let link = table.get_mut(w)?;
    let mut next = relations.into_iter();
    for e in &mut link.elements {
        if let ElementTag::Intersection { relation, .. } = &mut e.tag {
            if let Some(r) = next.next() {
                *relation = r;
            }
        }
    }
    log::debug!("classified {} records on waterbody {w}", records.len());
    Ok(())
}

/// Rewire the graph for one classified record.
///
/// `location` is in the frame `stream` had when the record was made; it is
/// resolved through split history first (entering points bias to the
/// element ending there, leaving points to the one starting there).
pub fn link_waterbody_stream_intersection(
    table: &mut LinkTable,
    w: LinkId,
    stream: LinkId,
    location: f64,
    relation: Relation,
) -> Result<(), NetworkError> {
    let bias = match relation {
        Relation::Upstream => LocationBias::End,
        Relation::Downstream => LocationBias::Start,
        Relation::Coincident | Relation::Unrelated => return Ok(()),
    };
    let (s, at) = resolve_location(table, stream, location, bias)?;
    if table.kind(s)? != LinkKind::Stream {
        log::debug!("record on {stream} resolves to non-stream {s}; skipped");
        return Ok(());
    }
    let extent = table.get(s)?.extent();
    match relation {
        Relation::Upstream if at <= 0.0 => redirect_upstream_to_waterbody(table, s, w),
        Relation::Upstream => make_stream_flow_into_waterbody(table, s, at, w),
        Relation::Downstream if at >= extent => take_over_downstream(table, s, w),
        _ => make_waterbody_flow_into_stream(table, w, s, at),
    }
}

/// The stream starts at the shoreline: its upstream neighbors drain into
/// the waterbody instead.
fn redirect_upstream_to_waterbody(
    table: &mut LinkTable,
    s: LinkId,
    w: LinkId,
) -> Result<(), NetworkError> {
    let upstream: Vec<LinkId> = table.get(s)?.upstream_links().collect();
    for u in upstream {
        if u == w {
            continue;
        }
        table.disconnect(u, s)?;
        if !table.is_connected(u, w) {
            table.connect(u, w)?;
        }
    }
    log::debug!("{s} begins at waterbody {w}; upstream redirected");
    Ok(())
}

/// Make the part of `s` above `at` drain into `w`.
pub fn make_stream_flow_into_waterbody(
    table: &mut LinkTable,
    s: LinkId,
    at: f64,
    w: LinkId,
) -> Result<(), NetworkError> {
    let link = table.expect_stream(s)?;
    let snapped = snap_out_of_associated(link, at);
    if snapped <= 0.0 {
        return redirect_upstream_to_waterbody(table, s, w);
    }
    if snapped < link.extent() {
        split(table, s, snapped)?;
    }
    let downstream: Vec<LinkId> = table.get(s)?.downstream_links().collect();
    for d in downstream {
        if table.is_stream(d) {
            table.disconnect(s, d)?;
        }
    }
    if !table.is_connected(s, w) {
        table.connect(s, w)?;
    }
    log::debug!("{s} flows into waterbody {w} at {snapped}");
    Ok(())
}

/// The stream ends at the shoreline: the waterbody inherits its downstream
/// connections, boundary outflow included.
fn take_over_downstream(table: &mut LinkTable, s: LinkId, w: LinkId) -> Result<(), NetworkError> {
    let downstream = table.get(s)?.downstream().to_vec();
    for ep in downstream {
        match ep {
            Endpoint::Link(d) if d == w => {}
            Endpoint::Link(d) => {
                table.disconnect(s, d)?;
                if !table.is_connected(w, d) {
                    table.connect(w, d)?;
                }
            }
            Endpoint::Boundary(_) => {
                table.remove_downstream(s, ep)?;
                if !table.get(w)?.downstream().contains(&ep) {
                    table.add_downstream(w, ep)?;
                }
            }
        }
    }
    log::debug!("waterbody {w} takes over downstream of {s}");
    Ok(())
}

/// Make `w` drain into the part of `s` below `at`.
pub fn make_waterbody_flow_into_stream(
    table: &mut LinkTable,
    w: LinkId,
    s: LinkId,
    at: f64,
) -> Result<(), NetworkError> {
    let link = table.expect_stream(s)?;
    let snapped = snap_out_of_associated(link, at);
    let extent = link.extent();
    if snapped >= extent {
        return take_over_downstream(table, s, w);
    }
    let target = if snapped > 0.0 {
        split(table, s, snapped)?
    } else {
        s
    };
    let upstream: Vec<LinkId> = table.get(target)?.upstream_links().collect();
    for u in upstream {
        if table.is_stream(u) {
            table.disconnect(u, target)?;
        }
    }
    if !table.is_connected(w, target) {
        table.connect(w, target)?;
    }
    log::debug!("waterbody {w} flows into {target} (from {s} at {snapped})");
    Ok(())
}

/// Connect touching waterbodies that are not yet adjacent. Direction
/// follows existing reachability, else the order the pair was listed in.
/// Returns the number of connections made.
pub fn link_waterbody_pairs(
    table: &mut LinkTable,
    contacts: &[WaterbodyIntersection],
) -> Result<usize, NetworkError> {
    let mut made = 0;
    for x in contacts {
        let a = table.link_by_reach_code(x.first_code)?;
        let b = table.link_by_reach_code(x.second_code)?;
        table.expect_waterbody(a)?;
        table.expect_waterbody(b)?;
        if a == b || table.is_adjacent(a, b) {
            continue;
        }
        let (up, down) = if reaches_downstream(table, b, a)? {
            (b, a)
        } else {
            (a, b)
        };
        table.connect(up, down)?;
        log::debug!("waterbody {up} -> waterbody {down}");
        made += 1;
    }
    Ok(made)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionLimits;
    use crate::geometry::Point2;
    use crate::io::{LinkIdentity, StreamRecord, WaterbodyRecord, WaterbodyType};

    fn square(x0: f64) -> Vec<Point2> {
        vec![
            Point2::new(x0, -10.0),
            Point2::new(x0 + 20.0, -10.0),
            Point2::new(x0 + 20.0, 10.0),
            Point2::new(x0, 10.0),
        ]
    }

    /// Stream 0 runs 0..100 along y = 0 into stream 1 (100..200) and out.
    /// Links 2 and 3 are waterbodies with reach codes 502 and 503.
    fn network() -> LinkTable {
        let ids: Vec<_> = (0..4)
            .map(|i| LinkIdentity {
                link: LinkId::new(i),
                reach_code: 500 + i as i64,
            })
            .collect();
        let mut t = LinkTable::from_identities(&ids, ConnectionLimits::default()).unwrap();
        let records = [
            StreamRecord {
                link: LinkId::new(0),
                polyline: vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)],
                upstream_contributing_area: 1.0,
                downstream_contributing_area: 2.0,
                stream_order: 1,
                upstream: [Endpoint::INFLOW, Endpoint::NO_FLOW],
                downstream: Endpoint::Link(LinkId::new(1)),
            },
            StreamRecord {
                link: LinkId::new(1),
                polyline: vec![Point2::new(100.0, 0.0), Point2::new(200.0, 0.0)],
                upstream_contributing_area: 2.0,
                downstream_contributing_area: 3.0,
                stream_order: 1,
                upstream: [Endpoint::Link(LinkId::new(0)), Endpoint::NO_FLOW],
                downstream: Endpoint::OUTFLOW,
            },
        ];
        for r in &records {
            t.add_stream(r).unwrap();
        }
        t.connect_stream_records(&records).unwrap();
        for (code, x0) in [(502, 40.0), (503, 300.0)] {
            t.add_waterbody(&WaterbodyRecord {
                reach_code: code,
                parts: vec![square(x0)],
                waterbody_type: WaterbodyType::LakePond,
            })
            .unwrap();
        }
        t
    }

    fn id(i: usize) -> LinkId {
        LinkId::new(i)
    }

    fn crossing(stream: usize, code: i64, x: f64) -> StreamWaterbodyIntersection {
        StreamWaterbodyIntersection {
            stream: id(stream),
            waterbody_code: code,
            point: Point2::new(x, 0.0),
        }
    }

    #[test]
    fn entry_and_exit_are_classified() {
        let mut t = network();
        record_intersections(
            &mut t,
            &[crossing(0, 502, 60.0), crossing(0, 502, 40.0), crossing(0, 502, 40.0)],
        )
        .unwrap();
        classify_intersections(&mut t, id(2)).unwrap();
        let rel: Vec<_> = t
            .get(id(2))
            .unwrap()
            .elements()
            .iter()
            .map(|e| e.intersection_record().unwrap().1)
            .collect();
        assert_eq!(
            rel,
            vec![Relation::Downstream, Relation::Upstream, Relation::Unrelated]
        );
    }

    #[test]
    fn lake_in_the_middle_of_a_stream() {
        let mut t = network();
        let s = link_waterbodies(
            &mut t,
            &[crossing(0, 502, 40.0), crossing(0, 502, 60.0)],
            &[],
        )
        .unwrap();
        assert_eq!(s.inflows, 1);
        assert_eq!(s.outflows, 1);
        assert_eq!(s.splits, 2);
        // 0 [0,40] -> W ; 4 [40,60] isolated ; W -> 5 [60,100] -> 1
        let (w, mid, tail) = (id(2), id(4), id(5));
        assert!(t.is_connected(id(0), w));
        assert!(t.is_connected(w, tail));
        assert!(t.is_connected(tail, id(1)));
        assert!(t.get(mid).unwrap().upstream().is_empty());
        assert!(t.get(mid).unwrap().downstream().is_empty());
        assert_eq!(t.get(id(0)).unwrap().length(), 40.0);
        assert_eq!(t.get(tail).unwrap().length(), 40.0);
    }

    #[test]
    fn stream_ending_in_lake_hands_over_outflow() {
        let mut t = network();
        link_waterbody_stream_intersection(&mut t, id(2), id(1), 100.0, Relation::Downstream)
            .unwrap();
        assert!(t.get(id(1)).unwrap().downstream().is_empty());
        assert_eq!(t.get(id(2)).unwrap().downstream(), &[Endpoint::OUTFLOW]);
    }

    #[test]
    fn entry_at_stream_start_redirects_upstream() {
        let mut t = network();
        link_waterbody_stream_intersection(&mut t, id(2), id(1), 0.0, Relation::Upstream)
            .unwrap();
        assert!(t.is_connected(id(0), id(2)));
        assert!(!t.is_connected(id(0), id(1)));
        assert!(t.get(id(1)).unwrap().upstream().is_empty());
    }

    #[test]
    fn waterbody_pairs_connect_once() {
        let mut t = network();
        let contact = WaterbodyIntersection {
            first_code: 503,
            second_code: 502,
            point: Point2::new(0.0, 0.0),
        };
        let n = link_waterbody_pairs(&mut t, &[contact, contact]).unwrap();
        assert_eq!(n, 1);
        assert!(t.is_connected(id(3), id(2)));
    }

    #[test]
    fn waterbody_pair_follows_reachability() {
        let mut t = network();
        // 2 -> 1 -> Outflow ... 3 downstream of 2 via 1
        t.connect(id(2), id(1)).unwrap();
        t.connect(id(1), id(3)).unwrap();
        let contact = WaterbodyIntersection {
            first_code: 503,
            second_code: 502,
            point: Point2::new(0.0, 0.0),
        };
        link_waterbody_pairs(&mut t, &[contact]).unwrap();
        assert!(t.is_connected(id(2), id(3)));
    }
}
