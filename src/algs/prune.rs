//! Removing orphaned headwater streams.
//!
//! A stream with nothing upstream and no mesh edge bound to it carries no
//! water the solver can see. Pruning converts it to
//! [`LinkKind::PrunedStream`] in place; ids are never reused.

use std::collections::{BTreeMap, VecDeque};

use crate::network_error::NetworkError;
use crate::topology::endpoint::Endpoint;
use crate::topology::ids::LinkId;
use crate::topology::link::LinkKind;
use crate::topology::link_table::LinkTable;

/// Pruned reach code -> reach code of the nearest surviving downstream link.
pub type PruneMap = BTreeMap<i64, i64>;

/// Whether `link` qualifies for pruning right now.
pub fn is_prunable(table: &LinkTable, link: LinkId) -> Result<bool, NetworkError> {
    let l = table.get(link)?;
    Ok(l.kind() == LinkKind::Stream && l.upstream().is_empty() && !l.has_association())
}

/// Prune `link` if it qualifies, then every downstream link left without
/// upstream neighbors as a result. Returns the number of links pruned.
pub fn try_prune(table: &mut LinkTable, link: LinkId) -> Result<usize, NetworkError> {
    let mut worklist = VecDeque::from([link]);
    let mut pruned = 0;
    while let Some(id) = worklist.pop_front() {
        if !is_prunable(table, id)? {
            continue;
        }
        let downstream = table.get(id)?.downstream().to_vec();
        for &ep in &downstream {
            match ep {
                Endpoint::Link(d) => {
                    table.disconnect(id, d)?;
                    if table.get(d)?.upstream().is_empty() {
                        worklist.push_back(d);
                    }
                }
                Endpoint::Boundary(_) => {
                    table.remove_downstream(id, ep)?;
                }
            }
        }
        let l = table.get_mut(id)?;
        l.kind = LinkKind::PrunedStream;
        l.former_downstream = downstream;
        l.elements = Vec::new();
        log::debug!("pruned {id} (reach {})", l.reach_code);
        pruned += 1;
    }
    Ok(pruned)
}

/// [`try_prune`] every link in id order.
pub fn prune_all(table: &mut LinkTable) -> Result<usize, NetworkError> {
    let mut pruned = 0;
    for id in table.ids() {
        pruned += try_prune(table, id)?;
    }
    log::info!("pruned {pruned} links");
    Ok(pruned)
}

/// Map each pruned reach code to the reach code of the nearest live link
/// reached through former downstream connections (breadth-first).
///
/// Reach codes still carried by a live link (a split sibling) are left out.
/// A pruned link with no live link downstream is logged and left out.
pub fn build_prune_map(table: &LinkTable) -> PruneMap {
    let live_codes: hashbrown::HashSet<i64> = table
        .iter()
        .filter(|(_, l)| l.kind().is_live())
        .map(|(_, l)| l.reach_code())
        .collect();
    let mut map = PruneMap::new();
    for (id, link) in table.iter() {
        if link.kind() != LinkKind::PrunedStream || live_codes.contains(&link.reach_code()) {
            continue;
        }
        match nearest_live_downstream(table, id) {
            Some(target) => {
                let code = table.get(target).map_or(link.reach_code(), |l| l.reach_code());
                map.entry(link.reach_code()).or_insert(code);
            }
            None => log::warn!(
                "pruned {id} (reach {}) has no surviving downstream link",
                link.reach_code()
            ),
        }
    }
    map
}

fn nearest_live_downstream(table: &LinkTable, start: LinkId) -> Option<LinkId> {
    let mut seen = vec![false; table.len()];
    let mut queue = VecDeque::from([start]);
    seen[start.index()] = true;
    while let Some(id) = queue.pop_front() {
        let link = table.get(id).ok()?;
        for d in link.former_downstream().iter().filter_map(|e| e.link()) {
            let Some(slot) = seen.get_mut(d.index()) else {
                continue;
            };
            if *slot {
                continue;
            }
            *slot = true;
            match table.kind(d) {
                Ok(kind) if kind.is_live() => return Some(d),
                Ok(LinkKind::PrunedStream) => queue.push_back(d),
                _ => {}
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionLimits;
    use crate::geometry::Point2;
    use crate::io::{LinkIdentity, StreamRecord};
    use crate::topology::element::LinkElement;
    use crate::topology::ids::MeshEdgeId;

    fn tree(edges: &[(usize, usize)], n: usize) -> LinkTable {
        let ids: Vec<_> = (0..n)
            .map(|i| LinkIdentity {
                link: LinkId::new(i),
                reach_code: 100 + i as i64,
            })
            .collect();
        let mut t = LinkTable::from_identities(&ids, ConnectionLimits::default()).unwrap();
        for i in 0..n {
            t.add_stream(&StreamRecord {
                link: LinkId::new(i),
                polyline: vec![Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)],
                upstream_contributing_area: 1.0,
                downstream_contributing_area: 1.0,
                stream_order: 1,
                upstream: [Endpoint::NO_FLOW; 2],
                downstream: Endpoint::NO_FLOW,
            })
            .unwrap();
        }
        for &(u, d) in edges {
            t.connect(LinkId::new(u), LinkId::new(d)).unwrap();
        }
        t
    }

    fn bind(t: &mut LinkTable, i: usize) {
        t.get_mut(LinkId::new(i)).unwrap().elements =
            vec![LinkElement::associated(100.0, MeshEdgeId::new(i))];
    }

    fn id(i: usize) -> LinkId {
        LinkId::new(i)
    }

    #[test]
    fn cascade_stops_at_associated_link() {
        let mut t = tree(&[(0, 1), (1, 2)], 3);
        t.add_downstream(id(2), Endpoint::OUTFLOW).unwrap();
        bind(&mut t, 2);
        assert_eq!(try_prune(&mut t, id(0)).unwrap(), 2);
        assert_eq!(t.kind(id(1)).unwrap(), LinkKind::PrunedStream);
        assert_eq!(t.kind(id(2)).unwrap(), LinkKind::Stream);
        assert!(t.get(id(2)).unwrap().upstream().is_empty());
        assert_eq!(build_prune_map(&t), PruneMap::from([(100, 102), (101, 102)]));
    }

    #[test]
    fn confluence_survives_while_one_branch_remains() {
        let mut t = tree(&[(0, 2), (1, 2)], 3);
        bind(&mut t, 1);
        assert_eq!(prune_all(&mut t).unwrap(), 1);
        assert_eq!(t.kind(id(2)).unwrap(), LinkKind::Stream);
        assert_eq!(t.get(id(2)).unwrap().upstream(), &[Endpoint::Link(id(1))]);
    }

    #[test]
    fn inflow_boundary_protects_link() {
        let mut t = tree(&[], 1);
        t.add_upstream(id(0), Endpoint::INFLOW).unwrap();
        assert_eq!(try_prune(&mut t, id(0)).unwrap(), 0);
    }

    #[test]
    fn outflow_is_detached_and_remembered() {
        let mut t = tree(&[], 1);
        t.add_downstream(id(0), Endpoint::OUTFLOW).unwrap();
        assert_eq!(try_prune(&mut t, id(0)).unwrap(), 1);
        let l = t.get(id(0)).unwrap();
        assert!(l.downstream().is_empty());
        assert!(l.elements().is_empty());
        assert_eq!(l.former_downstream(), &[Endpoint::OUTFLOW]);
        assert!(build_prune_map(&t).is_empty());
    }
}
