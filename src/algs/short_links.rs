//! Merging very short streams into their upstream neighbors.

use crate::algs::prune::try_prune;
use crate::config::NetworkConfig;
use crate::network_error::NetworkError;
use crate::topology::endpoint::Endpoint;
use crate::topology::ids::LinkId;
use crate::topology::link::LinkKind;
use crate::topology::link_table::LinkTable;

/// Merge every qualifying short stream, visiting links in id order.
/// Returns the number of links merged away.
///
/// A stream qualifies when it is shorter than
/// [`NetworkConfig::short_link_threshold`] for its order, has no mesh edge
/// bound to it, and has at least one upstream neighbor, all of them streams.
pub fn fix_short_links(table: &mut LinkTable, config: &NetworkConfig) -> Result<usize, NetworkError> {
    config.validate()?;
    let mut merged = 0;
    for id in table.ids() {
        let Some(upstream) = merge_candidates(table, id, config)? else {
            continue;
        };
        merge_into_upstream(table, id, &upstream)?;
        merged += 1;
    }
    log::info!("merged {merged} short links");
    Ok(merged)
}

/// Upstream neighbors to merge `id` into, or `None` if it does not qualify.
fn merge_candidates(
    table: &LinkTable,
    id: LinkId,
    config: &NetworkConfig,
) -> Result<Option<Vec<LinkId>>, NetworkError> {
    let link = table.get(id)?;
    if link.kind() != LinkKind::Stream || link.has_association() {
        return Ok(None);
    }
    let threshold = config.short_link_threshold(link.stream_order())?;
    if link.length() >= threshold || link.upstream().is_empty() {
        return Ok(None);
    }
    let mut upstream = Vec::with_capacity(link.upstream().len());
    for ep in link.upstream() {
        match *ep {
            Endpoint::Link(u) if table.is_stream(u) => upstream.push(u),
            _ => {
                log::debug!("short link {id} has non-stream upstream {ep}; kept");
                return Ok(None);
            }
        }
    }
    log::warn!(
        "link {id} is {:.2} m, below {threshold:.2} m for order {}; merging into {:?}",
        link.length(),
        link.stream_order(),
        upstream
    );
    Ok(Some(upstream))
}

fn merge_into_upstream(
    table: &mut LinkTable,
    id: LinkId,
    upstream: &[LinkId],
) -> Result<(), NetworkError> {
    let short = table.get(id)?;
    let added = short.length();
    let area = short.downstream_contributing_area();
    let downstream = short.downstream().to_vec();

    for &u in upstream {
        let l = table.get_mut(u)?;
        let count = l.unmoved_count();
        // moved placeholders shift too so end locations stay increasing
        for e in &mut l.elements[count.saturating_sub(1)..] {
            e.end_location += added;
        }
        l.length += added;
        l.downstream_contributing_area = area;

        for &ep in &downstream {
            match ep {
                Endpoint::Link(d) => {
                    if !table.is_connected(u, d) {
                        table.connect(u, d)?;
                    }
                }
                Endpoint::Boundary(_) => {
                    if !table.get(u)?.downstream().contains(&ep) {
                        table.add_downstream(u, ep)?;
                    }
                }
            }
        }
        table.disconnect(u, id)?;
    }
    try_prune(table, id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionLimits;
    use crate::geometry::Point2;
    use crate::io::{LinkIdentity, StreamRecord};

    /// 0 (1000 m) and 1 (1000 m) join into 2 (`short` m), which drains to 3.
    fn confluence(short: f64) -> LinkTable {
        let ids: Vec<_> = (0..4)
            .map(|i| LinkIdentity {
                link: LinkId::new(i),
                reach_code: i as i64,
            })
            .collect();
        let mut t = LinkTable::from_identities(&ids, ConnectionLimits::default()).unwrap();
        for (i, len) in [(0, 1000.0), (1, 1000.0), (2, short), (3, 1000.0)] {
            t.add_stream(&StreamRecord {
                link: LinkId::new(i),
                polyline: vec![Point2::new(0.0, 0.0), Point2::new(len, 0.0)],
                upstream_contributing_area: 1.0,
                downstream_contributing_area: 1.0 + i as f64,
                stream_order: 1,
                upstream: [Endpoint::NO_FLOW; 2],
                downstream: Endpoint::NO_FLOW,
            })
            .unwrap();
        }
        let l = LinkId::new;
        t.add_upstream(l(0), Endpoint::INFLOW).unwrap();
        t.add_upstream(l(1), Endpoint::INFLOW).unwrap();
        t.connect(l(0), l(2)).unwrap();
        t.connect(l(1), l(2)).unwrap();
        t.connect(l(2), l(3)).unwrap();
        t.add_downstream(l(3), Endpoint::OUTFLOW).unwrap();
        t
    }

    fn id(i: usize) -> LinkId {
        LinkId::new(i)
    }

    #[test]
    fn short_confluence_link_is_merged() {
        let mut t = confluence(100.0);
        assert_eq!(fix_short_links(&mut t, &NetworkConfig::default()).unwrap(), 1);
        assert_eq!(t.kind(id(2)).unwrap(), LinkKind::PrunedStream);
        for u in [0, 1] {
            let l = t.get(id(u)).unwrap();
            assert_eq!(l.length(), 1100.0);
            assert_eq!(l.extent(), 1100.0);
            assert_eq!(l.downstream_contributing_area(), 3.0);
            assert_eq!(l.downstream(), &[Endpoint::Link(id(3))]);
        }
        assert_eq!(
            t.get(id(3)).unwrap().upstream(),
            &[Endpoint::Link(id(0)), Endpoint::Link(id(1))]
        );
    }

    #[test]
    fn empty_target_table_is_rejected() {
        let mut t = confluence(100.0);
        let cfg = NetworkConfig {
            target_element_lengths: vec![],
            ..Default::default()
        };
        assert!(matches!(
            fix_short_links(&mut t, &cfg),
            Err(NetworkError::InvalidConfig(_))
        ));
        assert_eq!(t.kind(id(2)).unwrap(), LinkKind::Stream);
    }

    #[test]
    fn long_links_are_untouched() {
        let mut t = confluence(200.0);
        assert_eq!(fix_short_links(&mut t, &NetworkConfig::default()).unwrap(), 0);
        assert_eq!(t.kind(id(2)).unwrap(), LinkKind::Stream);
    }

    #[test]
    fn boundary_inflow_blocks_merge() {
        let mut t = confluence(1000.0);
        // every link is below this threshold
        let cfg = NetworkConfig {
            short_link_ratio: 10.0,
            ..Default::default()
        };
        fix_short_links(&mut t, &cfg).unwrap();
        // 0 and 1 have an Inflow upstream, so they absorb the others
        assert_eq!(t.kind(id(0)).unwrap(), LinkKind::Stream);
        assert_eq!(t.kind(id(1)).unwrap(), LinkKind::Stream);
    }
}
