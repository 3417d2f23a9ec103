#![allow(dead_code)]
use channel_net::config::NetworkConfig;
use channel_net::geometry::Point2;
use channel_net::io::{InMemoryHydrography, LinkIdentity, StreamRecord, WaterbodyRecord, WaterbodyType};
use channel_net::pipeline::populate_link_table;
use channel_net::topology::{Endpoint, LinkId, LinkTable};

pub fn id(i: usize) -> LinkId {
    LinkId::new(i)
}

/// Identities `0..n` with reach codes `100 + i`.
pub fn identities(n: usize) -> Vec<LinkIdentity> {
    (0..n)
        .map(|i| LinkIdentity {
            link: id(i),
            reach_code: 100 + i as i64,
        })
        .collect()
}

/// Straight stream from `a` to `b` with contributing area growing from
/// 1 km² to 2 km².
pub fn stream(link: usize, a: (f64, f64), b: (f64, f64), upstream: [Endpoint; 2], downstream: Endpoint) -> StreamRecord {
    StreamRecord {
        link: id(link),
        polyline: vec![a.into(), b.into()],
        upstream_contributing_area: 1.0e6,
        downstream_contributing_area: 2.0e6,
        stream_order: 1,
        upstream,
        downstream,
    }
}

/// Axis-aligned rectangular waterbody.
pub fn lake(reach_code: i64, x0: f64, x1: f64, y0: f64, y1: f64) -> WaterbodyRecord {
    WaterbodyRecord {
        reach_code,
        parts: vec![vec![
            Point2::new(x0, y0),
            Point2::new(x1, y0),
            Point2::new(x1, y1),
            Point2::new(x0, y1),
        ]],
        waterbody_type: WaterbodyType::LakePond,
    }
}

pub fn table_from(source: &InMemoryHydrography) -> LinkTable {
    populate_link_table(source, &NetworkConfig::default()).expect("populate")
}

/// Unmoved element ends of `link`.
pub fn ends(table: &LinkTable, link: LinkId) -> Vec<f64> {
    table
        .get(link)
        .expect("link")
        .unmoved_elements()
        .iter()
        .map(|e| e.end_location)
        .collect()
}
