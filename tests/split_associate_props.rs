mod util;

use channel_net::algs::associate::associate;
use channel_net::algs::split::split;
use channel_net::io::InMemoryHydrography;
use channel_net::topology::{Endpoint, InvariantContext, LinkTable, MeshEdgeId, check_invariants};
use proptest::prelude::*;
use util::{ends, id, identities, stream, table_from};

fn straight(length: f64) -> LinkTable {
    table_from(&InMemoryHydrography {
        identities: identities(1),
        streams: vec![stream(
            0,
            (0.0, 0.0),
            (length, 0.0),
            [Endpoint::INFLOW, Endpoint::NO_FLOW],
            Endpoint::OUTFLOW,
        )],
        ..Default::default()
    })
}

fn partition(table: &LinkTable) -> Vec<(f64, Option<MeshEdgeId>)> {
    table
        .get(id(0))
        .unwrap()
        .elements()
        .iter()
        .map(|e| (e.end_location, e.edge))
        .collect()
}

proptest! {
    #[test]
    fn split_lengths_sum_to_the_original(
        length in 1.0e-3f64..1.0e7,
        at_frac in 1.0e-6f64..1.0,
    ) {
        let at = length * at_frac;
        prop_assume!(at < length);

        let mut table = straight(length);
        prop_assert_eq!(table.get(id(0)).unwrap().length(), length);
        let new = split(&mut table, id(0), at).unwrap();

        let first = table.get(id(0)).unwrap().length();
        let second = table.get(new).unwrap().length();
        prop_assert_eq!((first + second).to_bits(), length.to_bits());
        prop_assert!(check_invariants(&table, &InvariantContext::strict()).is_ok());
    }

    // Whole-meter boundaries let the rebased element ends be compared exactly.
    #[test]
    fn split_preserves_element_boundaries(
        length in 100u32..2000,
        start in 0u32..90,
        width in 1u32..10,
        at_frac in 0.01f64..0.99,
    ) {
        let length = length as f64;
        let (a, b) = (start as f64, (start + width) as f64);
        let at = (length * at_frac).round().max(1.0);
        prop_assume!(at < length);
        prop_assume!(at <= a || at >= b);

        let mut table = straight(length);
        associate(&mut table, id(0), a, b, MeshEdgeId::new(0), 1.0).unwrap();
        let new = split(&mut table, id(0), at).unwrap();

        let first = table.get(id(0)).unwrap().length();
        let second = table.get(new).unwrap().length();
        prop_assert_eq!(first + second, length);

        let mut expected: Vec<f64> = [a, b, length, at].into_iter().filter(|&x| x > 0.0).collect();
        expected.sort_by(f64::total_cmp);
        expected.dedup();
        let mut joined = ends(&table, id(0));
        joined.extend(ends(&table, new).iter().map(|e| e + at));
        prop_assert_eq!(joined, expected);
        prop_assert!(check_invariants(&table, &InvariantContext::strict()).is_ok());
    }

    #[test]
    fn association_order_does_not_matter(
        a1 in 0u32..300,
        len1 in 1u32..50,
        gap in 1u32..50,
        len2 in 1u32..50,
    ) {
        let e1 = (a1 as f64, (a1 + len1) as f64, MeshEdgeId::new(1));
        let a2 = a1 + len1 + gap;
        let e2 = (a2 as f64, (a2 + len2) as f64, MeshEdgeId::new(2));

        let mut forward = straight(1000.0);
        let mut backward = straight(1000.0);
        for (t, order) in [(&mut forward, [e1, e2]), (&mut backward, [e2, e1])] {
            for (l1, l2, edge) in order {
                associate(t, id(0), l1, l2, edge, 1.0).unwrap();
            }
        }
        prop_assert_eq!(partition(&forward), partition(&backward));
    }
}
