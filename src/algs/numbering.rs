//! Channel element numbering.
//!
//! Each live link is cut into output elements: a stream into
//! `max(1, round(length / target))` equal pieces, a waterbody or ice mass
//! into exactly one. Numbers are assigned consecutively in link id order.

use crate::config::NetworkConfig;
use crate::network_error::NetworkError;
use crate::topology::link::LinkKind;
use crate::topology::link_table::LinkTable;

/// Output element count for a stream of `length` meters.
pub fn stream_element_count(length: f64, target: f64) -> usize {
    ((length / target).round() as usize).max(1)
}

/// Assign `element_start` and `number_of_elements` to every live link and
/// clear them on the rest. Returns the total element count.
pub fn number_elements(table: &mut LinkTable, config: &NetworkConfig) -> Result<usize, NetworkError> {
    config.validate()?;
    let mut next = 0usize;
    for id in table.ids() {
        let link = table.get_mut(id)?;
        let count = match link.kind {
            LinkKind::Stream => Some(stream_element_count(
                link.length,
                config.target_element_length(link.stream_order)?,
            )),
            LinkKind::Waterbody | LinkKind::IceMass => Some(1),
            LinkKind::Unused | LinkKind::PrunedStream => None,
        };
        link.element_start = count.map(|_| next);
        link.number_of_elements = count;
        next += count.unwrap_or(0);
    }
    log::info!("numbered {next} channel elements");
    Ok(next)
}
