//! End-to-end channel network construction.
//!
//! Phases run in a fixed order over one [`LinkTable`]:
//! 1. populate links from the hydrography source and wire stream connections
//! 2. associate channel-coded mesh edges
//! 3. link waterbodies to the streams crossing them
//! 4. prune unassociated streams and merge short links
//! 5. number output elements and assemble the output
//!
//! The table is checked between phases when the build enables invariant
//! checks or [`NetworkConfig::check_invariants`] is set.

use crate::algs::associate::{AssociationSummary, associate_mesh_edges};
use crate::algs::numbering::number_elements;
use crate::algs::prune::prune_all;
use crate::algs::short_links::fix_short_links;
use crate::algs::waterbody::{LinkingSummary, link_waterbodies};
use crate::config::NetworkConfig;
use crate::debug_invariants::invariants_enabled_by_build;
use crate::io::{HydrographySource, MeshBoundary};
use crate::network_error::NetworkError;
use crate::output::{ChannelNetworkOutput, assemble_output};
use crate::topology::link::LinkKind;
use crate::topology::link_table::LinkTable;
use crate::topology::validation::{InvariantContext, check_invariants};

/// Per-phase counts of one construction run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub streams: usize,
    pub waterbodies: usize,
    pub association: AssociationSummary,
    pub linking: LinkingSummary,
    pub pruned: usize,
    pub merged_short_links: usize,
    pub elements: usize,
}

/// Final link table together with the assembled output.
#[derive(Clone, Debug)]
pub struct ChannelNetwork {
    pub table: LinkTable,
    pub output: ChannelNetworkOutput,
    pub summary: PipelineSummary,
}

/// Create and type every link, then wire the stream records' connections.
pub fn populate_link_table<S: HydrographySource + ?Sized>(
    source: &S,
    config: &NetworkConfig,
) -> Result<LinkTable, NetworkError> {
    let identities = source.link_identities()?;
    let mut table = LinkTable::from_identities(&identities, config.connection_limits)?;
    let streams = source.streams()?;
    for record in &streams {
        table.add_stream(record)?;
    }
    for record in &source.waterbodies()? {
        table.add_waterbody(record)?;
    }
    table.connect_stream_records(&streams)?;
    log::info!(
        "populated {} links: {} streams, {} waterbodies, {} ice masses",
        table.len(),
        table.count_kind(LinkKind::Stream),
        table.count_kind(LinkKind::Waterbody),
        table.count_kind(LinkKind::IceMass)
    );
    Ok(table)
}

fn checkpoint(table: &LinkTable, config: &NetworkConfig, phase: &str) -> Result<(), NetworkError> {
    if config.check_invariants || invariants_enabled_by_build() {
        log::debug!("checking invariants after {phase}");
        check_invariants(table, &InvariantContext::strict())?;
    }
    Ok(())
}

/// Run every phase and return the network.
///
/// # Errors
/// The first error of any phase; the run stops there.
pub fn build_channel_network<S: HydrographySource + ?Sized>(
    source: &S,
    mesh: &MeshBoundary,
    config: &NetworkConfig,
) -> Result<ChannelNetwork, NetworkError> {
    config.validate()?;
    let mut summary = PipelineSummary::default();

    let mut table = populate_link_table(source, config)?;
    summary.streams = table.count_kind(LinkKind::Stream);
    summary.waterbodies = table.count_kind(LinkKind::Waterbody) + table.count_kind(LinkKind::IceMass);
    checkpoint(&table, config, "population")?;

    log::debug!("associating mesh edges");
    summary.association = associate_mesh_edges(&mut table, mesh, config)?;
    checkpoint(&table, config, "association")?;

    log::debug!("linking waterbodies");
    summary.linking = link_waterbodies(
        &mut table,
        &source.stream_waterbody_intersections()?,
        &source.waterbody_intersections()?,
    )?;
    checkpoint(&table, config, "waterbody linking")?;

    log::debug!("simplifying network");
    summary.pruned = prune_all(&mut table)?;
    summary.merged_short_links = fix_short_links(&mut table, config)?;
    checkpoint(&table, config, "simplification")?;

    summary.elements = number_elements(&mut table, config)?;
    let output = assemble_output(&table, mesh, config)?;
    Ok(ChannelNetwork {
        table,
        output,
        summary,
    })
}
