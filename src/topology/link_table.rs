//! LinkTable: the array of all links, indexed by stable [`LinkId`].
//!
//! The table is the root data structure of network construction. It is
//! created in bulk from the link identity list (every link starts as
//! [`LinkKind::Unused`] with only a reach code), then typed by the stream and
//! waterbody records. Links are never removed; splitting appends new links
//! and pruning converts links in place.
//!
//! # Invariants
//! - `links[i]` is the link with id `i`.
//! - `reach_index` maps each identity reach code to the link that was created
//!   for it. Links appended by splitting share their origin's reach code but
//!   are not indexed.

use crate::config::ConnectionLimits;
use crate::geometry::{Polygon, Polyline, Shape};
use crate::io::{LinkIdentity, StreamRecord, WaterbodyRecord};
use crate::network_error::NetworkError;
use crate::topology::element::LinkElement;
use crate::topology::endpoint::{Boundary, Endpoint};
use crate::topology::ids::LinkId;
use crate::topology::link::{Link, LinkKind};
use hashbrown::HashMap;

#[derive(Clone, Debug, Default)]
pub struct LinkTable {
    links: Vec<Link>,
    reach_index: HashMap<i64, LinkId>,
    limits: ConnectionLimits,
}

impl LinkTable {
    /// Create one `Unused` link per identity.
    ///
    /// # Errors
    /// `NonSequentialLinkId` if ids are not `0..n` in order,
    /// `DuplicateReachCode` if two identities share a reach code.
    pub fn from_identities(
        identities: &[LinkIdentity],
        limits: ConnectionLimits,
    ) -> Result<Self, NetworkError> {
        let mut links = Vec::with_capacity(identities.len());
        let mut reach_index = HashMap::with_capacity(identities.len());
        for (expected, ident) in identities.iter().enumerate() {
            if ident.link.index() != expected {
                return Err(NetworkError::NonSequentialLinkId {
                    expected,
                    found: ident.link.index(),
                });
            }
            if let Some(first) = reach_index.insert(ident.reach_code, ident.link) {
                return Err(NetworkError::DuplicateReachCode {
                    code: ident.reach_code,
                    first,
                    second: ident.link,
                });
            }
            links.push(Link::unused(ident.link, ident.reach_code));
        }
        log::debug!("created link table with {} links", links.len());
        Ok(Self {
            links,
            reach_index,
            limits,
        })
    }

    /// Number of links, including unused and pruned ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    #[inline]
    pub fn limits(&self) -> ConnectionLimits {
        self.limits
    }

    pub fn get(&self, id: LinkId) -> Result<&Link, NetworkError> {
        self.links.get(id.index()).ok_or(NetworkError::LinkOutOfRange {
            link: id,
            len: self.links.len(),
        })
    }

    pub(crate) fn get_mut(&mut self, id: LinkId) -> Result<&mut Link, NetworkError> {
        let len = self.links.len();
        self.links
            .get_mut(id.index())
            .ok_or(NetworkError::LinkOutOfRange { link: id, len })
    }

    /// The link's kind, or `LinkOutOfRange`.
    #[inline]
    pub fn kind(&self, id: LinkId) -> Result<LinkKind, NetworkError> {
        Ok(self.get(id)?.kind)
    }

    /// Fail with `WrongLinkKind` unless `id` is a stream.
    pub fn expect_stream(&self, id: LinkId) -> Result<&Link, NetworkError> {
        let link = self.get(id)?;
        if link.kind != LinkKind::Stream {
            return Err(NetworkError::WrongLinkKind {
                link: id,
                expected: "Stream",
                found: link.kind,
            });
        }
        Ok(link)
    }

    /// Fail with `WrongLinkKind` unless `id` is a waterbody or ice mass.
    pub fn expect_waterbody(&self, id: LinkId) -> Result<&Link, NetworkError> {
        let link = self.get(id)?;
        if !link.kind.is_waterbody() {
            return Err(NetworkError::WrongLinkKind {
                link: id,
                expected: "Waterbody or IceMass",
                found: link.kind,
            });
        }
        Ok(link)
    }

    pub fn ids(&self) -> impl Iterator<Item = LinkId> + use<> {
        (0..self.links.len()).map(LinkId::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links
            .iter()
            .enumerate()
            .map(|(i, l)| (LinkId::new(i), l))
    }

    /// Link created for identity `reach_code`.
    pub fn link_by_reach_code(&self, reach_code: i64) -> Result<LinkId, NetworkError> {
        self.reach_index
            .get(&reach_code)
            .copied()
            .ok_or(NetworkError::UnknownReachCode(reach_code))
    }

    /// Number of links of `kind`.
    pub fn count_kind(&self, kind: LinkKind) -> usize {
        self.links.iter().filter(|l| l.kind == kind).count()
    }

    /// Append a link and return its id.
    pub(crate) fn push_link(&mut self, link: Link) -> LinkId {
        self.links.push(link);
        LinkId::new(self.links.len() - 1)
    }

    /// Type a link as a stream from its record. Connections are wired
    /// separately by [`connect_stream_records`](Self::connect_stream_records)
    /// once every stream exists.
    pub fn add_stream(&mut self, record: &StreamRecord) -> Result<(), NetworkError> {
        let id = record.link;
        let polyline = Polyline::new(record.polyline.clone())?;
        for (attribute, value) in [
            ("upstream contributing area", record.upstream_contributing_area),
            ("downstream contributing area", record.downstream_contributing_area),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(NetworkError::InvalidAttribute {
                    link: id,
                    attribute,
                    value,
                });
            }
        }
        let link = self.get_mut(id)?;
        if link.kind != LinkKind::Unused {
            return Err(NetworkError::LinkAlreadyTyped {
                link: id,
                kind: link.kind,
            });
        }
        let length = polyline.length();
        link.kind = LinkKind::Stream;
        link.length = length;
        link.upstream_contributing_area = record.upstream_contributing_area;
        link.downstream_contributing_area = record.downstream_contributing_area;
        link.stream_order = record.stream_order;
        link.shapes = vec![Shape::Polyline(polyline)];
        link.elements = vec![LinkElement::channel(length)];
        Ok(())
    }

    /// Type the link carrying `record.reach_code` as a waterbody or ice mass.
    pub fn add_waterbody(&mut self, record: &WaterbodyRecord) -> Result<LinkId, NetworkError> {
        let id = self.link_by_reach_code(record.reach_code)?;
        if record.parts.is_empty() {
            return Err(NetworkError::DegenerateGeometry(format!(
                "waterbody {} has no polygon parts",
                record.reach_code
            )));
        }
        let shapes = record
            .parts
            .iter()
            .map(|part| Polygon::new(part.clone()).map(Shape::Polygon))
            .collect::<Result<Vec<_>, _>>()?;
        let link = self.get_mut(id)?;
        if link.kind != LinkKind::Unused {
            return Err(NetworkError::LinkAlreadyTyped {
                link: id,
                kind: link.kind,
            });
        }
        link.kind = record.waterbody_type.link_kind();
        link.shapes = shapes;
        Ok(id)
    }

    /// Wire the upstream/downstream references carried by stream records.
    ///
    /// A connection named by either end is made once; `NoFlow` slots are
    /// skipped.
    pub fn connect_stream_records(&mut self, records: &[StreamRecord]) -> Result<(), NetworkError> {
        for record in records {
            let id = record.link;
            for ep in record.upstream {
                match ep {
                    Endpoint::Link(up) => {
                        self.expect_stream(up)?;
                        if !self.is_connected(up, id) {
                            self.connect(up, id)?;
                        }
                    }
                    Endpoint::Boundary(Boundary::NoFlow) => {}
                    Endpoint::Boundary(_) => {
                        if !self.get(id)?.upstream.contains(&ep) {
                            self.add_upstream(id, ep)?;
                        }
                    }
                }
            }
            match record.downstream {
                Endpoint::Link(down) => {
                    self.expect_stream(down)?;
                    if !self.is_connected(id, down) {
                        self.connect(id, down)?;
                    }
                }
                Endpoint::Boundary(Boundary::NoFlow) => {}
                ep @ Endpoint::Boundary(_) => {
                    if !self.get(id)?.downstream.contains(&ep) {
                        self.add_downstream(id, ep)?;
                    }
                }
            }
        }
        Ok(())
    }
}
