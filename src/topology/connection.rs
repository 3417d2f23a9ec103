//! Connection management: the only code that edits adjacency lists.
//!
//! Upstream and downstream lists are ordered and duplicate-free. Removal
//! shifts later entries left (`Vec::retain`), so lists stay front-compacted
//! and an empty list is the no-flow state. `connect` edits both sides or
//! neither; `add_upstream`/`add_downstream` edit one side and are meant for
//! boundary sentinels or for deliberately scoped two-step mutations.

use crate::network_error::NetworkError;
use crate::topology::endpoint::{Boundary, Endpoint};
use crate::topology::ids::LinkId;
use crate::topology::link::{Link, LinkKind};
use crate::topology::link_table::LinkTable;

const UPSTREAM: &str = "upstream";
const DOWNSTREAM: &str = "downstream";

impl LinkTable {
    /// Append `endpoint` to `link`'s upstream list (one side only).
    ///
    /// Adding `NoFlow` is a no-op.
    pub fn add_upstream(&mut self, link: LinkId, endpoint: Endpoint) -> Result<(), NetworkError> {
        let limit = self.limits().upstream;
        let l = self.get_mut(link)?;
        push_endpoint(link, &mut l.upstream, endpoint, limit, UPSTREAM)
    }

    /// Append `endpoint` to `link`'s downstream list (one side only).
    ///
    /// Adding `NoFlow` is a no-op.
    pub fn add_downstream(
        &mut self,
        link: LinkId,
        endpoint: Endpoint,
    ) -> Result<(), NetworkError> {
        let limit = self.limits().downstream;
        let l = self.get_mut(link)?;
        push_endpoint(link, &mut l.downstream, endpoint, limit, DOWNSTREAM)
    }

    /// Make `down` a downstream neighbor of `up` and `up` an upstream
    /// neighbor of `down`.
    ///
    /// Every check runs before either list is touched, so on error nothing
    /// has changed.
    pub fn connect(&mut self, up: LinkId, down: LinkId) -> Result<(), NetworkError> {
        if up == down {
            return Err(NetworkError::SelfConnection(up));
        }
        let limits = self.limits();
        let (up_link, down_link) = (self.get(up)?, self.get(down)?);
        for (id, l) in [(up, up_link), (down, down_link)] {
            if !l.kind.is_live() {
                return Err(NetworkError::WrongLinkKind {
                    link: id,
                    expected: "Stream, Waterbody, or IceMass",
                    found: l.kind,
                });
            }
        }
        check_insert(up, &up_link.downstream, Endpoint::Link(down), limits.downstream, DOWNSTREAM)?;
        check_insert(down, &down_link.upstream, Endpoint::Link(up), limits.upstream, UPSTREAM)?;

        self.get_mut(up)?.downstream.push(Endpoint::Link(down));
        self.get_mut(down)?.upstream.push(Endpoint::Link(up));
        log::trace!("connect {up} -> {down}");
        Ok(())
    }

    /// Remove the `up -> down` connection from both lists.
    ///
    /// Tolerates a connection present on only one side (left behind by a
    /// one-sided edit) and removes whichever entry exists.
    ///
    /// # Errors
    /// `NotConnected` if neither side lists the other.
    pub fn disconnect(&mut self, up: LinkId, down: LinkId) -> Result<(), NetworkError> {
        let removed_down = remove_endpoint(self.get_mut(up)?, Endpoint::Link(down), false);
        let removed_up = remove_endpoint(self.get_mut(down)?, Endpoint::Link(up), true);
        if !removed_down && !removed_up {
            return Err(NetworkError::NotConnected {
                upstream: up,
                downstream: down,
            });
        }
        log::trace!("disconnect {up} -> {down}");
        Ok(())
    }

    /// Remove `endpoint` from `link`'s upstream list. Returns whether it was
    /// present.
    pub fn remove_upstream(
        &mut self,
        link: LinkId,
        endpoint: Endpoint,
    ) -> Result<bool, NetworkError> {
        Ok(remove_endpoint(self.get_mut(link)?, endpoint, true))
    }

    /// Remove `endpoint` from `link`'s downstream list. Returns whether it
    /// was present.
    pub fn remove_downstream(
        &mut self,
        link: LinkId,
        endpoint: Endpoint,
    ) -> Result<bool, NetworkError> {
        Ok(remove_endpoint(self.get_mut(link)?, endpoint, false))
    }

    /// Whether `up` lists `down` downstream.
    pub fn is_connected(&self, up: LinkId, down: LinkId) -> bool {
        self.get(up)
            .map(|l| l.downstream.contains(&Endpoint::Link(down)))
            .unwrap_or(false)
    }

    /// Whether `a` and `b` are connected in either direction.
    pub fn is_adjacent(&self, a: LinkId, b: LinkId) -> bool {
        self.is_connected(a, b) || self.is_connected(b, a)
    }

    /// Whether `link` is a stream.
    pub(crate) fn is_stream(&self, link: LinkId) -> bool {
        matches!(self.kind(link), Ok(LinkKind::Stream))
    }
}

fn check_insert(
    link: LinkId,
    list: &[Endpoint],
    endpoint: Endpoint,
    limit: Option<usize>,
    name: &'static str,
) -> Result<(), NetworkError> {
    if let Endpoint::Boundary(b) = endpoint {
        let allowed = match b {
            Boundary::NoFlow => false,
            Boundary::Inflow => name == UPSTREAM,
            Boundary::Outflow => name == DOWNSTREAM,
        };
        if !allowed {
            return Err(NetworkError::InvalidBoundary {
                link,
                boundary: b,
                list: name,
            });
        }
    }
    if endpoint == Endpoint::Link(link) {
        return Err(NetworkError::SelfConnection(link));
    }
    if list.contains(&endpoint) {
        return Err(NetworkError::DuplicateConnection { link, endpoint });
    }
    if let Some(limit) = limit {
        if list.len() >= limit {
            return Err(NetworkError::CapacityExceeded {
                link,
                list: name,
                limit,
            });
        }
    }
    Ok(())
}

fn push_endpoint(
    link: LinkId,
    list: &mut Vec<Endpoint>,
    endpoint: Endpoint,
    limit: Option<usize>,
    name: &'static str,
) -> Result<(), NetworkError> {
    if endpoint.is_no_flow() {
        return Ok(());
    }
    check_insert(link, list, endpoint, limit, name)?;
    list.push(endpoint);
    Ok(())
}

fn remove_endpoint(link: &mut Link, endpoint: Endpoint, upstream: bool) -> bool {
    let list = if upstream {
        &mut link.upstream
    } else {
        &mut link.downstream
    };
    let before = list.len();
    list.retain(|e| *e != endpoint);
    list.len() != before
}
