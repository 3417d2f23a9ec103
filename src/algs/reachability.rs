//! Bounded downstream search over the link graph.
//!
//! All walks are iterative with an explicit stack and stop after visiting at
//! most `table.len()` links, so malformed input that would cycle cannot hang
//! the run.

use crate::network_error::NetworkError;
use crate::topology::element::Relation;
use crate::topology::ids::LinkId;
use crate::topology::link_table::LinkTable;

/// Whether following downstream connections from `from` reaches `target`
/// in one or more hops.
pub fn reaches_downstream(
    table: &LinkTable,
    from: LinkId,
    target: LinkId,
) -> Result<bool, NetworkError> {
    let budget = table.len();
    let mut seen = vec![false; table.len()];
    let mut stack: Vec<LinkId> = table.get(from)?.downstream_links().collect();
    let mut visited = 0usize;

    while let Some(link) = stack.pop() {
        if link == target {
            return Ok(true);
        }
        let slot = seen
            .get_mut(link.index())
            .ok_or(NetworkError::LinkOutOfRange {
                link,
                len: budget,
            })?;
        if *slot {
            continue;
        }
        *slot = true;
        visited += 1;
        if visited > budget {
            return Err(NetworkError::CycleDetected { link });
        }
        stack.extend(table.get(link)?.downstream_links());
    }
    Ok(false)
}

/// Position of location `a` relative to location `b`, each given as
/// `(link, meters along link)`.
///
/// Same link: compared by location. Different links: `Upstream` if `b`'s link
/// is downstream of `a`'s, `Downstream` if the reverse, `Unrelated` if
/// neither.
pub fn relation_between(
    table: &LinkTable,
    a: (LinkId, f64),
    b: (LinkId, f64),
) -> Result<Relation, NetworkError> {
    if a.0 == b.0 {
        return Ok(if a.1 == b.1 {
            Relation::Coincident
        } else if a.1 < b.1 {
            Relation::Upstream
        } else {
            Relation::Downstream
        });
    }
    if reaches_downstream(table, a.0, b.0)? {
        Ok(Relation::Upstream)
    } else if reaches_downstream(table, b.0, a.0)? {
        Ok(Relation::Downstream)
    } else {
        Ok(Relation::Unrelated)
    }
}

/// First link found on a downstream cycle, if any.
///
/// Three-color iterative DFS over every link; each link is expanded once.
pub fn find_downstream_cycle(table: &LinkTable) -> Option<LinkId> {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Grey,
        Black,
    }
    let n = table.len();
    let mut color = vec![Color::White; n];
    for root in table.ids() {
        if color[root.index()] != Color::White {
            continue;
        }
        // (link, index of next downstream entry to visit)
        let mut stack: Vec<(LinkId, usize)> = vec![(root, 0)];
        color[root.index()] = Color::Grey;
        while let Some((link, next)) = stack.last_mut() {
            let link = *link;
            let child = table
                .get(link)
                .ok()
                .and_then(|l| l.downstream_links().nth(*next));
            *next += 1;
            match child {
                Some(c) if c.index() < n => match color[c.index()] {
                    Color::Grey => return Some(c),
                    Color::White => {
                        color[c.index()] = Color::Grey;
                        stack.push((c, 0));
                    }
                    Color::Black => {}
                },
                Some(_) => {}
                None => {
                    color[link.index()] = Color::Black;
                    stack.pop();
                }
            }
        }
    }
    None
}
