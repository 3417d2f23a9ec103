//! Triangle `.node` / `.ele` / `.edge` reader.
//!
//! # Supported format
//! - ASCII files as written by Shewchuk's Triangle.
//! - `#` starts a comment; blank lines are ignored.
//! - Ids may be 0- or 1-based; the base is taken from the first record of
//!   each file and node references in `.ele`/`.edge` use the `.node` base.
//! - The edge boundary marker becomes the edge code (0 when absent).
//!
//! # Limitations
//! - Only the first three nodes of an element are kept (no second-order
//!   triangles).
//! - Node attributes and node boundary markers are ignored.

use crate::geometry::Point2;
use crate::io::{MeshBoundary, MeshEdge};
use crate::network_error::NetworkError;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Reader for Triangle ASCII mesh files.
#[derive(Debug, Default, Clone)]
pub struct TriangleReader;

/// One non-comment line, split into fields.
struct Record<'a> {
    line: usize,
    fields: Vec<&'a str>,
}

impl Record<'_> {
    fn field(&self, i: usize, what: &str) -> Result<&str, NetworkError> {
        self.fields.get(i).copied().ok_or_else(|| {
            NetworkError::MeshParse(format!("line {}: missing {what}", self.line))
        })
    }

    fn parse_usize(&self, i: usize, what: &str) -> Result<usize, NetworkError> {
        let raw = self.field(i, what)?;
        raw.parse::<usize>().map_err(|_| {
            NetworkError::MeshParse(format!("line {}: invalid {what}: {raw}", self.line))
        })
    }

    fn parse_i64(&self, i: usize, what: &str) -> Result<i64, NetworkError> {
        let raw = self.field(i, what)?;
        raw.parse::<i64>().map_err(|_| {
            NetworkError::MeshParse(format!("line {}: invalid {what}: {raw}", self.line))
        })
    }

    fn parse_f64(&self, i: usize, what: &str) -> Result<f64, NetworkError> {
        let raw = self.field(i, what)?;
        raw.parse::<f64>().map_err(|_| {
            NetworkError::MeshParse(format!("line {}: invalid {what}: {raw}", self.line))
        })
    }
}

fn records(contents: &str) -> impl Iterator<Item = Record<'_>> {
    contents.lines().enumerate().filter_map(|(i, raw)| {
        let body = raw.split('#').next().unwrap_or("");
        let fields: Vec<&str> = body.split_whitespace().collect();
        (!fields.is_empty()).then_some(Record { line: i + 1, fields })
    })
}

/// Header record and the body records it announces.
fn sections<'a>(
    contents: &'a str,
    file: &str,
) -> Result<(Record<'a>, Vec<Record<'a>>), NetworkError> {
    let mut it = records(contents);
    let header = it
        .next()
        .ok_or_else(|| NetworkError::MeshParse(format!("{file}: missing header")))?;
    let count = header.parse_usize(0, "record count")?;
    let body: Vec<Record<'a>> = it.take(count).collect();
    if body.len() != count {
        return Err(NetworkError::MeshParse(format!(
            "{file}: header announces {count} records, found {}",
            body.len()
        )));
    }
    Ok((header, body))
}

/// Check that record ids run `base, base + 1, ...` and return the base.
fn id_base(body: &[Record<'_>], file: &str) -> Result<usize, NetworkError> {
    let Some(first) = body.first() else {
        return Ok(0);
    };
    let base = first.parse_usize(0, "id")?;
    if base > 1 {
        return Err(NetworkError::MeshParse(format!(
            "{file}: first id must be 0 or 1, found {base}"
        )));
    }
    for (i, r) in body.iter().enumerate() {
        let id = r.parse_usize(0, "id")?;
        if id != base + i {
            return Err(NetworkError::MeshParse(format!(
                "{file} line {}: expected id {}, found {id}",
                r.line,
                base + i
            )));
        }
    }
    Ok(base)
}

fn node_ref(r: &Record<'_>, i: usize, base: usize, nodes: usize) -> Result<usize, NetworkError> {
    let raw = r.parse_usize(i, "node reference")?;
    raw.checked_sub(base)
        .filter(|&n| n < nodes)
        .ok_or_else(|| {
            NetworkError::MeshParse(format!("line {}: node {raw} out of range", r.line))
        })
}

impl TriangleReader {
    /// Parse node coordinates. Returns the points and the id base.
    pub fn read_nodes<R: Read>(&self, mut reader: R) -> Result<(Vec<Point2>, usize), NetworkError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let (header, body) = sections(&contents, ".node")?;
        let dim = header.parse_usize(1, "dimension").unwrap_or(2);
        if dim != 2 {
            return Err(NetworkError::MeshParse(format!(
                ".node: dimension must be 2, found {dim}"
            )));
        }
        let base = id_base(&body, ".node")?;
        let points = body
            .iter()
            .map(|r| Ok(Point2::new(r.parse_f64(1, "x")?, r.parse_f64(2, "y")?)))
            .collect::<Result<Vec<_>, NetworkError>>()?;
        Ok((points, base))
    }

    /// Parse triangles, rebasing node references with `node_base`.
    pub fn read_elements<R: Read>(
        &self,
        mut reader: R,
        node_base: usize,
        node_count: usize,
    ) -> Result<Vec<[usize; 3]>, NetworkError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let (header, body) = sections(&contents, ".ele")?;
        let per = header.parse_usize(1, "nodes per triangle").unwrap_or(3);
        if per != 3 && per != 6 {
            return Err(NetworkError::MeshParse(format!(
                ".ele: unsupported nodes per triangle {per}"
            )));
        }
        id_base(&body, ".ele")?;
        body.iter()
            .map(|r| {
                Ok([
                    node_ref(r, 1, node_base, node_count)?,
                    node_ref(r, 2, node_base, node_count)?,
                    node_ref(r, 3, node_base, node_count)?,
                ])
            })
            .collect()
    }

    /// Parse coded edges, rebasing node references with `node_base`.
    pub fn read_edges<R: Read>(
        &self,
        mut reader: R,
        node_base: usize,
        node_count: usize,
    ) -> Result<Vec<MeshEdge>, NetworkError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        let (header, body) = sections(&contents, ".edge")?;
        let has_marker = header.parse_usize(1, "marker flag").unwrap_or(0) != 0;
        id_base(&body, ".edge")?;
        body.iter()
            .map(|r| {
                Ok(MeshEdge {
                    nodes: [
                        node_ref(r, 1, node_base, node_count)?,
                        node_ref(r, 2, node_base, node_count)?,
                    ],
                    code: if has_marker { r.parse_i64(3, "boundary marker")? } else { 0 },
                })
            })
            .collect()
    }

    /// Read all three files from readers.
    pub fn read<N: Read, E: Read, G: Read>(
        &self,
        nodes: N,
        elements: E,
        edges: G,
    ) -> Result<MeshBoundary, NetworkError> {
        let (points, base) = self.read_nodes(nodes)?;
        let triangles = self.read_elements(elements, base, points.len())?;
        let edges = self.read_edges(edges, base, points.len())?;
        log::debug!(
            "read mesh: {} nodes, {} triangles, {} edges",
            points.len(),
            triangles.len(),
            edges.len()
        );
        Ok(MeshBoundary {
            nodes: points,
            triangles,
            edges,
        })
    }

    /// Read `<base>.node`, `<base>.ele`, and `<base>.edge`.
    pub fn read_files(&self, base: impl AsRef<Path>) -> Result<MeshBoundary, NetworkError> {
        let base = base.as_ref();
        let open = |ext: &str| {
            let mut path = base.as_os_str().to_owned();
            path.push(".");
            path.push(ext);
            std::fs::File::open(PathBuf::from(path))
        };
        self.read(open("node")?, open("ele")?, open("edge")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODE: &str = "# square\n4 2 0 0\n1 0 0\n2 1 0\n3 1 1\n4 0 1\n";
    const ELE: &str = "2 3 0\n1 1 2 3\n2 1 3 4 # second\n";
    const EDGE: &str = "5 1\n1 1 2 1\n2 2 3 5\n3 3 4 1\n4 4 1 1\n\n5 1 3 0\n";

    #[test]
    fn one_based_files_are_rebased() {
        let mesh = TriangleReader
            .read(NODE.as_bytes(), ELE.as_bytes(), EDGE.as_bytes())
            .unwrap();
        assert_eq!(mesh.nodes.len(), 4);
        assert_eq!(mesh.nodes[2], Point2::new(1.0, 1.0));
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.edges[1], MeshEdge { nodes: [1, 2], code: 5 });
        assert_eq!(mesh.edges[4].code, 0);
    }

    #[test]
    fn zero_based_nodes_and_unmarked_edges() {
        let node = "3 2 0 0\n0 0 0\n1 2 0\n2 0 2\n";
        let ele = "1 3 0\n0 0 1 2\n";
        let edge = "1 0\n0 1 2\n";
        let mesh = TriangleReader
            .read(node.as_bytes(), ele.as_bytes(), edge.as_bytes())
            .unwrap();
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
        assert_eq!(mesh.edges, vec![MeshEdge { nodes: [1, 2], code: 0 }]);
    }

    #[test]
    fn malformed_input_is_reported() {
        let short = "3 2 0 0\n1 0 0\n";
        assert!(matches!(
            TriangleReader.read_nodes(short.as_bytes()),
            Err(NetworkError::MeshParse(_))
        ));
        let bad = "1 2 0 0\n1 zero 0\n";
        assert!(matches!(
            TriangleReader.read_nodes(bad.as_bytes()),
            Err(NetworkError::MeshParse(_))
        ));
        let out_of_range = "1 3 0\n1 1 2 9\n";
        assert!(matches!(
            TriangleReader.read_elements(out_of_range.as_bytes(), 1, 4),
            Err(NetworkError::MeshParse(_))
        ));
    }
}
