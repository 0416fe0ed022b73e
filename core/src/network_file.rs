//! Plain-text network files, as written by the network generators.
//!
//! Format:
//!   line 1:        N
//!   then:          one `u v` edge per line, ended by a blank line
//!   then, maybe:   one `node x y` layout line per node
//!
//! The layout is carried through for drawing tools; the engine ignores it.

use crate::{
    adjacency::AdjacencyMatrix,
    error::{SimError, SimResult},
    types::{Layout, NodeId},
};

#[derive(Debug, Clone)]
pub struct NetworkFile {
    pub adjacency: AdjacencyMatrix,
    pub layout:    Option<Layout>,
}

impl NetworkFile {
    pub fn read(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        Ok(Self::parse(&content)?)
    }

    pub fn parse(content: &str) -> SimResult<Self> {
        let mut lines = content.lines().enumerate();

        let n: usize = match lines.next() {
            Some((_, line)) => line.trim().parse().map_err(|_| {
                SimError::InvalidArgument(format!("bad node count {:?}", line.trim()))
            })?,
            None => return Err(SimError::InvalidArgument("empty network file".into())),
        };

        let mut edges = Vec::new();
        for (number, line) in lines.by_ref() {
            let line = line.trim();
            if line.is_empty() {
                break;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                [u, v] => edges.push((parse_node(u, number)?, parse_node(v, number)?)),
                _ => {
                    return Err(SimError::InvalidArgument(format!(
                        "line {}: expected `u v`, got {line:?}",
                        number + 1
                    )))
                }
            }
        }
        let adjacency = AdjacencyMatrix::from_edges(n, &edges)?;

        let mut layout = Layout::new();
        for (number, line) in lines {
            let fields: Vec<&str> = line.split_whitespace().collect();
            // Single-token lines are padding, not layout entries.
            if fields.len() < 2 {
                continue;
            }
            match fields.as_slice() {
                [node, x, y] => {
                    let node = parse_node(node, number)?;
                    let x = parse_coord(x, number)?;
                    let y = parse_coord(y, number)?;
                    layout.insert(node, (x, y));
                }
                _ => {
                    return Err(SimError::InvalidArgument(format!(
                        "line {}: expected `node x y`, got {:?}",
                        number + 1,
                        line.trim()
                    )))
                }
            }
        }

        Ok(Self {
            adjacency,
            layout: if layout.is_empty() { None } else { Some(layout) },
        })
    }
}

/// A bare `u v` edge list, one pair per line; used for flicker-eligible
/// edge sets produced by a partitioning step. Blank lines are skipped.
pub fn read_edge_list(path: &str) -> anyhow::Result<Vec<(NodeId, NodeId)>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    Ok(parse_edge_list(&content)?)
}

pub fn parse_edge_list(content: &str) -> SimResult<Vec<(NodeId, NodeId)>> {
    let mut edges = Vec::new();
    for (number, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields.as_slice() {
            [] => continue,
            [u, v] => edges.push((parse_node(u, number)?, parse_node(v, number)?)),
            _ => {
                return Err(SimError::InvalidArgument(format!(
                    "line {}: expected `u v`, got {:?}",
                    number + 1,
                    line.trim()
                )))
            }
        }
    }
    Ok(edges)
}

fn parse_node(field: &str, number: usize) -> SimResult<NodeId> {
    field.parse().map_err(|_| {
        SimError::InvalidArgument(format!("line {}: bad node id {field:?}", number + 1))
    })
}

fn parse_coord(field: &str, number: usize) -> SimResult<f64> {
    field.parse().map_err(|_| {
        SimError::InvalidArgument(format!("line {}: bad coordinate {field:?}", number + 1))
    })
}
