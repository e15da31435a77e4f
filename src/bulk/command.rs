//! Assembly of `GRAPH.BULK` argument vectors.

use bytes::Bytes;

use super::buffer::BulkTask;

/// Server command that ingests bulk tasks.
pub const BULK_COMMAND: &str = "GRAPH.BULK";
/// Marker present only in the first task of an import.
pub const BEGIN_MARKER: &str = "BEGIN";

/// A ready-to-send bulk-insert command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkCommand {
    args: Vec<Bytes>,
}

impl BulkCommand {
    /// Command name.
    pub fn name(&self) -> &'static str {
        BULK_COMMAND
    }

    /// Argument vector, graph name first.
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Consumes the command, returning its arguments.
    pub fn into_args(self) -> Vec<Bytes> {
        self.args
    }

    /// Summed length of every argument.
    pub fn payload_len(&self) -> usize {
        self.args.iter().map(Bytes::len).sum()
    }
}

/// Builds the argument vector for `task`:
/// `[graph, BEGIN?, nodes, edges, node groups, edge groups, node group binaries...,
/// edge group binaries...]` with the counts in decimal.
pub fn build(graph: &str, task: BulkTask) -> BulkCommand {
    let begin = task.is_begin();
    let node_count = task.node_count();
    let edge_count = task.edge_count();
    let (nodes, edges) = task.into_groups();

    let mut args = Vec::with_capacity(6 + nodes.len() + edges.len());
    args.push(Bytes::copy_from_slice(graph.as_bytes()));
    if begin {
        args.push(Bytes::from_static(BEGIN_MARKER.as_bytes()));
    }
    for count in [node_count, edge_count, nodes.len(), edges.len()] {
        args.push(Bytes::from(count.to_string()));
    }
    args.extend(nodes.into_iter().map(|group| group.into_binary()));
    args.extend(edges.into_iter().map(|group| group.into_binary()));
    BulkCommand { args }
}
