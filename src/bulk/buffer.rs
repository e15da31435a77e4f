//! Id resolution and size-bounded batching of type groups into bulk tasks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::transport::{Reply, Transport};
use crate::types::{GraphLoadError, NodeId, Result};

use super::command;
use super::entity::{Edge, Entity, Node};
use super::group::{TypeGroup, TypeHeader};
use super::ids::IdMap;
use super::types::Properties;

/// Default per-command payload ceiling (512 MiB, the server's bulk argument limit).
pub const DEFAULT_MAX_TASK_BYTES: usize = 512 * 1024 * 1024;

/// Options for one import.
#[derive(Clone, Debug)]
pub struct BufferOptions {
    /// Target graph key.
    pub graph: String,
    /// Ceiling on the summed size of a task's type groups.
    pub max_task_bytes: usize,
}

impl BufferOptions {
    /// Options targeting `graph` with the default ceiling.
    pub fn new(graph: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            max_task_bytes: DEFAULT_MAX_TASK_BYTES,
        }
    }

    /// Overrides the per-task ceiling.
    pub fn max_task_bytes(mut self, bytes: usize) -> Self {
        self.max_task_bytes = bytes;
        self
    }
}

/// Which group list of a task an entity belongs to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntityKind {
    /// Node groups.
    Node,
    /// Edge groups.
    Edge,
}

/// Tracks the group new entities of one kind append to within the current task.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum GroupCursor {
    /// No group is open; the next entity opens one.
    #[default]
    NoActiveGroup,
    /// Entities with this header's label append to the last group.
    ActiveGroup(Arc<TypeHeader>),
}

impl GroupCursor {
    /// Label of the open group.
    pub fn active_label(&self) -> Option<&str> {
        match self {
            GroupCursor::NoActiveGroup => None,
            GroupCursor::ActiveGroup(header) => Some(header.label()),
        }
    }

    fn header_for(&self, label: &str) -> Option<Arc<TypeHeader>> {
        match self {
            GroupCursor::ActiveGroup(header) if header.label() == label => Some(header.clone()),
            _ => None,
        }
    }
}

/// One `GRAPH.BULK` invocation worth of type groups.
#[derive(Clone, Debug)]
pub struct BulkTask {
    begin: bool,
    nodes: Vec<TypeGroup>,
    edges: Vec<TypeGroup>,
    node_entities: usize,
    edge_entities: usize,
    size: usize,
}

impl BulkTask {
    fn new(begin: bool) -> Self {
        Self {
            begin,
            nodes: Vec::new(),
            edges: Vec::new(),
            node_entities: 0,
            edge_entities: 0,
            size: 0,
        }
    }

    /// True for the first task of an import, which carries the `BEGIN` marker.
    pub fn is_begin(&self) -> bool {
        self.begin
    }

    /// Summed binary size of every group.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Node entities across all node groups.
    pub fn node_count(&self) -> usize {
        self.node_entities
    }

    /// Edge entities across all edge groups.
    pub fn edge_count(&self) -> usize {
        self.edge_entities
    }

    /// Node groups in creation order.
    pub fn node_groups(&self) -> &[TypeGroup] {
        &self.nodes
    }

    /// Edge groups in creation order.
    pub fn edge_groups(&self) -> &[TypeGroup] {
        &self.edges
    }

    /// True when no group has been opened.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub(crate) fn into_groups(self) -> (Vec<TypeGroup>, Vec<TypeGroup>) {
        (self.nodes, self.edges)
    }

    fn append(&mut self, kind: EntityKind, header: &Arc<TypeHeader>, open: bool, blob: &[u8]) {
        let groups = match kind {
            EntityKind::Node => &mut self.nodes,
            EntityKind::Edge => &mut self.edges,
        };
        if open || groups.is_empty() {
            let group = TypeGroup::open(header.clone());
            self.size += group.size();
            groups.push(group);
        }
        if let Some(group) = groups.last_mut() {
            group.push_encoded(blob);
        }
        self.size += blob.len();
        match kind {
            EntityKind::Node => self.node_entities += 1,
            EntityKind::Edge => self.edge_entities += 1,
        }
    }
}

/// Counters describing a buffer's contents.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    /// Nodes buffered (duplicates excluded).
    pub nodes: u64,
    /// Edges buffered.
    pub edges: u64,
    /// `add_node` calls whose key was already assigned.
    pub duplicate_nodes: u64,
    /// Tasks sealed so far plus the current one when non-empty.
    pub tasks: usize,
    /// Summed task payload size.
    pub bytes: usize,
}

/// Progress notification emitted before each task is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendProgress {
    /// Zero-based task index.
    pub task: usize,
    /// Total tasks in this send.
    pub total: usize,
    /// Payload bytes of this task.
    pub bytes: usize,
}

/// Result of a completed send.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendSummary {
    /// Commands issued.
    pub tasks: usize,
    /// Summed payload bytes of the issued commands.
    pub bytes: usize,
    /// Raw transport replies in task order.
    pub replies: Vec<Reply>,
}

/// Builds the bulk-insert commands of one import.
///
/// Nodes receive sequential ids in the order their keys are first added. Consecutive
/// entities of the same label share a type group; a group never spans two tasks.
#[derive(Debug)]
pub struct QueryBuffer {
    options: BufferOptions,
    ids: IdMap,
    node_schemas: HashMap<String, Arc<TypeHeader>>,
    edge_schemas: HashMap<String, Arc<TypeHeader>>,
    tasks: Vec<BulkTask>,
    current: BulkTask,
    node_cursor: GroupCursor,
    edge_cursor: GroupCursor,
    nodes: u64,
    edges: u64,
    duplicate_nodes: u64,
}

impl QueryBuffer {
    /// Creates an empty buffer for one import.
    pub fn new(options: BufferOptions) -> Result<Self> {
        if options.graph.is_empty() {
            return Err(GraphLoadError::InvalidArgument(
                "graph name must not be empty".into(),
            ));
        }
        if options.max_task_bytes == 0 {
            return Err(GraphLoadError::InvalidArgument(
                "max task bytes must be positive".into(),
            ));
        }
        Ok(Self {
            options,
            ids: IdMap::new(),
            node_schemas: HashMap::new(),
            edge_schemas: HashMap::new(),
            tasks: Vec::new(),
            current: BulkTask::new(true),
            node_cursor: GroupCursor::NoActiveGroup,
            edge_cursor: GroupCursor::NoActiveGroup,
            nodes: 0,
            edges: 0,
            duplicate_nodes: 0,
        })
    }

    /// Options this buffer was created with.
    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    /// Fixes the header used for node groups of `label` opened from now on.
    pub fn declare_node_schema(&mut self, label: &str, props: Vec<String>) {
        self.node_schemas
            .insert(label.to_string(), Arc::new(TypeHeader::new(label, props)));
    }

    /// Fixes the header used for edge groups of `label` opened from now on.
    pub fn declare_edge_schema(&mut self, label: &str, props: Vec<String>) {
        self.edge_schemas
            .insert(label.to_string(), Arc::new(TypeHeader::new(label, props)));
    }

    /// Buffers a node and returns its sequential id.
    ///
    /// A key added before keeps its id and first encoding; the new properties are
    /// ignored and no id is consumed.
    pub fn add_node(&mut self, label: &str, key: &str, props: &Properties) -> Result<NodeId> {
        if let Some(id) = self.ids.get(key) {
            self.duplicate_nodes += 1;
            debug!(key, id = id.0, "duplicate node key; keeping first encoding");
            return Ok(id);
        }
        let node = Node::new(key, props);
        let (header, open) = self.resolve_header(EntityKind::Node, label, &node);
        let blob = header.encode_entity(&node)?;
        let (id, _) = self.ids.assign(key);
        self.stage(EntityKind::Node, header, open, &blob);
        self.nodes += 1;
        Ok(id)
    }

    /// Buffers an edge between two previously added node keys.
    pub fn add_edge(
        &mut self,
        label: &str,
        src_key: &str,
        dst_key: &str,
        props: &Properties,
    ) -> Result<()> {
        let src = self.resolve(src_key)?;
        let dst = self.resolve(dst_key)?;
        self.push_edge(label, Edge::new(src, dst, props))
    }

    /// Buffers an edge between two sequential ids already assigned by this buffer.
    pub fn add_edge_by_id(
        &mut self,
        label: &str,
        src: NodeId,
        dst: NodeId,
        props: &Properties,
    ) -> Result<()> {
        for id in [src, dst] {
            if self.ids.key(id).is_none() {
                return Err(GraphLoadError::UnresolvedEndpoint {
                    key: id.to_string(),
                });
            }
        }
        self.push_edge(label, Edge::new(src, dst, props))
    }

    /// Id assigned to `key`, if added.
    pub fn node_id(&self, key: &str) -> Option<NodeId> {
        self.ids.get(key)
    }

    /// Key that received `id`, if any.
    pub fn node_key(&self, id: NodeId) -> Option<&str> {
        self.ids.key(id)
    }

    /// The key/id mapping built so far.
    pub fn ids(&self) -> &IdMap {
        &self.ids
    }

    /// Nodes buffered so far.
    pub fn node_count(&self) -> u64 {
        self.nodes
    }

    /// Edges buffered so far.
    pub fn edge_count(&self) -> u64 {
        self.edges
    }

    /// Tasks sealed because the ceiling was reached.
    pub fn sealed_tasks(&self) -> &[BulkTask] {
        &self.tasks
    }

    /// The task currently being filled.
    pub fn current_task(&self) -> &BulkTask {
        &self.current
    }

    /// Cursor of the given entity kind.
    pub fn cursor(&self, kind: EntityKind) -> &GroupCursor {
        match kind {
            EntityKind::Node => &self.node_cursor,
            EntityKind::Edge => &self.edge_cursor,
        }
    }

    /// Snapshot of the buffer counters.
    pub fn stats(&self) -> BufferStats {
        let current = usize::from(!self.current.is_empty());
        BufferStats {
            nodes: self.nodes,
            edges: self.edges,
            duplicate_nodes: self.duplicate_nodes,
            tasks: self.tasks.len() + current,
            bytes: self.tasks.iter().map(BulkTask::size).sum::<usize>() + self.current.size(),
        }
    }

    /// Seals the current task and returns every task in creation order.
    pub fn into_tasks(mut self) -> Vec<BulkTask> {
        if !self.current.is_empty() {
            self.seal();
        }
        self.tasks
    }

    /// Sends every task in order, one command each.
    pub fn send<T: Transport + ?Sized>(self, transport: &mut T) -> Result<SendSummary> {
        self.send_with_progress(transport, |_| {})
    }

    /// Like [`QueryBuffer::send`], calling `progress` before each task goes out.
    ///
    /// Stops at the first transport error; tasks sent before it stay applied.
    pub fn send_with_progress<T, F>(self, transport: &mut T, mut progress: F) -> Result<SendSummary>
    where
        T: Transport + ?Sized,
        F: FnMut(SendProgress),
    {
        let graph = self.options.graph.clone();
        let tasks = self.into_tasks();
        let total = tasks.len();
        let mut summary = SendSummary::default();
        for (index, task) in tasks.into_iter().enumerate() {
            let cmd = command::build(&graph, task);
            let bytes = cmd.payload_len();
            progress(SendProgress {
                task: index,
                total,
                bytes,
            });
            info!(graph = %graph, task = index, total, bytes, "sending bulk task");
            let reply = transport
                .send_command(cmd.name(), cmd.args())
                .map_err(|source| GraphLoadError::TransportFailure {
                    task: index,
                    source,
                })?;
            summary.tasks += 1;
            summary.bytes += bytes;
            summary.replies.push(reply);
        }
        Ok(summary)
    }

    fn resolve(&self, key: &str) -> Result<NodeId> {
        self.ids
            .get(key)
            .ok_or_else(|| GraphLoadError::UnresolvedEndpoint {
                key: key.to_string(),
            })
    }

    fn push_edge(&mut self, label: &str, edge: Edge) -> Result<()> {
        let (header, open) = self.resolve_header(EntityKind::Edge, label, &edge);
        let blob = header.encode_entity(&edge)?;
        self.stage(EntityKind::Edge, header, open, &blob);
        self.edges += 1;
        Ok(())
    }

    fn resolve_header<E: Entity>(
        &self,
        kind: EntityKind,
        label: &str,
        entity: &E,
    ) -> (Arc<TypeHeader>, bool) {
        if let Some(header) = self.cursor(kind).header_for(label) {
            return (header, false);
        }
        let schemas = match kind {
            EntityKind::Node => &self.node_schemas,
            EntityKind::Edge => &self.edge_schemas,
        };
        let header = schemas.get(label).cloned().unwrap_or_else(|| {
            let names = entity.props().iter().map(|(key, _)| key.clone()).collect();
            Arc::new(TypeHeader::new(label, names))
        });
        (header, true)
    }

    fn stage(&mut self, kind: EntityKind, header: Arc<TypeHeader>, open: bool, blob: &[u8]) {
        let header_cost = if open { header.encoded_len() } else { 0 };
        let cost = blob.len() + header_cost;
        let mut open = open;
        if !self.current.is_empty() && self.current.size() + cost > self.options.max_task_bytes {
            self.seal();
            open = true;
        }
        if open {
            trace!(label = header.label(), ?kind, "opening type group");
        }
        self.current.append(kind, &header, open, blob);
        if open {
            let cursor = match kind {
                EntityKind::Node => &mut self.node_cursor,
                EntityKind::Edge => &mut self.edge_cursor,
            };
            *cursor = GroupCursor::ActiveGroup(header);
        }
    }

    fn seal(&mut self) {
        let sealed = std::mem::replace(&mut self.current, BulkTask::new(false));
        debug!(
            task = self.tasks.len(),
            bytes = sealed.size(),
            nodes = sealed.node_count(),
            edges = sealed.edge_count(),
            "sealed bulk task"
        );
        self.tasks.push(sealed);
        self.node_cursor = GroupCursor::NoActiveGroup;
        self.edge_cursor = GroupCursor::NoActiveGroup;
    }
}
