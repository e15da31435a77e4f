use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::bulk::{BufferOptions, Properties, QueryBuffer, SendProgress, DEFAULT_MAX_TASK_BYTES};
use crate::transport::{Transport, TransportError};
use crate::types::GraphLoadError;

/// Configuration for importing nodes from a CSV file.
#[derive(Debug, Clone)]
pub struct NodeImportConfig {
    /// Path to the CSV file containing node data.
    pub path: PathBuf,
    /// Name of the CSV column containing unique node identifiers.
    pub id_column: String,
    /// Optional CSV column holding each row's label.
    pub label_column: Option<String>,
    /// Label applied to every row. Takes precedence over `label_column`.
    pub static_label: Option<String>,
    /// Optional list of CSV columns to import as node properties.
    /// If None, all columns except id and label columns are imported.
    pub prop_columns: Option<Vec<String>>,
}

impl NodeImportConfig {
    /// Config for `path` with an `id` column and the label taken from the file stem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_column: "id".into(),
            label_column: None,
            static_label: None,
            prop_columns: None,
        }
    }
}

/// Configuration for importing edges from a CSV file.
#[derive(Debug, Clone)]
pub struct EdgeImportConfig {
    /// Path to the CSV file containing edge data.
    pub path: PathBuf,
    /// Name of the CSV column containing source node identifiers.
    pub src_column: String,
    /// Name of the CSV column containing destination node identifiers.
    pub dst_column: String,
    /// Optional CSV column name containing edge type.
    pub type_column: Option<String>,
    /// Edge type applied to every row. Takes precedence over `type_column`.
    pub static_type: Option<String>,
    /// Optional list of CSV columns to import as edge properties.
    /// If None, all columns except src, dst, and type columns are imported.
    pub prop_columns: Option<Vec<String>>,
}

impl EdgeImportConfig {
    /// Config for `path` with `src`/`dst` columns and the type taken from the file stem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            src_column: "src".into(),
            dst_column: "dst".into(),
            type_column: None,
            static_type: None,
            prop_columns: None,
        }
    }
}

/// Configuration for the complete import operation.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Target graph key.
    pub graph: String,
    /// Node files, loaded in order before any edge file.
    pub nodes: Vec<NodeImportConfig>,
    /// Edge files, loaded in order.
    pub edges: Vec<EdgeImportConfig>,
    /// Per-command payload ceiling.
    pub max_task_bytes: usize,
    /// Delete an existing graph key before loading instead of refusing to run.
    pub replace: bool,
    /// Delete the graph key when a bulk command fails part way through.
    pub drop_on_failure: bool,
}

impl ImportConfig {
    /// Empty import into `graph` with the default ceiling.
    pub fn new(graph: impl Into<String>) -> Self {
        Self {
            graph: graph.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            max_task_bytes: DEFAULT_MAX_TASK_BYTES,
            replace: false,
            drop_on_failure: false,
        }
    }
}

/// Summary statistics from an import operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    /// Target graph key.
    pub graph: String,
    /// Distinct nodes sent.
    pub nodes: u64,
    /// Edges sent.
    pub edges: u64,
    /// Node rows skipped because their id was already loaded.
    pub duplicate_nodes: u64,
    /// Bulk commands issued.
    pub tasks: usize,
    /// Summed payload bytes of the issued commands.
    pub bytes: usize,
    /// Server replies, one per command.
    pub replies: Vec<String>,
}

/// Error type for CSV imports.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Generic error message.
    #[error("{0}")]
    Message(String),
    /// IO error from file operations.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV parsing error.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// A row was rejected by the bulk encoder.
    #[error("{}:{line}: {source}", .path.display())]
    Row {
        /// File containing the row.
        path: PathBuf,
        /// One-based line of the row.
        line: u64,
        /// Encoder error.
        #[source]
        source: GraphLoadError,
    },
    /// Bulk encoder or send error.
    #[error(transparent)]
    Load(#[from] GraphLoadError),
    /// Server round trip outside the bulk commands.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The graph key is already present and `replace` was not requested.
    #[error("graph '{0}' already exists (use --replace to overwrite)")]
    GraphExists(String),
}

impl From<&str> for ImportError {
    fn from(value: &str) -> Self {
        ImportError::Message(value.to_string())
    }
}

impl From<String> for ImportError {
    fn from(value: String) -> Self {
        ImportError::Message(value)
    }
}

/// Loads every configured CSV file and sends the result as `GRAPH.BULK` commands.
///
/// Node files are read first so that edge rows can reference any node id. The
/// target key is checked (and deleted with `replace`) only once all files parsed.
pub fn run_import<T: Transport + ?Sized>(
    cfg: &ImportConfig,
    transport: &mut T,
) -> Result<ImportSummary, ImportError> {
    run_import_with_progress(cfg, transport, |_| {})
}

/// Like [`run_import`], calling `progress` before each bulk command goes out.
pub fn run_import_with_progress<T, F>(
    cfg: &ImportConfig,
    transport: &mut T,
    progress: F,
) -> Result<ImportSummary, ImportError>
where
    T: Transport + ?Sized,
    F: FnMut(SendProgress),
{
    if cfg.nodes.is_empty() {
        return Err("at least one nodes file is required for import".into());
    }
    let mut buffer = QueryBuffer::new(
        BufferOptions::new(cfg.graph.clone()).max_task_bytes(cfg.max_task_bytes),
    )?;
    for nodes_cfg in &cfg.nodes {
        let rows = import_nodes(&mut buffer, nodes_cfg)?;
        info!(path = %nodes_cfg.path.display(), rows, "read node file");
    }
    for edges_cfg in &cfg.edges {
        let rows = import_edges(&mut buffer, edges_cfg)?;
        info!(path = %edges_cfg.path.display(), rows, "read edge file");
    }

    if transport.key_exists(&cfg.graph)? {
        if !cfg.replace {
            return Err(ImportError::GraphExists(cfg.graph.clone()));
        }
        warn!(graph = %cfg.graph, "deleting existing graph");
        transport.delete_key(&cfg.graph)?;
    }

    let stats = buffer.stats();
    let sent = match buffer.send_with_progress(transport, progress) {
        Ok(sent) => sent,
        Err(err) => {
            if cfg.drop_on_failure && matches!(err, GraphLoadError::TransportFailure { .. }) {
                warn!(graph = %cfg.graph, "bulk load failed; dropping partial graph");
                if let Err(drop_err) = transport.delete_key(&cfg.graph) {
                    warn!(graph = %cfg.graph, error = %drop_err, "failed to drop partial graph");
                }
            }
            return Err(err.into());
        }
    };

    Ok(ImportSummary {
        graph: cfg.graph.clone(),
        nodes: stats.nodes,
        edges: stats.edges,
        duplicate_nodes: stats.duplicate_nodes,
        tasks: sent.tasks,
        bytes: sent.bytes,
        replies: sent.replies.iter().map(ToString::to_string).collect(),
    })
}

struct ColumnSpec {
    name: String,
    index: usize,
}

fn import_nodes(buffer: &mut QueryBuffer, cfg: &NodeImportConfig) -> Result<u64, ImportError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    let id_index = find_column(&headers, &cfg.id_column)?;
    let label_index = match (&cfg.static_label, &cfg.label_column) {
        (None, Some(col)) => Some(find_column(&headers, col)?),
        _ => None,
    };
    let fallback = cfg
        .static_label
        .clone()
        .or_else(|| file_stem(&cfg.path))
        .filter(|_| label_index.is_none());

    let mut skip = vec![id_index];
    if let Some(idx) = label_index {
        skip.push(idx);
    }
    let prop_columns = resolve_prop_columns(&headers, &cfg.prop_columns, &skip)?;

    let mut rows = 0u64;
    for result in reader.records() {
        let record = result?;
        let line = line_of(&record);
        let key = get_required(&record, id_index, &cfg.id_column)?;
        let label = match label_index {
            Some(idx) => get_required(&record, idx, "label")?.to_string(),
            None => fallback.clone().ok_or_else(|| {
                ImportError::Message(format!(
                    "cannot derive a label for {} (provide --node-label)",
                    cfg.path.display()
                ))
            })?,
        };
        let props = build_props(&record, &prop_columns);
        buffer
            .add_node(&label, key, &props)
            .map_err(|source| row_error(&cfg.path, line, source))?;
        rows += 1;
    }
    Ok(rows)
}

fn import_edges(buffer: &mut QueryBuffer, cfg: &EdgeImportConfig) -> Result<u64, ImportError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(&cfg.path)?;
    let headers = reader.headers()?.clone();
    let src_index = find_column(&headers, &cfg.src_column)?;
    let dst_index = find_column(&headers, &cfg.dst_column)?;
    let ty_index = match (&cfg.static_type, &cfg.type_column) {
        (None, Some(col)) => Some(find_column(&headers, col)?),
        _ => None,
    };
    let fallback = cfg
        .static_type
        .clone()
        .or_else(|| file_stem(&cfg.path))
        .filter(|_| ty_index.is_none());

    let mut skip = vec![src_index, dst_index];
    if let Some(idx) = ty_index {
        skip.push(idx);
    }
    let prop_columns = resolve_prop_columns(&headers, &cfg.prop_columns, &skip)?;

    let mut rows = 0u64;
    for result in reader.records() {
        let record = result?;
        let line = line_of(&record);
        let src = get_required(&record, src_index, &cfg.src_column)?;
        let dst = get_required(&record, dst_index, &cfg.dst_column)?;
        let ty = match ty_index {
            Some(idx) => get_required(&record, idx, "type")?.to_string(),
            None => fallback.clone().ok_or_else(|| {
                ImportError::Message(format!(
                    "cannot derive an edge type for {} (provide --edge-type)",
                    cfg.path.display()
                ))
            })?,
        };
        let props = build_props(&record, &prop_columns);
        buffer
            .add_edge(&ty, src, dst, &props)
            .map_err(|source| row_error(&cfg.path, line, source))?;
        rows += 1;
    }
    Ok(rows)
}

fn row_error(path: &Path, line: u64, source: GraphLoadError) -> ImportError {
    ImportError::Row {
        path: path.to_path_buf(),
        line,
        source,
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|pos| pos.line()).unwrap_or(0)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

fn resolve_prop_columns(
    headers: &StringRecord,
    requested: &Option<Vec<String>>,
    skip: &[usize],
) -> Result<Vec<ColumnSpec>, ImportError> {
    if let Some(list) = requested {
        let mut cols = Vec::with_capacity(list.len());
        for name in list {
            let index = find_column(headers, name)?;
            cols.push(ColumnSpec {
                name: name.clone(),
                index,
            });
        }
        Ok(cols)
    } else {
        Ok(headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| !skip.contains(idx))
            .map(|(index, header)| ColumnSpec {
                name: header.to_string(),
                index,
            })
            .collect())
    }
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize, ImportError> {
    headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(name))
        .ok_or_else(|| ImportError::Message(format!("column '{}' not found", name)))
}

fn get_required<'a>(
    record: &'a StringRecord,
    idx: usize,
    name: &str,
) -> Result<&'a str, ImportError> {
    record
        .get(idx)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ImportError::Message(format!(
                "line {}: missing value for column '{}'",
                line_of(record),
                name
            ))
        })
}

// Cells stay strings; the encoder classifies them, so an empty cell becomes Null and
// every row of a file carries the same property names.
fn build_props(record: &StringRecord, columns: &[ColumnSpec]) -> Properties {
    let mut props = Properties::new();
    for col in columns {
        let raw = record.get(col.index).unwrap_or("").trim();
        props.insert(col.name.clone(), Value::String(raw.to_string()));
    }
    props
}
