#![forbid(unsafe_code)]

//! Encoder for the `GRAPH.BULK` bulk-insert payload.
//!
//! Callers feed nodes and edges into a [`QueryBuffer`], which classifies and encodes
//! their properties, resolves node keys into sequential ids, groups same-labeled
//! entities under a shared header, and splits the result into size-bounded
//! [`BulkTask`]s. [`QueryBuffer::send`] turns each task into one command and hands it
//! to a [`crate::transport::Transport`] in creation order.

pub mod buffer;
pub mod command;
pub mod entity;
pub mod group;
pub mod ids;
pub mod props;
mod types;


pub use buffer::{
    BufferOptions, BufferStats, BulkTask, EntityKind, GroupCursor, QueryBuffer, SendProgress,
    SendSummary, DEFAULT_MAX_TASK_BYTES,
};
pub use command::{build, BulkCommand, BEGIN_MARKER, BULK_COMMAND};
pub use entity::{Edge, Entity, Layout, Node};
pub use group::{TypeGroup, TypeHeader};
pub use ids::IdMap;
pub use props::{classify, classify_value, encode_value};
pub use types::{PropValue, Properties, PropertyType};
