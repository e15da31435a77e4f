//! Bulk graph loader for the `GRAPH.BULK` command.
//!
//! [`bulk::QueryBuffer`] turns streams of nodes and edges into size-bounded bulk
//! commands, [`transport`] delivers them, and [`cli`] wires CSV files to both.

#![warn(missing_docs)]

pub mod bulk;
pub mod cli;
pub mod primitives;
pub mod transport;
pub mod types;

pub use bulk::{BufferOptions, QueryBuffer};
pub use types::{GraphLoadError, NodeId, Result};
