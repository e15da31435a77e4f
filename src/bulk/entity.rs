//! Node and edge payload encoding.

use rustc_hash::FxHashMap;

use crate::primitives::bytes::le;
use crate::types::NodeId;

use super::props::{encode_value, encoded_len};
use super::types::{PropValue, Properties};

/// Bytes taken by the endpoint pair in front of an edge's properties.
pub const EDGE_ENDPOINTS_LEN: usize = 16;

/// An entity whose properties are laid out against a type group header.
pub trait Entity {
    /// Declared properties in declaration order.
    fn props(&self) -> &[(String, PropValue)];

    /// Fixed fields written before the properties.
    fn encode_prefix(&self, _out: &mut Vec<u8>) {}

    /// Length of [`Entity::encode_prefix`] output.
    fn prefix_len(&self) -> usize {
        0
    }

    /// Matches the declared properties against `header` in one pass.
    fn layout(&self, header: &[String]) -> Layout<'_> {
        let props = self.props();
        // entities usually declare the header's names in header order
        if props.len() <= header.len() && props.iter().zip(header).all(|((key, _), name)| key == name) {
            let mut values: Vec<_> = props.iter().map(|(_, value)| Some(value)).collect();
            values.resize(header.len(), None);
            return Layout {
                values,
                undeclared: Vec::new(),
            };
        }
        let slots: FxHashMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(slot, name)| (name.as_str(), slot))
            .collect();
        let mut values = vec![None; header.len()];
        let mut undeclared = Vec::new();
        for (key, value) in props {
            match slots.get(key.as_str()) {
                Some(&slot) => values[slot] = Some(value),
                None => undeclared.push(key.clone()),
            }
        }
        Layout { values, undeclared }
    }

    /// Declared property names absent from `header`, in declaration order.
    fn undeclared_keys(&self, header: &[String]) -> Vec<String> {
        self.layout(header).undeclared
    }

    /// Appends the entity payload: prefix, then one value per header name, null when
    /// the entity does not declare it.
    fn encode_into(&self, header: &[String], out: &mut Vec<u8>) {
        self.encode_prefix(out);
        self.layout(header).encode_into(out);
    }

    /// Length [`Entity::encode_into`] produces for `header`.
    fn encoded_len(&self, header: &[String]) -> usize {
        self.prefix_len() + self.layout(header).encoded_len()
    }

    /// Encodes the entity into a fresh buffer.
    fn encode(&self, header: &[String]) -> Vec<u8> {
        let layout = self.layout(header);
        let mut out = Vec::with_capacity(self.prefix_len() + layout.encoded_len());
        self.encode_prefix(&mut out);
        layout.encode_into(&mut out);
        out
    }
}

/// An entity's property values ordered by a header.
#[derive(Debug)]
pub struct Layout<'a> {
    /// One slot per header name; `None` encodes as null.
    pub values: Vec<Option<&'a PropValue>>,
    /// Declared names the header does not carry, in declaration order.
    pub undeclared: Vec<String>,
}

impl Layout<'_> {
    /// Encoded length of the property values.
    pub fn encoded_len(&self) -> usize {
        self.values
            .iter()
            .map(|value| value.map_or(1, encoded_len))
            .sum()
    }

    /// Appends the property values.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        for value in &self.values {
            encode_value(value.unwrap_or(&PropValue::Null), out);
        }
    }
}

fn classify_all(props: &Properties) -> Vec<(String, PropValue)> {
    props
        .iter()
        .map(|(key, value)| (key.clone(), PropValue::classify(value)))
        .collect()
}

/// A node identified by its caller-supplied key.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// External key, unique within one import.
    pub key: String,
    /// Classified properties.
    pub props: Vec<(String, PropValue)>,
}

impl Node {
    /// Creates a node, classifying every property value.
    pub fn new(key: impl Into<String>, props: &Properties) -> Self {
        Self {
            key: key.into(),
            props: classify_all(props),
        }
    }
}

impl Entity for Node {
    fn props(&self) -> &[(String, PropValue)] {
        &self.props
    }
}

/// An edge between two already resolved nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    /// Source node id.
    pub src: NodeId,
    /// Target node id.
    pub dst: NodeId,
    /// Classified properties.
    pub props: Vec<(String, PropValue)>,
}

impl Edge {
    /// Creates an edge, classifying every property value.
    pub fn new(src: NodeId, dst: NodeId, props: &Properties) -> Self {
        Self {
            src,
            dst,
            props: classify_all(props),
        }
    }
}

impl Entity for Edge {
    fn props(&self) -> &[(String, PropValue)] {
        &self.props
    }

    fn encode_prefix(&self, out: &mut Vec<u8>) {
        le::put_u64(out, self.src.0);
        le::put_u64(out, self.dst.0);
    }

    fn prefix_len(&self) -> usize {
        EDGE_ENDPOINTS_LEN
    }
}
