//! Type group headers and accumulated entity payloads.

use std::sync::Arc;

use bytes::Bytes;

use crate::primitives::bytes::{buf::Cursor, cstr, le};
use crate::types::{GraphLoadError, Result};

use super::entity::Entity;

/// Label and ordered property names shared by every entity of a group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeHeader {
    label: String,
    props: Vec<String>,
    encoded: Vec<u8>,
}

impl TypeHeader {
    /// Fixes the schema and caches its encoding:
    /// `label\0`, u32 property count, then each `name\0`.
    pub fn new(label: impl Into<String>, props: Vec<String>) -> Self {
        let label = label.into();
        let mut encoded = Vec::with_capacity(
            cstr::encoded_len(&label) + 4 + props.iter().map(|p| p.len() + 1).sum::<usize>(),
        );
        cstr::put(&mut encoded, &label);
        le::put_u32(&mut encoded, props.len() as u32);
        for prop in &props {
            cstr::put(&mut encoded, prop);
        }
        Self {
            label,
            props,
            encoded,
        }
    }

    /// Parses a header from the head of a group binary, returning it with the number
    /// of bytes it occupies.
    pub fn decode(src: &[u8]) -> Option<(TypeHeader, usize)> {
        let mut cur = Cursor::new(src);
        let label = cur.cstr()?.to_string();
        let count = cur.u32_le()? as usize;
        let mut props = Vec::with_capacity(count.min(cur.remaining()));
        for _ in 0..count {
            props.push(cur.cstr()?.to_string());
        }
        let used = cur.off;
        Some((TypeHeader::new(label, props), used))
    }

    /// Group label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Ordered property names.
    pub fn props(&self) -> &[String] {
        &self.props
    }

    /// Encoded header bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.encoded
    }

    /// Encoded header length.
    pub fn encoded_len(&self) -> usize {
        self.encoded.len()
    }

    /// Validates `entity` against this header and encodes it.
    ///
    /// Fails with [`GraphLoadError::SchemaMismatch`] when the entity declares a
    /// property the header does not list.
    pub fn encode_entity<E: Entity + ?Sized>(&self, entity: &E) -> Result<Vec<u8>> {
        let layout = entity.layout(&self.props);
        if !layout.undeclared.is_empty() {
            return Err(GraphLoadError::SchemaMismatch {
                label: self.label.clone(),
                keys: layout.undeclared,
            });
        }
        let mut out = Vec::with_capacity(entity.prefix_len() + layout.encoded_len());
        entity.encode_prefix(&mut out);
        layout.encode_into(&mut out);
        Ok(out)
    }
}

/// Same-labeled entities under one header within one bulk task.
#[derive(Clone, Debug)]
pub struct TypeGroup {
    header: Arc<TypeHeader>,
    buf: Vec<u8>,
    entities: usize,
}

impl TypeGroup {
    /// Opens an empty group; its size starts at the header length.
    pub fn open(header: Arc<TypeHeader>) -> Self {
        let buf = header.as_bytes().to_vec();
        Self {
            header,
            buf,
            entities: 0,
        }
    }

    /// Validates, encodes and appends `entity`, returning the blob length.
    /// Nothing is written when validation fails.
    pub fn add<E: Entity + ?Sized>(&mut self, entity: &E) -> Result<usize> {
        let blob = self.header.encode_entity(entity)?;
        let len = blob.len();
        self.push_encoded(&blob);
        Ok(len)
    }

    /// Appends an entity blob already encoded against this group's header.
    pub(crate) fn push_encoded(&mut self, blob: &[u8]) {
        self.buf.extend_from_slice(blob);
        self.entities += 1;
    }

    /// Header shared by this group.
    pub fn header(&self) -> &Arc<TypeHeader> {
        &self.header
    }

    /// Group label.
    pub fn label(&self) -> &str {
        self.header.label()
    }

    /// Header length plus every appended blob.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Number of entities appended.
    pub fn entity_count(&self) -> usize {
        self.entities
    }

    /// Header bytes followed by entity blobs in add order.
    pub fn to_binary(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// Hands the group binary off without copying.
    pub fn into_binary(self) -> Bytes {
        Bytes::from(self.buf)
    }
}
