use bytes::{BufMut, Bytes, BytesMut};

use super::{TAG_BLOCK, TAG_INDIRECT, TAG_INLINE};
use crate::varint::{write_varint, write_varlong};

/// Builds a stream id by appending tagged records.
#[derive(Debug, Default)]
pub struct IdBuilder {
    data: BytesMut,
}

impl IdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payload carried inside the id itself.
    pub fn append_inline(&mut self, data: &[u8]) {
        self.data.put_u8(TAG_INLINE);
        write_varint(&mut self.data, data.len() as u32);
        self.data.put_slice(data);
    }

    /// `len` payload bytes stored in the block map under `key`.
    pub fn append_block_ref(&mut self, len: u32, key: u64) {
        self.data.put_u8(TAG_BLOCK);
        write_varint(&mut self.data, len);
        write_varlong(&mut self.data, key);
    }

    /// A nested id of `total_len` payload bytes stored under `key`.
    pub fn append_indirect(&mut self, total_len: u64, key: u64) {
        self.data.put_u8(TAG_INDIRECT);
        write_varlong(&mut self.data, total_len);
        write_varlong(&mut self.data, key);
    }

    /// Append another id behind this one; the payloads concatenate.
    pub fn extend_from(&mut self, other: &IdBuilder) {
        self.data.put_slice(&other.data);
    }

    /// Serialized length of the id so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }
}
