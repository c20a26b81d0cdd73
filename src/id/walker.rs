use anyhow::Result;
use bytes::{Buf, Bytes, BytesMut};

use super::{TAG_BLOCK, TAG_INDIRECT, TAG_INLINE};
use crate::error::LobError;
use crate::varint::{read_varint, read_varlong};

/// One tagged record of a stream id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdRecord {
    /// Payload held inside the id; the slice views the id bytes directly.
    Inline(Bytes),
    /// `len` payload bytes stored in the block map under `key`.
    BlockRef { len: u32, key: u64 },
    /// A nested id of `total_len` payload bytes stored under `key`.
    Indirect { total_len: u64, key: u64 },
}

/// Cursor over the records of a stream id.
#[derive(Debug)]
pub struct IdWalker {
    id: Bytes,
}

impl IdWalker {
    pub fn new(id: Bytes) -> Self {
        IdWalker { id }
    }

    /// Parse the next record, or `None` at the end of the id.
    pub fn next_record(&mut self) -> Result<Option<IdRecord>> {
        if self.id.is_empty() {
            return Ok(None);
        }
        let record = match self.id.get_u8() {
            TAG_INLINE => {
                let len = read_varint(&mut self.id)? as usize;
                if self.id.len() < len {
                    return Err(LobError::MalformedId("truncated inline data").into());
                }
                IdRecord::Inline(self.id.split_to(len))
            }
            TAG_BLOCK => {
                let len = read_varint(&mut self.id)?;
                let key = read_varlong(&mut self.id)?;
                IdRecord::BlockRef { len, key }
            }
            TAG_INDIRECT => {
                let total_len = read_varlong(&mut self.id)?;
                let key = read_varlong(&mut self.id)?;
                IdRecord::Indirect { total_len, key }
            }
            _ => return Err(LobError::MalformedId("unknown record tag").into()),
        };
        Ok(Some(record))
    }

    /// Splice a nested id in front of the bytes not yet walked. The reader
    /// expands indirect records this way.
    pub fn splice(&mut self, nested: Bytes) {
        if self.id.is_empty() {
            self.id = nested;
            return;
        }
        let mut merged = BytesMut::with_capacity(nested.len() + self.id.len());
        merged.extend_from_slice(&nested);
        merged.extend_from_slice(&self.id);
        self.id = merged.freeze();
    }

    /// Drop everything not yet walked.
    pub fn finish(&mut self) {
        self.id = Bytes::new();
    }

    pub fn is_finished(&self) -> bool {
        self.id.is_empty()
    }
}
