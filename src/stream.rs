use std::io::{self, Read};

use anyhow::Result;
use bytes::{Buf, Bytes};

use crate::block_map::BlockMap;
use crate::error::LobError;
use crate::id::{self, IdRecord, IdWalker};
use crate::store::LobStore;

/// Sequential reader over a stored stream. Blocks are fetched lazily, one at
/// a time; indirect records are expanded by splicing the nested id in front
/// of the bytes not yet walked. Records that fall entirely inside a pending
/// skip are dropped without touching the map.
pub struct LobReader<'a, M: BlockMap> {
    store: &'a LobStore<M>,
    length: u64,
    id: IdWalker,
    buffer: Option<Bytes>,
    skip: u64,
    pos: u64,
}

impl<'a, M: BlockMap> LobReader<'a, M> {
    pub(crate) fn open(store: &'a LobStore<M>, id: &[u8]) -> Result<Self> {
        let length = id::length(id)?;
        Ok(LobReader {
            store,
            length,
            id: IdWalker::new(Bytes::copy_from_slice(id)),
            buffer: None,
            skip: 0,
            pos: 0,
        })
    }

    /// Total number of payload bytes behind the id.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Bytes consumed so far, skips included.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Read one byte, or `None` at the end of the stream.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.read(&mut byte)? {
            0 => Ok(None),
            _ => Ok(Some(byte[0])),
        }
    }

    /// Skip up to `n` payload bytes, clamped at the end of the stream, and
    /// return the number actually skipped. Whatever the current sub-buffer
    /// cannot satisfy is consumed lazily by the next advance, so skipped
    /// blocks are never fetched.
    pub fn skip(&mut self, n: u64) -> u64 {
        let n = n.min(self.length.saturating_sub(self.pos));
        if n == 0 {
            return 0;
        }
        let mut remaining = n;
        if let Some(buffer) = &mut self.buffer {
            let from_buffer = remaining.min(buffer.len() as u64);
            buffer.advance(from_buffer as usize);
            if buffer.is_empty() {
                self.buffer = None;
            }
            remaining -= from_buffer;
        }
        self.skip += remaining;
        self.pos += n;
        n
    }

    /// Drop the current sub-buffer and forward the cursor to the end. Later
    /// reads report end-of-stream.
    pub fn close(&mut self) {
        self.buffer = None;
        self.id.finish();
        self.pos = self.length;
    }

    /// Walk the id to the next sub-buffer, resolving indirection and
    /// consuming the pending skip. `None` when the id is exhausted.
    fn next_buffer(&mut self) -> Result<Option<Bytes>> {
        while let Some(record) = self.id.next_record()? {
            match record {
                IdRecord::Inline(data) => {
                    let len = data.len() as u64;
                    if self.skip >= len {
                        self.skip -= len;
                        continue;
                    }
                    let offset = self.skip as usize;
                    self.skip = 0;
                    return Ok(Some(data.slice(offset..)));
                }
                IdRecord::BlockRef { len, key } => {
                    if self.skip >= len as u64 {
                        self.skip -= len as u64;
                        continue;
                    }
                    let data = self.store.block(key)?;
                    let offset = (self.skip as usize).min(data.len());
                    self.skip = 0;
                    return Ok(Some(data.slice(offset..)));
                }
                IdRecord::Indirect { total_len, key } => {
                    if self.skip >= total_len {
                        self.skip -= total_len;
                        continue;
                    }
                    let nested = self.store.block(key)?;
                    self.id.splice(nested);
                }
            }
        }
        Ok(None)
    }
}

impl<M: BlockMap> Read for LobReader<'_, M> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            let mut buffer = match self.buffer.take() {
                Some(buffer) if !buffer.is_empty() => buffer,
                _ => match self.next_buffer().map_err(to_io_error)? {
                    Some(buffer) => buffer,
                    None => return Ok(0),
                },
            };
            let len = buf.len().min(buffer.len());
            if len > 0 {
                buf[..len].copy_from_slice(&buffer[..len]);
                buffer.advance(len);
                self.buffer = Some(buffer);
                self.pos += len as u64;
                return Ok(len);
            }
        }
    }
}

fn to_io_error(e: anyhow::Error) -> io::Error {
    let kind = match e.downcast_ref::<LobError>() {
        Some(LobError::BlockNotFound(_)) => io::ErrorKind::NotFound,
        Some(LobError::MalformedId(_)) => io::ErrorKind::InvalidData,
        None => io::ErrorKind::Other,
    };
    io::Error::new(kind, e)
}
