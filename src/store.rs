use std::io::{self, Read};
use std::mem;

use anyhow::{Context, Result};
use bytes::Bytes;
use log::{debug, error};
use parking_lot::Mutex;

use crate::block_map::BlockMap;
use crate::error::LobError;
use crate::id::{self, IdBuilder, IdRecord, IdWalker};
use crate::opt::LobOptions;
use crate::stream::LobReader;

/// Stores byte streams as blocks in an ordered map. Small payloads are
/// inlined in the returned id; larger ones are split into blocks of at most
/// `max_block_size` bytes. An id that grows too large is itself pushed into
/// a block and replaced by an indirect record, so the id handed back to the
/// caller stays small no matter the payload size.
pub struct LobStore<M: BlockMap> {
    map: M,
    opt: LobOptions,
    // single-slot cache for the read chunk buffer, shared across put calls
    next_buffer: Mutex<Option<Vec<u8>>>,
}

impl<M: BlockMap> LobStore<M> {
    pub fn new(map: M, opt: LobOptions) -> Self {
        LobStore {
            map,
            opt,
            next_buffer: Mutex::new(None),
        }
    }

    /// Store the stream and return its id. The stream is read to its end but
    /// not closed. On failure every block already appended for this id is
    /// removed again before the error surfaces.
    pub fn put(&self, input: &mut impl Read) -> Result<Bytes> {
        let mut id = IdBuilder::new();
        if let Err(e) = self.put_stream(&mut id, input) {
            if let Err(rollback) = self.remove(id.as_bytes()) {
                error!("rollback of partial lob failed: {rollback:#}");
            }
            return Err(e);
        }
        Ok(id.freeze())
    }

    fn put_stream(&self, id: &mut IdBuilder, input: &mut impl Read) -> Result<()> {
        let mut level = 0;
        loop {
            if self.put_level(id, input, level)? {
                break;
            }
            if id.len() > self.opt.max_block_size / 2 {
                *id = self.put_indirect(mem::take(id))?;
                level += 1;
            }
        }
        if id.len() > self.opt.min_block_size * 2 {
            *id = self.put_indirect(mem::take(id))?;
        }
        Ok(())
    }

    /// One writer step. At level 0 this consumes a single chunk; above that
    /// it assembles a nested id from the level below and collapses it once
    /// it outgrows half a block. Returns true when the input is exhausted.
    fn put_level(&self, id: &mut IdBuilder, input: &mut impl Read, level: u32) -> Result<bool> {
        if level > 0 {
            let mut nested = IdBuilder::new();
            loop {
                let eof = self.put_level(&mut nested, input, level - 1)?;
                if nested.len() > self.opt.max_block_size / 2 {
                    nested = self.put_indirect(nested)?;
                    id.extend_from(&nested);
                    return Ok(eof);
                } else if eof {
                    id.extend_from(&nested);
                    return Ok(true);
                }
            }
        }
        let mut buffer = self.take_buffer();
        let len = read_full(input, &mut buffer)?;
        let chunk = if len < buffer.len() {
            // short read: the big buffer stays cached for the next chunk
            let chunk = Bytes::copy_from_slice(&buffer[..len]);
            self.offer_buffer(buffer);
            chunk
        } else {
            // full read: hand the buffer itself off as the block
            Bytes::from(buffer)
        };
        if len == 0 {
            return Ok(true);
        }
        let eof = len < self.opt.max_block_size;
        if len < self.opt.min_block_size {
            id.append_inline(&chunk);
        } else {
            let key = self.map.append(chunk)?;
            id.append_block_ref(len as u32, key);
        }
        Ok(eof)
    }

    /// Push the id bytes into a block of their own and return a one-record
    /// id pointing at them.
    fn put_indirect(&self, id: IdBuilder) -> Result<IdBuilder> {
        let data = id.freeze();
        let total_len = id::length(&data)?;
        let key = self.map.append(data)?;
        debug!("collapsed lob id into indirect block {key}, total_len={total_len}");
        let mut indirect = IdBuilder::new();
        indirect.append_indirect(total_len, key);
        Ok(indirect)
    }

    fn take_buffer(&self) -> Vec<u8> {
        let cached = self.next_buffer.try_lock().and_then(|mut slot| slot.take());
        cached.unwrap_or_else(|| vec![0; self.opt.max_block_size])
    }

    fn offer_buffer(&self, buffer: Vec<u8>) {
        if let Some(mut slot) = self.next_buffer.try_lock() {
            if slot.is_none() {
                *slot = Some(buffer);
            }
        }
    }

    /// Open the stored stream behind an id.
    pub fn get_input_stream(&self, id: &[u8]) -> Result<LobReader<'_, M>> {
        LobReader::open(self, id)
    }

    /// Number of payload bytes behind the id. Never reads the block map.
    pub fn length(&self, id: &[u8]) -> Result<u64> {
        id::length(id)
    }

    /// Key of the biggest block the id references, or -1 for inline-only
    /// data. Used to find orphaned blocks.
    pub fn max_block_key(&self, id: &[u8]) -> Result<i64> {
        let mut max_key = -1i64;
        let mut walker = IdWalker::new(Bytes::copy_from_slice(id));
        while let Some(record) = walker.next_record()? {
            match record {
                IdRecord::Inline(_) => {}
                IdRecord::BlockRef { key, .. } => max_key = max_key.max(key as i64),
                IdRecord::Indirect { key, .. } => {
                    max_key = max_key.max(key as i64);
                    let nested = self.block(key)?;
                    max_key = max_key.max(self.max_block_key(&nested)?);
                }
            }
        }
        Ok(max_key)
    }

    /// Remove every block the id references, nested ids included.
    pub fn remove(&self, id: &[u8]) -> Result<()> {
        let mut walker = IdWalker::new(Bytes::copy_from_slice(id));
        while let Some(record) = walker.next_record()? {
            match record {
                IdRecord::Inline(_) => {}
                IdRecord::BlockRef { key, .. } => {
                    self.map.remove(key)?;
                }
                IdRecord::Indirect { key, .. } => {
                    let nested = self.block(key)?;
                    self.remove(&nested)?;
                    self.map.remove(key)?;
                }
            }
        }
        Ok(())
    }

    /// Human readable dump of an id, for logs. The format is not stable.
    pub fn to_string(&self, id: &[u8]) -> String {
        id::describe(id)
    }

    pub fn set_min_block_size(&mut self, min_block_size: usize) {
        self.opt.min_block_size = min_block_size;
    }

    pub fn get_min_block_size(&self) -> usize {
        self.opt.min_block_size
    }

    /// Also drops the cached chunk buffer, so the next `put` reads chunks of
    /// the new size.
    pub fn set_max_block_size(&mut self, max_block_size: usize) {
        self.opt.max_block_size = max_block_size;
        *self.next_buffer.get_mut() = None;
    }

    pub fn get_max_block_size(&self) -> usize {
        self.opt.max_block_size
    }

    pub(crate) fn block(&self, key: u64) -> Result<Bytes> {
        self.map
            .get(key)?
            .ok_or_else(|| LobError::BlockNotFound(key).into())
    }

    pub fn block_map(&self) -> &M {
        &self.map
    }

    pub fn save(&self) -> Result<()> {
        self.map.save()
    }

    pub fn gc(&self) {
        self.map.gc()
    }

    pub fn clear(&self) -> Result<()> {
        self.map.clear()
    }

    pub fn close(&self) {
        self.map.close()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn last_key(&self) -> Option<u64> {
        self.map.last_key()
    }

    /// Remove a single block directly, bypassing any id.
    pub fn remove_block(&self, key: u64) -> Result<Option<Bytes>> {
        self.map.remove(key)
    }
}

/// Read until the buffer is full or the input ends. Returns the number of
/// bytes read.
fn read_full(input: &mut impl Read, buffer: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match input.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(len) => filled += len,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e).context("lob input read failed"),
        }
    }
    Ok(filled)
}
