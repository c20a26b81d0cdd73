mod builder;
mod walker;

use anyhow::Result;
use bytes::Bytes;

pub use builder::IdBuilder;
pub use walker::{IdRecord, IdWalker};

/// Payload bytes held inside the id itself.
pub(crate) const TAG_INLINE: u8 = 0;
/// Payload bytes stored as a single block in the map.
pub(crate) const TAG_BLOCK: u8 = 1;
/// A nested id stored as a block in the map.
pub(crate) const TAG_INDIRECT: u8 = 2;

/// Number of payload bytes the id describes. Every length is encoded in the
/// id itself, so this never touches the block map.
pub fn length(id: &[u8]) -> Result<u64> {
    let mut walker = IdWalker::new(Bytes::copy_from_slice(id));
    let mut length = 0u64;
    while let Some(record) = walker.next_record()? {
        length += match record {
            IdRecord::Inline(data) => data.len() as u64,
            IdRecord::BlockRef { len, .. } => len as u64,
            IdRecord::Indirect { total_len, .. } => total_len,
        };
    }
    Ok(length)
}

/// Human readable dump of an id, for logs. The format is not stable.
pub fn describe(id: &[u8]) -> String {
    let mut walker = IdWalker::new(Bytes::copy_from_slice(id));
    let mut out = String::new();
    let mut length = 0u64;
    loop {
        match walker.next_record() {
            Ok(Some(IdRecord::Inline(data))) => {
                out.push_str(&format!("data len={}, ", data.len()));
                length += data.len() as u64;
            }
            Ok(Some(IdRecord::BlockRef { len, key })) => {
                out.push_str(&format!("block {key} len={len}, "));
                length += len as u64;
            }
            Ok(Some(IdRecord::Indirect { total_len, key })) => {
                out.push_str(&format!("indirect block {key} len={total_len}, "));
                length += total_len;
            }
            Ok(None) => break,
            Err(_) => {
                out.push_str("error, ");
                break;
            }
        }
    }
    out.push_str(&format!("length={length}"));
    out
}

#[cfg(test)]
mod tests;
