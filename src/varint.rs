use anyhow::Result;
use bytes::{Buf, BufMut};

use crate::error::LobError;

/// Write an unsigned 32-bit value, low 7 bits first, with the continuation
/// bit set on every byte except the last.
pub fn write_varint(buf: &mut impl BufMut, mut value: u32) {
    while value >= 0x80 {
        buf.put_u8(value as u8 | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

pub fn write_varlong(buf: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8(value as u8 | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Read a varint, consuming at most 5 bytes. Overlong encodings are
/// accepted; a truncated buffer or a fifth continuation byte is an error.
pub fn read_varint(buf: &mut impl Buf) -> Result<u32> {
    let mut value = 0u32;
    for shift in (0..35).step_by(7) {
        if !buf.has_remaining() {
            return Err(LobError::MalformedId("truncated varint").into());
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(LobError::MalformedId("varint too long").into())
}

/// Read a varlong, consuming at most 10 bytes.
pub fn read_varlong(buf: &mut impl Buf) -> Result<u64> {
    let mut value = 0u64;
    for shift in (0..70).step_by(7) {
        if !buf.has_remaining() {
            return Err(LobError::MalformedId("truncated varlong").into());
        }
        let byte = buf.get_u8();
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(LobError::MalformedId("varlong too long").into())
}
