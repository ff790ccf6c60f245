//! Primitive wire types: VarInt and the fixed-layout fields packets are built from.
//!
//! Readers never panic on short input; they return `MalformedFrame` instead of
//! letting `Buf::get_*` underflow.

use crate::error::{constants, ProtocolError, Result};
use bytes::{Buf, BufMut};
use uuid::Uuid;

/// Longest legal VarInt encoding of an `i32`.
pub const MAX_VARINT_LEN: usize = 5;

/// Default maximum string length in characters.
pub const MAX_STRING_LEN: usize = 32767;

/// Longest Chat-typed field (JSON text component), in characters.
pub const MAX_CHAT_JSON_LEN: usize = 262_144;

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Number of bytes `value` occupies as a VarInt.
pub fn varint_len(value: i32) -> usize {
    let value = value as u32;
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}

pub fn write_varint(buf: &mut impl BufMut, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !(SEGMENT_BITS as u32) == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
}

pub fn read_varint(buf: &mut impl Buf) -> Result<i32> {
    let mut value: u32 = 0;
    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(ProtocolError::malformed(constants::ERR_VARINT_TRUNCATED));
        }
        let byte = buf.get_u8();
        value |= ((byte & SEGMENT_BITS) as u32) << (7 * i);
        if byte & CONTINUE_BIT == 0 {
            return Ok(value as i32);
        }
    }
    Err(ProtocolError::malformed(constants::ERR_VARINT_TOO_LONG))
}

/// Decode a VarInt from the front of `src` without consuming it.
///
/// Returns `Ok(None)` when `src` ends before the VarInt does, which is how the
/// frame decoder tells "wait for more bytes" apart from a corrupt prefix.
pub fn peek_varint(src: &[u8]) -> Result<Option<(i32, usize)>> {
    let mut value: u32 = 0;
    for (i, &byte) in src.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= ((byte & SEGMENT_BITS) as u32) << (7 * i);
        if byte & CONTINUE_BIT == 0 {
            return Ok(Some((value as i32, i + 1)));
        }
    }
    if src.len() >= MAX_VARINT_LEN {
        Err(ProtocolError::malformed(constants::ERR_VARINT_TOO_LONG))
    } else {
        Ok(None)
    }
}

fn ensure(buf: &impl Buf, len: usize) -> Result<()> {
    if buf.remaining() < len {
        Err(ProtocolError::malformed(constants::ERR_FIELD_TRUNCATED))
    } else {
        Ok(())
    }
}

/// Read a VarInt length prefix and reject negative values.
pub fn read_length(buf: &mut impl Buf) -> Result<usize> {
    let len = read_varint(buf)?;
    usize::try_from(len).map_err(|_| ProtocolError::malformed(constants::ERR_NEGATIVE_LENGTH))
}

pub fn read_string(buf: &mut impl Buf, max_chars: usize) -> Result<String> {
    let len = read_length(buf)?;
    if len > max_chars * 4 {
        return Err(ProtocolError::malformed(constants::ERR_STRING_TOO_LONG));
    }
    ensure(buf, len)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    let value =
        String::from_utf8(raw).map_err(|_| ProtocolError::malformed(constants::ERR_INVALID_UTF8))?;
    if value.chars().count() > max_chars {
        return Err(ProtocolError::malformed(constants::ERR_STRING_TOO_LONG));
    }
    Ok(value)
}

pub fn write_string(buf: &mut impl BufMut, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.put_slice(value.as_bytes());
}

/// VarInt-prefixed byte array.
pub fn read_byte_array(buf: &mut impl Buf) -> Result<Vec<u8>> {
    let len = read_length(buf)?;
    ensure(buf, len)?;
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    Ok(raw)
}

pub fn write_byte_array(buf: &mut impl BufMut, value: &[u8]) {
    write_varint(buf, value.len() as i32);
    buf.put_slice(value);
}

/// Everything left in the packet body.
pub fn read_remaining(buf: &mut impl Buf) -> Vec<u8> {
    let mut raw = vec![0u8; buf.remaining()];
    buf.copy_to_slice(&mut raw);
    raw
}

pub fn read_u8(buf: &mut impl Buf) -> Result<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

pub fn read_bool(buf: &mut impl Buf) -> Result<bool> {
    match read_u8(buf)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(ProtocolError::MalformedFrame(format!(
            "invalid boolean byte {other}"
        ))),
    }
}

pub fn read_u16(buf: &mut impl Buf) -> Result<u16> {
    ensure(buf, 2)?;
    Ok(buf.get_u16())
}

pub fn read_i64(buf: &mut impl Buf) -> Result<i64> {
    ensure(buf, 8)?;
    Ok(buf.get_i64())
}

pub fn read_f32(buf: &mut impl Buf) -> Result<f32> {
    ensure(buf, 4)?;
    Ok(buf.get_f32())
}

pub fn read_f64(buf: &mut impl Buf) -> Result<f64> {
    ensure(buf, 8)?;
    Ok(buf.get_f64())
}

pub fn read_uuid(buf: &mut impl Buf) -> Result<Uuid> {
    ensure(buf, 16)?;
    Ok(Uuid::from_u128(buf.get_u128()))
}

pub fn write_uuid(buf: &mut impl BufMut, value: &Uuid) {
    buf.put_u128(value.as_u128());
}
