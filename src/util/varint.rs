//! Variable-length integer encoding used by the transport stream codec.
//!
//! Values are written 7 bits at a time, least significant group first, with
//! the high bit of each byte marking a continuation.

use std::io::{Read, Write};

use byteorder::ReadBytesExt;

use crate::error::{Result, SarissaError};

/// Encode a u64 value using variable-length encoding.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(10);
    let mut val = value;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80; // Set continuation bit
        }

        bytes.push(byte);

        if val == 0 {
            return bytes;
        }
    }
}

/// Encode a u32 value using variable-length encoding.
pub fn encode_u32(value: u32) -> Vec<u8> {
    encode_u64(u64::from(value))
}

/// Decode a u64 from the front of `bytes`, returning it with the bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut cursor = bytes;
    let value = read_bits(&mut cursor, 64)?;
    Ok((value, bytes.len() - cursor.len()))
}

/// Decode a u32 from the front of `bytes`, returning it with the bytes consumed.
pub fn decode_u32(bytes: &[u8]) -> Result<(u32, usize)> {
    let mut cursor = bytes;
    let value = read_bits(&mut cursor, 32)?;
    Ok((value as u32, bytes.len() - cursor.len()))
}

/// Write a variable-length encoded u32 to a writer.
pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<usize> {
    write_u64(writer, u64::from(value))
}

/// Write a variable-length encoded u64 to a writer.
pub fn write_u64<W: Write>(writer: &mut W, value: u64) -> Result<usize> {
    let bytes = encode_u64(value);
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Read a variable-length encoded u32 from a reader.
pub fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(read_bits(reader, 32)? as u32)
}

/// Read a variable-length encoded u64 from a reader.
pub fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    read_bits(reader, 64)
}

fn read_bits<R: Read>(reader: &mut R, width: u32) -> Result<u64> {
    let mut result = 0u64;
    let mut shift = 0u32;

    loop {
        let byte = reader.read_u8().map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                SarissaError::other("Incomplete VarInt")
            } else {
                SarissaError::Io(e)
            }
        })?;

        if shift >= width {
            return Err(SarissaError::other("VarInt overflow"));
        }

        let group = u64::from(byte & 0x7F);
        if width < 64 && shift + 7 > width && (group >> (width - shift)) != 0 {
            return Err(SarissaError::other("VarInt overflow"));
        }
        result |= group << shift;

        if (byte & 0x80) == 0 {
            return Ok(result);
        }

        shift += 7;
    }
}
