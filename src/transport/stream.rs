//! Binary stream codec for inter-node messages.
//!
//! Integers that are usually small (lengths, counts, `top_n`) are written as
//! varints; fixed-width numbers are big-endian; strings are length-prefixed
//! UTF-8.

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, SarissaError};
use crate::util::varint;

/// A growable output buffer.
#[derive(Debug, Default, Clone)]
pub struct StreamOutput {
    buf: Vec<u8>,
}

impl StreamOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_byte(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_vint(&mut self, value: u32) {
        self.buf.extend_from_slice(&varint::encode_u32(value));
    }

    pub fn write_vlong(&mut self, value: u64) {
        self.buf.extend_from_slice(&varint::encode_u64(value));
    }

    pub fn write_i32(&mut self, value: i32) {
        // Writing into a Vec cannot fail.
        let _ = self.buf.write_i32::<BigEndian>(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        let _ = self.buf.write_i64::<BigEndian>(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        let _ = self.buf.write_f32::<BigEndian>(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        let _ = self.buf.write_f64::<BigEndian>(value);
    }

    /// Length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Presence flag followed by the string when present.
    pub fn write_optional_string(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.write_bool(true);
                self.write_string(value);
            }
            None => self.write_bool(false),
        }
    }

    pub fn write_string_array<S: AsRef<str>>(&mut self, values: &[S]) {
        self.write_vint(values.len() as u32);
        for value in values {
            self.write_string(value.as_ref());
        }
    }

    /// Length-prefixed raw bytes.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_vint(value.len() as u32);
        self.buf.extend_from_slice(value);
    }
}

/// A reader over a received message.
#[derive(Debug)]
pub struct StreamInput<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> StreamInput<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        StreamInput {
            cursor: Cursor::new(bytes),
        }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        let total = self.cursor.get_ref().len();
        total.saturating_sub(self.cursor.position() as usize)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(eof)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_byte()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SarissaError::transport(format!(
                "unexpected byte [{other:#04x}] for a boolean"
            ))),
        }
    }

    pub fn read_vint(&mut self) -> Result<u32> {
        varint::read_u32(&mut self.cursor)
            .map_err(|e| SarissaError::transport(format!("failed to read varint: {e}")))
    }

    pub fn read_vlong(&mut self) -> Result<u64> {
        varint::read_u64(&mut self.cursor)
            .map_err(|e| SarissaError::transport(format!("failed to read varint: {e}")))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.cursor.read_i32::<BigEndian>().map_err(eof)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.cursor.read_i64::<BigEndian>().map_err(eof)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.cursor.read_f32::<BigEndian>().map_err(eof)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.cursor.read_f64::<BigEndian>().map_err(eof)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes)
            .map_err(|e| SarissaError::transport(format!("invalid UTF-8 string: {e}")))
    }

    pub fn read_optional_string(&mut self) -> Result<Option<String>> {
        if self.read_bool()? {
            Ok(Some(self.read_string()?))
        } else {
            Ok(None)
        }
    }

    pub fn read_string_array(&mut self) -> Result<Vec<String>> {
        let len = self.read_vint()? as usize;
        let mut values = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            values.push(self.read_string()?);
        }
        Ok(values)
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_vint()? as usize;
        if len > self.remaining() {
            return Err(SarissaError::transport(format!(
                "declared length [{len}] exceeds the [{}] remaining bytes",
                self.remaining()
            )));
        }
        let mut bytes = vec![0u8; len];
        self.cursor.read_exact(&mut bytes).map_err(eof)?;
        Ok(bytes)
    }
}

fn eof(e: std::io::Error) -> SarissaError {
    SarissaError::transport(format!("unexpected end of stream: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_message() {
        let mut out = StreamOutput::new();
        out.write_string_array(&["body", "title"]);
        out.write_string("label");
        out.write_optional_string(None);
        out.write_optional_string(Some("standard"));
        out.write_bytes(&[1, 2, 3]);
        out.write_vint(300);
        out.write_f64(0.75);

        let bytes = out.into_bytes();
        let mut input = StreamInput::new(&bytes);
        assert_eq!(input.read_string_array().unwrap(), vec!["body", "title"]);
        assert_eq!(input.read_string().unwrap(), "label");
        assert_eq!(input.read_optional_string().unwrap(), None);
        assert_eq!(
            input.read_optional_string().unwrap().as_deref(),
            Some("standard")
        );
        assert_eq!(input.read_bytes().unwrap(), vec![1, 2, 3]);
        assert_eq!(input.read_vint().unwrap(), 300);
        assert_eq!(input.read_f64().unwrap(), 0.75);
        assert_eq!(input.remaining(), 0);
    }

    #[test]
    fn test_f64_is_big_endian() {
        let mut out = StreamOutput::new();
        out.write_f64(1.0);
        assert_eq!(out.into_bytes(), 1.0f64.to_be_bytes().to_vec());
    }

    #[test]
    fn test_truncated_input() {
        let mut out = StreamOutput::new();
        out.write_string("classification");
        let mut bytes = out.into_bytes();
        bytes.truncate(4);

        let mut input = StreamInput::new(&bytes);
        assert!(input.read_string().is_err());
        assert!(StreamInput::new(&[]).read_f64().is_err());
    }
}
