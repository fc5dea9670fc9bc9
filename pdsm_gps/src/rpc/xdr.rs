//! Big-endian XDR argument encoding.
//!
//! Every item occupies a multiple of four bytes. Sub-word integers are
//! widened to a full word and opaque data is length-prefixed and
//! zero-padded.

use byteorder::{BigEndian, WriteBytesExt};

/// Accumulates XDR-encoded call arguments.
#[derive(Debug, Default, Clone)]
pub struct XdrWriter {
    buf: Vec<u8>,
}

impl XdrWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain argument list: one word per value.
    pub fn words(values: &[u32]) -> Vec<u8> {
        values
            .iter()
            .fold(Self::new(), |w, &v| w.u32(v))
            .into_bytes()
    }

    pub fn u32(mut self, value: u32) -> Self {
        // Writing into a Vec cannot fail.
        let _ = self.buf.write_u32::<BigEndian>(value);
        self
    }

    pub fn i32(mut self, value: i32) -> Self {
        let _ = self.buf.write_i32::<BigEndian>(value);
        self
    }

    pub fn u64(mut self, value: u64) -> Self {
        let _ = self.buf.write_u64::<BigEndian>(value);
        self
    }

    pub fn u8(self, value: u8) -> Self {
        self.u32(u32::from(value))
    }

    pub fn u16(self, value: u16) -> Self {
        self.u32(u32::from(value))
    }

    pub fn bool(self, value: bool) -> Self {
        self.u32(u32::from(value))
    }

    /// Variable-length opaque data.
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self = self.u32(data.len() as u32);
        self.buf.extend_from_slice(data);
        let pad = (4 - data.len() % 4) % 4;
        self.buf.resize(self.buf.len() + pad, 0);
        self
    }

    /// Optional data: presence word followed by the encoded value.
    pub fn optional(self, value: Option<impl FnOnce(Self) -> Self>) -> Self {
        match value {
            Some(encode) => encode(self.bool(true)),
            None => self.bool(false),
        }
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
}
