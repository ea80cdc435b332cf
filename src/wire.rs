//! Network-byte-order pack/unpack primitives.
//!
//! Every multi-byte value is big-endian. Strings are length-prefixed with a
//! `u32` byte count and carry no terminator.

use crate::error::{MaterialError, Result};

pub const U8_SIZE: usize = 1;
pub const I32_SIZE: usize = 4;
pub const U32_SIZE: usize = 4;
pub const F32_SIZE: usize = 4;
pub const F32X4_SIZE: usize = 4 * F32_SIZE;

/// Packed size of a length-prefixed string.
pub fn string_pack_size(s: &str) -> usize {
    U32_SIZE + s.len()
}

/// Append-only writer for the material wire format.
#[derive(Debug, Default)]
pub struct Packer {
    buf: Vec<u8>,
}

impl Packer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate for a known `pack_size()`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn pack_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn pack_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn pack_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn pack_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_bits().to_be_bytes());
    }

    pub fn pack_f32x4(&mut self, v: &[f32; 4]) {
        for &c in v {
            self.pack_f32(c);
        }
    }

    /// Write a `u32` length prefix followed by the UTF-8 bytes.
    ///
    /// Strings longer than `u32::MAX` bytes cannot be represented; in practice
    /// material and texture names are a handful of bytes.
    pub fn pack_string(&mut self, s: &str) {
        self.pack_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct Unpacker<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Unpacker<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, what: &'static str, needed: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(MaterialError::Truncated {
                what,
                needed,
                remaining,
            });
        }
        let bytes = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(what, N)?);
        Ok(out)
    }

    pub fn unpack_u8(&mut self, what: &'static str) -> Result<u8> {
        Ok(self.take_array::<1>(what)?[0])
    }

    pub fn unpack_i32(&mut self, what: &'static str) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take_array(what)?))
    }

    pub fn unpack_u32(&mut self, what: &'static str) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take_array(what)?))
    }

    pub fn unpack_f32(&mut self, what: &'static str) -> Result<f32> {
        Ok(f32::from_bits(u32::from_be_bytes(self.take_array(what)?)))
    }

    pub fn unpack_f32x4(&mut self, what: &'static str) -> Result<[f32; 4]> {
        Ok([
            self.unpack_f32(what)?,
            self.unpack_f32(what)?,
            self.unpack_f32(what)?,
            self.unpack_f32(what)?,
        ])
    }

    pub fn unpack_string(&mut self, what: &'static str) -> Result<String> {
        let len = self.unpack_u32(what)? as usize;
        let bytes = self.take(what, len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| MaterialError::Decode(format!("{what} is not valid UTF-8: {e}")))
    }
}
