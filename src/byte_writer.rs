// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Primitive byte-buffer writer shared by every packet builder.

use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

use crate::error::CodecError;
use crate::var_int::encode_vbi;

/// Maximum length of a length-prefixed UTF-8 string or binary field.
pub const MAX_FIELD_LEN: usize = 65_535;

/// An append cursor over a growable byte buffer.
///
/// Every outbound packet builder writes through one of these rather than
/// pushing bytes by hand, so the field length checks live in
/// one place.
pub struct ByteWriter<'a> {
    buf: &'a mut Vec<u8>,
}

impl<'a> ByteWriter<'a> {
    #[must_use]
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        Self { buf }
    }

    /// Append a single byte.
    pub fn put_u8(&mut self, b: u8) {
        self.buf.push(b);
    }

    /// Append a 16-bit integer, most significant byte first.
    pub fn put_u16(&mut self, v: u16) {
        // Writing into a Vec<u8> never fails.
        self.buf.write_u16::<BigEndian>(v).expect("vec write");
    }

    /// Append a 32-bit integer, most significant byte first.
    pub fn put_u32(&mut self, v: u32) {
        self.buf.write_u32::<BigEndian>(v).expect("vec write");
    }

    /// Append a two-byte length prefix followed by the raw UTF-8 bytes of `s`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidArgument`] if `s` is longer than
    /// [`MAX_FIELD_LEN`] bytes.
    pub fn put_utf8(&mut self, s: &str) -> Result<(), CodecError> {
        self.put_binary(s.as_bytes())
    }

    /// Append a two-byte length prefix followed by the raw bytes of `data`.
    ///
    /// Used for fields the spec calls out as length-prefixed but not
    /// UTF-8-validated, such as the CONNECT will message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidArgument`] if `data` is longer than
    /// [`MAX_FIELD_LEN`] bytes.
    pub fn put_binary(&mut self, data: &[u8]) -> Result<(), CodecError> {
        if data.len() > MAX_FIELD_LEN {
            return Err(CodecError::InvalidArgument("field exceeds 65535 bytes"));
        }
        #[allow(clippy::cast_possible_truncation)]
        let len = data.len() as u16;
        self.put_u16(len);
        self.buf.write_all(data).expect("vec write");
        Ok(())
    }

    /// Append `v` as an MQTT variable byte integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidArgument`] if `v` exceeds
    /// [`crate::var_int::MAX_VBI_VALUE`].
    pub fn put_vbi(&mut self, v: u32) -> Result<(), CodecError> {
        encode_vbi(self.buf, v)?;
        Ok(())
    }

    /// Append raw bytes with no length prefix.
    pub fn put_raw(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }
}
