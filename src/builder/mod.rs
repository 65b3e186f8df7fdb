// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Per-packet-type outbound assembly.
//!
//! Every builder follows the same shape: allocate an empty buffer, append
//! variable header, (v5) property set, payload, then prepend a fixed header
//! with the computed remaining length. `finish` does the prepend step once
//! the variable-header-plus-payload body is ready, so individual builders
//! only ever append to a plain `Vec<u8>`.

pub mod ack;
pub mod connect;
pub mod disconnect;
pub mod pingreq;
pub mod publish;
pub mod subscribe;
pub mod unsubscribe;

use crate::error::CodecError;
use crate::packet_type::{PacketType, ProtocolLevel};
use crate::property::PropertySet;
use crate::var_int::encode_vbi;

/// Prepend a fixed header (type nibble | flags nibble, then VBI remaining
/// length) to `body` and return the complete packet.
///
/// # Errors
///
/// Returns [`CodecError::InvalidArgument`] if `body`'s length exceeds the
/// 4-byte VBI maximum.
pub(crate) fn finish(packet_type: PacketType, flags: u8, body: Vec<u8>) -> Result<Vec<u8>, CodecError> {
    #[allow(clippy::cast_possible_truncation)]
    let remaining_length = body.len() as u32;
    let mut out = Vec::with_capacity(body.len() + 5);
    out.push((packet_type.nibble() << 4) | (flags & 0x0F));
    encode_vbi(&mut out, remaining_length)?;
    out.extend_from_slice(&body);
    Ok(out)
}

/// Append the property section for `protocol_level` to `body`.
///
/// v3 never carries a property section and this is a no-op regardless of
/// `properties`. v5 always carries one: `properties` is serialized if
/// given, otherwise the mandatory zero-length byte is written, since every
/// v5 packet that defines a property section carries one even when empty.
///
/// # Errors
///
/// Propagates any [`CodecError`] raised while serializing `properties`.
pub(crate) fn append_property_section(
    protocol_level: ProtocolLevel,
    properties: Option<&PropertySet>,
    body: &mut Vec<u8>,
) -> Result<(), CodecError> {
    if protocol_level == ProtocolLevel::V311 {
        return Ok(());
    }
    match properties {
        Some(properties) => properties.serialize(body),
        None => {
            body.push(0x00);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_prepends_type_flags_and_remaining_length() {
        let body = vec![0xAA; 200];
        let packet = finish(PacketType::PubAck, 0, body.clone()).unwrap();
        assert_eq!(packet[0], 0x40);
        // 200 encodes as two VBI bytes: 0xC8 0x01
        assert_eq!(&packet[1..3], &[0xC8, 0x01]);
        assert_eq!(&packet[3..], &body[..]);
    }

    #[test]
    fn v3_never_appends_a_property_section() {
        let mut body = Vec::new();
        append_property_section(ProtocolLevel::V311, None, &mut body).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn v5_appends_mandatory_zero_byte_when_no_properties_given() {
        let mut body = Vec::new();
        append_property_section(ProtocolLevel::V5, None, &mut body).unwrap();
        assert_eq!(body, vec![0x00]);
    }

    #[test]
    fn v5_serializes_a_given_property_set() {
        let mut set = PropertySet::new();
        set.add_byte(crate::property::PropertyId::PayloadFormatIndicator, 1)
            .unwrap();
        let mut body = Vec::new();
        append_property_section(ProtocolLevel::V5, Some(&set), &mut body).unwrap();
        assert_eq!(body, vec![0x02, 0x01, 0x01]);
    }
}
