// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! PUBACK / PUBREC / PUBREL / PUBCOMP builder.
//!
//! All four packet types share the same body shape: a packet id, and
//! (v5 only) an optional reason code plus property tail. v3 always uses the
//! two-byte short form; v5 uses it too whenever the reason is `Normal` with
//! no properties, since a reason byte of `0x00` followed by nothing is
//! indistinguishable on the wire from omitting it and the spec prefers the
//! shorter encoding in that case.

use super::finish;
use crate::byte_writer::ByteWriter;
use crate::error::CodecError;
use crate::packet_type::PacketType;
use crate::property::PropertySet;
use crate::reason_code::ReasonCode;

/// `PUBREL` is the only one of the four with flags `0010` set; the rest use
/// `0000`.
const fn flags_for(packet_type: PacketType) -> u8 {
    match packet_type {
        PacketType::PubRel => 0x02,
        _ => 0x00,
    }
}

/// Build a PUBACK/PUBREC/PUBREL/PUBCOMP packet.
///
/// `reason` is `None` for a v3 packet, or for a v5 packet that wants the
/// plain two-byte form. A v5 packet with a non-`Normal` reason or a
/// non-empty property set needs the long form and must pass
/// `Some((code, properties))`.
///
/// # Errors
///
/// Propagates any [`CodecError`] raised while serializing `properties`.
pub fn build(
    packet_type: PacketType,
    packet_id: u16,
    reason: Option<(ReasonCode, Option<&PropertySet>)>,
) -> Result<Vec<u8>, CodecError> {
    let mut body = Vec::new();
    let mut w = ByteWriter::new(&mut body);
    w.put_u16(packet_id);

    if let Some((code, properties)) = reason {
        let needs_long_form = !code.is_success() || properties.map_or(false, |p| !p.is_empty());
        if needs_long_form {
            w.put_u8(code.into());
            match properties {
                Some(properties) => properties.serialize(&mut body)?,
                None => body.push(0x00),
            }
        }
    }

    finish(packet_type, flags_for(packet_type), body)
}
