// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! SUBSCRIBE builder.

use super::{append_property_section, finish};
use crate::byte_writer::ByteWriter;
use crate::error::CodecError;
use crate::packet_type::{PacketType, ProtocolLevel};
use crate::property::PropertySet;
use crate::subscribe_payload::SubscribeTopic;

/// Fixed-header flags are always `0010` for SUBSCRIBE.
const FLAGS: u8 = 0x02;

/// Build a SUBSCRIBE packet.
///
/// # Errors
///
/// Returns [`CodecError::InvalidArgument`] if `topics` is empty, or any
/// filter exceeds the 65,535-byte field limit.
pub fn build(
    packet_id: u16,
    topics: &[SubscribeTopic],
    protocol_level: ProtocolLevel,
    properties: Option<&PropertySet>,
) -> Result<Vec<u8>, CodecError> {
    if topics.is_empty() {
        return Err(CodecError::InvalidArgument(
            "subscribe packet must list at least one topic filter",
        ));
    }

    let mut body = Vec::new();
    {
        let mut w = ByteWriter::new(&mut body);
        w.put_u16(packet_id);
    }
    append_property_section(protocol_level, properties, &mut body)?;
    let mut w = ByteWriter::new(&mut body);
    for topic in topics {
        w.put_utf8(&topic.filter)?;
        let options_byte = match protocol_level {
            ProtocolLevel::V311 => topic.v3_options_byte(),
            ProtocolLevel::V5 => topic.v5_options_byte(),
        };
        w.put_u8(options_byte);
    }

    finish(PacketType::Subscribe, FLAGS, body)
}
