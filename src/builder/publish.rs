// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! PUBLISH builder.

use super::{append_property_section, finish};
use crate::byte_writer::ByteWriter;
use crate::error::CodecError;
use crate::packet_type::{PacketType, ProtocolLevel};
use crate::property::PropertySet;
use crate::publish_header::{PublishHeader, MAX_OUTBOUND_LEN};
use crate::qos::Qos;

/// Build a PUBLISH packet.
///
/// `header.packet_id` must be `Some` iff `header.qos != Qos::AtMostOnce`;
/// this is checked rather than silently corrected, since a caller-supplied
/// packet id out of step with the QoS level is a bug worth surfacing.
///
/// # Errors
///
/// Returns [`CodecError::InvalidArgument`] if `header.topic` is empty, the
/// packet id/QoS pairing is inconsistent, or the assembled packet would
/// exceed [`MAX_OUTBOUND_LEN`].
pub fn build(
    header: &PublishHeader,
    payload: &[u8],
    protocol_level: ProtocolLevel,
    properties: Option<&PropertySet>,
) -> Result<Vec<u8>, CodecError> {
    if header.topic.is_empty() {
        return Err(CodecError::InvalidArgument("publish topic must not be empty"));
    }
    let needs_packet_id = header.qos != Qos::AtMostOnce;
    if needs_packet_id != header.packet_id.is_some() {
        return Err(CodecError::InvalidArgument(
            "packet id must be present iff qos is at-least-once or exactly-once",
        ));
    }

    let mut body = Vec::new();
    {
        let mut w = ByteWriter::new(&mut body);
        w.put_utf8(&header.topic)?;
        if let Some(packet_id) = header.packet_id {
            w.put_u16(packet_id);
        }
    }
    append_property_section(protocol_level, properties, &mut body)?;
    {
        let mut w = ByteWriter::new(&mut body);
        w.put_raw(payload);
    }

    if body.len() > MAX_OUTBOUND_LEN {
        return Err(CodecError::InvalidArgument("publish packet exceeds maximum outbound length"));
    }

    let flags = (if header.dup { 0b1000 } else { 0 })
        | ((header.qos as u8) << 1)
        | u8::from(header.retain);
    finish(PacketType::Publish, flags, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos0_publish_omits_packet_id() {
        let header = PublishHeader::new("a/b", Qos::AtMostOnce);
        let packet = build(&header, b"hi", ProtocolLevel::V311, None).unwrap();
        assert_eq!(packet[0], 0x30);
        let expected_tail = [0x00, 0x03, b'a', b'/', b'b', b'h', b'i'];
        assert_eq!(&packet[2..], &expected_tail);
    }

    #[test]
    fn qos1_publish_requires_packet_id() {
        let header = PublishHeader::new("a/b", Qos::AtLeastOnce);
        assert!(build(&header, b"hi", ProtocolLevel::V311, None).is_err());

        let header = PublishHeader {
            packet_id: Some(7),
            ..PublishHeader::new("a/b", Qos::AtLeastOnce)
        };
        let packet = build(&header, b"hi", ProtocolLevel::V311, None).unwrap();
        assert_eq!(packet[0], 0x32); // qos bits = 0b01 << 1
        assert_eq!(&packet[7..9], &[0x00, 0x07]);
    }

    #[test]
    fn dup_and_retain_flags_are_packed() {
        let header = PublishHeader {
            dup: true,
            retain: true,
            ..PublishHeader::new("a", Qos::AtMostOnce)
        };
        let packet = build(&header, b"", ProtocolLevel::V311, None).unwrap();
        assert_eq!(packet[0] & 0x0F, 0b1001);
    }

    #[test]
    fn rejects_empty_topic() {
        let header = PublishHeader::new("", Qos::AtMostOnce);
        assert!(build(&header, b"x", ProtocolLevel::V311, None).is_err());
    }

    #[test]
    fn rejects_payload_over_max_outbound_len() {
        let header = PublishHeader::new("t", Qos::AtMostOnce);
        let payload = vec![0u8; MAX_OUTBOUND_LEN + 1];
        let err = build(&header, &payload, ProtocolLevel::V311, None).unwrap_err();
        assert!(matches!(err, CodecError::InvalidArgument(_)));
    }

    #[test]
    fn accepts_payload_at_max_outbound_len_boundary() {
        // body = topic(2+1) + payload; size the payload so body.len() == MAX_OUTBOUND_LEN exactly.
        let header = PublishHeader::new("t", Qos::AtMostOnce);
        let payload = vec![0u8; MAX_OUTBOUND_LEN - 3];
        assert!(build(&header, &payload, ProtocolLevel::V311, None).is_ok());
    }

    #[test]
    fn v5_publish_with_no_properties_given_still_carries_the_mandatory_zero_byte() {
        let header = PublishHeader::new("a/b", Qos::AtMostOnce);
        let packet = build(&header, b"hi", ProtocolLevel::V5, None).unwrap();
        let expected_tail = [0x00, 0x03, b'a', b'/', b'b', 0x00, b'h', b'i'];
        assert_eq!(&packet[2..], &expected_tail);
    }
}
