// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! CONNECT builder.

use super::{append_property_section, finish};
use crate::byte_writer::ByteWriter;
use crate::client_options::ClientOptions;
use crate::error::CodecError;
use crate::packet_type::{PacketType, ProtocolLevel};
use crate::property::PropertySet;

const PROTOCOL_NAME: &str = "MQTT";

const USERNAME_FLAG: u8 = 0x80;
const PASSWORD_FLAG: u8 = 0x40;
const WILL_RETAIN_FLAG: u8 = 0x20;
const WILL_FLAG: u8 = 0x04;
const CLEAN_SESSION_FLAG: u8 = 0x02;

/// Build a CONNECT packet.
///
/// The connect-flags byte is fully computed before any payload byte is
/// written, rather than patched in after the payload is partially assembled.
///
/// # Errors
///
/// Returns [`CodecError::InvalidArgument`] if `opts` fails
/// [`ClientOptions::validate`], or if any field exceeds its length limit.
pub fn build(
    opts: &ClientOptions,
    protocol_level: ProtocolLevel,
    properties: Option<&PropertySet>,
) -> Result<Vec<u8>, CodecError> {
    opts.validate()?;

    let will_qos_bits = (u8::from(opts.will_qos) << 3) & 0x18;
    let connect_flags = (if opts.username.is_some() { USERNAME_FLAG } else { 0 })
        | (if opts.password.is_some() { PASSWORD_FLAG } else { 0 })
        | (if opts.will_retain { WILL_RETAIN_FLAG } else { 0 })
        | will_qos_bits
        | (if opts.will.is_some() { WILL_FLAG } else { 0 })
        | (if opts.clean_session { CLEAN_SESSION_FLAG } else { 0 });

    let mut body = Vec::new();
    {
        let mut w = ByteWriter::new(&mut body);
        w.put_utf8(PROTOCOL_NAME)?;
        w.put_u8(protocol_level.into());
        w.put_u8(connect_flags);
        w.put_u16(opts.keep_alive);
    }
    append_property_section(protocol_level, properties, &mut body)?;

    let mut w = ByteWriter::new(&mut body);
    w.put_utf8(&opts.client_id)?;

    if let Some(will) = &opts.will {
        w.put_utf8(&will.topic)?;
        w.put_binary(&will.message)?;
    }
    if let Some(username) = &opts.username {
        w.put_utf8(username)?;
    }
    if let Some(password) = &opts.password {
        w.put_binary(password)?;
    }

    finish(PacketType::Connect, 0, body)
}
