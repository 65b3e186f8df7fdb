// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! DISCONNECT builder.
//!
//! v3 DISCONNECT is the two literal bytes `0xE0 0x00`. v5 adds an optional
//! reason code and property tail; `DisconnectInfo::is_trivial` decides
//! whether the short v3-compatible form still applies.

use super::finish;
use crate::disconnect_info::DisconnectInfo;
use crate::error::CodecError;
use crate::packet_type::{PacketType, ProtocolLevel};
use crate::property::PropertySet;
use crate::reason_code::ReasonCode;

/// Build a v3 DISCONNECT packet: always the two literal bytes `0xE0 0x00`.
#[must_use]
pub fn build_v3() -> Vec<u8> {
    vec![0xE0, 0x00]
}

/// Build a v5 DISCONNECT packet.
///
/// # Errors
///
/// Propagates any [`CodecError`] raised while serializing the user
/// properties in `info`.
pub fn build_v5(info: &DisconnectInfo, properties: Option<&PropertySet>) -> Result<Vec<u8>, CodecError> {
    if info.is_trivial() && properties.map_or(true, PropertySet::is_empty) {
        return Ok(build_v3());
    }

    let mut body = Vec::new();
    let reason = info.reason.unwrap_or(ReasonCode::Normal);
    body.push(reason.into());

    if let Some(properties) = properties {
        properties.serialize(&mut body)?;
    } else {
        let mut set = PropertySet::new();
        if let Some(session_expiry_interval) = info.session_expiry_interval {
            set.add_u32(
                crate::property::PropertyId::SessionExpiryInterval,
                session_expiry_interval,
            )?;
        }
        if let Some(reason_string) = &info.reason_string {
            set.add_string(crate::property::PropertyId::ReasonString, reason_string)?;
        }
        for (key, value) in &info.user_properties {
            set.add_user_pair(key, value)?;
        }
        if let Some(server_reference) = &info.server_reference {
            set.add_string(crate::property::PropertyId::ServerReference, server_reference)?;
        }
        set.serialize(&mut body)?;
    }

    finish(PacketType::Disconnect, 0, body)
}

/// Dispatch on protocol level, matching the shape of the other builders.
///
/// # Errors
///
/// See [`build_v5`].
pub fn build(
    protocol_level: ProtocolLevel,
    info: &DisconnectInfo,
    properties: Option<&PropertySet>,
) -> Result<Vec<u8>, CodecError> {
    match protocol_level {
        ProtocolLevel::V311 => Ok(build_v3()),
        ProtocolLevel::V5 => build_v5(info, properties),
    }
}
