// Copyright (c) 2021 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! MQTT v5 property system.
//!
//! A [`PropertySet`] is an ordered, typed collection of [`Property`] items
//! keyed by [`PropertyId`]. It is the only place in the crate that needs
//! insertion-order preservation with per-identifier duplicate rules, which is
//! why it is a `Vec<Property>` rather than a map (`USER_PROPERTY` and
//! `SUBSCRIPTION_IDENTIFIER` are explicitly repeatable and must come back out
//! in the order they went in).

use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;

use crate::byte_writer::MAX_FIELD_LEN;
use crate::error::CodecError;
use crate::var_int::encode_vbi;

/// v5 property identifier.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PropertyId {
    PayloadFormatIndicator = 0x01,
    MessageExpiryInterval = 0x02,
    ContentType = 0x03,
    ResponseTopic = 0x08,
    CorrelationData = 0x09,
    SubscriptionIdentifier = 0x0B,
    SessionExpiryInterval = 0x11,
    AssignedClientIdentifier = 0x12,
    ServerKeepAlive = 0x13,
    AuthenticationMethod = 0x15,
    AuthenticationData = 0x16,
    RequestProblemInformation = 0x17,
    WillDelayInterval = 0x18,
    RequestResponseInformation = 0x19,
    ResponseInformation = 0x1A,
    ServerReference = 0x1C,
    ReasonString = 0x1F,
    ReceiveMaximum = 0x21,
    TopicAliasMaximum = 0x22,
    TopicAlias = 0x23,
    MaximumQos = 0x24,
    RetainAvailable = 0x25,
    UserProperty = 0x26,
    MaximumPacketSize = 0x27,
    WildcardSubscriptionAvailable = 0x28,
    SubscriptionIdentifierAvailable = 0x29,
    SharedSubscriptionAvailable = 0x2A,
}

/// The value kind a [`PropertyId`] is defined with.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PropertyKind {
    Byte,
    U16,
    U32,
    Vbi,
    Utf8,
    Binary,
    Utf8Pair,
}

impl PropertyId {
    /// The fixed value kind for this identifier.
    #[must_use]
    pub const fn kind(self) -> PropertyKind {
        match self {
            Self::PayloadFormatIndicator
            | Self::RequestProblemInformation
            | Self::RequestResponseInformation
            | Self::MaximumQos
            | Self::RetainAvailable
            | Self::WildcardSubscriptionAvailable
            | Self::SubscriptionIdentifierAvailable
            | Self::SharedSubscriptionAvailable => PropertyKind::Byte,

            Self::ServerKeepAlive
            | Self::ReceiveMaximum
            | Self::TopicAliasMaximum
            | Self::TopicAlias => PropertyKind::U16,

            Self::MessageExpiryInterval
            | Self::SessionExpiryInterval
            | Self::WillDelayInterval
            | Self::MaximumPacketSize => PropertyKind::U32,

            Self::SubscriptionIdentifier => PropertyKind::Vbi,

            Self::ContentType
            | Self::ResponseTopic
            | Self::AssignedClientIdentifier
            | Self::AuthenticationMethod
            | Self::ResponseInformation
            | Self::ServerReference
            | Self::ReasonString => PropertyKind::Utf8,

            Self::CorrelationData | Self::AuthenticationData => PropertyKind::Binary,

            Self::UserProperty => PropertyKind::Utf8Pair,
        }
    }

    /// `true` for the two identifiers the spec allows to repeat
    /// (`USER_PROPERTY` and `SUBSCRIPTION_IDENTIFIER`).
    #[must_use]
    pub const fn repeatable(self) -> bool {
        matches!(self, Self::UserProperty | Self::SubscriptionIdentifier)
    }
}

/// The value carried by one [`Property`] item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    Byte(u8),
    U16(u16),
    U32(u32),
    /// Variable byte integer, 0..=268,435,455.
    Vbi(u32),
    Utf8(String),
    Binary(Vec<u8>),
    Utf8Pair(String, String),
}

impl PropertyValue {
    const fn kind_name(&self) -> &'static str {
        match self {
            Self::Byte(_) => "byte",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::Vbi(_) => "variable byte integer",
            Self::Utf8(_) => "utf8 string",
            Self::Binary(_) => "binary",
            Self::Utf8Pair(_, _) => "utf8 string pair",
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        match self {
            Self::Byte(v) => buf.push(*v),
            Self::U16(v) => buf.write_u16::<BigEndian>(*v).expect("vec write"),
            Self::U32(v) => buf.write_u32::<BigEndian>(*v).expect("vec write"),
            Self::Vbi(v) => {
                encode_vbi(buf, *v)?;
            }
            Self::Utf8(s) => write_length_prefixed(buf, s.as_bytes())?,
            Self::Binary(b) => write_length_prefixed(buf, b)?,
            Self::Utf8Pair(k, v) => {
                write_length_prefixed(buf, k.as_bytes())?;
                write_length_prefixed(buf, v.as_bytes())?;
            }
        }
        Ok(())
    }
}

fn write_length_prefixed(buf: &mut Vec<u8>, data: &[u8]) -> Result<(), CodecError> {
    if data.len() > MAX_FIELD_LEN {
        return Err(CodecError::InvalidArgument("property field exceeds 65535 bytes"));
    }
    #[allow(clippy::cast_possible_truncation)]
    let len = data.len() as u16;
    buf.write_u16::<BigEndian>(len).expect("vec write");
    buf.write_all(data).expect("vec write");
    Ok(())
}

/// One (identifier, value) entry in a [`PropertySet`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    id: PropertyId,
    value: PropertyValue,
}

impl Property {
    #[must_use]
    pub const fn id(&self) -> PropertyId {
        self.id
    }

    #[must_use]
    pub const fn value(&self) -> &PropertyValue {
        &self.value
    }

    fn bytes(&self) -> Result<usize, CodecError> {
        let mut probe = Vec::new();
        encode_vbi(&mut probe, self.id as u32)?;
        let id_len = probe.len();
        probe.clear();
        self.value.encode(&mut probe)?;
        Ok(id_len + probe.len())
    }

    fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        encode_vbi(buf, self.id as u32)?;
        self.value.encode(buf)
    }
}

/// An ordered, typed collection of v5 properties.
///
/// Serializes as a VBI-encoded total length followed by each item in
/// insertion order; an empty set still serializes as the single zero byte
/// MQTT v5 requires on every packet that defines a property section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertySet {
    items: Vec<Property>,
}

impl PropertySet {
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.items.iter()
    }

    fn check_insert(&self, id: PropertyId, kind: PropertyKind) -> Result<(), CodecError> {
        if id.kind() != kind {
            return Err(CodecError::PropertyTypeMismatch {
                id,
                expected: kind_name(id.kind()),
            });
        }
        if !id.repeatable() && self.items.iter().any(|p| p.id == id) {
            return Err(CodecError::DuplicateProperty(id));
        }
        Ok(())
    }

    fn push(&mut self, id: PropertyId, value: PropertyValue) -> Result<(), CodecError> {
        self.check_insert(id, value_kind(&value))?;
        log::debug!("property: add {id:?}");
        self.items.push(Property { id, value });
        Ok(())
    }

    /// Add a one-byte property.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::PropertyTypeMismatch`] if `id`'s defined kind is
    /// not `byte`, or [`CodecError::DuplicateProperty`] if `id` is
    /// non-repeatable and already present.
    pub fn add_byte(&mut self, id: PropertyId, v: u8) -> Result<(), CodecError> {
        self.push(id, PropertyValue::Byte(v))
    }

    /// Add a two-byte integer property. See [`Self::add_byte`] for errors.
    pub fn add_u16(&mut self, id: PropertyId, v: u16) -> Result<(), CodecError> {
        self.push(id, PropertyValue::U16(v))
    }

    /// Add a four-byte integer property. See [`Self::add_byte`] for errors.
    pub fn add_u32(&mut self, id: PropertyId, v: u32) -> Result<(), CodecError> {
        self.push(id, PropertyValue::U32(v))
    }

    /// Add a variable-byte-integer property (only `SUBSCRIPTION_IDENTIFIER`
    /// is defined with this kind). See [`Self::add_byte`] for errors.
    pub fn add_vbi(&mut self, id: PropertyId, v: u32) -> Result<(), CodecError> {
        self.push(id, PropertyValue::Vbi(v))
    }

    /// Add a UTF-8 string property. See [`Self::add_byte`] for errors.
    pub fn add_string(&mut self, id: PropertyId, s: &str) -> Result<(), CodecError> {
        self.push(id, PropertyValue::Utf8(s.to_string()))
    }

    /// Add a binary property. See [`Self::add_byte`] for errors.
    pub fn add_binary(&mut self, id: PropertyId, data: &[u8]) -> Result<(), CodecError> {
        self.push(id, PropertyValue::Binary(data.to_vec()))
    }

    /// Add a `USER_PROPERTY` (key, value) pair. Always repeatable.
    pub fn add_user_pair(&mut self, key: &str, value: &str) -> Result<(), CodecError> {
        self.push(
            PropertyId::UserProperty,
            PropertyValue::Utf8Pair(key.to_string(), value.to_string()),
        )
    }

    /// Serialize the property section: a VBI-encoded total length followed by
    /// each item, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] if any item's encoded length overflows the
    /// VBI maximum.
    pub fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut total = 0usize;
        for item in &self.items {
            total += item.bytes()?;
        }
        #[allow(clippy::cast_possible_truncation)]
        encode_vbi(buf, total as u32)?;
        for item in &self.items {
            item.encode(buf)?;
        }
        Ok(())
    }
}

const fn value_kind(value: &PropertyValue) -> PropertyKind {
    match value {
        PropertyValue::Byte(_) => PropertyKind::Byte,
        PropertyValue::U16(_) => PropertyKind::U16,
        PropertyValue::U32(_) => PropertyKind::U32,
        PropertyValue::Vbi(_) => PropertyKind::Vbi,
        PropertyValue::Utf8(_) => PropertyKind::Utf8,
        PropertyValue::Binary(_) => PropertyKind::Binary,
        PropertyValue::Utf8Pair(_, _) => PropertyKind::Utf8Pair,
    }
}

const fn kind_name(kind: PropertyKind) -> &'static str {
    match kind {
        PropertyKind::Byte => "byte",
        PropertyKind::U16 => "u16",
        PropertyKind::U32 => "u32",
        PropertyKind::Vbi => "variable byte integer",
        PropertyKind::Utf8 => "utf8 string",
        PropertyKind::Binary => "binary",
        PropertyKind::Utf8Pair => "utf8 string pair",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_serializes_as_single_zero_byte() {
        let set = PropertySet::new();
        let mut buf = Vec::new();
        set.serialize(&mut buf).unwrap();
        assert_eq!(buf, vec![0x00]);
    }

    #[test]
    fn preserves_insertion_order() {
        let mut set = PropertySet::new();
        set.add_string(PropertyId::ContentType, "text/plain").unwrap();
        set.add_u32(PropertyId::MessageExpiryInterval, 30).unwrap();
        set.add_user_pair("a", "1").unwrap();
        set.add_user_pair("b", "2").unwrap();

        let ids: Vec<_> = set.iter().map(Property::id).collect();
        assert_eq!(
            ids,
            vec![
                PropertyId::ContentType,
                PropertyId::MessageExpiryInterval,
                PropertyId::UserProperty,
                PropertyId::UserProperty,
            ]
        );
        let values: Vec<_> = set.iter().map(Property::value).cloned().collect();
        assert_eq!(
            values[2],
            PropertyValue::Utf8Pair("a".to_string(), "1".to_string())
        );
        assert_eq!(
            values[3],
            PropertyValue::Utf8Pair("b".to_string(), "2".to_string())
        );
    }

    #[test]
    fn rejects_type_mismatched_adder() {
        let mut set = PropertySet::new();
        let err = set.add_u16(PropertyId::ContentType, 1).unwrap_err();
        assert!(matches!(err, CodecError::PropertyTypeMismatch { .. }));
    }

    #[test]
    fn rejects_duplicate_non_repeatable_property() {
        let mut set = PropertySet::new();
        set.add_string(PropertyId::ContentType, "a").unwrap();
        let err = set.add_string(PropertyId::ContentType, "b").unwrap_err();
        assert_eq!(err, CodecError::DuplicateProperty(PropertyId::ContentType));
    }

    #[test]
    fn allows_duplicate_user_property_and_subscription_id() {
        let mut set = PropertySet::new();
        set.add_user_pair("k", "v1").unwrap();
        set.add_user_pair("k", "v2").unwrap();
        set.add_vbi(PropertyId::SubscriptionIdentifier, 1).unwrap();
        set.add_vbi(PropertyId::SubscriptionIdentifier, 2).unwrap();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn serializes_identifier_then_kind_appropriate_encoding() {
        let mut set = PropertySet::new();
        set.add_byte(PropertyId::PayloadFormatIndicator, 1).unwrap();
        let mut buf = Vec::new();
        set.serialize(&mut buf).unwrap();
        // length=2, id=0x01, value=0x01
        assert_eq!(buf, vec![0x02, 0x01, 0x01]);
    }
}
