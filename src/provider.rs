// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Versioned provider facade.
//!
//! A [`Provider`] is a value-immutable capability table: one trait with two
//! concrete zero-sized implementations ([`V3Provider`], [`V5Provider`]) so
//! the surrounding client dispatches through a single indirection and never
//! branches on protocol version itself (avoiding a
//! deep class hierarchy).

use crate::builder;
use crate::client_options::ClientOptions;
use crate::disconnect_info::DisconnectInfo;
use crate::error::CodecError;
use crate::packet_type::{PacketType, ProtocolLevel};
use crate::property::PropertySet;
use crate::publish_header::PublishHeader;
use crate::reason_code::ReasonCode;
use crate::receive::{OnPacketComplete, Receiver, TraceFn};
use crate::subscribe_payload::SubscribeTopic;

/// Ack-family packet kinds that share [`Provider::build_ack`]'s shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AckKind {
    PubAck,
    PubRec,
    PubRel,
    PubComp,
}

impl AckKind {
    const fn packet_type(self) -> PacketType {
        match self {
            Self::PubAck => PacketType::PubAck,
            Self::PubRec => PacketType::PubRec,
            Self::PubRel => PacketType::PubRel,
            Self::PubComp => PacketType::PubComp,
        }
    }
}

/// A versioned capability table covering every outbound builder.
/// v3 implementations ignore the `properties` arguments; v5 implementations
/// use them to emit the long form where needed, injecting the mandatory
/// empty property section when none is given.
pub trait Provider {
    fn protocol_level(&self) -> ProtocolLevel;

    /// # Errors
    /// See [`builder::connect::build`].
    fn build_connect(&self, opts: &ClientOptions, properties: Option<&PropertySet>) -> Result<Vec<u8>, CodecError> {
        builder::connect::build(opts, self.protocol_level(), properties)
    }

    /// # Errors
    /// See [`builder::publish::build`].
    fn build_publish(
        &self,
        header: &PublishHeader,
        payload: &[u8],
        properties: Option<&PropertySet>,
    ) -> Result<Vec<u8>, CodecError> {
        builder::publish::build(header, payload, self.protocol_level(), properties)
    }

    /// # Errors
    /// See [`builder::ack::build`].
    fn build_ack(
        &self,
        kind: AckKind,
        packet_id: u16,
        reason: Option<(ReasonCode, Option<&PropertySet>)>,
    ) -> Result<Vec<u8>, CodecError> {
        builder::ack::build(kind.packet_type(), packet_id, reason)
    }

    /// # Errors
    /// See [`builder::subscribe::build`].
    fn build_subscribe(
        &self,
        packet_id: u16,
        topics: &[SubscribeTopic],
        properties: Option<&PropertySet>,
    ) -> Result<Vec<u8>, CodecError> {
        builder::subscribe::build(packet_id, topics, self.protocol_level(), properties)
    }

    /// # Errors
    /// See [`builder::unsubscribe::build`].
    fn build_unsubscribe(
        &self,
        packet_id: u16,
        filters: &[String],
        properties: Option<&PropertySet>,
    ) -> Result<Vec<u8>, CodecError> {
        builder::unsubscribe::build(packet_id, filters, self.protocol_level(), properties)
    }

    #[must_use]
    fn build_pingreq(&self) -> Vec<u8> {
        builder::pingreq::build()
    }

    /// # Errors
    /// See [`builder::disconnect::build`].
    fn build_disconnect(
        &self,
        info: &DisconnectInfo,
        properties: Option<&PropertySet>,
    ) -> Result<Vec<u8>, CodecError> {
        builder::disconnect::build(self.protocol_level(), info, properties)
    }
}

/// MQTT v3.1.1 capability table. v5-only inputs (`properties`) are accepted
/// for interface uniformity and silently ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct V3Provider;

impl Provider for V3Provider {
    fn protocol_level(&self) -> ProtocolLevel {
        ProtocolLevel::V311
    }
}

/// MQTT v5 capability table.
#[derive(Clone, Copy, Debug, Default)]
pub struct V5Provider;

impl Provider for V5Provider {
    fn protocol_level(&self) -> ProtocolLevel {
        ProtocolLevel::V5
    }
}

/// A codec instance bound to one provider and one receive state machine
/// exposing `create`/`destroy`-equivalent lifecycle operations, `set_trace`,
/// and the bytes-received entrypoint.
pub struct CodecHandle<P: Provider> {
    provider: P,
    receiver: Receiver,
}

impl<P: Provider> CodecHandle<P> {
    /// Create a codec instance bound to `provider`, with `on_complete`
    /// invoked once per fully-assembled inbound packet.
    #[must_use]
    pub fn create(provider: P, on_complete: OnPacketComplete) -> Self {
        Self {
            provider,
            receiver: Receiver::new(on_complete),
        }
    }

    /// Install, replace, or clear the trace callback.
    pub fn set_trace(&mut self, trace: Option<TraceFn>) {
        self.receiver.set_trace(trace);
    }

    /// Borrow the provider bound to this instance.
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// The bytes-received entrypoint the transport feeds.
    ///
    /// # Errors
    /// See [`Receiver::feed`].
    pub fn receive(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.receiver.feed(bytes)
    }
}

// `destroy` has no Rust counterpart: dropping a `CodecHandle` releases any
// partially-assembled buffer along with everything else it owns.

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::Qos;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn v3_provider_reports_protocol_level_four() {
        assert_eq!(V3Provider.protocol_level(), ProtocolLevel::V311);
        assert_eq!(V5Provider.protocol_level(), ProtocolLevel::V5);
    }

    #[test]
    fn v3_provider_builds_pingreq() {
        assert_eq!(V3Provider.build_pingreq(), vec![0xC0, 0x00]);
    }

    #[test]
    fn handle_round_trips_a_built_publish_through_its_own_receiver() {
        let delivered = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&delivered);
        let mut handle = CodecHandle::create(
            V3Provider,
            Box::new(move |packet_type, flags, payload| {
                sink.borrow_mut().push((packet_type, flags, payload.to_vec()));
            }),
        );

        let header = PublishHeader::new("a/b", Qos::AtMostOnce);
        let packet = handle.provider().build_publish(&header, b"hi", None).unwrap();
        handle.receive(&packet).unwrap();

        let delivered = delivered.borrow();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, PacketType::Publish);
    }
}
