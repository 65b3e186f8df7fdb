// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! Incremental receive state machine.
//!
//! [`Receiver`] advances one byte at a time so the transport never has to
//! buffer a whole packet before handing bytes to the codec. It owns exactly
//! one in-flight [`bytes::BytesMut`], freeing it to the completion callback
//! the moment a packet is fully assembled.

use std::convert::TryFrom;
use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::CodecError;
use crate::packet_type::PacketType;

/// Invoked once per fully-assembled packet, with ownership of the payload.
pub type OnPacketComplete = Box<dyn FnMut(PacketType, u8, Bytes)>;

/// Optional diagnostic hook, invoked with a short human-readable message.
pub type TraceFn = Box<dyn FnMut(&str)>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Phase {
    FixedHeader,
    VarHeader,
    Error,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FixedHeader => "fixed-header",
            Self::VarHeader => "var-header",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Per-connection C4 instance.
///
/// `phase == FixedHeader` is the only state in which no buffer is
/// allocated; every other phase field tracks the
/// VBI remaining-length accumulator or the in-flight payload buffer.
pub struct Receiver {
    phase: Phase,
    packet_type: Option<PacketType>,
    flags: u8,
    remaining_length: u32,
    vbi_multiplier: u32,
    vbi_bytes_read: u8,
    buffer: Option<BytesMut>,
    on_complete: OnPacketComplete,
    trace: Option<TraceFn>,
}

impl Receiver {
    #[must_use]
    pub fn new(on_complete: OnPacketComplete) -> Self {
        Self {
            phase: Phase::FixedHeader,
            packet_type: None,
            flags: 0,
            remaining_length: 0,
            vbi_multiplier: 1,
            vbi_bytes_read: 0,
            buffer: None,
            on_complete,
            trace: None,
        }
    }

    /// Install, replace, or clear the trace callback.
    pub fn set_trace(&mut self, trace: Option<TraceFn>) {
        self.trace = trace;
    }

    fn emit_trace(&mut self, message: &str) {
        log::trace!("{message}");
        if let Some(trace) = self.trace.as_mut() {
            trace(message);
        }
    }

    /// Feed received bytes through the state machine, invoking the
    /// completion callback synchronously for every packet fully assembled
    /// during this call.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedFrame`] if the VBI remaining-length
    /// encoding exceeds four bytes, an unknown packet type nibble is seen,
    /// or the instance is already in the terminal ERROR state. Once this
    /// happens every subsequent call returns the same error until the
    /// instance is dropped and replaced; there is no partial result.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        for &byte in bytes {
            self.feed_one(byte)?;
        }
        Ok(())
    }

    fn feed_one(&mut self, byte: u8) -> Result<(), CodecError> {
        match self.phase {
            Phase::Error => Err(CodecError::MalformedFrame("receiver is in the error state")),
            Phase::FixedHeader => self.feed_fixed_header(byte),
            Phase::VarHeader => {
                self.feed_var_header(byte);
                Ok(())
            }
        }
    }

    fn feed_fixed_header(&mut self, byte: u8) -> Result<(), CodecError> {
        if self.packet_type.is_none() {
            let packet_type = PacketType::try_from(byte >> 4).map_err(|err| self.fail(err))?;
            self.packet_type = Some(packet_type);
            self.flags = byte & 0x0F;
            self.remaining_length = 0;
            self.vbi_multiplier = 1;
            self.vbi_bytes_read = 0;
            return Ok(());
        }

        self.vbi_bytes_read += 1;
        if self.vbi_bytes_read > 4 {
            return Err(self.fail(CodecError::MalformedFrame(
                "remaining length VBI exceeds four bytes",
            )));
        }

        self.remaining_length += u32::from(byte & 0x7F) * self.vbi_multiplier;

        if byte & 0x80 != 0 {
            self.vbi_multiplier *= 128;
            return Ok(());
        }

        if self.remaining_length == 0 {
            self.deliver(Bytes::new());
        } else {
            self.buffer = Some(BytesMut::with_capacity(self.remaining_length as usize));
            self.phase = Phase::VarHeader;
        }
        Ok(())
    }

    fn feed_var_header(&mut self, byte: u8) {
        let buffer = self
            .buffer
            .as_mut()
            .expect("invariant: VarHeader phase always has an allocated buffer");
        buffer.extend_from_slice(&[byte]);
        if buffer.len() == self.remaining_length as usize {
            let payload = self.buffer.take().unwrap_or_default().freeze();
            self.deliver(payload);
        }
    }

    fn deliver(&mut self, payload: Bytes) {
        let packet_type = self
            .packet_type
            .take()
            .expect("invariant: deliver is only reached with a packet type set");
        let flags = self.flags;
        self.emit_trace(&format!(
            "packet complete: type={packet_type:?} flags={flags:#04x} len={}",
            payload.len()
        ));
        (self.on_complete)(packet_type, flags, payload);
        self.reset_for_next_packet();
    }

    fn reset_for_next_packet(&mut self) {
        self.phase = Phase::FixedHeader;
        self.packet_type = None;
        self.flags = 0;
        self.remaining_length = 0;
        self.vbi_multiplier = 1;
        self.vbi_bytes_read = 0;
        self.buffer = None;
    }

    fn fail(&mut self, err: CodecError) -> CodecError {
        self.emit_trace(&format!("receiver entering error state: {err}"));
        self.phase = Phase::Error;
        self.buffer = None;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Delivered = Rc<RefCell<Vec<(PacketType, u8, Vec<u8>)>>>;

    fn collecting_receiver() -> (Receiver, Delivered) {
        let delivered: Delivered = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&delivered);
        let receiver = Receiver::new(Box::new(move |packet_type, flags, payload| {
            sink.borrow_mut().push((packet_type, flags, payload.to_vec()));
        }));
        (receiver, delivered)
    }

    #[test]
    fn zero_length_packet_delivers_immediately() {
        let (mut receiver, delivered) = collecting_receiver();
        receiver.feed(&[0xD0, 0x00]).unwrap();
        assert_eq!(delivered.borrow().as_slice(), &[(PacketType::PingResp, 0, vec![])]);
    }

    #[test]
    fn s4_connack_parse() {
        let (mut receiver, delivered) = collecting_receiver();
        receiver.feed(&[0x20, 0x02, 0x01, 0x00]).unwrap();
        assert_eq!(
            delivered.borrow().as_slice(),
            &[(PacketType::ConnAck, 0, vec![0x01, 0x00])]
        );
    }

    #[test]
    fn s5_chunked_suback() {
        let (mut receiver, delivered) = collecting_receiver();
        receiver.feed(&[0x90]).unwrap();
        receiver.feed(&[0x05]).unwrap();
        receiver.feed(&[0x12, 0x34, 0x01, 0x80]).unwrap();
        receiver.feed(&[0x02]).unwrap();
        let delivered = delivered.borrow();
        assert_eq!(delivered.len(), 1);
        let (packet_type, flags, payload) = &delivered[0];
        assert_eq!(*packet_type, PacketType::SubAck);
        assert_eq!(*flags, 0);
        assert_eq!(payload.len(), 5);
    }

    #[test]
    fn s6_malformed_vbi_enters_error_state() {
        let (mut receiver, _delivered) = collecting_receiver();
        let err = receiver.feed(&[0x30, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedFrame(_)));
        // every subsequent call keeps reporting failure
        assert!(receiver.feed(&[0x00]).is_err());
    }

    #[test]
    fn chunk_invariance_matches_whole_feed() {
        let whole: Vec<u8> = vec![0x30, 0x05, 0x00, 0x01, b'a', b'h', b'i'];

        let (mut receiver_a, delivered_a) = collecting_receiver();
        receiver_a.feed(&whole).unwrap();

        let (mut receiver_b, delivered_b) = collecting_receiver();
        for chunk in [&whole[0..1], &whole[1..3], &whole[3..4], &whole[4..]] {
            receiver_b.feed(chunk).unwrap();
        }

        assert_eq!(delivered_a.borrow().as_slice(), delivered_b.borrow().as_slice());
    }
}
