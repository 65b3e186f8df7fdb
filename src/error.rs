// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

use std::fmt;

use crate::property::PropertyId;

/// Error kinds surfaced by the codec core.
///
/// Every builder and the receive state machine report failures through
/// this single enum rather than a per-module error type, since callers
/// outside this crate need one stable `?`-composable error to match on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Null required input, `QoS` out of range, empty topic, password
    /// without username, a will topic without a will message (or vice
    /// versa), or an oversize string/payload.
    InvalidArgument(&'static str),

    /// A buffer could not be grown or created.
    ///
    /// Not reachable from safe Rust (`Vec`/`BytesMut` abort the process
    /// on true allocation failure instead of returning an error), kept
    /// only so this enum mirrors every error kind the spec names.
    AllocationFailed,

    /// A v5 property was added with the wrong typed adder for its
    /// identifier.
    PropertyTypeMismatch {
        id: PropertyId,
        expected: &'static str,
    },

    /// A non-repeatable v5 property identifier was added more than once.
    DuplicateProperty(PropertyId),

    /// The variable-byte integer continuation bit was set past the
    /// fourth byte, the declared remaining length exceeds the 4-byte VBI
    /// maximum, or a byte arrived while the receive state machine was
    /// already in the `ERROR` state.
    MalformedFrame(&'static str),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::AllocationFailed => write!(f, "buffer allocation failed"),
            Self::PropertyTypeMismatch { id, expected } => {
                write!(f, "property {id:?} must be added as {expected}")
            }
            Self::DuplicateProperty(id) => write!(f, "duplicate non-repeatable property {id:?}"),
            Self::MalformedFrame(msg) => write!(f, "malformed frame: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}
