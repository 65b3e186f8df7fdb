// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by Apache-2.0 License that can be found
// in the LICENSE file.

//! CONNECT input data model.

use crate::error::CodecError;
use crate::qos::Qos;

/// Last Will and Testament, present only when the client registers one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Will {
    pub topic: String,
    /// Encoded as length-prefixed binary, not a UTF-8 string.
    pub message: Vec<u8>,
}

/// Immutable snapshot consumed by the CONNECT builder.
///
/// `client_id` may be empty but is never absent; `password` must not be
/// present without `username`; `will` carries topic and message together so
/// "both present or both absent" is enforced by the type rather than by a
/// runtime check on two separate optional fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<Vec<u8>>,
    pub will: Option<Will>,
    pub keep_alive: u16,
    pub clean_session: bool,
    pub will_retain: bool,
    pub will_qos: Qos,
    pub log_trace: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            username: None,
            password: None,
            will: None,
            keep_alive: 60,
            clean_session: true,
            will_retain: false,
            will_qos: Qos::AtMostOnce,
            log_trace: false,
        }
    }
}

impl ClientOptions {
    /// Create options with just a client id, leaving every other field at
    /// its default.
    #[must_use]
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            ..Self::default()
        }
    }

    /// Validate the invariants this type places on `ClientOptions`:
    /// password implies username, will topic/message are both-or-neither
    /// (guaranteed by the `Will` struct already, checked here only for the
    /// will-qos/retain-without-will case), and will-qos is in range.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidArgument`] on any violated precondition.
    pub fn validate(&self) -> Result<(), CodecError> {
        if self.password.is_some() && self.username.is_none() {
            return Err(CodecError::InvalidArgument(
                "password present without username",
            ));
        }
        if matches!(self.will_qos, Qos::Failure) {
            return Err(CodecError::InvalidArgument("will qos out of range"));
        }
        if self.will.is_none() && self.will_retain {
            return Err(CodecError::InvalidArgument(
                "will-retain set without a will message",
            ));
        }
        if self.will.is_none() && self.will_qos != Qos::AtMostOnce {
            return Err(CodecError::InvalidArgument(
                "will-qos set without a will message",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_validate() {
        let opts = ClientOptions::new("test");
        opts.validate().unwrap();
    }

    #[test]
    fn password_without_username_is_rejected() {
        let mut opts = ClientOptions::new("test");
        opts.password = Some(b"secret".to_vec());
        assert!(opts.validate().is_err());
    }

    #[test]
    fn will_retain_without_will_is_rejected() {
        let mut opts = ClientOptions::new("test");
        opts.will_retain = true;
        assert!(opts.validate().is_err());
    }

    #[test]
    fn will_qos_without_will_is_rejected() {
        let mut opts = ClientOptions::new("test");
        opts.will_qos = Qos::AtLeastOnce;
        assert!(opts.validate().is_err());

        let mut opts = ClientOptions::new("test");
        opts.will_qos = Qos::ExactlyOnce;
        assert!(opts.validate().is_err());
    }
}
