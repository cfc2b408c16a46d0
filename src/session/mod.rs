//! # Session Sequencer Module
//!
//! Owns the per-connection frame-id counter and runs one half-duplex
//! request/reply exchange at a time.
//!
//! The protocol permits no pipelining: the frame-id/reply-matching scheme
//! assumes a single outstanding exchange, so [`Session::issue`] takes
//! `&mut self` and the session holds no internal locking. Callers needing
//! concurrent access to one device must serialize around the session.

pub mod catalog;

pub use catalog::Command;

use std::io;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::{BtdaqError, Result};
use crate::frame::decoder::decode_frame;
use crate::frame::encoder::encode_frame;
use crate::frame::protocol::{ReplyExpectation, MSG_MAX_PAYLOAD_SIZE};
use crate::transport::Transport;

/// Default bound on one request/reply exchange
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(1000);

/// One open connection to an instrument
///
/// Created when the transport is opened; the frame-id counter starts at 0
/// and resets only on reconnect, never mid-session.
pub struct Session<T: Transport> {
    transport: T,
    frame_id: u8,
    reply_timeout: Duration,
}

impl<T: Transport> Session<T> {
    /// Create a session over an open transport with the default timeout
    pub fn new(transport: T) -> Self {
        Self::with_timeout(transport, DEFAULT_REPLY_TIMEOUT)
    }

    /// Create a session with a specific reply timeout
    pub fn with_timeout(transport: T, reply_timeout: Duration) -> Self {
        Self {
            transport,
            frame_id: 0,
            reply_timeout,
        }
    }

    /// Frame id that the next request will carry
    #[must_use]
    pub fn frame_id(&self) -> u8 {
        self.frame_id
    }

    /// Current reply timeout
    #[must_use]
    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    pub fn set_reply_timeout(&mut self, timeout: Duration) {
        self.reply_timeout = timeout;
    }

    #[cfg(test)]
    pub(crate) fn set_frame_id(&mut self, frame_id: u8) {
        self.frame_id = frame_id;
    }

    /// Allocate the current frame id and advance the counter (mod 256).
    ///
    /// Every attempted send consumes one id, whether or not the exchange
    /// later fails; retries are the caller's decision and carry a fresh id.
    fn next_frame_id(&mut self) -> u8 {
        let id = self.frame_id;
        self.frame_id = self.frame_id.wrapping_add(1);
        id
    }

    /// Run one request/reply exchange
    ///
    /// Encodes and sends a request frame, waits for the reply within the
    /// session timeout, and validates it against this command's expectation.
    /// No automatic retry on any failure.
    ///
    /// # Arguments
    ///
    /// * `command` - Command opcode (reply bit clear)
    /// * `payload` - Request payload, at most 255 bytes
    /// * `reply_len` - Expected reply payload length for this command
    ///
    /// # Returns
    ///
    /// * `Result<Vec<u8>>` - Validated reply payload
    ///
    /// # Errors
    ///
    /// * [`BtdaqError::Range`] - payload exceeds 255 bytes (no id consumed,
    ///   nothing sent)
    /// * [`BtdaqError::Timeout`] - no reply within the timeout
    /// * [`BtdaqError::FrameIntegrity`] / [`BtdaqError::DeviceRejected`] -
    ///   reply failed validation
    pub async fn issue(&mut self, command: u8, payload: &[u8], reply_len: u8) -> Result<Vec<u8>> {
        if payload.len() > MSG_MAX_PAYLOAD_SIZE {
            return Err(BtdaqError::Range(format!(
                "request payload is {} bytes, limit is {}",
                payload.len(),
                MSG_MAX_PAYLOAD_SIZE
            )));
        }

        let frame_id = self.next_frame_id();
        let frame = encode_frame(command, frame_id, payload);
        trace!(
            command = format_args!("0x{:02X}", command),
            frame_id,
            payload_len = payload.len(),
            "sending request"
        );

        self.transport.send(&frame).await?;

        let reply = match self.transport.receive(self.reply_timeout).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                warn!(
                    command = format_args!("0x{:02X}", command),
                    frame_id, "reply timed out"
                );
                return Err(BtdaqError::Timeout);
            }
            Err(e) => return Err(e.into()),
        };

        let expected = ReplyExpectation {
            command,
            frame_id,
            reply_len,
        };
        let data = decode_frame(&reply, &expected)?;
        debug!(
            command = format_args!("0x{:02X}", command),
            frame_id,
            reply_len = data.len(),
            "exchange complete"
        );
        Ok(data.to_vec())
    }

    /// Run one exchange for a cataloged command with fixed sizes
    ///
    /// Convenience over [`Session::issue`] for commands whose reply size is
    /// static in the catalog.
    pub async fn issue_command(&mut self, command: Command, payload: &[u8]) -> Result<Vec<u8>> {
        let Some(reply_len) = command.reply_len() else {
            return Err(BtdaqError::Range(format!(
                "command 0x{:02X} has a caller-chosen reply size; use issue()",
                command.opcode()
            )));
        };
        self.issue(command.opcode(), payload, reply_len).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::protocol::{MSG_INDEX_COMMAND, MSG_INDEX_COUNT, MSG_INDEX_FRAME};
    use crate::transport::link::mocks::MockTransport;

    #[tokio::test]
    async fn test_issue_returns_reply_payload() {
        let mock = MockTransport::new();
        mock.queue_reply(0x00, 0, 0, &[0x0F]);

        let mut session = Session::new(mock.clone());
        let reply = session.issue(0x00, &[], 1).await.unwrap();

        assert_eq!(reply, vec![0x0F]);
        let sent = mock.sent_frames();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0][MSG_INDEX_COMMAND], 0x00);
        assert_eq!(sent[0][MSG_INDEX_FRAME], 0);
        assert_eq!(sent[0][MSG_INDEX_COUNT], 0);
    }

    #[tokio::test]
    async fn test_digital_in_scenario_with_frame_id_5() {
        // Request with frame id 5; device replies command 0x80, id 5,
        // status 0, one data byte 0x0F.
        let mock = MockTransport::new();
        mock.queue_reply(0x00, 5, 0, &[0x0F]);

        let mut session = Session::new(mock);
        session.set_frame_id(5);

        let reply = session.issue(0x00, &[], 1).await.unwrap();
        assert_eq!(reply, vec![0x0F]);
        assert_eq!(session.frame_id(), 6);
    }

    #[tokio::test]
    async fn test_frame_id_advances_on_success_and_failure() {
        // N attempted exchanges leave the counter at (initial + N) mod 256,
        // timeouts included.
        let mock = MockTransport::new();
        mock.queue_reply(0x55, 0, 0, &[]);
        mock.queue_timeout();
        mock.queue_reply(0x55, 2, 0x02, &[]); // device rejection

        let mut session = Session::new(mock);

        assert!(session.issue(0x55, &[], 0).await.is_ok());
        assert!(matches!(
            session.issue(0x55, &[], 0).await,
            Err(BtdaqError::Timeout)
        ));
        assert!(matches!(
            session.issue(0x55, &[], 0).await,
            Err(BtdaqError::DeviceRejected { status: 0x02 })
        ));
        assert_eq!(session.frame_id(), 3);
    }

    #[tokio::test]
    async fn test_frame_id_wraps_mod_256() {
        let mock = MockTransport::new();
        mock.queue_reply(0x55, 255, 0, &[]);
        mock.queue_reply(0x55, 0, 0, &[]);

        let mut session = Session::new(mock);
        session.set_frame_id(255);

        assert!(session.issue(0x55, &[], 0).await.is_ok());
        assert_eq!(session.frame_id(), 0);
        assert!(session.issue(0x55, &[], 0).await.is_ok());
        assert_eq!(session.frame_id(), 1);
    }

    #[tokio::test]
    async fn test_oversize_payload_rejected_before_send() {
        let mock = MockTransport::new();
        let mut session = Session::new(mock.clone());

        let result = session.issue(0x43, &[0u8; 256], 0).await;
        assert!(matches!(result, Err(BtdaqError::Range(_))));

        // Nothing was sent and no frame id was consumed
        assert!(mock.sent_frames().is_empty());
        assert_eq!(session.frame_id(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_frame_id_reply_is_rejected() {
        let mock = MockTransport::new();
        mock.queue_reply(0x00, 7, 0, &[0x0F]); // session will send id 0

        let mut session = Session::new(mock);
        let result = session.issue(0x00, &[], 1).await;
        assert!(matches!(result, Err(BtdaqError::FrameIntegrity { .. })));
    }

    #[tokio::test]
    async fn test_send_error_propagates_as_io() {
        let mock = MockTransport::new();
        mock.set_send_error(io::ErrorKind::BrokenPipe);

        let mut session = Session::new(mock);
        let result = session.issue(0x55, &[], 0).await;
        assert!(matches!(result, Err(BtdaqError::Io(_))));
        // The attempt still consumed an id
        assert_eq!(session.frame_id(), 1);
    }

    #[tokio::test]
    async fn test_issue_command_uses_catalog_sizes() {
        let mock = MockTransport::new();
        mock.queue_reply(Command::Status.opcode(), 0, 0, &[0x02, 0x01]);

        let mut session = Session::new(mock);
        let reply = session.issue_command(Command::Status, &[]).await.unwrap();
        assert_eq!(reply, vec![0x02, 0x01]);
    }
}
