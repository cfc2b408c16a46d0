//! # Wire Protocol Constants and Types
//!
//! Core definitions for the BTH-series framing protocol.
//!
//! Every exchange is one request frame and one reply frame:
//!
//! ```text
//! | start | command | frame id | status | count | payload[count] | checksum |
//! ```
//!
//! The device marks a reply by setting the high bit of the command byte.
//! All multi-byte payload integers are little-endian.

/// Frame start marker (always 0xDB)
pub const MSG_START: u8 = 0xDB;

/// Reply flag, ORed into the command byte by the device
pub const MSG_REPLY: u8 = 0x80;

/// Status byte value on a successful reply
pub const MSG_SUCCESS: u8 = 0x00;

/// Header size: start + command + frame id + status + count
pub const MSG_HEADER_SIZE: usize = 5;

/// Checksum trailer size
pub const MSG_CHECKSUM_SIZE: usize = 1;

/// Maximum payload bytes in one frame (count is a single byte)
pub const MSG_MAX_PAYLOAD_SIZE: usize = 255;

/// Byte offsets within a frame
pub const MSG_INDEX_START: usize = 0;
pub const MSG_INDEX_COMMAND: usize = 1;
pub const MSG_INDEX_FRAME: usize = 2;
pub const MSG_INDEX_STATUS: usize = 3;
pub const MSG_INDEX_COUNT: usize = 4;
pub const MSG_INDEX_DATA: usize = 5;

/// Total frame length for a given payload length
///
/// # Examples
///
/// ```
/// use btdaq::frame::protocol::frame_len;
///
/// assert_eq!(frame_len(0), 6);  // header + checksum only
/// assert_eq!(frame_len(8), 14);
/// ```
#[must_use]
pub fn frame_len(payload_len: usize) -> usize {
    MSG_HEADER_SIZE + payload_len + MSG_CHECKSUM_SIZE
}

/// Everything a reply frame must match to correlate with its request.
///
/// One record per in-flight exchange; the decoder validates an inbound frame
/// against it field by field instead of duplicating the conjunction per
/// command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyExpectation {
    /// Command opcode of the request (without the reply bit)
    pub command: u8,

    /// Frame id assigned to the request
    pub frame_id: u8,

    /// Declared reply payload length for this command
    pub reply_len: u8,
}
