//! # Reply Frame Decoder
//!
//! Validates inbound reply frames against the expectations recorded for the
//! matching request.

use crate::error::{BtdaqError, Result};

use super::checksum::{additive_checksum, complement};
use super::protocol::*;

/// Validate a reply frame and extract its payload
///
/// Checks run in a fixed order: total length, start marker, command (with
/// reply bit), frame id, status, payload count, checksum. The first failed
/// check aborts, carrying the reply's status byte whenever the frame was
/// long enough to contain one.
///
/// # Arguments
///
/// * `frame` - Complete reply frame bytes as read from the transport
/// * `expected` - Correlation record for the outstanding request
///
/// # Returns
///
/// * `Result<&[u8]>` - Reply payload slice, or the specific validation error
///
/// # Errors
///
/// Returns [`BtdaqError::FrameIntegrity`] on any structural or correlation
/// mismatch and [`BtdaqError::DeviceRejected`] when the device reported a
/// non-success status.
pub fn decode_frame<'a>(frame: &'a [u8], expected: &ReplyExpectation) -> Result<&'a [u8]> {
    let reply_len = expected.reply_len as usize;
    let total = frame_len(reply_len);

    // Status byte is the only diagnostic the instrument gives; surface it
    // whenever it is parseable, even from an otherwise malformed frame.
    let status = frame.get(MSG_INDEX_STATUS).copied();

    if frame.len() != total {
        return Err(BtdaqError::FrameIntegrity {
            reason: format!("length mismatch: expected {} bytes, got {}", total, frame.len()),
            status,
        });
    }

    if frame[MSG_INDEX_START] != MSG_START {
        return Err(BtdaqError::FrameIntegrity {
            reason: format!("invalid start marker: 0x{:02X}", frame[MSG_INDEX_START]),
            status,
        });
    }

    if frame[MSG_INDEX_COMMAND] != expected.command | MSG_REPLY {
        return Err(BtdaqError::FrameIntegrity {
            reason: format!(
                "command mismatch: expected 0x{:02X}, got 0x{:02X}",
                expected.command | MSG_REPLY,
                frame[MSG_INDEX_COMMAND]
            ),
            status,
        });
    }

    if frame[MSG_INDEX_FRAME] != expected.frame_id {
        return Err(BtdaqError::FrameIntegrity {
            reason: format!(
                "frame id mismatch: expected {}, got {}",
                expected.frame_id, frame[MSG_INDEX_FRAME]
            ),
            status,
        });
    }

    if frame[MSG_INDEX_STATUS] != MSG_SUCCESS {
        return Err(BtdaqError::DeviceRejected {
            status: frame[MSG_INDEX_STATUS],
        });
    }

    if frame[MSG_INDEX_COUNT] as usize != reply_len {
        return Err(BtdaqError::FrameIntegrity {
            reason: format!(
                "payload count mismatch: expected {}, got {}",
                reply_len, frame[MSG_INDEX_COUNT]
            ),
            status,
        });
    }

    let received_crc = frame[total - 1];
    let calculated_crc = complement(additive_checksum(&frame[..total - 1]));
    if received_crc != calculated_crc {
        return Err(BtdaqError::FrameIntegrity {
            reason: format!(
                "checksum mismatch: expected 0x{calculated_crc:02X}, got 0x{received_crc:02X}"
            ),
            status,
        });
    }

    Ok(&frame[MSG_INDEX_DATA..MSG_INDEX_DATA + reply_len])
}
