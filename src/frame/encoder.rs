//! # Request Frame Encoder
//!
//! Lays out command request frames for the BTH-series protocol.

use bytes::{BufMut, BytesMut};

use super::checksum::{additive_checksum, complement};
use super::protocol::*;

/// Encode a command request into a complete wire frame
///
/// Always succeeds for payloads of at most [`MSG_MAX_PAYLOAD_SIZE`] bytes;
/// the caller enforces that bound before encoding (a longer payload is a
/// usage error rejected at the session layer).
///
/// # Arguments
///
/// * `command` - Command opcode (reply bit clear)
/// * `frame_id` - Sequence number assigned by the session
/// * `payload` - Command-specific data, at most 255 bytes
///
/// # Returns
///
/// * `Vec<u8>` - Complete frame: header + payload + checksum
///
/// # Examples
///
/// ```
/// use btdaq::frame::encoder::encode_frame;
///
/// let frame = encode_frame(0x00, 5, &[]);
/// assert_eq!(frame.len(), 6);
/// assert_eq!(frame[0], 0xDB);
/// ```
pub fn encode_frame(command: u8, frame_id: u8, payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= MSG_MAX_PAYLOAD_SIZE);

    let mut frame = BytesMut::with_capacity(frame_len(payload.len()));
    frame.put_u8(MSG_START);
    frame.put_u8(command);
    frame.put_u8(frame_id);
    frame.put_u8(MSG_SUCCESS);
    frame.put_u8(payload.len() as u8);
    frame.put_slice(payload);

    // Checksum covers everything before it
    let crc = complement(additive_checksum(&frame));
    frame.put_u8(crc);

    frame.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty_payload_layout() {
        let frame = encode_frame(0x00, 5, &[]);

        assert_eq!(frame.len(), 6);
        assert_eq!(frame[MSG_INDEX_START], MSG_START);
        assert_eq!(frame[MSG_INDEX_COMMAND], 0x00);
        assert_eq!(frame[MSG_INDEX_FRAME], 5);
        assert_eq!(frame[MSG_INDEX_STATUS], MSG_SUCCESS);
        assert_eq!(frame[MSG_INDEX_COUNT], 0);
    }

    #[test]
    fn test_encode_payload_placement() {
        let frame = encode_frame(0x21, 0, &[0x01, 0x34, 0x02]);

        assert_eq!(frame.len(), 9);
        assert_eq!(frame[MSG_INDEX_COUNT], 3);
        assert_eq!(&frame[MSG_INDEX_DATA..MSG_INDEX_DATA + 3], &[0x01, 0x34, 0x02]);
    }

    #[test]
    fn test_encode_checksum_invariant() {
        // Sum of every byte including the checksum must equal 0xFF mod 256
        let cases: [(u8, u8, Vec<u8>); 4] = [
            (0x00, 0, vec![]),
            (0x50, 17, vec![0x03]),
            (0x40, 254, vec![0x00, 0x01, 0x04]),
            (0x43, 255, vec![0xAA; 255]),
        ];

        for (command, frame_id, payload) in cases {
            let frame = encode_frame(command, frame_id, &payload);
            let total = additive_checksum(&frame);
            assert_eq!(total, 0xFF, "checksum invariant broken for cmd 0x{command:02X}");
        }
    }

    #[test]
    fn test_encode_max_payload_length() {
        let frame = encode_frame(0x43, 0, &[0u8; MSG_MAX_PAYLOAD_SIZE]);
        assert_eq!(frame.len(), frame_len(MSG_MAX_PAYLOAD_SIZE));
        assert_eq!(frame[MSG_INDEX_COUNT], 255);
    }

    #[test]
    fn test_encode_different_frames_different_checksum() {
        let frame1 = encode_frame(0x00, 0, &[]);
        let frame2 = encode_frame(0x00, 1, &[]);
        assert_ne!(frame1[5], frame2[5]);
    }
}
