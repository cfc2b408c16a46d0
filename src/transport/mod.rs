//! # Transport Module
//!
//! Concrete byte-channel to the instrument.
//!
//! This module handles:
//! - Opening the serial device carrying the RFCOMM/USB bridge (8N1)
//! - Async framed read/write with a bounded receive timeout
//! - A [`Transport`] trait seam so the protocol layers are testable without
//!   hardware

pub mod link;

pub use link::Transport;

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{BtdaqError, Result};
use crate::frame::protocol::{
    frame_len, MSG_HEADER_SIZE, MSG_INDEX_COUNT, MSG_MAX_PAYLOAD_SIZE,
};

/// Default baud rate for the RFCOMM serial bridge
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/rfcomm0", // bound Bluetooth RFCOMM channel
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Serial transport to a BTH-series instrument
///
/// Owns the open port for the lifetime of one session.
pub struct SerialTransport {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/rfcomm0)
    device_path: String,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    /// Open a connection, auto-detecting the device from common paths
    ///
    /// # Errors
    ///
    /// Returns [`BtdaqError::DeviceNotFound`] if none of the candidate
    /// paths opens.
    pub fn open() -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, DEFAULT_BAUD_RATE)
    }

    /// Open a connection trying each path in turn
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/rfcomm0"])
    /// * `baud_rate` - Line speed for the bridge
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open device: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened device at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(BtdaqError::DeviceNotFound(paths.join(", ")))
    }

    /// Open a specific device path
    pub fn open_path(path: &str, baud_rate: u32) -> Result<Self> {
        let port = Self::open_port(path, baud_rate)?;
        info!("Successfully opened device at {}", path);
        Ok(Self {
            port,
            device_path: path.to_string(),
        })
    }

    /// Open a serial port with protocol settings (8N1, no flow control)
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| BtdaqError::Transport(format!("Failed to open {path}: {e}")))?;

        Ok(port)
    }

    /// Get the device path of the opened port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;

        self.port.write_all(frame).await?;
        self.port.flush().await?;

        debug!("Sent frame ({} bytes)", frame.len());
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> io::Result<Vec<u8>> {
        match tokio::time::timeout(timeout, read_frame(&mut self.port)).await {
            Ok(Ok(frame)) => {
                debug!("Received frame ({} bytes)", frame.len());
                Ok(frame)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "receive timed out",
            )),
        }
    }
}

/// Read one complete frame, reassembling across fragmented reads
///
/// The RFCOMM bridge may deliver a reply in several chunks. Reads accumulate
/// until the header is in, then until the count byte's worth of payload and
/// the checksum have arrived. The caller bounds the whole loop with a
/// timeout.
async fn read_frame<R>(port: &mut R) -> io::Result<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;

    // Largest frame the protocol can produce
    let mut buf = vec![0u8; frame_len(MSG_MAX_PAYLOAD_SIZE)];
    let mut filled = 0;

    loop {
        let needed = if filled >= MSG_HEADER_SIZE {
            frame_len(buf[MSG_INDEX_COUNT] as usize)
        } else {
            MSG_HEADER_SIZE
        };
        if filled >= needed {
            buf.truncate(needed);
            return Ok(buf);
        }

        let n = port.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "device closed the connection",
            ));
        }
        filled += n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BAUD_RATE, 115_200);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/rfcomm0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = SerialTransport::open_with_paths(invalid_paths, DEFAULT_BAUD_RATE);

        assert!(result.is_err());
        match result.unwrap_err() {
            BtdaqError::DeviceNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected DeviceNotFound error, got: {other:?}"),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = SerialTransport::open_with_paths(empty_paths, DEFAULT_BAUD_RATE);
        assert!(matches!(result, Err(BtdaqError::DeviceNotFound(_))));
    }

    #[test]
    fn test_open_path_with_invalid_path_returns_error() {
        let result = SerialTransport::open_path("/dev/nonexistent_daq_device_12345", 115_200);

        assert!(result.is_err());
        match result.unwrap_err() {
            BtdaqError::Transport(msg) => {
                assert!(msg.contains("/dev/nonexistent_daq_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Transport error, got: {other:?}"),
        }
    }

    /// Well-formed reply frame bytes for the read tests
    fn reply_bytes(command: u8, frame_id: u8, payload: &[u8]) -> Vec<u8> {
        use crate::frame::checksum::{additive_checksum, complement};
        use crate::frame::protocol::{MSG_REPLY, MSG_START};

        let mut frame = vec![
            MSG_START,
            command | MSG_REPLY,
            frame_id,
            0x00,
            payload.len() as u8,
        ];
        frame.extend_from_slice(payload);
        frame.push(complement(additive_checksum(&frame)));
        frame
    }

    #[tokio::test]
    async fn test_read_frame_single_delivery() {
        use tokio::io::AsyncWriteExt;

        let frame = reply_bytes(0x30, 7, &[0x10, 0x27, 0x00, 0x00]);
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(&frame).await.unwrap();

        let got = read_frame(&mut rx).await.unwrap();
        assert_eq!(got, frame);
    }

    #[tokio::test]
    async fn test_read_frame_reassembles_fragmented_reply() {
        use tokio::io::AsyncWriteExt;

        let frame = reply_bytes(0x54, 3, b"00000001");
        let (mut tx, mut rx) = tokio::io::duplex(64);

        // Deliver the frame in three chunks, split inside the header and
        // inside the payload
        let (a, rest) = frame.split_at(3);
        let (b, c) = rest.split_at(6);
        let chunks = [a.to_vec(), b.to_vec(), c.to_vec()];
        let writer = tokio::spawn(async move {
            for chunk in chunks {
                tx.write_all(&chunk).await.unwrap();
                tx.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            tx
        });

        let got = read_frame(&mut rx).await.unwrap();
        assert_eq!(got, frame);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_frame_eof_mid_frame() {
        use tokio::io::AsyncWriteExt;

        let frame = reply_bytes(0x00, 0, &[0x0F]);
        let (mut tx, mut rx) = tokio::io::duplex(64);
        tx.write_all(&frame[..4]).await.unwrap();
        drop(tx); // connection closed before the frame completed

        let err = read_frame(&mut rx).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_mock_transport_scripted_exchange() {
        use link::mocks::MockTransport;

        let mock = MockTransport::new();
        mock.queue_reply(0x00, 0, 0, &[0x0F]);
        mock.queue_timeout();

        let mut handle = mock.clone();
        handle.send(&[0xDB, 0x00]).await.unwrap();

        let reply = handle.receive(Duration::from_millis(10)).await.unwrap();
        assert_eq!(reply[1], 0x80); // reply bit set
        assert_eq!(reply[5], 0x0F);

        let timeout = handle.receive(Duration::from_millis(10)).await;
        assert_eq!(timeout.unwrap_err().kind(), io::ErrorKind::TimedOut);

        assert_eq!(mock.sent_frames().len(), 1);
    }
}
