//! Trait abstraction for the duplex byte channel to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;

/// Duplex byte channel carrying one protocol frame per exchange.
///
/// No ordering or buffering guarantees beyond in-order delivery of bytes on
/// one physical link. `receive` must honor the caller-supplied timeout and
/// return `io::ErrorKind::TimedOut` instead of blocking indefinitely; the
/// session layer relies on this to bound exchange latency.
#[async_trait]
pub trait Transport: Send {
    /// Write one complete frame to the channel
    async fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Wait up to `timeout` for the next inbound frame
    async fn receive(&mut self, timeout: Duration) -> io::Result<Vec<u8>>;
}
