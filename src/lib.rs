//! # btdaq
//!
//! Command/response protocol layer for the MCC BTH-1208LS wireless data
//! acquisition device.
//!
//! The crate is layered bottom-up:
//!
//! - [`frame`] - framing, checksum, encode and validate-decode
//! - [`transport`] - the serial link and the [`transport::Transport`] seam
//! - [`session`] - the frame-id sequencer running one exchange at a time
//! - [`calibration`] / [`units`] - coefficient tables and code-to-volts
//!   conversion
//! - [`device`] - typed wrappers for every device command
//!
//! ```no_run
//! use btdaq::device::Bth1208ls;
//! use btdaq::transport::SerialTransport;
//! use btdaq::units::{AnalogMode, AnalogRange};
//!
//! # async fn run() -> btdaq::error::Result<()> {
//! let transport = SerialTransport::open()?;
//! let mut device = Bth1208ls::connect(transport).await?;
//! let volts = device
//!     .ain_volts(0, AnalogMode::Differential, AnalogRange::Bipolar10V)
//!     .await?;
//! println!("channel 0: {volts:.4} V");
//! # Ok(())
//! # }
//! ```

pub mod calibration;
pub mod config;
pub mod device;
pub mod error;
pub mod frame;
pub mod session;
pub mod transport;
pub mod units;

pub use device::Bth1208ls;
pub use error::{BtdaqError, Result};
pub use session::Session;
pub use transport::{SerialTransport, Transport};
