//! # btdaq
//!
//! Connect to a BTH-1208LS over its serial link, identify it, and poll a few
//! readings until interrupted.

use std::time::Duration;

use anyhow::Result;
use tokio::time::interval;
use tracing::{info, warn};

use btdaq::config::Config;
use btdaq::device::Bth1208ls;
use btdaq::transport::SerialTransport;
use btdaq::units::{AnalogMode, AnalogRange};
use btdaq::Session;

/// Configuration file consulted when present
const CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("btdaq v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            info!("no usable config at {CONFIG_PATH} ({e}), using defaults");
            Config::default()
        }
    };

    let transport = match &config.transport.port {
        Some(port) => SerialTransport::open_path(port, config.transport.baud_rate)?,
        None => SerialTransport::open()?,
    };
    info!("serial port opened at: {}", transport.device_path());

    let session = Session::with_timeout(
        transport,
        Duration::from_millis(config.transport.timeout_ms),
    );
    let mut device = if config.device.load_calibration {
        Bth1208ls::from_session(session).await?
    } else {
        info!("calibration load disabled; using identity coefficients");
        Bth1208ls::from_session_uncalibrated(session)
    };

    info!("serial number: {}", device.serial_number().await?);
    info!("firmware: {}", device.firmware_version().await?);
    info!("radio firmware: {}", device.radio_firmware_version().await?);
    info!("calibrated: {}", device.cal_date().await?);
    info!("battery: {} mV", device.battery_voltage_mv().await?);

    let mut poll = interval(Duration::from_millis(config.device.poll_interval_ms));

    info!("polling channel 0; press Ctrl+C to exit");

    loop {
        tokio::select! {
            _ = poll.tick() => {
                match device
                    .ain_volts(0, AnalogMode::Differential, AnalogRange::Bipolar10V)
                    .await
                {
                    Ok(volts) => info!("channel 0: {volts:.4} V"),
                    Err(e) => warn!("read failed: {e}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    Ok(())
}
