//! # BTH-1208LS Device Commands
//!
//! Typed wrappers around the command catalog, one thin instantiation of
//! [`Session::issue`] per device command.
//!
//! Every wrapper validates its arguments before any transport I/O and
//! propagates protocol failures as typed errors; no command ever returns
//! stale or default data after a failed exchange.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::calibration::{
    read_cal_date, CalTable, NUM_CHANNELS_DIFF, NUM_CHANNELS_SE,
};
use crate::error::{BtdaqError, Result};
use crate::session::{Command, Session};
use crate::transport::Transport;
use crate::units::{AnalogMode, AnalogRange, ConversionModel, Resolution};

/// Number of 12-bit 0-2.5V analog output channels
pub const NUM_CHANNELS_AOUT: usize = 2;

/// Largest writable DAC code (12-bit)
pub const AOUT_MAX_CODE: u16 = 0xFFF;

/// Nonvolatile memory regions addressable by the memory commands
///
/// All are addressed by a 16-bit offset with at most 255 bytes per
/// transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryRegion {
    /// Calibration memory, 768 bytes (0x000 - 0x2FF), read-only
    Calibration,
    /// User memory, 256 bytes (0x00 - 0xFF)
    User,
    /// Settings memory, 1024 bytes (0x000 - 0x3FF)
    Settings,
}

impl MemoryRegion {
    fn name(self) -> &'static str {
        match self {
            MemoryRegion::Calibration => "calibration memory",
            MemoryRegion::User => "user memory",
            MemoryRegion::Settings => "settings memory",
        }
    }

    fn last_address(self) -> u16 {
        match self {
            MemoryRegion::Calibration => 0x2FF,
            MemoryRegion::User => 0xFF,
            MemoryRegion::Settings => 0x3FF,
        }
    }

    /// Reject a transaction that starts or ends outside the region
    fn check(self, address: u16, count: usize) -> Result<()> {
        let last = self.last_address();
        if address > last {
            return Err(BtdaqError::Range(format!(
                "{} address 0x{address:03X} exceeds region bound 0x{last:03X}",
                self.name()
            )));
        }
        if count > 0 && usize::from(address) + count - 1 > usize::from(last) {
            return Err(BtdaqError::Range(format!(
                "{} access of {count} bytes at 0x{address:03X} runs past 0x{last:03X}",
                self.name()
            )));
        }
        Ok(())
    }
}

/// Device status word
///
/// Reply of the status command: bit 1 = AIn scan running, bit 2 = AIn scan
/// overrun, bits 8-10 = charger status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatus {
    pub raw: u16,
}

/// Charger state reported in status bits 8-10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargerStatus {
    NoBattery,
    FastCharge,
    MaintenanceCharge,
    Fault,
    Disabled,
    Reserved(u8),
}

impl DeviceStatus {
    #[must_use]
    pub fn ain_scan_running(self) -> bool {
        self.raw & (1 << 1) != 0
    }

    #[must_use]
    pub fn ain_scan_overrun(self) -> bool {
        self.raw & (1 << 2) != 0
    }

    #[must_use]
    pub fn charger(self) -> ChargerStatus {
        match ((self.raw >> 8) & 0x7) as u8 {
            0 => ChargerStatus::NoBattery,
            1 => ChargerStatus::FastCharge,
            2 => ChargerStatus::MaintenanceCharge,
            3 => ChargerStatus::Fault,
            4 => ChargerStatus::Disabled,
            other => ChargerStatus::Reserved(other),
        }
    }
}

/// Firmware version in packed BCD, e.g. 0x0215 is "2.15"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub bcd: u16,
}

impl std::fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:x}.{:02x}", self.bcd >> 8, self.bcd & 0xFF)
    }
}

/// One connected BTH-1208LS
///
/// Owns the session and the calibration tables loaded at connect time.
pub struct Bth1208ls<T: Transport> {
    session: Session<T>,
    cal: CalTable,
}

impl<T: Transport> Bth1208ls<T> {
    /// Connect over an open transport and load the calibration tables
    ///
    /// # Errors
    ///
    /// Fails if the calibration load fails; a device without usable
    /// calibration is not exposed.
    pub async fn connect(transport: T) -> Result<Self> {
        Self::from_session(Session::new(transport)).await
    }

    /// Connect over a pre-configured session
    pub async fn from_session(mut session: Session<T>) -> Result<Self> {
        let cal = CalTable::load(&mut session).await?;
        info!("device connected and calibrated");
        Ok(Self { session, cal })
    }

    /// Connect without loading calibration; identity coefficients are used
    /// until [`Bth1208ls::reload_calibration`] runs
    pub fn from_session_uncalibrated(session: Session<T>) -> Self {
        Self {
            session,
            cal: CalTable::identity(),
        }
    }

    /// Loaded calibration tables
    #[must_use]
    pub fn calibration(&self) -> &CalTable {
        &self.cal
    }

    /// Re-read the calibration tables from device memory
    pub async fn reload_calibration(&mut self) -> Result<()> {
        self.cal = CalTable::load(&mut self.session).await?;
        Ok(())
    }

    /// Access the underlying session (timeout adjustment, raw commands)
    pub fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }

    // ------------------------------------------------------------------
    // Digital I/O
    // ------------------------------------------------------------------

    /// Read the current state of the DIO pins
    ///
    /// A 0 bit reads a low state, a 1 bit a high state.
    pub async fn din(&mut self) -> Result<u8> {
        let reply = self.session.issue_command(Command::DIn, &[]).await?;
        Ok(reply[0])
    }

    /// Read the DIO output latch value
    pub async fn dout_read(&mut self) -> Result<u8> {
        let reply = self.session.issue_command(Command::DOutRead, &[]).await?;
        Ok(reply[0])
    }

    /// Write the DIO output latch value
    ///
    /// Writing a 0 bit drives the pin low, a 1 bit lets it float.
    pub async fn dout_write(&mut self, value: u8) -> Result<()> {
        self.session
            .issue_command(Command::DOutWrite, &[value])
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Analog input
    // ------------------------------------------------------------------

    /// Read one analog input channel, returning the raw 12-bit code
    ///
    /// Differential mode supports channels 0-3 with a selectable bipolar
    /// range; single-ended mode supports channels 0-7.
    pub async fn ain(
        &mut self,
        channel: u8,
        mode: AnalogMode,
        range: AnalogRange,
    ) -> Result<u16> {
        self.check_ain_args(channel, mode, range)?;

        let request = [channel, mode as u8, range.code()];
        let reply = self.session.issue_command(Command::AIn, &request).await?;
        Ok(u16::from_le_bytes([reply[0], reply[1]]))
    }

    /// Read one analog input channel converted to volts
    ///
    /// Applies the channel's loaded calibration entry, then the range
    /// transform.
    pub async fn ain_volts(
        &mut self,
        channel: u8,
        mode: AnalogMode,
        range: AnalogRange,
    ) -> Result<f64> {
        let code = self.ain(channel, mode, range).await?;

        let entry = match mode {
            AnalogMode::Differential => {
                // check_ain_args already established the range is bipolar
                let gain = range.gain_index().ok_or_else(|| {
                    BtdaqError::Range(format!(
                        "range 0x{:02X} is not a differential gain",
                        range.code()
                    ))
                })?;
                self.cal.differential(usize::from(channel), gain)?
            }
            AnalogMode::SingleEnded => self.cal.single_ended(usize::from(channel))?,
        };

        let model = ConversionModel::Calibrated {
            entry,
            range,
            resolution: Resolution::Bits12,
        };
        Ok(model.to_volts(u32::from(code)))
    }

    fn check_ain_args(&self, channel: u8, mode: AnalogMode, range: AnalogRange) -> Result<()> {
        let limit = match mode {
            AnalogMode::Differential => NUM_CHANNELS_DIFF,
            AnalogMode::SingleEnded => NUM_CHANNELS_SE,
        };
        if usize::from(channel) >= limit {
            return Err(BtdaqError::Index {
                kind: "analog input channel",
                index: usize::from(channel),
                limit,
            });
        }
        if mode == AnalogMode::Differential && !range.is_bipolar() {
            return Err(BtdaqError::Range(format!(
                "range 0x{:02X} is not valid in differential mode",
                range.code()
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Analog output
    // ------------------------------------------------------------------

    /// Read the current raw codes of both analog output channels
    pub async fn aout_read(&mut self) -> Result<[u16; 2]> {
        let reply = self.session.issue_command(Command::AOutRead, &[]).await?;
        Ok([
            u16::from_le_bytes([reply[0], reply[1]]),
            u16::from_le_bytes([reply[2], reply[3]]),
        ])
    }

    /// Write a raw 12-bit code to an analog output channel
    pub async fn aout_write(&mut self, channel: u8, value: u16) -> Result<()> {
        if usize::from(channel) >= NUM_CHANNELS_AOUT {
            return Err(BtdaqError::Index {
                kind: "analog output channel",
                index: usize::from(channel),
                limit: NUM_CHANNELS_AOUT,
            });
        }
        if value > AOUT_MAX_CODE {
            return Err(BtdaqError::Range(format!(
                "analog output value {value} exceeds {AOUT_MAX_CODE}"
            )));
        }

        let request = [channel, value as u8, (value >> 8) as u8];
        self.session
            .issue_command(Command::AOutWrite, &request)
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Event counter
    // ------------------------------------------------------------------

    /// Read the event counter
    pub async fn counter(&mut self) -> Result<u32> {
        let reply = self
            .session
            .issue_command(Command::CounterRead, &[])
            .await?;
        Ok(u32::from_le_bytes([reply[0], reply[1], reply[2], reply[3]]))
    }

    /// Reset the event counter to 0
    pub async fn reset_counter(&mut self) -> Result<()> {
        self.session
            .issue_command(Command::CounterReset, &[])
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Nonvolatile memory
    // ------------------------------------------------------------------

    /// Read from calibration memory (768 bytes, 0x000 - 0x2FF)
    pub async fn cal_memory_read(&mut self, address: u16, count: u8) -> Result<Vec<u8>> {
        self.memory_read(MemoryRegion::Calibration, Command::CalMemoryRead, address, count)
            .await
    }

    /// Read from user memory (256 bytes, 0x00 - 0xFF)
    pub async fn user_memory_read(&mut self, address: u16, count: u8) -> Result<Vec<u8>> {
        self.memory_read(MemoryRegion::User, Command::UserMemoryRead, address, count)
            .await
    }

    /// Write to user memory (256 bytes, 0x00 - 0xFF)
    pub async fn user_memory_write(&mut self, address: u16, data: &[u8]) -> Result<()> {
        self.memory_write(MemoryRegion::User, Command::UserMemoryWrite, address, data)
            .await
    }

    /// Read from settings memory (1024 bytes, 0x000 - 0x3FF)
    pub async fn settings_memory_read(&mut self, address: u16, count: u8) -> Result<Vec<u8>> {
        self.memory_read(
            MemoryRegion::Settings,
            Command::SettingsMemoryRead,
            address,
            count,
        )
        .await
    }

    /// Write to settings memory (1024 bytes, 0x000 - 0x3FF)
    ///
    /// Settings take effect immediately.
    pub async fn settings_memory_write(&mut self, address: u16, data: &[u8]) -> Result<()> {
        self.memory_write(
            MemoryRegion::Settings,
            Command::SettingsMemoryWrite,
            address,
            data,
        )
        .await
    }

    /// Read the factory calibration timestamp
    pub async fn cal_date(&mut self) -> Result<NaiveDateTime> {
        read_cal_date(&mut self.session).await
    }

    async fn memory_read(
        &mut self,
        region: MemoryRegion,
        command: Command,
        address: u16,
        count: u8,
    ) -> Result<Vec<u8>> {
        region.check(address, usize::from(count))?;

        let request = [address as u8, (address >> 8) as u8, count];
        self.session.issue(command.opcode(), &request, count).await
    }

    async fn memory_write(
        &mut self,
        region: MemoryRegion,
        command: Command,
        address: u16,
        data: &[u8],
    ) -> Result<()> {
        region.check(address, data.len())?;
        // Request payload is address (2) + data, and must fit one frame
        if data.len() > 253 {
            return Err(BtdaqError::Range(format!(
                "{} write of {} bytes exceeds the 253-byte transaction limit",
                region.name(),
                data.len()
            )));
        }

        let mut request = Vec::with_capacity(2 + data.len());
        request.push(address as u8);
        request.push((address >> 8) as u8);
        request.extend_from_slice(data);

        self.session.issue(command.opcode(), &request, 0).await?;
        debug!(
            region = region.name(),
            address, len = data.len(), "memory write complete"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Miscellaneous
    // ------------------------------------------------------------------

    /// Blink the power LED `count` times
    pub async fn blink_led(&mut self, count: u8) -> Result<()> {
        self.session
            .issue_command(Command::BlinkLed, &[count])
            .await?;
        Ok(())
    }

    /// Reset the device
    pub async fn reset(&mut self) -> Result<()> {
        self.session.issue_command(Command::Reset, &[]).await?;
        Ok(())
    }

    /// Read the device status word
    pub async fn status(&mut self) -> Result<DeviceStatus> {
        let reply = self.session.issue_command(Command::Status, &[]).await?;
        Ok(DeviceStatus {
            raw: u16::from_le_bytes([reply[0], reply[1]]),
        })
    }

    /// Check device communications
    ///
    /// Repetitive use drains the battery; not recommended as a keepalive.
    pub async fn ping(&mut self) -> Result<()> {
        self.session.issue_command(Command::Ping, &[]).await?;
        Ok(())
    }

    /// Read the 8-byte serial number, typically ASCII digits
    pub async fn serial_number(&mut self) -> Result<String> {
        let reply = self
            .session
            .issue_command(Command::SerialNumber, &[])
            .await?;
        Ok(String::from_utf8_lossy(&reply)
            .trim_end_matches('\0')
            .to_string())
    }

    /// Read the firmware version
    pub async fn firmware_version(&mut self) -> Result<FirmwareVersion> {
        let reply = self
            .session
            .issue_command(Command::FirmwareVersion, &[])
            .await?;
        Ok(FirmwareVersion {
            bcd: u16::from_le_bytes([reply[0], reply[1]]),
        })
    }

    /// Read the radio firmware version
    pub async fn radio_firmware_version(&mut self) -> Result<FirmwareVersion> {
        let reply = self
            .session
            .issue_command(Command::RadioFirmwareVersion, &[])
            .await?;
        Ok(FirmwareVersion {
            bcd: u16::from_le_bytes([reply[0], reply[1]]),
        })
    }

    /// Read the battery voltage in millivolts
    pub async fn battery_voltage_mv(&mut self) -> Result<u16> {
        let reply = self
            .session
            .issue_command(Command::BatteryVoltage, &[])
            .await?;
        Ok(u16::from_le_bytes([reply[0], reply[1]]))
    }
}
