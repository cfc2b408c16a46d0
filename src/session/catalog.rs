//! # Command Catalog
//!
//! Opcodes and nominal payload sizes for every supported command.
//!
//! The sequencer itself is command-agnostic; this table is what a wrapper
//! consults to instantiate one exchange. Memory commands carry a
//! caller-chosen byte count, so their sizes are `None` here and supplied at
//! call time.

/// Command opcodes for the BTH-1208LS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Read the current state of the DIO pins
    DIn = 0x00,
    /// Read the DIO output latch value
    DOutRead = 0x02,
    /// Write the DIO output latch value
    DOutWrite = 0x03,
    /// Read an analog input channel
    AIn = 0x10,
    /// Read both analog output channels
    AOutRead = 0x20,
    /// Write an analog output channel
    AOutWrite = 0x21,
    /// Read the event counter
    CounterRead = 0x30,
    /// Reset the event counter
    CounterReset = 0x31,
    /// Read calibration memory
    CalMemoryRead = 0x40,
    /// Read user memory
    UserMemoryRead = 0x42,
    /// Write user memory
    UserMemoryWrite = 0x43,
    /// Read settings memory
    SettingsMemoryRead = 0x44,
    /// Write settings memory
    SettingsMemoryWrite = 0x45,
    /// Blink the power LED
    BlinkLed = 0x50,
    /// Reset the device
    Reset = 0x51,
    /// Read device status
    Status = 0x52,
    /// Read the serial number
    SerialNumber = 0x54,
    /// Check device communications
    Ping = 0x55,
    /// Read the firmware version (packed BCD)
    FirmwareVersion = 0x56,
    /// Read the battery voltage in millivolts
    BatteryVoltage = 0x58,
    /// Read the radio firmware version (packed BCD)
    RadioFirmwareVersion = 0x5A,
}

impl Command {
    /// Wire opcode (reply bit clear)
    #[must_use]
    pub fn opcode(self) -> u8 {
        self as u8
    }

    /// Nominal request payload size, `None` when the size depends on the
    /// caller (memory transactions)
    #[must_use]
    pub fn request_len(self) -> Option<u8> {
        match self {
            Command::DIn
            | Command::DOutRead
            | Command::AOutRead
            | Command::CounterRead
            | Command::CounterReset
            | Command::Reset
            | Command::Status
            | Command::SerialNumber
            | Command::Ping
            | Command::FirmwareVersion
            | Command::BatteryVoltage
            | Command::RadioFirmwareVersion => Some(0),
            Command::DOutWrite | Command::BlinkLed => Some(1),
            Command::AIn | Command::AOutWrite => Some(3),
            // address (2) + count (1)
            Command::CalMemoryRead
            | Command::UserMemoryRead
            | Command::SettingsMemoryRead => Some(3),
            // address (2) + data (N)
            Command::UserMemoryWrite | Command::SettingsMemoryWrite => None,
        }
    }

    /// Nominal reply payload size, `None` when the size depends on the
    /// caller (memory reads echo the requested count)
    #[must_use]
    pub fn reply_len(self) -> Option<u8> {
        match self {
            Command::DOutWrite
            | Command::AOutWrite
            | Command::CounterReset
            | Command::UserMemoryWrite
            | Command::SettingsMemoryWrite
            | Command::BlinkLed
            | Command::Reset
            | Command::Ping => Some(0),
            Command::DIn | Command::DOutRead => Some(1),
            Command::AIn
            | Command::Status
            | Command::FirmwareVersion
            | Command::BatteryVoltage
            | Command::RadioFirmwareVersion => Some(2),
            Command::AOutRead | Command::CounterRead => Some(4),
            Command::SerialNumber => Some(8),
            Command::CalMemoryRead
            | Command::UserMemoryRead
            | Command::SettingsMemoryRead => None,
        }
    }
}
