//! # Calibration Store
//!
//! Per-channel, per-gain calibration coefficients loaded once from the
//! device's nonvolatile calibration memory.
//!
//! The coefficients are stored on the device as IEEE-754 4-byte
//! little-endian floats, one (slope, intercept) pair per table cell:
//!
//! ```text
//! calibrated code = raw code * slope + intercept
//! ```
//!
//! Differential-mode pairs start at address 0x000 in gain-major order;
//! single-ended pairs start at 0x100; the factory calibration timestamp is
//! packed at 0x200. Once loaded, a table is immutable and freely shareable.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::error::{BtdaqError, Result};
use crate::session::{Command, Session};
use crate::transport::Transport;

/// Number of selectable input gain levels (differential mode only)
pub const NUM_GAINS: usize = 8;

/// Number of A/D differential channels
pub const NUM_CHANNELS_DIFF: usize = 4;

/// Number of A/D single-ended channels
pub const NUM_CHANNELS_SE: usize = 8;

/// Base address of the differential coefficient block
pub const CAL_BASE_DIFFERENTIAL: u16 = 0x000;

/// Base address of the single-ended coefficient block
pub const CAL_BASE_SINGLE_ENDED: u16 = 0x100;

/// Address of the factory calibration timestamp
pub const CAL_DATE_ADDRESS: u16 = 0x200;

/// One slope/intercept pair converting a raw code to a corrected code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalEntry {
    pub slope: f32,
    pub intercept: f32,
}

impl Default for CalEntry {
    /// Identity correction
    fn default() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }
}

impl CalEntry {
    /// Apply the affine correction to a raw code
    ///
    /// Deterministic and exact to f64 representation:
    /// `apply(code) == code * slope + intercept`.
    #[must_use]
    pub fn apply(&self, code: u16) -> f64 {
        f64::from(code) * f64::from(self.slope) + f64::from(self.intercept)
    }
}

/// Calibration coefficients for every input channel and gain
///
/// Built once at session start by [`CalTable::load`]; lookups are
/// bounds-checked and never clamped, since silently substituting the wrong
/// entry would corrupt measurement accuracy.
#[derive(Debug, Clone, PartialEq)]
pub struct CalTable {
    differential: [[CalEntry; NUM_GAINS]; NUM_CHANNELS_DIFF],
    single_ended: [CalEntry; NUM_CHANNELS_SE],
}

impl CalTable {
    /// Load both coefficient blocks from the device
    ///
    /// Issues one 4-byte calibration-memory read per coefficient: slope then
    /// intercept for each cell, gain-major across the differential block,
    /// then channel order across the single-ended block. Any protocol error
    /// aborts the load; a partial table is never returned.
    ///
    /// # Errors
    ///
    /// Propagates the first [`BtdaqError`] from the underlying exchanges.
    pub async fn load<T: Transport>(session: &mut Session<T>) -> Result<Self> {
        debug!("loading calibration tables from device memory");

        let mut differential = [[CalEntry::default(); NUM_GAINS]; NUM_CHANNELS_DIFF];
        let mut address = CAL_BASE_DIFFERENTIAL;
        for gain in 0..NUM_GAINS {
            for channel in 0..NUM_CHANNELS_DIFF {
                let slope = read_coefficient(session, address).await?;
                address += 4;
                let intercept = read_coefficient(session, address).await?;
                address += 4;
                differential[channel][gain] = CalEntry { slope, intercept };
            }
        }

        let mut single_ended = [CalEntry::default(); NUM_CHANNELS_SE];
        let mut address = CAL_BASE_SINGLE_ENDED;
        for channel in 0..NUM_CHANNELS_SE {
            let slope = read_coefficient(session, address).await?;
            address += 4;
            let intercept = read_coefficient(session, address).await?;
            address += 4;
            single_ended[channel] = CalEntry { slope, intercept };
        }

        info!(
            diff_cells = NUM_CHANNELS_DIFF * NUM_GAINS,
            se_cells = NUM_CHANNELS_SE,
            "calibration tables loaded"
        );

        Ok(Self {
            differential,
            single_ended,
        })
    }

    /// Look up the differential-mode entry for a channel and gain
    ///
    /// # Errors
    ///
    /// Returns [`BtdaqError::Index`] outside the configured bounds.
    pub fn differential(&self, channel: usize, gain: usize) -> Result<CalEntry> {
        if channel >= NUM_CHANNELS_DIFF {
            return Err(BtdaqError::Index {
                kind: "differential channel",
                index: channel,
                limit: NUM_CHANNELS_DIFF,
            });
        }
        if gain >= NUM_GAINS {
            return Err(BtdaqError::Index {
                kind: "gain",
                index: gain,
                limit: NUM_GAINS,
            });
        }
        Ok(self.differential[channel][gain])
    }

    /// Look up the single-ended entry for a channel
    ///
    /// # Errors
    ///
    /// Returns [`BtdaqError::Index`] outside the configured bounds.
    pub fn single_ended(&self, channel: usize) -> Result<CalEntry> {
        if channel >= NUM_CHANNELS_SE {
            return Err(BtdaqError::Index {
                kind: "single-ended channel",
                index: channel,
                limit: NUM_CHANNELS_SE,
            });
        }
        Ok(self.single_ended[channel])
    }

    /// Table of identity corrections, for use before a load has run
    #[must_use]
    pub fn identity() -> Self {
        Self {
            differential: [[CalEntry::default(); NUM_GAINS]; NUM_CHANNELS_DIFF],
            single_ended: [CalEntry::default(); NUM_CHANNELS_SE],
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        differential: [[CalEntry; NUM_GAINS]; NUM_CHANNELS_DIFF],
        single_ended: [CalEntry; NUM_CHANNELS_SE],
    ) -> Self {
        Self {
            differential,
            single_ended,
        }
    }
}

/// Read one IEEE-754 float from calibration memory
async fn read_coefficient<T: Transport>(session: &mut Session<T>, address: u16) -> Result<f32> {
    let request = [address as u8, (address >> 8) as u8, 4];
    let reply = session
        .issue(Command::CalMemoryRead.opcode(), &request, 4)
        .await?;
    Ok(f32::from_le_bytes([reply[0], reply[1], reply[2], reply[3]]))
}

/// Read the factory calibration timestamp from calibration memory
///
/// Stored as six packed bytes at [`CAL_DATE_ADDRESS`]: year since 2000,
/// month, day, hour, minute, second.
///
/// # Errors
///
/// Propagates exchange errors; a byte sequence that does not form a valid
/// date is reported as a frame integrity error.
pub async fn read_cal_date<T: Transport>(session: &mut Session<T>) -> Result<NaiveDateTime> {
    let request = [CAL_DATE_ADDRESS as u8, (CAL_DATE_ADDRESS >> 8) as u8, 6];
    let reply = session
        .issue(Command::CalMemoryRead.opcode(), &request, 6)
        .await?;

    let [year, month, day, hour, minute, second] = [
        reply[0], reply[1], reply[2], reply[3], reply[4], reply[5],
    ];

    chrono::NaiveDate::from_ymd_opt(2000 + i32::from(year), u32::from(month), u32::from(day))
        .and_then(|d| d.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
        .ok_or_else(|| BtdaqError::FrameIntegrity {
            reason: format!(
                "calibration date bytes out of range: {year:02}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
            ),
            status: None,
        })
}
