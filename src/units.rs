//! # Unit Converter
//!
//! Pure conversions between raw converter codes and volts.
//!
//! Two numeric models coexist and are kept as an explicit selector rather
//! than inferred from populated fields:
//!
//! - **Range table**: the fixed analytic transform for a selectable input
//!   range, e.g. `volts = (code - midscale) * span / half_scale` for bipolar
//!   ranges.
//! - **Calibrated**: a loaded [`CalEntry`] corrects the raw code first, then
//!   the range transform maps the corrected code to volts.
//!
//! Nothing here touches the transport; all functions are deterministic.

use crate::calibration::CalEntry;
use crate::error::{BtdaqError, Result};

/// Analog input mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnalogMode {
    SingleEnded = 0,
    Differential = 1,
}

/// Selectable voltage ranges
///
/// The bipolar ranges are the differential-mode gain settings; the unipolar
/// 0-2.5V range is used by the single-ended inputs' companion DAC outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnalogRange {
    /// ±20 V
    Bipolar20V = 0x0,
    /// ±10 V
    Bipolar10V = 0x1,
    /// ±5 V
    Bipolar5V = 0x2,
    /// ±4 V
    Bipolar4V = 0x3,
    /// ±2.5 V
    Bipolar2_5V = 0x4,
    /// ±2 V
    Bipolar2V = 0x5,
    /// ±1.25 V
    Bipolar1_25V = 0x6,
    /// ±1 V
    Bipolar1V = 0x7,
    /// 0 - 2.5 V
    Unipolar2_5V = 0x8,
}

impl AnalogRange {
    /// Parse a wire range selector
    ///
    /// # Errors
    ///
    /// An unrecognized selector is a fatal input error, never silently
    /// defaulted: defaulting would silently misreport voltage.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x0 => Ok(AnalogRange::Bipolar20V),
            0x1 => Ok(AnalogRange::Bipolar10V),
            0x2 => Ok(AnalogRange::Bipolar5V),
            0x3 => Ok(AnalogRange::Bipolar4V),
            0x4 => Ok(AnalogRange::Bipolar2_5V),
            0x5 => Ok(AnalogRange::Bipolar2V),
            0x6 => Ok(AnalogRange::Bipolar1_25V),
            0x7 => Ok(AnalogRange::Bipolar1V),
            0x8 => Ok(AnalogRange::Unipolar2_5V),
            other => Err(BtdaqError::Range(format!(
                "unknown range selector 0x{other:02X}"
            ))),
        }
    }

    /// Wire selector for this range
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Magnitude of the range in volts (half-span for bipolar ranges)
    #[must_use]
    pub fn span(self) -> f64 {
        match self {
            AnalogRange::Bipolar20V => 20.0,
            AnalogRange::Bipolar10V => 10.0,
            AnalogRange::Bipolar5V => 5.0,
            AnalogRange::Bipolar4V => 4.0,
            AnalogRange::Bipolar2_5V | AnalogRange::Unipolar2_5V => 2.5,
            AnalogRange::Bipolar2V => 2.0,
            AnalogRange::Bipolar1_25V => 1.25,
            AnalogRange::Bipolar1V => 1.0,
        }
    }

    #[must_use]
    pub fn is_bipolar(self) -> bool {
        !matches!(self, AnalogRange::Unipolar2_5V)
    }

    /// Row index into the differential calibration table, bipolar only
    #[must_use]
    pub fn gain_index(self) -> Option<usize> {
        if self.is_bipolar() {
            Some(self as usize)
        } else {
            None
        }
    }
}

/// Converter code widths with their fixed scale constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// 12-bit converter: midscale 0x800, half scale 2048, full scale 4096
    Bits12,
    /// 18-bit converter: midscale 131072, half scale 131072,
    /// full scale 262143
    Bits18,
}

impl Resolution {
    #[must_use]
    pub fn midscale(self) -> f64 {
        match self {
            Resolution::Bits12 => 2048.0,
            Resolution::Bits18 => 131_072.0,
        }
    }

    #[must_use]
    pub fn half_scale(self) -> f64 {
        match self {
            Resolution::Bits12 => 2048.0,
            Resolution::Bits18 => 131_072.0,
        }
    }

    /// Full-scale divisor for unipolar ranges, following each converter's
    /// documented convention
    #[must_use]
    pub fn full_scale(self) -> f64 {
        match self {
            Resolution::Bits12 => 4096.0,
            Resolution::Bits18 => 262_143.0,
        }
    }

    /// Largest representable code
    #[must_use]
    pub fn max_code(self) -> u32 {
        match self {
            Resolution::Bits12 => 0xFFF,
            Resolution::Bits18 => 0x3FFFF,
        }
    }
}

/// Range-table conversion: raw code to volts
///
/// # Examples
///
/// ```
/// use btdaq::units::{range_volts, AnalogRange, Resolution};
///
/// let v = range_volts(0x800, AnalogRange::Bipolar10V, Resolution::Bits12);
/// assert_eq!(v, 0.0);
/// ```
#[must_use]
pub fn range_volts(code: u32, range: AnalogRange, resolution: Resolution) -> f64 {
    if range.is_bipolar() {
        (f64::from(code) - resolution.midscale()) * range.span() / resolution.half_scale()
    } else {
        f64::from(code) * range.span() / resolution.full_scale()
    }
}

/// Range-table inverse: volts to the nearest raw code, for output channels
///
/// The result is clamped to the representable code range; the voltage
/// argument itself is not range-checked since the DAC clips identically.
#[must_use]
pub fn range_code(volts: f64, range: AnalogRange, resolution: Resolution) -> u32 {
    let code = if range.is_bipolar() {
        volts * resolution.half_scale() / range.span() + resolution.midscale()
    } else {
        volts * resolution.full_scale() / range.span()
    };
    code.round().clamp(0.0, f64::from(resolution.max_code())) as u32
}

/// Selector for how a raw code becomes volts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConversionModel {
    /// Fixed analytic transform only
    RangeTable {
        range: AnalogRange,
        resolution: Resolution,
    },
    /// Loaded calibration entry corrects the code, then the range transform
    /// applies
    Calibrated {
        entry: CalEntry,
        range: AnalogRange,
        resolution: Resolution,
    },
}

impl ConversionModel {
    /// Convert a raw code to volts under this model
    #[must_use]
    pub fn to_volts(&self, code: u32) -> f64 {
        match *self {
            ConversionModel::RangeTable { range, resolution } => {
                range_volts(code, range, resolution)
            }
            ConversionModel::Calibrated {
                entry,
                range,
                resolution,
            } => {
                let corrected = f64::from(code) * f64::from(entry.slope)
                    + f64::from(entry.intercept);
                let corrected = corrected
                    .round()
                    .clamp(0.0, f64::from(resolution.max_code()))
                    as u32;
                range_volts(corrected, range, resolution)
            }
        }
    }
}
