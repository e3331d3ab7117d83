//! Battery and charger configuration.
//!
//! [`Options`] holds the raw values as supplied (environment variables in the daemon),
//! [`Config`] is the clamped, immutable form every other module works with. Out-of-range
//! values are clamped to the nearest safe value, never rejected.

use crate::registers::{ICHG_PRESETS, ILIM_PRESETS, VREG_PRESETS};

/// Environment keys read by [`Options::from_lookup`].
pub mod keys {
    pub const ILIM_INDEX: &str = "ILIM_INDEX";
    pub const ICHG_INDEX: &str = "ICHG_INDEX";
    pub const VREG_INDEX: &str = "VREG_INDEX";
    pub const BAT_CAPACITY: &str = "BAT_CAPACITY";
    pub const CURRENT_DRAW: &str = "CURRENT_DRAW";
    pub const VBAT_MAX: &str = "VBAT_MAX";
    pub const VBAT_LOW: &str = "VBAT_LOW";
}

pub const BAT_CAPACITY_MIN_MAH: u16 = 2_000;
pub const BAT_CAPACITY_MAX_MAH: u16 = 4_000;
pub const CURRENT_DRAW_MIN_MA: u16 = 1_500;
pub const CURRENT_DRAW_MAX_MA: u16 = 2_500;
/// VBAT_MAX range matches the lowest and highest VREG preset.
pub const VBAT_MAX_MIN_MV: u16 = 3_840;
pub const VBAT_MAX_MAX_MV: u16 = 4_608;
/// Lower bound of VBAT_LOW. The upper bound is the configured VBAT_MAX.
pub const VBAT_LOW_MIN_MV: u16 = 3_000;

/// Unclamped configuration values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Options {
    /// Index into [`ILIM_PRESETS`]. Limits the current drawn from the input, not the output.
    pub ilim_index: i32,
    /// Index into [`ICHG_PRESETS`].
    pub ichg_index: i32,
    /// Index into [`VREG_PRESETS`].
    pub vreg_index: i32,
    pub battery_capacity_mah: i32,
    /// Average system draw used for the runtime estimate.
    pub current_draw_ma: i32,
    /// Battery voltage at 100 % charge, in volts.
    pub vbat_max: f32,
    /// Battery voltage at which the board is shut down, in volts.
    pub vbat_low: f32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ilim_index: 1,            // 3.25 A
            ichg_index: 1,            // 1.0 A
            vreg_index: 4,            // 4.208 V
            battery_capacity_mah: 2_900,
            current_draw_ma: 2_000,
            vbat_max: 4.208,
            vbat_low: 3.200,
        }
    }
}

impl Options {
    /// Build options from a key lookup such as `|key| std::env::var(key).ok()`.
    /// Missing or unparsable values keep their default.
    pub fn from_lookup<F, V>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<V>,
        V: AsRef<str>,
    {
        let mut int = |key: &str, default: i32| {
            lookup(key)
                .and_then(|v| v.as_ref().trim().parse::<i32>().ok())
                .unwrap_or(default)
        };
        let defaults = Self::default();
        let ilim_index = int(keys::ILIM_INDEX, defaults.ilim_index);
        let ichg_index = int(keys::ICHG_INDEX, defaults.ichg_index);
        let vreg_index = int(keys::VREG_INDEX, defaults.vreg_index);
        let battery_capacity_mah = int(keys::BAT_CAPACITY, defaults.battery_capacity_mah);
        let current_draw_ma = int(keys::CURRENT_DRAW, defaults.current_draw_ma);

        let mut float = |key: &str, default: f32| {
            lookup(key)
                .and_then(|v| v.as_ref().trim().parse::<f32>().ok())
                .filter(|v| v.is_finite())
                .unwrap_or(default)
        };
        let vbat_max = float(keys::VBAT_MAX, defaults.vbat_max);
        let vbat_low = float(keys::VBAT_LOW, defaults.vbat_low);

        Self {
            ilim_index,
            ichg_index,
            vreg_index,
            battery_capacity_mah,
            current_draw_ma,
            vbat_max,
            vbat_low,
        }
    }
}

/// Clamped configuration.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    ilim_index: usize,
    ichg_index: usize,
    vreg_index: usize,
    battery_capacity_mah: u16,
    current_draw_ma: u16,
    vbat_max_mv: u16,
    vbat_low_mv: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_options(&Options::default())
    }
}

impl Config {
    pub fn from_options(options: &Options) -> Self {
        let vbat_max_mv = volts_to_mv(options.vbat_max).clamp(VBAT_MAX_MIN_MV, VBAT_MAX_MAX_MV);
        let vbat_low_mv = volts_to_mv(options.vbat_low).clamp(VBAT_LOW_MIN_MV, vbat_max_mv);
        Self {
            ilim_index: clamp_index(options.ilim_index, ILIM_PRESETS.len()),
            ichg_index: clamp_index(options.ichg_index, ICHG_PRESETS.len()),
            vreg_index: clamp_index(options.vreg_index, VREG_PRESETS.len()),
            battery_capacity_mah: clamp_u16(options.battery_capacity_mah, BAT_CAPACITY_MIN_MAH, BAT_CAPACITY_MAX_MAH),
            current_draw_ma: clamp_u16(options.current_draw_ma, CURRENT_DRAW_MIN_MA, CURRENT_DRAW_MAX_MA),
            vbat_max_mv,
            vbat_low_mv,
        }
    }

    /// The options this configuration was clamped to. `from_options(&c.to_options()) == c`.
    pub fn to_options(&self) -> Options {
        Options {
            ilim_index: self.ilim_index as i32,
            ichg_index: self.ichg_index as i32,
            vreg_index: self.vreg_index as i32,
            battery_capacity_mah: i32::from(self.battery_capacity_mah),
            current_draw_ma: i32::from(self.current_draw_ma),
            vbat_max: f32::from(self.vbat_max_mv) / 1000.0,
            vbat_low: f32::from(self.vbat_low_mv) / 1000.0,
        }
    }

    pub fn ilim_index(&self) -> usize {
        self.ilim_index
    }

    pub fn ichg_index(&self) -> usize {
        self.ichg_index
    }

    pub fn vreg_index(&self) -> usize {
        self.vreg_index
    }

    /// ILIM register value for the selected preset.
    pub fn ilim_byte(&self) -> u8 {
        ILIM_PRESETS[self.ilim_index]
    }

    /// ICHG register value for the selected preset.
    pub fn ichg_byte(&self) -> u8 {
        ICHG_PRESETS[self.ichg_index]
    }

    /// VREG register value for the selected preset.
    pub fn vreg_byte(&self) -> u8 {
        VREG_PRESETS[self.vreg_index]
    }

    pub fn battery_capacity_mah(&self) -> u16 {
        self.battery_capacity_mah
    }

    pub fn current_draw_ma(&self) -> u16 {
        self.current_draw_ma
    }

    pub fn vbat_max_mv(&self) -> u16 {
        self.vbat_max_mv
    }

    pub fn vbat_low_mv(&self) -> u16 {
        self.vbat_low_mv
    }
}

fn clamp_index(index: i32, len: usize) -> usize {
    let last = len.saturating_sub(1);
    usize::try_from(index).map_or(0, |i| i.min(last))
}

fn clamp_u16(value: i32, min: u16, max: u16) -> u16 {
    value.clamp(i32::from(min), i32::from(max)) as u16
}

// Rounds to the nearest millivolt; NaN and negatives saturate to 0 before clamping.
fn volts_to_mv(volts: f32) -> u16 {
    (volts * 1000.0 + 0.5) as u16
}
