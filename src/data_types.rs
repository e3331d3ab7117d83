//! Data types for the BQ25895 UPS monitor.

use crate::config::Config;
use crate::estimator::{charge_percent, time_remaining_minutes};
use crate::registers::{FaultBits, StatusBits, decode_charge_state, power_good};

/// `time_remaining_min` value reported while running on input power.
pub const TIME_REMAINING_ON_INPUT: i32 = -1;

/// Whether external power is feeding the board.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PowerInput {
    Connected,
    NotConnected,
}

impl PowerInput {
    pub fn is_connected(self) -> bool {
        matches!(self, PowerInput::Connected)
    }
}

impl core::fmt::Display for PowerInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PowerInput::Connected => f.write_str("Connected"),
            PowerInput::NotConnected => f.write_str("Not Connected"),
        }
    }
}

/// Charge sub-state decoded from CHRG_STAT.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChargeStatus {
    NotCharging,
    PreCharge,
    Charging,
    Done,
}

impl ChargeStatus {
    pub fn from_status(bits: &StatusBits) -> Self {
        match decode_charge_state(bits) {
            0b11 => ChargeStatus::Done,
            0b10 => ChargeStatus::Charging,
            0b01 => ChargeStatus::PreCharge,
            _ => ChargeStatus::NotCharging,
        }
    }
}

impl core::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ChargeStatus::NotCharging => f.write_str("Not Charging"),
            ChargeStatus::PreCharge => f.write_str("Pre-Charge"),
            ChargeStatus::Charging => f.write_str("Charging"),
            ChargeStatus::Done => f.write_str("Charging done"),
        }
    }
}

/// Decoded result registers of one ADC conversion cycle.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AdcReadings {
    pub status: StatusBits,
    pub battery_mv: u16,
    pub charge_current_ma: u16,
    pub input_mv: u16,
    /// Present only when the cycle cleared the latched fault register.
    pub faults: Option<FaultBits>,
}

/// One telemetry sample, derived from [`AdcReadings`] and the battery parameters.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Telemetry {
    pub power_input: PowerInput,
    pub charge_status: ChargeStatus,
    pub battery_mv: u16,
    pub charge_current_ma: u16,
    pub input_mv: u16,
    /// 0..=100.
    pub battery_percent: u8,
    /// Minutes of runtime left on battery, [`TIME_REMAINING_ON_INPUT`] while on input power.
    pub time_remaining_min: i32,
    pub faults: Option<FaultBits>,
}

impl Telemetry {
    pub fn from_readings(readings: &AdcReadings, config: &Config) -> Self {
        let power_input = if power_good(&readings.status) {
            PowerInput::Connected
        } else {
            PowerInput::NotConnected
        };
        let time_remaining_min = match power_input {
            PowerInput::Connected => TIME_REMAINING_ON_INPUT,
            PowerInput::NotConnected => {
                let minutes = time_remaining_minutes(
                    readings.battery_mv,
                    config.battery_capacity_mah(),
                    config.current_draw_ma(),
                    config.vbat_low_mv(),
                    config.vbat_max_mv(),
                );
                i32::try_from(minutes).unwrap_or(i32::MAX)
            }
        };
        Self {
            power_input,
            charge_status: ChargeStatus::from_status(&readings.status),
            battery_mv: readings.battery_mv,
            charge_current_ma: readings.charge_current_ma,
            input_mv: readings.input_mv,
            battery_percent: charge_percent(readings.battery_mv, config.vbat_low_mv(), config.vbat_max_mv()),
            time_remaining_min,
            faults: readings.faults,
        }
    }

    /// Battery voltage in volts.
    pub fn battery_volts(&self) -> f32 {
        f32::from(self.battery_mv) / 1000.0
    }

    /// Input bus voltage in volts.
    pub fn input_volts(&self) -> f32 {
        f32::from(self.input_mv) / 1000.0
    }

    /// Runtime estimate, `None` while on input power.
    pub fn time_remaining(&self) -> Option<u32> {
        u32::try_from(self.time_remaining_min).ok()
    }
}
