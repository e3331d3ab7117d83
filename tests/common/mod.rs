#![allow(dead_code)]

use embedded_hal::delay::DelayNs;
use embedded_hal_mock::eh1::i2c::Transaction as I2cTrans;
use powerpi_rs::data_types::{ChargeStatus, PowerInput, TIME_REMAINING_ON_INPUT, Telemetry};
use powerpi_rs::monitor::PowerActions;
use powerpi_rs::shutdown::{Notice, ShutdownReason};

pub const ADDR: u8 = 0x6A;

/// STATUS with power good, not charging.
pub const STATUS_ON_INPUT: u8 = 0b0000_0100;
/// STATUS without power good.
pub const STATUS_ON_BATTERY: u8 = 0b0000_0000;

/// BATV bytes and their decoded millivolts.
pub const VBAT_3904: u8 = 0b0101_0000;
pub const VBAT_3204: u8 = 0b0010_1101;
pub const VBAT_3184: u8 = 0b0010_1100;

/// Bus transactions of one ADC read cycle.
pub fn read_cycle(fault: Option<u8>, status: u8, vbat: u8, ichgr: u8, vbus: u8) -> Vec<I2cTrans> {
    let mut t = Vec::new();
    if let Some(fault) = fault {
        t.push(I2cTrans::write_read(ADDR, vec![0x0C], vec![fault]));
    }
    t.push(I2cTrans::write(ADDR, vec![0x02, 0b1001_1101]));
    t.push(I2cTrans::write_read(ADDR, vec![0x0B], vec![status]));
    t.push(I2cTrans::write_read(ADDR, vec![0x0E], vec![vbat]));
    t.push(I2cTrans::write_read(ADDR, vec![0x12], vec![ichgr]));
    t.push(I2cTrans::write_read(ADDR, vec![0x11], vec![vbus]));
    t.push(I2cTrans::write(ADDR, vec![0x02, 0b0001_1101]));
    t
}

pub fn batfet_disable() -> I2cTrans {
    I2cTrans::write(ADDR, vec![0x09, 0b0110_1000])
}

/// Hand-built sample for controller tests.
pub fn sample(connected: bool, battery_mv: u16) -> Telemetry {
    Telemetry {
        power_input: if connected {
            PowerInput::Connected
        } else {
            PowerInput::NotConnected
        },
        charge_status: ChargeStatus::NotCharging,
        battery_mv,
        charge_current_ma: 0,
        input_mv: if connected { 5_100 } else { 2_600 },
        battery_percent: 50,
        time_remaining_min: if connected { TIME_REMAINING_ON_INPUT } else { 43 },
        faults: None,
    }
}

/// Records every delay in nanoseconds.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub delays_ns: Vec<u64>,
}

impl RecordingDelay {
    pub fn delays_ms(&self) -> Vec<u64> {
        self.delays_ns.iter().map(|ns| ns / 1_000_000).collect()
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_ns.push(u64::from(ns));
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ns.push(u64::from(ms) * 1_000_000);
    }
}

#[cfg(feature = "async")]
impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.delays_ns.push(u64::from(ns));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.delays_ns.push(u64::from(ms) * 1_000_000);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Notify(Notice),
    Shutdown(ShutdownReason),
}

/// Records every action. The first `failing_shutdowns` shutdown requests report an error.
#[derive(Debug, Default)]
pub struct RecordingActions {
    pub log: Vec<Action>,
    pub failing_shutdowns: usize,
}

impl PowerActions for RecordingActions {
    type Error = &'static str;

    fn notify(&mut self, notice: &Notice) {
        self.log.push(Action::Notify(*notice));
    }

    fn request_shutdown(&mut self, reason: &ShutdownReason) -> Result<(), Self::Error> {
        self.log.push(Action::Shutdown(*reason));
        if self.failing_shutdowns > 0 {
            self.failing_shutdowns -= 1;
            return Err("shutdown refused");
        }
        Ok(())
    }
}
