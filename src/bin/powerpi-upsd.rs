//! PowerPi UPS daemon for the Raspberry Pi.
//!
//! Configuration comes from the environment (`ILIM_INDEX`, `ICHG_INDEX`, `VREG_INDEX`,
//! `BAT_CAPACITY`, `CURRENT_DRAW`, `VBAT_MAX`, `VBAT_LOW`), log filtering from `RUST_LOG`.
//! The charger interrupt line is GPIO4, active low.

use std::env;
use std::io;
use std::process::{Command, ExitCode};
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{error, info, warn};
use powerpi_rs::monitor::RequestChannel;
use powerpi_rs::shutdown::{Notice, ShutdownReason};
use powerpi_rs::{Bq25895, Config, Monitor, Options, PowerActions, Triggers};
use rppal::gpio::{Gpio, InputPin, Trigger};
use rppal::hal::Delay;
use rppal::i2c::I2c;

const I2C_BUS: u8 = 1;
const INTERRUPT_PIN: u8 = 4;
const INTERRUPT_DEBOUNCE: Duration = Duration::from_millis(200);

static REQUESTS: RequestChannel<CriticalSectionRawMutex> = Channel::new();

/// `wall` for notices, `sudo shutdown` for the final action.
struct SystemActions;

impl PowerActions for SystemActions {
    fn notify(&mut self, notice: &Notice) {
        if let Err(e) = Command::new("wall").arg(notice.to_string()).status() {
            warn!("could not broadcast notice: {}", e);
        }
    }

    type Error = io::Error;

    fn request_shutdown(&mut self, reason: &ShutdownReason) -> io::Result<()> {
        info!("requesting system shutdown ({})", reason);
        let status = Command::new("sudo").args(["shutdown", "-h", "now"]).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!("shutdown exited with {}", status)))
        }
    }
}

fn attach_interrupt(triggers: Triggers<'static, CriticalSectionRawMutex>) -> rppal::gpio::Result<InputPin> {
    let mut pin = Gpio::new()?.get(INTERRUPT_PIN)?.into_input_pullup();
    pin.set_async_interrupt(Trigger::FallingEdge, Some(INTERRUPT_DEBOUNCE), move |_event| {
        triggers.interrupt();
    })?;
    Ok(pin)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_options(&Options::from_lookup(|key| env::var(key).ok()));
    info!("{:?}", config);

    let i2c = match I2c::with_bus(I2C_BUS) {
        Ok(i2c) => i2c,
        Err(e) => {
            error!("could not open I2C bus {}: {}", I2C_BUS, e);
            return ExitCode::FAILURE;
        }
    };
    let mut charger = Bq25895::new(i2c);
    if let Err(e) = charger.init(&config) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    // The pin must stay alive for the interrupt callback to keep firing.
    let _interrupt_pin = match attach_interrupt(Triggers::new(&REQUESTS)) {
        Ok(pin) => Some(pin),
        Err(e) => {
            error!(
                "error attaching interrupt to GPIO{}, UPS will work without interrupt: {}",
                INTERRUPT_PIN, e
            );
            None
        }
    };

    let mut monitor = Monitor::new(charger, Delay::new(), SystemActions, config, &REQUESTS);
    monitor.run();
    ExitCode::SUCCESS
}
