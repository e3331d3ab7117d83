//! Debounced shutdown decision.
//!
//! The controller sees every telemetry sample in order and returns a [`Verdict`]; it never
//! touches the bus itself. Two independent paths lead to shutdown:
//!
//! - **timeout**: input power has been gone for longer than [`ShutdownPolicy::timeout_s`],
//!   counted in [`ShutdownPolicy::poll_interval_s`] steps per sample;
//! - **voltage floor**: the battery is below the configured cutoff, on any sample, in any state.
//!
//! Shutdown is issued once; the process is expected to die shortly after. A request that
//! could not be carried out is reported back through [`ShutdownController::shutdown_failed`],
//! which re-arms the controller so the next qualifying sample asks again.

use core::fmt;

use crate::data_types::Telemetry;

/// Seconds on battery before shutting down.
pub const DEFAULT_TIMEOUT_S: u32 = 100;
/// Seconds credited to the debounce counter per sample. Matches the ADC settle time.
pub const DEFAULT_POLL_INTERVAL_S: u32 = 2;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ShutdownPolicy {
    pub timeout_s: u32,
    pub poll_interval_s: u32,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            timeout_s: DEFAULT_TIMEOUT_S,
            poll_interval_s: DEFAULT_POLL_INTERVAL_S,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PowerState {
    #[default]
    OnInput,
    /// Input lost; `elapsed_s` is the debounce counter.
    OnBattery { elapsed_s: u32 },
}

/// Message broadcast to logged-in users on a power transition.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Notice {
    PowerLost { minutes_remaining: i32 },
    PowerRestored { battery_percent: u8 },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PowerLost { minutes_remaining } => write!(
                f,
                "Power Disconnected, system will shutdown in {} minutes!",
                minutes_remaining
            ),
            Notice::PowerRestored { battery_percent } => {
                write!(f, "Power Restored, battery at {} percent", battery_percent)
            }
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ShutdownReason {
    /// Battery voltage fell below the cutoff.
    LowVoltage { battery_mv: u16, cutoff_mv: u16 },
    /// Input power stayed away past the timeout.
    Timeout { elapsed_s: u32 },
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::LowVoltage { battery_mv, cutoff_mv } => {
                write!(f, "battery at {} mV, below cutoff {} mV", battery_mv, cutoff_mv)
            }
            ShutdownReason::Timeout { elapsed_s } => write!(f, "on battery for {} s", elapsed_s),
        }
    }
}

/// What to do after one sample. `shutdown` means: disconnect the battery, then shut down.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Verdict {
    pub notice: Option<Notice>,
    pub shutdown: Option<ShutdownReason>,
}

#[derive(Debug)]
pub struct ShutdownController {
    state: PowerState,
    policy: ShutdownPolicy,
    vbat_low_mv: u16,
    shutdown_issued: bool,
}

impl ShutdownController {
    pub fn new(vbat_low_mv: u16, policy: ShutdownPolicy) -> Self {
        Self {
            state: PowerState::OnInput,
            policy,
            vbat_low_mv,
            shutdown_issued: false,
        }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn policy(&self) -> ShutdownPolicy {
        self.policy
    }

    pub fn shutdown_issued(&self) -> bool {
        self.shutdown_issued
    }

    /// The last shutdown request did not go through.
    pub fn shutdown_failed(&mut self) {
        self.shutdown_issued = false;
    }

    /// Advance on one sample.
    pub fn observe(&mut self, sample: &Telemetry) -> Verdict {
        let connected = sample.power_input.is_connected();
        let mut verdict = Verdict::default();

        let timed_out = match (self.state, connected) {
            (PowerState::OnInput, false) => {
                self.state = PowerState::OnBattery { elapsed_s: 0 };
                verdict.notice = Some(Notice::PowerLost {
                    minutes_remaining: sample.time_remaining_min,
                });
                None
            }
            (PowerState::OnBattery { .. }, true) => {
                self.state = PowerState::OnInput;
                verdict.notice = Some(Notice::PowerRestored {
                    battery_percent: sample.battery_percent,
                });
                None
            }
            (PowerState::OnBattery { elapsed_s }, false) => {
                let elapsed_s = elapsed_s.saturating_add(self.policy.poll_interval_s);
                self.state = PowerState::OnBattery { elapsed_s };
                (elapsed_s > self.policy.timeout_s).then_some(ShutdownReason::Timeout { elapsed_s })
            }
            (PowerState::OnInput, true) => None,
        };

        // The voltage floor preempts the debounce counter.
        let reason = if sample.battery_mv < self.vbat_low_mv {
            Some(ShutdownReason::LowVoltage {
                battery_mv: sample.battery_mv,
                cutoff_mv: self.vbat_low_mv,
            })
        } else {
            timed_out
        };

        if let Some(reason) = reason {
            if !self.shutdown_issued {
                self.shutdown_issued = true;
                verdict.shutdown = Some(reason);
            }
        }
        verdict
    }
}
