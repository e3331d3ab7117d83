//! Monitor loop: one consumer for poll and interrupt triggers.
//!
//! Producers (the GPIO interrupt callback, a supervisor wanting to stop) push [`Request`]s
//! through a [`Triggers`] handle onto one channel. The [`Monitor`] is the only consumer and
//! the only owner of the charger and the [`ShutdownController`], so shutdown state is never
//! shared between execution contexts. When nothing is queued the monitor performs a
//! routine poll; the ADC settle time inside each read sets the polling cadence.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::data_types::Telemetry;
use crate::driver::Bq25895;
use crate::shutdown::{Notice, ShutdownController, ShutdownPolicy, ShutdownReason, Verdict};

/// Pause after a failed read cycle before trying again.
pub const BUS_FAULT_BACKOFF_MS: u32 = 2_000;
/// Pending requests beyond this are dropped; a queued read already covers them.
pub const REQUEST_QUEUE_DEPTH: usize = 4;

pub type RequestChannel<M> = Channel<M, Request, REQUEST_QUEUE_DEPTH>;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Request {
    /// Routine read.
    Poll,
    /// Charger interrupt: clear the latched fault register, then read.
    Interrupt,
    /// Leave the loop after the read in flight, if any, completes.
    Stop,
}

impl Request {
    pub fn clears_fault(self) -> bool {
        matches!(self, Request::Interrupt)
    }
}

/// Producer side of the request channel. Safe to call from an interrupt callback thread
/// when `M` is a thread-safe mutex such as `CriticalSectionRawMutex`.
pub struct Triggers<'a, M: RawMutex> {
    requests: &'a RequestChannel<M>,
}

impl<M: RawMutex> Clone for Triggers<'_, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: RawMutex> Copy for Triggers<'_, M> {}

impl<'a, M: RawMutex> Triggers<'a, M> {
    pub fn new(requests: &'a RequestChannel<M>) -> Self {
        Self { requests }
    }

    /// Queue an interrupt-triggered read. Returns `false` if the queue was full.
    pub fn interrupt(&self) -> bool {
        self.push(Request::Interrupt)
    }

    /// Queue a stop request. Returns `false` if the queue was full.
    pub fn stop(&self) -> bool {
        self.push(Request::Stop)
    }

    fn push(&self, request: Request) -> bool {
        match self.requests.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                debug!("request queue full, dropping {:?}", request);
                false
            }
        }
    }
}

/// Hooks into the operating system.
pub trait PowerActions {
    type Error: core::fmt::Display;

    /// Broadcast a power transition to logged-in users.
    fn notify(&mut self, notice: &Notice);
    /// Shut the system down. Called after the battery disconnect was attempted.
    ///
    /// On error the monitor asks again on the next sample that still calls for shutdown.
    fn request_shutdown(&mut self, reason: &ShutdownReason) -> Result<(), Self::Error>;
}

/// Outcome of one read cycle.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Cycle {
    Sampled { telemetry: Telemetry, verdict: Verdict },
    /// The bus failed; nothing was observed and the back-off delay has elapsed.
    BusFault,
}

pub struct Monitor<'a, I2C, D, A, M: RawMutex> {
    charger: Bq25895<I2C>,
    delay: D,
    actions: A,
    config: Config,
    controller: ShutdownController,
    requests: &'a RequestChannel<M>,
}

impl<'a, I2C, D, A, M: RawMutex> Monitor<'a, I2C, D, A, M> {
    /// `charger` must already be initialized.
    pub fn new(charger: Bq25895<I2C>, delay: D, actions: A, config: Config, requests: &'a RequestChannel<M>) -> Self {
        Self {
            charger,
            delay,
            actions,
            controller: ShutdownController::new(config.vbat_low_mv(), ShutdownPolicy::default()),
            config,
            requests,
        }
    }

    pub fn with_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.controller = ShutdownController::new(self.config.vbat_low_mv(), policy);
        self
    }

    pub fn triggers(&self) -> Triggers<'a, M> {
        Triggers::new(self.requests)
    }

    pub fn controller(&self) -> &ShutdownController {
        &self.controller
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Release the charger, delay and actions.
    pub fn free(self) -> (Bq25895<I2C>, D, A) {
        (self.charger, self.delay, self.actions)
    }

    fn next_request(&self) -> Request {
        self.requests.try_receive().unwrap_or(Request::Poll)
    }

    fn issue_shutdown(&mut self, reason: &ShutdownReason)
    where
        A: PowerActions,
    {
        if let Err(e) = self.actions.request_shutdown(reason) {
            error!("shutdown request failed, retrying on the next sample: {}", e);
            self.controller.shutdown_failed();
        }
    }
}

impl<I2C, D, A, M> Monitor<'_, I2C, D, A, M>
where
    I2C: embedded_hal::i2c::I2c,
    D: DelayNs,
    A: PowerActions,
    M: RawMutex,
{
    /// Serve requests until [`Request::Stop`].
    pub fn run(&mut self) {
        loop {
            match self.next_request() {
                Request::Stop => {
                    info!("monitor stopped");
                    return;
                }
                request => {
                    self.cycle(request.clears_fault());
                }
            }
        }
    }

    /// One read cycle followed by the controller's verdict.
    pub fn cycle(&mut self, clear_fault: bool) -> Cycle {
        match self.charger.read_telemetry(&mut self.delay, &self.config, clear_fault) {
            Ok(telemetry) => {
                debug!("{:?}", telemetry);
                let verdict = self.controller.observe(&telemetry);
                self.act(&verdict);
                Cycle::Sampled { telemetry, verdict }
            }
            Err(e) => {
                error!("an error occurred while reading values from the UPS: {}", e);
                self.delay.delay_ms(BUS_FAULT_BACKOFF_MS);
                Cycle::BusFault
            }
        }
    }

    fn act(&mut self, verdict: &Verdict) {
        if let Some(notice) = &verdict.notice {
            info!("{}", notice);
            self.actions.notify(notice);
        }
        if let Some(reason) = &verdict.shutdown {
            warn!("shutting down: {}", reason);
            if let Err(e) = self.charger.disconnect_battery(&mut self.delay) {
                error!("{}, shutting down anyway", e);
            }
            self.issue_shutdown(reason);
        }
    }
}

#[cfg(feature = "async")]
impl<I2C, D, A, M> Monitor<'_, I2C, D, A, M>
where
    I2C: embedded_hal_async::i2c::I2c,
    D: embedded_hal_async::delay::DelayNs,
    A: PowerActions,
    M: RawMutex,
{
    /// Async version of [`run`](Self::run).
    pub async fn run_async(&mut self) {
        loop {
            match self.next_request() {
                Request::Stop => {
                    info!("monitor stopped");
                    return;
                }
                request => {
                    self.cycle_async(request.clears_fault()).await;
                }
            }
        }
    }

    pub async fn cycle_async(&mut self, clear_fault: bool) -> Cycle {
        match self
            .charger
            .read_telemetry_async(&mut self.delay, &self.config, clear_fault)
            .await
        {
            Ok(telemetry) => {
                debug!("{:?}", telemetry);
                let verdict = self.controller.observe(&telemetry);
                self.act_async(&verdict).await;
                Cycle::Sampled { telemetry, verdict }
            }
            Err(e) => {
                error!("an error occurred while reading values from the UPS: {}", e);
                self.delay.delay_ms(BUS_FAULT_BACKOFF_MS).await;
                Cycle::BusFault
            }
        }
    }

    async fn act_async(&mut self, verdict: &Verdict) {
        if let Some(notice) = &verdict.notice {
            info!("{}", notice);
            self.actions.notify(notice);
        }
        if let Some(reason) = &verdict.shutdown {
            warn!("shutting down: {}", reason);
            if let Err(e) = self.charger.disconnect_battery_async(&mut self.delay).await {
                error!("{}, shutting down anyway", e);
            }
            self.issue_shutdown(reason);
        }
    }
}
