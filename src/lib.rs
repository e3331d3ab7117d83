//! PowerPi UPS monitor
//!
//! Drives the TI BQ25895 charger on the PowerPi board over I2C, decodes its ADC registers into
//! battery telemetry, and decides when to cut the battery and shut the host down after input
//! power is lost. no-std, with an optional async API and defmt support.

#![no_std]

pub mod config;
pub mod data_types;
pub mod driver;
pub mod error;
pub mod estimator;
pub mod monitor;
pub mod registers;
pub mod shutdown;

pub use config::{Config, Options};
pub use data_types::Telemetry;
pub use driver::Bq25895;
pub use error::Error;
pub use monitor::{Monitor, PowerActions, Request, Triggers};
pub use registers::DEFAULT_I2C_ADDRESS;
pub use shutdown::ShutdownController;
