//! Error definitions for the BQ25895 UPS monitor.

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug)]
pub enum Error<I2cError> {
    /// Underlying I2C transaction failed. Recoverable: the cycle is skipped.
    I2c(I2cError),
    /// The one-time charger setup sequence failed.
    Init(I2cError),
    /// Writing BATFET_DIS failed on every attempt.
    BatteryDisconnect(I2cError),
}

impl<I2cError: core::fmt::Debug> core::fmt::Display for Error<I2cError> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::Init(e) => write!(f, "initialization failed, check connection to the UPS: {:?}", e),
            Error::BatteryDisconnect(e) => write!(f, "battery disconnect failed: {:?}", e),
        }
    }
}

impl<I2cError: core::fmt::Debug> core::error::Error for Error<I2cError> {}
