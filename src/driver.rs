//! BQ25895 driver.
//! Provides blocking I2C helpers; the async version mirrors this API behind the `async` feature.

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::Config;
use crate::data_types::{AdcReadings, Telemetry};
use crate::error::Error;
use crate::registers::{
    ADC_SETTLE_MS, BYTE_BATFET, BYTE_BATFET_DIS, BYTE_CONV_ADC_START, BYTE_CONV_ADC_STOP, BYTE_SYSMIN,
    BYTE_WATCHDOG_STOP, DEFAULT_I2C_ADDRESS, FaultBits, StatusBits, addr, decode_battery_mv,
    decode_charge_current_ma, decode_input_mv,
};

/// BATFET_DIS write attempts before giving up.
pub const DISCONNECT_ATTEMPTS: u32 = 2;
/// Pause between BATFET_DIS attempts.
pub const DISCONNECT_RETRY_MS: u32 = 1_000;

/// Register writes performed once at startup, in order.
pub fn setup_sequence(config: &Config) -> [(u8, u8); 6] {
    [
        (addr::WATCHDOG, BYTE_WATCHDOG_STOP),
        (addr::ILIM, config.ilim_byte()),
        (addr::ICHG, config.ichg_byte()),
        (addr::BATFET, BYTE_BATFET),
        (addr::SYSMIN, BYTE_SYSMIN),
        (addr::VREG, config.vreg_byte()),
    ]
}

fn decode_readings(status: u8, vbat: u8, ichgr: u8, vbus: u8, faults: Option<FaultBits>) -> AdcReadings {
    AdcReadings {
        status: StatusBits::from_bits_retain(status),
        battery_mv: decode_battery_mv(vbat),
        charge_current_ma: decode_charge_current_ma(ichgr),
        input_mv: decode_input_mv(vbus),
        faults,
    }
}

fn report_faults(faults: FaultBits) {
    if !faults.is_empty() {
        warn!("charger fault latched: {:?}", faults);
    }
}

/// BQ25895 charger on the PowerPi board.
pub struct Bq25895<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> Bq25895<I2C> {
    /// Create a new driver instance with the default I2C address (0x6A).
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: DEFAULT_I2C_ADDRESS,
        }
    }

    /// Create a new driver instance with a custom I2C address.
    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Return the 7-bit I2C address configured for this instance.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the underlying bus.
    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Bq25895<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    /// Stop the watchdog and program current limits, BATFET delay, minimum system voltage
    /// and charge voltage. Any failure is reported as [`Error::Init`].
    pub fn init(&mut self, config: &Config) -> Result<(), Error<I2C::Error>> {
        for (reg, value) in setup_sequence(config) {
            self.i2c
                .write(self.address, &[reg, value])
                .map_err(Error::Init)?;
        }
        info!("UPS initialized");
        Ok(())
    }

    /// Write a single register.
    pub fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[reg, value])
            .map_err(Error::I2c)
    }

    /// Read a single register.
    pub fn read_reg(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    /// Read STATUS register bits.
    pub fn read_status(&mut self) -> Result<StatusBits, Error<I2C::Error>> {
        let val = self.read_reg(addr::STATUS)?;
        Ok(StatusBits::from_bits_retain(val))
    }

    /// Read and thereby clear the latched FAULT register.
    pub fn read_faults(&mut self) -> Result<FaultBits, Error<I2C::Error>> {
        let val = self.read_reg(addr::FAULT)?;
        Ok(FaultBits::from_bits_retain(val))
    }

    /// Run one ADC conversion cycle and read the result registers.
    ///
    /// Blocks for [`ADC_SETTLE_MS`] between starting the conversion and reading back.
    /// With `clear_fault` the latched FAULT register is read first.
    pub fn read_adc<D: DelayNs>(&mut self, delay: &mut D, clear_fault: bool) -> Result<AdcReadings, Error<I2C::Error>> {
        let faults = if clear_fault {
            let faults = self.read_faults()?;
            report_faults(faults);
            Some(faults)
        } else {
            None
        };
        self.write_reg(addr::CONV_ADC, BYTE_CONV_ADC_START)?;
        delay.delay_ms(ADC_SETTLE_MS);
        let status = self.read_reg(addr::STATUS)?;
        let vbat = self.read_reg(addr::VBAT)?;
        let ichgr = self.read_reg(addr::ICHGR)?;
        let vbus = self.read_reg(addr::VBUS)?;
        self.write_reg(addr::CONV_ADC, BYTE_CONV_ADC_STOP)?;
        Ok(decode_readings(status, vbat, ichgr, vbus, faults))
    }

    /// [`read_adc`](Self::read_adc) followed by charge estimation.
    pub fn read_telemetry<D: DelayNs>(
        &mut self,
        delay: &mut D,
        config: &Config,
        clear_fault: bool,
    ) -> Result<Telemetry, Error<I2C::Error>> {
        let readings = self.read_adc(delay, clear_fault)?;
        Ok(Telemetry::from_readings(&readings, config))
    }

    /// Force the BATFET off, isolating the battery from the system.
    /// Tries [`DISCONNECT_ATTEMPTS`] times, [`DISCONNECT_RETRY_MS`] apart.
    pub fn disconnect_battery<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Error<I2C::Error>> {
        let mut attempt = 1;
        loop {
            match self.i2c.write(self.address, &[addr::BATFET, BYTE_BATFET_DIS]) {
                Ok(()) => {
                    debug!("BATFET disabled on attempt {}", attempt);
                    return Ok(());
                }
                Err(e) if attempt < DISCONNECT_ATTEMPTS => {
                    warn!("BATFET disable attempt {} failed: {:?}", attempt, e);
                    delay.delay_ms(DISCONNECT_RETRY_MS);
                    attempt += 1;
                }
                Err(e) => return Err(Error::BatteryDisconnect(e)),
            }
        }
    }
}

#[cfg(feature = "async")]
impl<I2C> Bq25895<I2C>
where
    I2C: embedded_hal_async::i2c::I2c,
{
    /// Async version of [`init`](Self::init).
    pub async fn init_async(&mut self, config: &Config) -> Result<(), Error<I2C::Error>> {
        for (reg, value) in setup_sequence(config) {
            self.i2c
                .write(self.address, &[reg, value])
                .await
                .map_err(Error::Init)?;
        }
        info!("UPS initialized");
        Ok(())
    }

    pub async fn write_reg_async(&mut self, reg: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.i2c
            .write(self.address, &[reg, value])
            .await
            .map_err(Error::I2c)
    }

    pub async fn read_reg_async(&mut self, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[reg], &mut buf)
            .await
            .map_err(Error::I2c)?;
        Ok(buf[0])
    }

    pub async fn read_status_async(&mut self) -> Result<StatusBits, Error<I2C::Error>> {
        let val = self.read_reg_async(addr::STATUS).await?;
        Ok(StatusBits::from_bits_retain(val))
    }

    pub async fn read_faults_async(&mut self) -> Result<FaultBits, Error<I2C::Error>> {
        let val = self.read_reg_async(addr::FAULT).await?;
        Ok(FaultBits::from_bits_retain(val))
    }

    /// Async version of [`read_adc`](Self::read_adc). The conversion is not cancel-safe:
    /// dropping the future mid-cycle leaves the ADC running.
    pub async fn read_adc_async<D: embedded_hal_async::delay::DelayNs>(
        &mut self,
        delay: &mut D,
        clear_fault: bool,
    ) -> Result<AdcReadings, Error<I2C::Error>> {
        let faults = if clear_fault {
            let faults = self.read_faults_async().await?;
            report_faults(faults);
            Some(faults)
        } else {
            None
        };
        self.write_reg_async(addr::CONV_ADC, BYTE_CONV_ADC_START).await?;
        delay.delay_ms(ADC_SETTLE_MS).await;
        let status = self.read_reg_async(addr::STATUS).await?;
        let vbat = self.read_reg_async(addr::VBAT).await?;
        let ichgr = self.read_reg_async(addr::ICHGR).await?;
        let vbus = self.read_reg_async(addr::VBUS).await?;
        self.write_reg_async(addr::CONV_ADC, BYTE_CONV_ADC_STOP).await?;
        Ok(decode_readings(status, vbat, ichgr, vbus, faults))
    }

    pub async fn read_telemetry_async<D: embedded_hal_async::delay::DelayNs>(
        &mut self,
        delay: &mut D,
        config: &Config,
        clear_fault: bool,
    ) -> Result<Telemetry, Error<I2C::Error>> {
        let readings = self.read_adc_async(delay, clear_fault).await?;
        Ok(Telemetry::from_readings(&readings, config))
    }

    pub async fn disconnect_battery_async<D: embedded_hal_async::delay::DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<(), Error<I2C::Error>> {
        let mut attempt = 1;
        loop {
            match self.i2c.write(self.address, &[addr::BATFET, BYTE_BATFET_DIS]).await {
                Ok(()) => {
                    debug!("BATFET disabled on attempt {}", attempt);
                    return Ok(());
                }
                Err(e) if attempt < DISCONNECT_ATTEMPTS => {
                    warn!("BATFET disable attempt {} failed: {:?}", attempt, e);
                    delay.delay_ms(DISCONNECT_RETRY_MS).await;
                    attempt += 1;
                }
                Err(e) => return Err(Error::BatteryDisconnect(e)),
            }
        }
    }
}
