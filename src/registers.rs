//! Register map, preset encodings and ADC decoding for the BQ25895.
//! Values are taken from the BQ25895 datasheet (SLUSC88) as populated on the PowerPi board.

/// Fixed 7-bit I2C address of the BQ25895.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x6A;

/// Register addresses (7-bit).
pub mod addr {
    /// Input current limit (IINLIM).
    pub const ILIM: u8 = 0x00;
    /// ADC control (CONV_START, CONV_RATE, boost frequency, ICO, HVDCP, auto DPDM).
    pub const CONV_ADC: u8 = 0x02;
    /// Minimum system voltage and charge/OTG enable.
    pub const SYSMIN: u8 = 0x03;
    /// Fast charge current limit.
    pub const ICHG: u8 = 0x04;
    /// Charge voltage limit (VREG).
    pub const VREG: u8 = 0x06;
    /// Termination, watchdog and charge timer control.
    pub const WATCHDOG: u8 = 0x07;
    /// BATFET control. The same register holds the BATFET disable bit.
    pub const BATFET: u8 = 0x09;
    /// System status (VBUS, charge state, power good, VSYS regulation).
    pub const STATUS: u8 = 0x0B;
    /// Latched fault flags, cleared on read.
    pub const FAULT: u8 = 0x0C;
    /// Battery voltage ADC result (BATV).
    pub const VBAT: u8 = 0x0E;
    /// Input bus voltage ADC result (VBUSV).
    pub const VBUS: u8 = 0x11;
    /// Charge current ADC result (ICHGR).
    pub const ICHGR: u8 = 0x12;
}

/// Input current limit presets, indexed by `ILIM_INDEX`.
pub const ILIM_PRESETS: [u8; 2] = [
    0b0110_1000, // 2.00 A
    0b0111_1111, // 3.25 A
];

/// Fast charge current presets, indexed by `ICHG_INDEX`.
pub const ICHG_PRESETS: [u8; 2] = [
    0b0000_1000, // 0.5 A
    0b0001_0000, // 1.0 A
];

/// Charge voltage presets, indexed by `VREG_INDEX`.
pub const VREG_PRESETS: [u8; 9] = [
    0b0000_0010, // 3.840 V
    0b0001_0010, // 3.904 V
    0b0010_1010, // 4.000 V
    0b0100_0110, // 4.112 V
    0b0101_1110, // 4.208 V
    0b0111_0110, // 4.304 V
    0b1000_1110, // 4.400 V
    0b1010_1010, // 4.512 V
    0b1100_0010, // 4.608 V
];

/// Watchdog timer disabled, termination enabled.
pub const BYTE_WATCHDOG_STOP: u8 = 0b1000_1101;
/// Minimum system voltage 3.0 V, charging enabled.
pub const BYTE_SYSMIN: u8 = 0b0001_0000;
/// BATFET turn-off delay enabled.
pub const BYTE_BATFET: u8 = 0b0100_1000;
/// BATFET disable with delay: isolates the battery from the system.
pub const BYTE_BATFET_DIS: u8 = 0b0110_1000;
/// One-shot ADC conversion start.
pub const BYTE_CONV_ADC_START: u8 = 0b1001_1101;
/// ADC conversion stop, other ADC control bits unchanged.
pub const BYTE_CONV_ADC_STOP: u8 = 0b0001_1101;

/// Time the ADC needs after `CONV_START` before the result registers are valid.
pub const ADC_SETTLE_MS: u32 = 2_000;

/// BATV: 2.304 V offset, 20 mV LSB.
pub const VBAT_BASE_MV: u16 = 2_304;
pub const VBAT_WEIGHTS_MV: [u16; 7] = [20, 40, 80, 160, 320, 640, 1_280];

/// VBUSV: 2.6 V offset, 100 mV LSB.
pub const VBUS_BASE_MV: u16 = 2_600;
pub const VBUS_WEIGHTS_MV: [u16; 7] = [100, 200, 400, 800, 1_600, 3_200, 6_400];

/// ICHGR: no offset, 50 mA LSB.
pub const IBAT_BASE_MA: u16 = 0;
pub const IBAT_WEIGHTS_MA: [u16; 7] = [50, 100, 200, 400, 800, 1_600, 3_200];

bitflags::bitflags! {
    /// STATUS register bits (0x0B).
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct StatusBits: u8 {
        /// Bits 7-5: VBUS input type.
        const VBUS_STAT2 = 1 << 7;
        const VBUS_STAT1 = 1 << 6;
        const VBUS_STAT0 = 1 << 5;
        /// Bits 4-3: charge state (00 idle, 01 pre-charge, 10 fast charge, 11 done).
        const CHRG_STAT1 = 1 << 4;
        const CHRG_STAT0 = 1 << 3;
        /// Bit 2: input power good.
        const PG_STAT    = 1 << 2;
        /// Bit 1: USB input 500 mA detected.
        const SDP_STAT   = 1 << 1;
        /// Bit 0: in VSYSMIN regulation.
        const VSYS_STAT  = 1 << 0;
    }

    /// FAULT register bits (0x0C). Latched until read.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct FaultBits: u8 {
        const WATCHDOG    = 1 << 7;
        const BOOST       = 1 << 6;
        /// Bits 5-4: charge fault (01 input, 10 thermal shutdown, 11 safety timer).
        const CHRG_FAULT1 = 1 << 5;
        const CHRG_FAULT0 = 1 << 4;
        /// Bit 3: battery over-voltage.
        const BAT         = 1 << 3;
        /// Bits 2-0: NTC fault.
        const NTC2        = 1 << 2;
        const NTC1        = 1 << 1;
        const NTC0        = 1 << 0;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StatusBits {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "StatusBits({=u8:#010b})", self.bits());
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FaultBits {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "FaultBits({=u8:#010b})", self.bits());
    }
}

/// Whether bit `index` (LSB first) of `byte` is set. Indices past 7 read as clear.
pub const fn bit_set(byte: u8, index: u8) -> bool {
    index < 8 && byte & (1 << index) != 0
}

/// Decode a weighted-bit ADC register: `base` plus `weights[i]` for each set bit 0..=6.
/// Bit 7 carries an unrelated flag on every ADC register and is ignored.
pub fn decode_weighted(byte: u8, base: u16, weights: &[u16; 7]) -> u16 {
    weights
        .iter()
        .enumerate()
        .filter(|&(i, _)| bit_set(byte, i as u8))
        .fold(base, |acc, (_, w)| acc + w)
}

/// Battery voltage in millivolts from BATV.
pub fn decode_battery_mv(byte: u8) -> u16 {
    decode_weighted(byte, VBAT_BASE_MV, &VBAT_WEIGHTS_MV)
}

/// Input bus voltage in millivolts from VBUSV.
pub fn decode_input_mv(byte: u8) -> u16 {
    decode_weighted(byte, VBUS_BASE_MV, &VBUS_WEIGHTS_MV)
}

/// Battery charge current in milliamps from ICHGR.
pub fn decode_charge_current_ma(byte: u8) -> u16 {
    decode_weighted(byte, IBAT_BASE_MA, &IBAT_WEIGHTS_MA)
}

/// Decode CHRG_STAT into the 2-bit charge state index (0b00 idle, 0b01 pre-charge, 0b10 fast, 0b11 done).
pub fn decode_charge_state(bits: &StatusBits) -> u8 {
    let raw = bits.bits() & (StatusBits::CHRG_STAT0 | StatusBits::CHRG_STAT1).bits();
    (raw >> 3) & 0b11
}

/// Input power is present and good.
pub fn power_good(bits: &StatusBits) -> bool {
    bits.contains(StatusBits::PG_STAT)
}
