use powerpi_rs::estimator::{charge_fraction, charge_percent, time_remaining_minutes};
use powerpi_rs::registers::{
    IBAT_WEIGHTS_MA, VBAT_BASE_MV, bit_set, decode_battery_mv, decode_charge_current_ma, decode_input_mv,
    decode_weighted,
};

#[test]
fn battery_voltage_offsets_and_weights() {
    assert_eq!(decode_battery_mv(0), 2_304);
    assert_eq!(decode_battery_mv(0b0000_0001), 2_324);
    assert_eq!(decode_battery_mv(0b0101_0000), 3_904);
    assert_eq!(decode_battery_mv(0b0111_1111), 4_844);
}

#[test]
fn input_voltage_and_charge_current() {
    assert_eq!(decode_input_mv(0), 2_600);
    // 5.0 V USB: 2.6 + 1.6 + 0.8 = 5.0
    assert_eq!(decode_input_mv(0b0001_1000), 5_000);
    assert_eq!(decode_input_mv(0b0111_1111), 15_300);

    assert_eq!(decode_charge_current_ma(0), 0);
    assert_eq!(decode_charge_current_ma(0b0001_0100), 1_000);
    assert_eq!(decode_charge_current_ma(0b0111_1111), 6_350);
}

#[test]
fn bit_seven_is_ignored() {
    for byte in 0..=0x7Fu8 {
        assert_eq!(decode_battery_mv(byte), decode_battery_mv(byte | 0x80));
        assert_eq!(decode_input_mv(byte), decode_input_mv(byte | 0x80));
        assert_eq!(decode_charge_current_ma(byte), decode_charge_current_ma(byte | 0x80));
    }
}

#[test]
fn weighted_decode_is_monotonic_over_weighted_bits() {
    let mut last = 0;
    for byte in 0..=0x7Fu8 {
        let mv = decode_weighted(byte, VBAT_BASE_MV, &[20, 40, 80, 160, 320, 640, 1_280]);
        assert!(mv >= last, "byte {byte:#010b} decoded to {mv} below {last}");
        last = mv;
    }
    // Setting an extra bit never lowers the value.
    for byte in 0..=0x7Fu8 {
        for bit in 0..7 {
            let more = byte | (1 << bit);
            assert!(decode_weighted(more, 0, &IBAT_WEIGHTS_MA) >= decode_weighted(byte, 0, &IBAT_WEIGHTS_MA));
        }
    }
}

#[test]
fn bit_accessor_is_lsb_first() {
    assert!(bit_set(0b0000_0001, 0));
    assert!(!bit_set(0b0000_0001, 1));
    assert!(bit_set(0b1000_0000, 7));
    assert!(!bit_set(0xFF, 8));
}

#[test]
fn fraction_at_cutoff_is_empty() {
    assert_eq!(charge_fraction(3_200, 3_200, 4_208), 0.0);
    assert_eq!(time_remaining_minutes(3_200, 2_900, 2_000, 3_200, 4_208), 0);
}

#[test]
fn fraction_at_full_gives_full_runtime() {
    assert_eq!(charge_fraction(4_208, 3_200, 4_208), 1.0);
    // floor(60 * 2900 / 2000)
    assert_eq!(time_remaining_minutes(4_208, 2_900, 2_000, 3_200, 4_208), 87);
    assert_eq!(charge_percent(4_208, 3_200, 4_208), 100);
}

#[test]
fn fraction_clamps_outside_range() {
    assert_eq!(charge_fraction(2_304, 3_200, 4_208), 0.0);
    assert_eq!(charge_fraction(4_844, 3_200, 4_208), 1.0);
    assert_eq!(time_remaining_minutes(2_304, 4_000, 1_500, 3_200, 4_208), 0);
    assert_eq!(charge_percent(2_304, 3_200, 4_208), 0);
}

#[test]
fn fraction_is_linear_in_between() {
    let mid = charge_fraction(3_704, 3_200, 4_208);
    assert!((mid - 0.5).abs() < 1e-6);
    assert_eq!(charge_percent(3_904, 3_200, 4_208), 69);
    assert_eq!(time_remaining_minutes(3_904, 2_900, 2_000, 3_200, 4_208), 60);
}

#[test]
fn exact_fractions_are_not_rounded_down() {
    // 424 / 800 is exactly 0.53.
    assert_eq!(charge_percent(3_464, 3_040, 3_840), 53);
    // 0.53 * 60 * 2500 / 1500 is exactly 53.
    assert_eq!(time_remaining_minutes(3_464, 2_500, 1_500, 3_040, 3_840), 53);
    // 0.29 * 60 * 2000 / 1500 is exactly 23.2.
    assert_eq!(charge_percent(3_272, 3_040, 3_840), 29);
    assert_eq!(time_remaining_minutes(3_272, 2_000, 1_500, 3_040, 3_840), 23);
}

#[test]
fn percent_and_minutes_match_exact_floor_for_every_battery_byte() {
    for byte in 0..=0x7Fu8 {
        let vbat = decode_battery_mv(byte);
        for (low, max) in [(3_040, 3_840), (3_200, 4_208), (3_000, 4_608)] {
            let above = u64::from(vbat.clamp(low, max) - low);
            let span = u64::from(max - low);
            assert_eq!(u64::from(charge_percent(vbat, low, max)), above * 100 / span, "{vbat} mV");
            for (capacity, draw) in [(2_000u16, 1_500u16), (2_900, 2_000), (4_000, 2_500)] {
                assert_eq!(
                    u64::from(time_remaining_minutes(vbat, capacity, draw, low, max)),
                    above * 60 * u64::from(capacity) / (span * u64::from(draw)),
                    "{vbat} mV, {capacity} mAh, {draw} mA"
                );
            }
        }
    }
}

#[test]
fn equal_bounds_do_not_divide_by_zero() {
    assert_eq!(charge_fraction(3_900, 3_900, 3_900), 1.0);
    assert_eq!(charge_fraction(3_899, 3_900, 3_900), 0.0);
    assert_eq!(time_remaining_minutes(3_899, 2_900, 2_000, 3_900, 3_900), 0);
}

#[test]
fn zero_draw_reports_no_runtime() {
    assert_eq!(time_remaining_minutes(4_208, 2_900, 0, 3_200, 4_208), 0);
}
