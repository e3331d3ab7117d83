//! State-of-charge and runtime estimation from battery voltage.
//!
//! The board has no coulomb counter, so charge is interpolated linearly between the
//! cutoff voltage and the fully-charged voltage, and runtime assumes a constant draw.
//! Percent and minutes are floored in integer arithmetic on the millivolt span.

/// Millivolts above the cutoff, clamped to the usable span, and the span itself.
///
/// With `vbat_max_mv <= vbat_low_mv` the battery is either full (at or above the cutoff) or empty.
fn usable_mv(vbat_mv: u16, vbat_low_mv: u16, vbat_max_mv: u16) -> (u32, u32) {
    if vbat_max_mv <= vbat_low_mv {
        return (u32::from(vbat_mv >= vbat_low_mv), 1);
    }
    let span = u32::from(vbat_max_mv - vbat_low_mv);
    let above = u32::from(vbat_mv.saturating_sub(vbat_low_mv)).min(span);
    (above, span)
}

/// Fraction of usable charge left, in `[0, 1]`.
pub fn charge_fraction(vbat_mv: u16, vbat_low_mv: u16, vbat_max_mv: u16) -> f32 {
    let (above, span) = usable_mv(vbat_mv, vbat_low_mv, vbat_max_mv);
    above as f32 / span as f32
}

/// Whole percent of usable charge left, `0..=100`.
pub fn charge_percent(vbat_mv: u16, vbat_low_mv: u16, vbat_max_mv: u16) -> u8 {
    let (above, span) = usable_mv(vbat_mv, vbat_low_mv, vbat_max_mv);
    // above <= span, so the quotient is at most 100.
    (above * 100 / span) as u8
}

/// Whole minutes of runtime left at a constant `draw_ma`.
pub fn time_remaining_minutes(
    vbat_mv: u16,
    capacity_mah: u16,
    draw_ma: u16,
    vbat_low_mv: u16,
    vbat_max_mv: u16,
) -> u32 {
    if draw_ma == 0 {
        return 0;
    }
    let (above, span) = usable_mv(vbat_mv, vbat_low_mv, vbat_max_mv);
    let minutes = u64::from(above) * 60 * u64::from(capacity_mah) / (u64::from(span) * u64::from(draw_ma));
    u32::try_from(minutes).unwrap_or(u32::MAX)
}
