// ── Unit conversions ──
//
// The processor speaks 16-bit levels (0..=65535) for lights and shades and
// tenths of a degree for temperatures. Consumers speak percent and degrees.

/// Full-scale light level / shade position.
pub const MAX_LEVEL: u16 = u16::MAX;

/// Percent (0..=100) to a raw level, rounded to nearest.
pub fn percent_to_level(percent: u8) -> u16 {
    let pct = u32::from(percent.min(100));
    let level = (pct * u32::from(MAX_LEVEL) + 50) / 100;
    u16::try_from(level).unwrap_or(MAX_LEVEL)
}

/// Raw level to percent (0..=100), rounded to nearest.
pub fn level_to_percent(level: u16) -> u8 {
    let max = u32::from(MAX_LEVEL);
    let pct = (u32::from(level) * 100 + max / 2) / max;
    u8::try_from(pct).unwrap_or(100)
}

/// Clamp a wire level into `0..=65535`.
pub fn clamp_level(raw: i64) -> u16 {
    u16::try_from(raw.clamp(0, i64::from(MAX_LEVEL))).unwrap_or(MAX_LEVEL)
}

pub fn deci_to_degrees(deci: f64) -> f64 {
    deci / 10.0
}

/// Degrees to tenths of a degree, rounded to nearest.
#[allow(clippy::cast_possible_truncation)]
pub fn degrees_to_deci(degrees: f64) -> i64 {
    (degrees * 10.0).round() as i64
}
