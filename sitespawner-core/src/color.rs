//! Coverage ratio to color mapping.

/// Gradient stops from 0% (red) to 100% (green), evenly spaced.
pub const GRADIENT_STOPS: [[u8; 3]; 5] = [
    [0xef, 0x44, 0x44],
    [0xf9, 0x73, 0x16],
    [0xea, 0xb3, 0x08],
    [0x84, 0xcc, 0x16],
    [0x16, 0xa3, 0x4a],
];

const SEGMENT_SIZE: f64 = 100.0 / (GRADIENT_STOPS.len() - 1) as f64;
const LAST_SEGMENT: usize = GRADIENT_STOPS.len() - 2;

/// Color for `value` out of `total`, as a lowercase `#rrggbb` string.
///
/// A zero `total` maps to the 0% color.
pub fn color_for(value: u64, total: u64) -> String {
    let percentage = if total == 0 {
        0.0
    } else {
        value as f64 / total as f64 * 100.0
    };
    gradient(percentage)
}

/// Interpolate the gradient at `percentage`.
///
/// Values outside `0..=100` extrapolate along the first or last segment and
/// each channel is clamped to `0..=255`.
pub fn gradient(percentage: f64) -> String {
    let segment = ((percentage / SEGMENT_SIZE) as i64).clamp(0, LAST_SEGMENT as i64) as usize;
    let fraction = (percentage - segment as f64 * SEGMENT_SIZE) / SEGMENT_SIZE;
    let start = GRADIENT_STOPS[segment];
    let end = GRADIENT_STOPS[segment + 1];

    let channel = |index: usize| {
        let from = f64::from(start[index]);
        let to = f64::from(end[index]);
        (from + (to - from) * fraction).round_ties_even().clamp(0.0, 255.0) as u8
    };
    format!("#{:02x}{:02x}{:02x}", channel(0), channel(1), channel(2))
}
