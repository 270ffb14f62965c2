//! Casts between cell counts, pixel coordinates and detector values.
//!
//! Pedantic clippy flags every lossy `as`; the allowances live here so the
//! call sites stay clean.

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn usize_to_f32(value: usize) -> f32 {
    value as f32
}

/// Convert usize to f64 with allowed precision loss.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn u64_to_f64(value: u64) -> f64 {
    value as f64
}

/// Color channel from a float, rounded and clamped. NaN is black.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f32_to_u8(value: f32) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.clamp(0.0, 255.0).round() as u8
    }
}

/// Convert f64 to usize, flooring and clamping to `[0, max_inclusive]`.
///
/// NaN maps to 0.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_usize_clamped(value: f64, max_inclusive: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let floored = value.floor();
    if floored >= usize_to_f64(max_inclusive) {
        max_inclusive
    } else {
        floored as usize
    }
}

/// Convert f64 to usize with bounds checking.
///
/// Returns `None` if the value is not finite, negative, or >= `max_exclusive`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn f64_to_usize_bounded(value: f64, max_exclusive: usize) -> Option<usize> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    if value >= usize_to_f64(max_exclusive) {
        return None;
    }
    Some(value as usize)
}

/// Round an f64 to the nearest i64, saturating at the i64 range.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn round_to_i64(value: f64) -> i64 {
    // `as` saturates for out-of-range floats.
    value.round() as i64
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn i64_to_f64(value: i64) -> f64 {
    value as f64
}

/// Thousands-separated integer for labels and the statistics panel.
#[must_use]
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 3 == lead {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_u8_clamps() {
        assert_eq!(f32_to_u8(-5.0), 0);
        assert_eq!(f32_to_u8(300.0), 255);
        assert_eq!(f32_to_u8(127.6), 128);
        assert_eq!(f32_to_u8(f32::NAN), 0);
    }

    #[test]
    fn test_f64_to_usize_clamped() {
        assert_eq!(f64_to_usize_clamped(-1.0, 10), 0);
        assert_eq!(f64_to_usize_clamped(3.9, 10), 3);
        assert_eq!(f64_to_usize_clamped(99.0, 10), 10);
        assert_eq!(f64_to_usize_clamped(f64::INFINITY, 10), 10);
        assert_eq!(f64_to_usize_clamped(f64::NAN, 10), 0);
    }

    #[test]
    fn test_f64_to_usize_bounded() {
        assert_eq!(f64_to_usize_bounded(2.5, 4), Some(2));
        assert_eq!(f64_to_usize_bounded(4.0, 4), None);
        assert_eq!(f64_to_usize_bounded(-0.5, 4), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(12_345_678), "12,345,678");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(42), "42");
    }
}
