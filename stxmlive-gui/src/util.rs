//! Conversions between egui's `f32` points and the engine's `f64` pixels.

use eframe::egui;

/// Convert f64 to f32 with allowed precision loss.
#[allow(clippy::cast_possible_truncation)]
pub fn f64_to_f32(value: f64) -> f32 {
    value as f32
}

/// Screen-space vector as an engine `(x, y)` pair.
pub fn vec_to_pair(v: egui::Vec2) -> (f64, f64) {
    (f64::from(v.x), f64::from(v.y))
}

/// Engine `(x, y)` pair as a screen-space vector.
pub fn pair_to_vec(pair: (f64, f64)) -> egui::Vec2 {
    egui::vec2(f64_to_f32(pair.0), f64_to_f32(pair.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_survive_conversion() {
        let v = egui::vec2(12.5, -3.0);
        assert_eq!(pair_to_vec(vec_to_pair(v)), v);
        assert!((f64_to_f32(0.1) - 0.1).abs() < f32::EPSILON);
    }
}
