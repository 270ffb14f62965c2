//! Color scheme definitions and the normalized-value to RGB mapping.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::util::{f32_to_u8, f64_to_usize_clamped, usize_to_f32};

/// Available color schemes for grid and legend rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    /// Blue to yellow to red.
    #[default]
    Linear,
    /// Black to white.
    Grayscale,
    /// Red-dominant ramp with power-law green and blue falloff.
    Heat,
    /// Approximate Viridis (dark blue to teal to yellow).
    Viridis,
    /// Log-boosted ramp that lifts low intensities before a three-stop ramp.
    Hdr,
}

impl ColorScheme {
    /// Every scheme, in display order.
    pub const ALL: [ColorScheme; 5] = [
        ColorScheme::Linear,
        ColorScheme::Grayscale,
        ColorScheme::Heat,
        ColorScheme::Viridis,
        ColorScheme::Hdr,
    ];

    /// Short identifier used in export metadata and on the command line.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            ColorScheme::Linear => "linear",
            ColorScheme::Grayscale => "grayscale",
            ColorScheme::Heat => "heat",
            ColorScheme::Viridis => "viridis",
            ColorScheme::Hdr => "hdr",
        }
    }

    /// Parse a scheme from its [`key`](Self::key).
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|scheme| scheme.key().eq_ignore_ascii_case(key.trim()))
    }

    /// Apply the scheme to a normalized value and return RGB bytes.
    ///
    /// Values outside [0, 1] are clamped; NaN is treated as 0.
    #[must_use]
    pub fn apply(self, t: f32) -> [u8; 3] {
        color_for(t, self)
    }
}

impl std::fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorScheme::Linear => write!(f, "Linear (Blue-Yellow-Red)"),
            ColorScheme::Grayscale => write!(f, "Grayscale"),
            ColorScheme::Heat => write!(f, "Heat"),
            ColorScheme::Viridis => write!(f, "Viridis"),
            ColorScheme::Hdr => write!(f, "HDR (Log Boost)"),
        }
    }
}

const BLUE: [f32; 3] = [0.0, 0.0, 255.0];
const YELLOW: [f32; 3] = [255.0, 255.0, 0.0];
const RED: [f32; 3] = [255.0, 0.0, 0.0];

const HDR_LOW: [f32; 3] = [10.0, 10.0, 80.0];
const HDR_MID: [f32; 3] = [230.0, 60.0, 40.0];
const HDR_HIGH: [f32; 3] = [255.0, 255.0, 220.0];

fn lerp(a: [f32; 3], b: [f32; 3], s: f32) -> [u8; 3] {
    [
        f32_to_u8(a[0] + (b[0] - a[0]) * s),
        f32_to_u8(a[1] + (b[1] - a[1]) * s),
        f32_to_u8(a[2] + (b[2] - a[2]) * s),
    ]
}

fn three_stop(low: [f32; 3], mid: [f32; 3], high: [f32; 3], t: f32) -> [u8; 3] {
    if t < 0.5 {
        lerp(low, mid, t * 2.0)
    } else {
        lerp(mid, high, (t - 0.5) * 2.0)
    }
}

/// Map a normalized value `t` in [0, 1] to an RGB triple for `scheme`.
///
/// Pure and total: out-of-range input is clamped and NaN maps like 0.
#[must_use]
pub fn color_for(t: f32, scheme: ColorScheme) -> [u8; 3] {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    match scheme {
        ColorScheme::Linear => three_stop(BLUE, YELLOW, RED, t),
        ColorScheme::Grayscale => {
            let v = f32_to_u8(t * 255.0);
            [v, v, v]
        }
        ColorScheme::Heat => [
            f32_to_u8(255.0 * t.sqrt()),
            f32_to_u8(255.0 * t.powi(2)),
            f32_to_u8(255.0 * t.powi(4)),
        ],
        ColorScheme::Viridis => {
            let phase = t * std::f32::consts::PI;
            [
                f32_to_u8(255.0 * t.powi(2)),
                f32_to_u8(255.0 * (phase / 2.0).sin()),
                f32_to_u8(153.0 * (1.0 - t) + 51.0 * phase.sin()),
            ]
        }
        ColorScheme::Hdr => {
            let boosted = (1.0 + 9.0 * t).log10();
            three_stop(HDR_LOW, HDR_MID, HDR_HIGH, boosted)
        }
    }
}

/// One color stop of a legend gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradientStop {
    /// Position along the gradient in [0, 1].
    pub offset: f32,
    /// Color at this position.
    pub rgb: [u8; 3],
}

/// Legend gradient description for one scheme.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gradient {
    /// Low values at the bottom, high values at the top.
    pub vertical: bool,
    /// Ordered stops from low (offset 0) to high (offset 1).
    pub stops: Vec<GradientStop>,
}

/// Number of sampled stops in a legend gradient.
pub const GRADIENT_STOPS: usize = 11;

impl Gradient {
    /// Render as a CSS `linear-gradient(...)` expression.
    #[must_use]
    pub fn to_css(&self) -> String {
        let direction = if self.vertical { "to top" } else { "to right" };
        let mut css = format!("linear-gradient({direction}");
        for stop in &self.stops {
            let [r, g, b] = stop.rgb;
            let _ = write!(css, ", rgb({r}, {g}, {b}) {:.0}%", stop.offset * 100.0);
        }
        css.push(')');
        css
    }

    /// Color at `t`, sampled from the stops by nearest neighbour.
    #[must_use]
    pub fn sample(&self, t: f32) -> [u8; 3] {
        let Some(last) = self.stops.len().checked_sub(1) else {
            return [0, 0, 0];
        };
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let idx = f64_to_usize_clamped(f64::from(t * usize_to_f32(last)).round(), last);
        self.stops[idx].rgb
    }
}

/// Build the legend gradient for `scheme`.
#[must_use]
pub fn gradient_for(scheme: ColorScheme, vertical: bool) -> Gradient {
    let last = usize_to_f32(GRADIENT_STOPS - 1);
    let stops = (0..GRADIENT_STOPS)
        .map(|i| {
            let offset = usize_to_f32(i) / last;
            GradientStop {
                offset,
                rgb: color_for(offset, scheme),
            }
        })
        .collect();
    Gradient { vertical, stops }
}
