use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

/// Fill for communes that have no emissions under the current filters.
pub const NO_DATA: Color32 = Color32::from_rgb(205, 205, 205);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.70, 0.45);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Sequential ramp for the choropleth
// ---------------------------------------------------------------------------

/// Yellow → orange → red stops, low to high.
const YL_OR_RD: [(u8, u8, u8); 5] = [
    (255, 255, 178),
    (254, 204, 92),
    (253, 141, 60),
    (240, 59, 32),
    (189, 0, 38),
];

/// Colour at position `t` in `[0, 1]` of the yellow-orange-red ramp,
/// interpolated in linear RGB. Out-of-range and NaN positions are clamped.
pub fn ylorrd(t: f32) -> Color32 {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (YL_OR_RD.len() - 1) as f32;
    let lower = (scaled.floor() as usize).min(YL_OR_RD.len() - 2);
    let factor = scaled - lower as f32;

    let stop = |(r, g, b): (u8, u8, u8)| -> LinSrgb {
        Srgb::new(r, g, b).into_format::<f32>().into_linear()
    };
    let mixed = stop(YL_OR_RD[lower]).mix(stop(YL_OR_RD[lower + 1]), factor);
    to_color32(Srgb::from_linear(mixed))
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Color mapping: series label → Color32
// ---------------------------------------------------------------------------

/// Maps series labels (source types) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the full, sorted label list so colours stay
    /// stable while filters change.
    pub fn new(labels: &[String]) -> Self {
        let palette = generate_palette(labels.len());
        let mapping = labels.iter().cloned().zip(palette).collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Color32, b: Color32) -> bool {
        let d = |x: u8, y: u8| x.abs_diff(y) <= 1;
        d(a.r(), b.r()) && d(a.g(), b.g()) && d(a.b(), b.b())
    }

    #[test]
    fn ramp_hits_its_end_stops() {
        assert!(close(ylorrd(0.0), Color32::from_rgb(255, 255, 178)));
        assert!(close(ylorrd(1.0), Color32::from_rgb(189, 0, 38)));
        assert_eq!(ylorrd(7.0), ylorrd(1.0));
        assert_eq!(ylorrd(f32::NAN), ylorrd(0.0));
    }

    #[test]
    fn ramp_darkens_monotonically_in_green() {
        let greens: Vec<u8> = (0..=10).map(|i| ylorrd(i as f32 / 10.0).g()).collect();
        assert!(greens.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn color_map_is_distinct_and_has_fallback() {
        let labels = vec!["fire".to_string(), "wood".to_string()];
        let map = ColorMap::new(&labels);
        assert_ne!(map.color_for("fire"), map.color_for("wood"));
        assert_eq!(map.color_for("unknown"), Color32::GRAY);
    }
}
