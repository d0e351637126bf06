use palette::{IntoColor, Lab, Mix, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Diverging colour map for correlation heatmaps
// ---------------------------------------------------------------------------

/// Anchor colours of the cool-warm map (Moreland), low → mid → high.
const COOL: (u8, u8, u8) = (59, 76, 192);
const NEUTRAL: (u8, u8, u8) = (221, 221, 221);
const WARM: (u8, u8, u8) = (180, 4, 38);

/// Cool-warm map over `[min, max]`, interpolated in CIE Lab so the midpoint
/// stays perceptually neutral.
#[derive(Debug, Clone, Copy)]
pub struct DivergingMap {
    pub min: f64,
    pub max: f64,
    /// Warm colours at the low end instead of the high end.
    pub reversed: bool,
}

impl DivergingMap {
    /// The map used for correlation coefficients: `[-1, 1]`, negative
    /// correlations warm, positive ones cool.
    pub fn correlation() -> Self {
        DivergingMap {
            min: -1.0,
            max: 1.0,
            reversed: true,
        }
    }

    /// Colour for `value`, clamped into the map's range.
    pub fn color_for(&self, value: f64) -> RGBColor {
        let span = self.max - self.min;
        let mut t = if span > 0.0 && value.is_finite() {
            ((value - self.min) / span).clamp(0.0, 1.0)
        } else {
            0.5
        };
        if self.reversed {
            t = 1.0 - t;
        }

        let lab = if t < 0.5 {
            to_lab(COOL).mix(to_lab(NEUTRAL), (t * 2.0) as f32)
        } else {
            to_lab(NEUTRAL).mix(to_lab(WARM), ((t - 0.5) * 2.0) as f32)
        };
        from_lab(lab)
    }
}

fn to_lab((r, g, b): (u8, u8, u8)) -> Lab {
    Srgb::new(r, g, b).into_format::<f32>().into_color()
}

fn from_lab(lab: Lab) -> RGBColor {
    let rgb: Srgb = lab.into_color();
    let rgb: Srgb<u8> = rgb.into_format();
    RGBColor(rgb.red, rgb.green, rgb.blue)
}
