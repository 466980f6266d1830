use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use isl_toolkit::Value;

/// Opacity of decision-region shading behind the data points.
const REGION_ALPHA: u8 = 48;

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
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: class label → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct labels of the class column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub column: String,
    mapping: BTreeMap<Value, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(column: &str, labels: &BTreeSet<Value>) -> Self {
        let mapping = labels
            .iter()
            .cloned()
            .zip(generate_palette(labels.len()))
            .collect();

        ColorMap {
            column: column.to_string(),
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Colour for a data point with this label.
    pub fn color_for(&self, label: &Value) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Translucent colour for mesh points predicted as this label.
    pub fn region_color_for(&self, label: &Value) -> Color32 {
        let c = self.color_for(label);
        Color32::from_rgba_unmultiplied(c.r(), c.g(), c.b(), REGION_ALPHA)
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }
}
