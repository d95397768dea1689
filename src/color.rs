use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::fields::fold;
use crate::data::model::Category;

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

/// Cartographic convention for the two school-calendar regimes.
pub fn regime_color(value: &str) -> Option<Color32> {
    match fold(value).as_str() {
        "costa" => Some(Color32::from_rgb(0xd4, 0x00, 0x00)),
        "sierra" => Some(Color32::from_rgb(0xf4, 0xd0, 0x3f)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category value → Color32
// ---------------------------------------------------------------------------

/// Maps the distinct values of a chosen category to distinct colours.
#[derive(Debug, Clone)]
pub struct CategoryColors {
    pub category: Category,
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl CategoryColors {
    /// Build a colour map for the given category from its distinct values.
    /// The regime category keeps its fixed red/yellow convention; everything
    /// else gets evenly spaced hues.
    pub fn new(category: Category, values: &BTreeSet<String>) -> Self {
        let palette = generate_palette(values.len());
        let mapping: BTreeMap<String, Color32> = values
            .iter()
            .zip(palette.into_iter())
            .map(|(value, generated): (&String, Color32)| {
                let color = if category == Category::Regime {
                    regime_color(value).unwrap_or(Color32::GRAY)
                } else {
                    generated
                };
                (value.clone(), color)
            })
            .collect();

        CategoryColors {
            category,
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a value; missing values go gray.
    pub fn color_for(&self, value: Option<&str>) -> Color32 {
        value
            .and_then(|v| self.mapping.get(v))
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Legend entries (value label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(value, color): (&String, &Color32)| (value.clone(), *color))
            .collect()
    }
}

// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regimes_keep_the_fixed_convention() {
        let values: BTreeSet<String> = ["COSTA", "SIERRA", "AMAZONÍA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let colors = CategoryColors::new(Category::Regime, &values);
        assert_eq!(
            colors.color_for(Some("COSTA")),
            Color32::from_rgb(0xd4, 0x00, 0x00)
        );
        assert_eq!(
            colors.color_for(Some("SIERRA")),
            Color32::from_rgb(0xf4, 0xd0, 0x3f)
        );
        assert_eq!(colors.color_for(Some("AMAZONÍA")), Color32::GRAY);
        assert_eq!(colors.color_for(None), Color32::GRAY);
    }

    #[test]
    fn other_categories_get_distinct_hues() {
        let values: BTreeSet<String> = ["AZUAY", "GUAYAS", "LOJA"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let colors = CategoryColors::new(Category::Province, &values);
        let legend = colors.legend_entries();
        assert_eq!(legend.len(), 3);
        assert_ne!(legend[0].1, legend[1].1);
        assert_ne!(legend[1].1, legend[2].1);
    }
}
