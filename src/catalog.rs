// src/catalog.rs
use serde::Serialize;

use crate::models::{ColorOption, Hardware, Sheen};

const POPULAR_COLORS: [(&str, &str, &str, &str, &str); 8] = [
    ("Pure White", "#F5F5F5", "Timeless, clean, and bright.", "Sherwin Williams", "SW 7005"),
    ("Classic Navy", "#2C3E50", "Deep, dramatic, and sophisticated.", "Benjamin Moore", "HC-154"),
    ("Sage Green", "#8DA399", "Earthy, calming, and organic.", "Farrow & Ball", "No. 293"),
    ("Charcoal Gray", "#36454F", "Modern, sleek, and grounding.", "Behr", "PPU18-01"),
    ("Creamy Off-White", "#F0EAD6", "Warm, inviting, and traditional.", "Benjamin Moore", "OC-96"),
    ("Slate Blue", "#5B7C99", "Cool, serene, and coastal.", "Sherwin Williams", "SW 9136"),
    ("Matte Black", "#1A1A1A", "Bold, industrial, and chic.", "Benjamin Moore", "2132-10"),
    ("Greige", "#B0A99F", "The perfect balance of gray and beige.", "Sherwin Williams", "SW 7029"),
];

pub fn popular_colors() -> Vec<ColorOption> {
    POPULAR_COLORS
        .iter()
        .map(|(name, hex, description, manufacturer, code)| ColorOption {
            name: name.to_string(),
            hex: hex.to_string(),
            description: Some(description.to_string()),
            manufacturer: Some(manufacturer.to_string()),
            code: Some(code.to_string()),
            is_ai: false,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct HardwareOption {
    pub id: Hardware,
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub colors: Vec<ColorOption>,
    pub hardware: Vec<HardwareOption>,
    pub sheens: Vec<Sheen>,
}

impl Catalog {
    pub fn load() -> Self {
        Self {
            colors: popular_colors(),
            hardware: Hardware::ALL
                .into_iter()
                .map(|hardware| HardwareOption {
                    id: hardware,
                    name: hardware.name(),
                    description: hardware.description(),
                })
                .collect(),
            sheens: Sheen::ALL.to_vec(),
        }
    }
}
