// src/composer.rs
//! Turns a resolved selection into the edit instruction sent to the image model.

use crate::models::{ColorChoice, Hardware, SelectionSnapshot, Sheen};

const BASE_DIRECTIVE: &str = "Edit this image.";

const CLOSING_DIRECTIVE: &str = " Keep the countertops, backsplash, flooring, walls, appliances, and lighting largely as they are unless instructed otherwise. \
Maintain the wood grain texture or finish details if visible (unless changing sheen). \
Ensure a photorealistic interior design result. High quality, 4k.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintColor {
    pub name: String,
    pub hex: Option<String>,
}

/// A selection with every precedence rule already applied.
///
/// `color: None` means the cabinets keep their current color, whether the
/// user never picked one or explicitly chose the original finish.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResolvedSelection {
    pub color: Option<PaintColor>,
    pub hardware: Hardware,
    pub sheen: Sheen,
    pub tweak: String,
}

impl ResolvedSelection {
    pub fn from_snapshot(snapshot: &SelectionSnapshot) -> Self {
        let color = match &snapshot.color {
            ColorChoice::Custom { text } if !text.trim().is_empty() => Some(PaintColor {
                name: text.trim().to_string(),
                hex: None,
            }),
            ColorChoice::Preset(option) if !option.name.trim().is_empty() => Some(PaintColor {
                name: option.name.trim().to_string(),
                hex: Some(option.hex.clone()).filter(|hex| !hex.is_empty()),
            }),
            _ => None,
        };

        Self {
            color,
            hardware: snapshot.hardware,
            sheen: snapshot.sheen,
            tweak: snapshot.tweak.clone(),
        }
    }

    /// True when sending this selection would ask the model for nothing.
    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.hardware == Hardware::KeepExisting
            && self.sheen == Sheen::Default
            && self.tweak.trim().is_empty()
    }
}

pub fn compose(selection: &ResolvedSelection) -> String {
    let mut prompt = String::from(BASE_DIRECTIVE);

    match &selection.color {
        Some(color) => {
            prompt.push_str(&format!(" Paint the kitchen cabinets {}", color.name));
            if let Some(hex) = &color.hex {
                prompt.push_str(&format!(" (approximate hex: {})", hex));
            }
            prompt.push('.');
        }
        None => prompt.push_str(" Keep the existing cabinet color."),
    }

    if selection.sheen != Sheen::Default {
        prompt.push_str(&format!(
            " Apply a {} finish to the cabinets.",
            selection.sheen.label()
        ));
    } else if selection.color.is_none() {
        prompt.push_str(" Maintain existing finish details.");
    }

    if selection.hardware != Hardware::KeepExisting {
        prompt.push_str(&format!(
            " Replace the cabinet hardware (handles/knobs) with {}.",
            selection.hardware.name()
        ));
    }

    if !selection.tweak.trim().is_empty() {
        prompt.push_str(&format!(
            " User Instructions/Tweaks: \"{}\".",
            selection.tweak
        ));
    }

    prompt.push_str(CLOSING_DIRECTIVE);
    prompt
}
