// src/models.rs
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorOption {
    pub name: String,
    pub hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, rename = "isAI")]
    pub is_ai: bool,
}

/// The user's cabinet color decision.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorChoice {
    #[default]
    Unset,
    Preset(ColorOption),
    Custom {
        text: String,
    },
    OriginalFinish,
}

impl ColorChoice {
    pub fn preset(&self) -> Option<&ColorOption> {
        match self {
            ColorChoice::Preset(color) => Some(color),
            _ => None,
        }
    }

    pub fn custom_text(&self) -> &str {
        match self {
            ColorChoice::Custom { text } => text,
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Hardware {
    #[default]
    #[serde(rename = "none")]
    KeepExisting,
    #[serde(rename = "gold-bar")]
    BrushedGoldBarPulls,
    #[serde(rename = "black-matte")]
    MatteBlackHandles,
    #[serde(rename = "chrome-knobs")]
    PolishedChromeKnobs,
    #[serde(rename = "bronze-cup")]
    OilRubbedBronzeCupPulls,
    #[serde(rename = "minimalist")]
    FingerPulls,
}

impl Hardware {
    pub const ALL: [Hardware; 6] = [
        Hardware::KeepExisting,
        Hardware::BrushedGoldBarPulls,
        Hardware::MatteBlackHandles,
        Hardware::PolishedChromeKnobs,
        Hardware::OilRubbedBronzeCupPulls,
        Hardware::FingerPulls,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Hardware::KeepExisting => "none",
            Hardware::BrushedGoldBarPulls => "gold-bar",
            Hardware::MatteBlackHandles => "black-matte",
            Hardware::PolishedChromeKnobs => "chrome-knobs",
            Hardware::OilRubbedBronzeCupPulls => "bronze-cup",
            Hardware::FingerPulls => "minimalist",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Hardware::KeepExisting => "Keep Existing",
            Hardware::BrushedGoldBarPulls => "Brushed Gold Bar Pulls",
            Hardware::MatteBlackHandles => "Matte Black Handles",
            Hardware::PolishedChromeKnobs => "Polished Chrome Knobs",
            Hardware::OilRubbedBronzeCupPulls => "Oil-Rubbed Bronze Cup Pulls",
            Hardware::FingerPulls => "Finger Pulls / Handleless",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Hardware::KeepExisting => "Retain current hardware",
            Hardware::BrushedGoldBarPulls => "Modern luxury",
            Hardware::MatteBlackHandles => "Sleek contrast",
            Hardware::PolishedChromeKnobs => "Classic shine",
            Hardware::OilRubbedBronzeCupPulls => "Farmhouse style",
            Hardware::FingerPulls => "Ultra modern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sheen {
    #[default]
    Default,
    Matte,
    Satin,
    #[serde(rename = "Semi-Gloss")]
    SemiGloss,
    #[serde(rename = "High-Gloss")]
    HighGloss,
}

impl Sheen {
    pub const ALL: [Sheen; 5] = [
        Sheen::Default,
        Sheen::Matte,
        Sheen::Satin,
        Sheen::SemiGloss,
        Sheen::HighGloss,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Sheen::Default => "Default",
            Sheen::Matte => "Matte",
            Sheen::Satin => "Satin",
            Sheen::SemiGloss => "Semi-Gloss",
            Sheen::HighGloss => "High-Gloss",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    pub color: ColorChoice,
    pub hardware: Hardware,
    pub sheen: Sheen,
    pub tweak: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub reasoning: String,
    pub suggested_colors: Vec<ColorOption>,
}

/// An uploaded image, base64 encoded for the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    pub data: String,
}

/// Raw image returned by the synthesis model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub image: GeneratedImage,
    pub prompt_used: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    #[default]
    Idle,
    Analyzing,
    Generating,
    Complete,
}

impl ProcessingState {
    pub fn is_busy(self) -> bool {
        matches!(self, ProcessingState::Analyzing | ProcessingState::Generating)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub mime_type: String,
    pub size: usize,
    pub prompt_used: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    pub has_key: bool,
    pub interactive_selection: bool,
}

/// Read model of a wizard session handed to the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    pub state: ProcessingState,
    pub error: Option<String>,
    pub selection: SelectionSnapshot,
    pub analysis: Option<AnalysisResult>,
    pub has_image: bool,
    pub artifact: Option<ArtifactSummary>,
    pub credentials: CredentialStatus,
}
