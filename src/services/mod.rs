// src/services/mod.rs
pub mod gemini_service;
pub mod image_encoder;
pub mod session_store;

pub use gemini_service::GeminiService;
pub use image_encoder::ImageEncoder;
pub use session_store::SessionStore;

use crate::errors::CabinetError;
use crate::models::{AnalysisResult, EncodedImage, GeneratedImage};
use async_trait::async_trait;

/// Remote image understanding and editing.
#[async_trait]
pub trait DesignService: Send + Sync {
    /// Suggests cabinet colors for the pictured kitchen.
    async fn analyze(&self, image: &EncodedImage) -> Result<AnalysisResult, CabinetError>;

    /// Edits the picture according to `instruction`.
    async fn generate(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> Result<GeneratedImage, CabinetError>;
}
