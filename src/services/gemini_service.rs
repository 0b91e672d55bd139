// src/services/gemini_service.rs
use crate::config::{Config, CredentialContext};
use crate::errors::CabinetError;
use crate::models::*;
use crate::services::DesignService;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use log::{debug, info};
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;

const ANALYSIS_PROMPT: &str = "Analyze this kitchen's existing elements (flooring, countertops, backsplash, lighting). Suggest 4 specific paint colors for the cabinets that would complement the room perfectly. Return the response in JSON format.";

pub struct GeminiService {
    api_base: String,
    analysis_model: String,
    generation_model: String,
    credentials: Arc<CredentialContext>,
    client: Client,
}

impl GeminiService {
    pub fn new(config: &Config, credentials: Arc<CredentialContext>) -> Result<Self, CabinetError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CabinetError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_base: config.api_base.clone(),
            analysis_model: config.analysis_model.clone(),
            generation_model: config.generation_model.clone(),
            credentials,
            client,
        })
    }

    fn endpoint_for_model(&self, model: &str) -> String {
        let model = model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn response_schema() -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "reasoning": {
                    "type": "STRING",
                    "description": "Brief design advice on why these colors work."
                },
                "suggestedColors": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": { "type": "STRING" },
                            "hex": {
                                "type": "STRING",
                                "description": "A representative hex code for the paint color"
                            },
                            "description": {
                                "type": "STRING",
                                "description": "Why this fits the room"
                            }
                        }
                    }
                }
            }
        })
    }

    async fn generate_content(&self, model: &str, payload: &Value) -> Result<Value, CabinetError> {
        let api_key = self
            .credentials
            .api_key()
            .ok_or(CabinetError::CredentialsRequired)?;
        let endpoint = self.endpoint_for_model(model);

        let response = self
            .client
            .post(&endpoint)
            .query(&[("key", api_key.as_str())])
            .json(payload)
            .send()
            .await
            .map_err(|e| CabinetError::Service(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(CabinetError::from_remote(status.as_u16(), &error_text));
        }

        response
            .json()
            .await
            .map_err(|e| CabinetError::Service(format!("Failed to parse Gemini response: {}", e)))
    }

    fn first_candidate_parts(result: &Value) -> &[Value] {
        result["candidates"][0]["content"]["parts"]
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn extract_text(result: &Value) -> Option<String> {
        let text: String = Self::first_candidate_parts(result)
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect();
        Some(text).filter(|text| !text.trim().is_empty())
    }

    fn extract_image(result: &Value) -> Result<GeneratedImage, CabinetError> {
        for part in Self::first_candidate_parts(result) {
            let inline = if part["inlineData"].is_object() {
                &part["inlineData"]
            } else {
                &part["inline_data"]
            };
            let Some(data) = inline["data"].as_str().filter(|data| !data.is_empty()) else {
                continue;
            };

            let bytes = general_purpose::STANDARD
                .decode(data)
                .map_err(|e| CabinetError::Service(format!("Failed to decode image: {}", e)))?;
            let mime_type = inline["mimeType"]
                .as_str()
                .or_else(|| inline["mime_type"].as_str())
                .unwrap_or("image/png")
                .to_string();

            return Ok(GeneratedImage {
                mime_type,
                data: Bytes::from(bytes),
            });
        }

        Err(CabinetError::Service(
            "No image generated in response".to_string(),
        ))
    }
}

fn image_part(image: &EncodedImage) -> Value {
    json!({
        "inlineData": {
            "mimeType": image.mime_type,
            "data": image.data
        }
    })
}

#[async_trait]
impl DesignService for GeminiService {
    async fn analyze(&self, image: &EncodedImage) -> Result<AnalysisResult, CabinetError> {
        let start = Instant::now();
        let payload = json!({
            "contents": [{
                "parts": [
                    image_part(image),
                    { "text": ANALYSIS_PROMPT }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": Self::response_schema()
            }
        });

        let result = self.generate_content(&self.analysis_model, &payload).await?;
        let text = Self::extract_text(&result)
            .ok_or_else(|| CabinetError::Service("No response from AI".to_string()))?;

        let analysis: AnalysisResult = serde_json::from_str(&text)
            .map_err(|e| CabinetError::Service(format!("Failed to parse analysis JSON: {}", e)))?;

        info!(
            "Analysis with {} returned {} colors in {:?}",
            self.analysis_model,
            analysis.suggested_colors.len(),
            start.elapsed()
        );
        Ok(analysis)
    }

    async fn generate(
        &self,
        image: &EncodedImage,
        instruction: &str,
    ) -> Result<GeneratedImage, CabinetError> {
        let start = Instant::now();
        debug!("Generation instruction: {}", instruction);
        // Image models reject responseMimeType, so no generationConfig is sent.
        let payload = json!({
            "contents": [{
                "parts": [
                    image_part(image),
                    { "text": instruction }
                ]
            }]
        });

        let result = self.generate_content(&self.generation_model, &payload).await?;
        let generated = Self::extract_image(&result)?;

        info!(
            "Generation with {} produced {} bytes in {:?}",
            self.generation_model,
            generated.data.len(),
            start.elapsed()
        );
        Ok(generated)
    }
}
