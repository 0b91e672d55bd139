// src/config.rs
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use log::warn;

use crate::errors::CabinetError;
use crate::models::CredentialStatus;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-3-pro-image-preview";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 2048;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 86400;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base: String,
    pub analysis_model: String,
    pub generation_model: String,
    pub bind_addr: String,
    pub interactive_key_selection: bool,
    pub max_image_dimension: u32,
    pub request_timeout: Duration,
    pub max_upload_bytes: usize,
    /// Sessions idle for longer than this are evicted.
    pub session_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, CabinetError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source, ignoring blank values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CabinetError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let max_image_dimension = match var("MAX_IMAGE_DIMENSION") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| {
                    CabinetError::Config(format!("MAX_IMAGE_DIMENSION is not a positive integer: {}", raw))
                })?,
            None => DEFAULT_MAX_IMAGE_DIMENSION,
        };

        let request_timeout_secs = match var("REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                CabinetError::Config(format!("REQUEST_TIMEOUT_SECS is invalid ({}): {}", raw, e))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let max_upload_bytes = match var("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| {
                    CabinetError::Config(format!("MAX_UPLOAD_BYTES is not a positive integer: {}", raw))
                })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let session_ttl_secs = match var("SESSION_TTL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                CabinetError::Config(format!("SESSION_TTL_SECS is invalid ({}): {}", raw, e))
            })?,
            None => DEFAULT_SESSION_TTL_SECS,
        };

        let interactive_key_selection = var("KEY_SELECTION_ENABLED")
            .map(|value| matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            api_key: var("API_KEY").or_else(|| var("GEMINI_API_KEY")),
            api_base: var("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            analysis_model: var("ANALYSIS_MODEL").unwrap_or_else(|| DEFAULT_ANALYSIS_MODEL.to_string()),
            generation_model: var("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            interactive_key_selection,
            max_image_dimension,
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_upload_bytes,
            session_ttl: Duration::from_secs(session_ttl_secs),
        })
    }
}

#[derive(Debug, Default)]
struct CredentialState {
    api_key: Option<String>,
    valid: bool,
}

/// Process-wide credential status shared by every session.
#[derive(Debug)]
pub struct CredentialContext {
    interactive_selection: bool,
    state: RwLock<CredentialState>,
}

impl CredentialContext {
    pub fn new(api_key: Option<String>, interactive_selection: bool) -> Self {
        let valid = api_key.is_some();
        Self {
            interactive_selection,
            state: RwLock::new(CredentialState { api_key, valid }),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_key.clone(), config.interactive_key_selection)
    }

    pub fn interactive_selection(&self) -> bool {
        self.interactive_selection
    }

    pub fn has_valid_credential(&self) -> bool {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.valid && state.api_key.is_some()
    }

    pub fn api_key(&self) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.api_key.clone().filter(|_| state.valid)
    }

    /// Installs a key chosen through the interactive flow.
    pub fn select_key(&self, api_key: String) -> Result<(), CabinetError> {
        if !self.interactive_selection {
            return Err(CabinetError::Validation(
                "Interactive key selection is disabled; set API_KEY in the hosting environment"
                    .to_string(),
            ));
        }
        let api_key = api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(CabinetError::Validation("API key must not be empty".to_string()));
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.api_key = Some(api_key);
        state.valid = true;
        Ok(())
    }

    /// Marks the current key unusable after the remote service rejected it.
    pub fn revoke(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.valid {
            warn!("API key rejected by the remote service; credential marked invalid");
        }
        state.valid = false;
    }

    pub fn status(&self) -> CredentialStatus {
        CredentialStatus {
            has_key: self.has_valid_credential(),
            interactive_selection: self.interactive_selection,
        }
    }
}
