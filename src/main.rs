// src/main.rs
use actix_web::{App, HttpServer, middleware, web};
use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use cabinet_vision::config::{Config, CredentialContext};
use cabinet_vision::services::{DesignService, GeminiService, ImageEncoder, SessionStore};
use cabinet_vision::{AppState, configure_routes};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting CabinetVision service...");

    let config = Config::from_env().context("Failed to load configuration")?;
    let credentials = Arc::new(CredentialContext::from_config(&config));
    if !credentials.has_valid_credential() {
        if credentials.interactive_selection() {
            warn!("No API key configured; waiting for a key to be selected");
        } else {
            warn!("API_KEY is not set; requests will be rejected until it is configured");
        }
    }

    // Initialize services
    let design_service: Arc<dyn DesignService> = Arc::new(
        GeminiService::new(&config, credentials.clone())
            .context("Failed to initialise the Gemini client")?,
    );
    let session_ttl =
        chrono::Duration::from_std(config.session_ttl).context("SESSION_TTL_SECS is out of range")?;
    let sessions = Arc::new(SessionStore::new(credentials.clone(), session_ttl));
    let app_state = AppState {
        sessions: sessions.clone(),
        design_service,
        image_encoder: Arc::new(
            ImageEncoder::new(config.max_image_dimension)
                .with_max_upload_bytes(config.max_upload_bytes),
        ),
        credentials,
    };

    actix_web::rt::spawn(async move {
        let mut sweep = actix_web::rt::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            sweep.tick().await;
            sessions.evict_expired().await;
        }
    });

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(&config.bind_addr)
    .with_context(|| format!("Failed to bind {}", config.bind_addr))?
    .run()
    .await?;

    Ok(())
}
