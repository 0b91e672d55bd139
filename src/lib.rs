// src/lib.rs
use actix_web::{HttpResponse, web};
use std::sync::Arc;

pub mod catalog;
pub mod composer;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod wizard;

use crate::config::CredentialContext;
use crate::handlers::{
    apply_custom_look, apply_tweak, create_session, delete_session, edit_custom_color, edit_tweak,
    get_catalog, get_credentials, get_generated_image, get_session, reset_session,
    select_credentials, select_hardware, select_original_finish, select_preset, select_sheen,
    upload_image,
};
use crate::services::{DesignService, ImageEncoder, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub design_service: Arc<dyn DesignService>,
    pub image_encoder: Arc<ImageEncoder>,
    pub credentials: Arc<CredentialContext>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/catalog", web::get().to(get_catalog))
            .route("/credentials", web::get().to(get_credentials))
            .route("/credentials", web::post().to(select_credentials))
            .route("/sessions", web::post().to(create_session))
            .route("/sessions/{session_id}", web::get().to(get_session))
            .route("/sessions/{session_id}", web::delete().to(delete_session))
            .route("/sessions/{session_id}/upload", web::post().to(upload_image))
            .route(
                "/sessions/{session_id}/color/preset",
                web::post().to(select_preset),
            )
            .route(
                "/sessions/{session_id}/color/original",
                web::post().to(select_original_finish),
            )
            .route(
                "/sessions/{session_id}/color/custom",
                web::put().to(edit_custom_color),
            )
            .route(
                "/sessions/{session_id}/hardware",
                web::post().to(select_hardware),
            )
            .route("/sessions/{session_id}/sheen", web::put().to(select_sheen))
            .route("/sessions/{session_id}/tweak", web::put().to(edit_tweak))
            .route(
                "/sessions/{session_id}/apply-tweak",
                web::post().to(apply_tweak),
            )
            .route(
                "/sessions/{session_id}/apply-custom-look",
                web::post().to(apply_custom_look),
            )
            .route("/sessions/{session_id}/reset", web::post().to(reset_session))
            .route(
                "/sessions/{session_id}/image",
                web::get().to(get_generated_image),
            ),
    )
    .route("/health", web::get().to(health_check));
}

async fn health_check(data: Option<web::Data<AppState>>) -> HttpResponse {
    let sessions = match data {
        Some(data) => data.sessions.session_count().await,
        None => 0,
    };
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "cabinet-vision",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": sessions
    }))
}
