// src/handlers.rs
use crate::catalog::Catalog;
use crate::errors::CabinetError;
use crate::models::*;
use crate::wizard::{Trigger, run_generation, run_upload};
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures_util::TryStreamExt;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct TextBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct HardwareBody {
    pub hardware: Hardware,
}

#[derive(Debug, Deserialize)]
pub struct SheenBody {
    pub sheen: Sheen,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyBody {
    pub api_key: String,
}

async fn session_view(data: &AppState, session_id: Uuid) -> Result<HttpResponse, CabinetError> {
    let wizard = data.sessions.get_session(&session_id).await?;
    let view = wizard.lock().await.view();
    Ok(HttpResponse::Ok().json(view))
}

async fn generate(
    data: &AppState,
    session_id: Uuid,
    trigger: Trigger,
) -> Result<HttpResponse, CabinetError> {
    let wizard = data.sessions.get_session(&session_id).await?;
    run_generation(&wizard, data.design_service.as_ref(), trigger).await?;
    let view = wizard.lock().await.view();
    Ok(HttpResponse::Ok().json(view))
}

pub async fn create_session(data: web::Data<AppState>) -> Result<HttpResponse, CabinetError> {
    let (session_id, wizard) = data.sessions.create_session().await;
    let view = wizard.lock().await.view();

    Ok(HttpResponse::Created().json(serde_json::json!({
        "session_id": session_id,
        "view": view
    })))
}

pub async fn get_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CabinetError> {
    session_view(&data, path.into_inner()).await
}

pub async fn delete_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CabinetError> {
    data.sessions.remove_session(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn upload_image(
    path: web::Path<Uuid>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let wizard = data.sessions.get_session(&session_id).await?;

    let mut field = payload
        .try_next()
        .await?
        .ok_or_else(|| CabinetError::Validation("No file provided".to_string()))?;

    let content_type = field
        .content_type()
        .map(|ct| ct.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let max_upload_bytes = data.image_encoder.max_upload_bytes();
    let mut image_data = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        if image_data.len() + chunk.len() > max_upload_bytes {
            return Err(CabinetError::Validation(format!(
                "Upload exceeds {} bytes",
                max_upload_bytes
            ))
            .into());
        }
        image_data.extend_from_slice(&chunk);
    }

    run_upload(
        &wizard,
        &data.image_encoder,
        data.design_service.as_ref(),
        image_data,
        &content_type,
    )
    .await?;

    let view = wizard.lock().await.view();
    Ok(HttpResponse::Ok().json(view))
}

pub async fn select_preset(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<ColorOption>,
) -> Result<HttpResponse, CabinetError> {
    let color = body.into_inner();
    if color.name.trim().is_empty() {
        return Err(CabinetError::Validation("Color name must not be empty".to_string()));
    }
    generate(&data, path.into_inner(), Trigger::Preset(color)).await
}

pub async fn select_original_finish(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CabinetError> {
    generate(&data, path.into_inner(), Trigger::OriginalFinish).await
}

pub async fn select_hardware(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<HardwareBody>,
) -> Result<HttpResponse, CabinetError> {
    generate(&data, path.into_inner(), Trigger::Hardware(body.hardware)).await
}

pub async fn apply_tweak(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CabinetError> {
    generate(&data, path.into_inner(), Trigger::ApplyTweak).await
}

pub async fn apply_custom_look(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CabinetError> {
    generate(&data, path.into_inner(), Trigger::ApplyCustomLook).await
}

pub async fn edit_custom_color(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<TextBody>,
) -> Result<HttpResponse, CabinetError> {
    let session_id = path.into_inner();
    let wizard = data.sessions.get_session(&session_id).await?;
    wizard.lock().await.edit_custom_color(&body.text);
    session_view(&data, session_id).await
}

pub async fn select_sheen(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<SheenBody>,
) -> Result<HttpResponse, CabinetError> {
    let session_id = path.into_inner();
    let wizard = data.sessions.get_session(&session_id).await?;
    wizard.lock().await.select_sheen(body.sheen);
    session_view(&data, session_id).await
}

pub async fn edit_tweak(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<TextBody>,
) -> Result<HttpResponse, CabinetError> {
    let session_id = path.into_inner();
    let wizard = data.sessions.get_session(&session_id).await?;
    wizard.lock().await.edit_tweak(&body.text);
    session_view(&data, session_id).await
}

pub async fn reset_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CabinetError> {
    let session_id = path.into_inner();
    let wizard = data.sessions.get_session(&session_id).await?;
    wizard.lock().await.reset();
    session_view(&data, session_id).await
}

pub async fn get_generated_image(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, CabinetError> {
    let wizard = data.sessions.get_session(&path.into_inner()).await?;
    let wizard = wizard.lock().await;

    match wizard.artifact() {
        Some(artifact) => Ok(HttpResponse::Ok()
            .content_type(artifact.image.mime_type.as_str())
            .body(artifact.image.data.clone())),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "Not found",
            "message": "No image has been generated yet"
        }))),
    }
}

pub async fn get_catalog() -> HttpResponse {
    HttpResponse::Ok().json(Catalog::load())
}

pub async fn get_credentials(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.credentials.status())
}

pub async fn select_credentials(
    data: web::Data<AppState>,
    body: web::Json<ApiKeyBody>,
) -> Result<HttpResponse, CabinetError> {
    data.credentials.select_key(body.into_inner().api_key)?;
    Ok(HttpResponse::Ok().json(data.credentials.status()))
}
