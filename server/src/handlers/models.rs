use std::collections::HashMap;

use actix_web::error::{ErrorBadRequest, ErrorNotFound};
use actix_web::{web, HttpResponse};
use common::catalog::Provider;
use common::config::AppConfig;
use common::models::MODEL_TYPE_API;
use common::secrets::SecretBox;
use common::GUEST_USER_ID;
use proxy::{HealthReport, ProviderClient};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use super::db_error;

#[derive(Deserialize)]
pub struct UploadRequest {
    pub name: String,
    #[serde(rename = "type", default = "default_upload_type")]
    pub model_type: String,
    pub provider: Option<String>,
    pub model_identifier: Option<String>,
    pub file_path: Option<String>,
    pub config: Option<Value>,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

fn default_upload_type() -> String {
    common::models::MODEL_TYPE_CUSTOM.to_string()
}

pub async fn upload_model(
    pool: web::Data<SqlitePool>,
    body: web::Json<UploadRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    if body.name.trim().is_empty() {
        return Err(ErrorBadRequest("Model name is required"));
    }
    let model = db::create_model(
        pool.get_ref(),
        &db::NewModel {
            user_id: GUEST_USER_ID,
            name: &body.name,
            model_type: &body.model_type,
            provider: body.provider.as_deref(),
            model_identifier: body.model_identifier.as_deref(),
            file_path: body.file_path.as_deref(),
            config: body.config.as_ref(),
            description: body.description.as_deref(),
            tags: &body.tags,
            is_public: body.is_public,
        },
    )
    .await
    .map_err(db_error)?;
    log::info!("registered uploaded model {} ({})", model.name, model.id);
    Ok(HttpResponse::Ok().json(model.to_response()))
}

pub async fn list_models(pool: web::Data<SqlitePool>) -> Result<HttpResponse, actix_web::Error> {
    let models = db::list_visible_models(pool.get_ref(), GUEST_USER_ID)
        .await
        .map_err(db_error)?;
    let body: Vec<Value> = models.iter().map(|m| m.to_response()).collect();
    Ok(HttpResponse::Ok().json(body))
}

pub async fn delete_model(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let id = path.into_inner();
    if !db::delete_model(pool.get_ref(), &id).await.map_err(db_error)? {
        return Err(ErrorNotFound("Model not found"));
    }
    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "Model deleted"})))
}

/// Health-check every visible API model at once and store the outcomes.
pub async fn check_all_models(
    pool: web::Data<SqlitePool>,
    secrets: web::Data<SecretBox>,
    config: web::Data<AppConfig>,
    client: web::Data<reqwest::Client>,
) -> Result<HttpResponse, actix_web::Error> {
    let models = db::list_visible_models(pool.get_ref(), GUEST_USER_ID)
        .await
        .map_err(db_error)?;

    let mut clients: HashMap<Provider, Option<ProviderClient>> = HashMap::new();
    let mut checks = Vec::new();
    for model in models.iter().filter(|m| m.model_type == MODEL_TYPE_API) {
        let (Some(provider), Some(identifier)) = (
            model.provider.as_deref().and_then(Provider::parse),
            model.model_identifier.clone(),
        ) else {
            continue;
        };
        if !clients.contains_key(&provider) {
            let key = db::get_active_key(pool.get_ref(), GUEST_USER_ID, provider.as_str())
                .await
                .map_err(db_error)?;
            let built = key.and_then(|k| match secrets.open(&k.encrypted_key) {
                Ok(api_key) => Some(ProviderClient::new(provider, api_key, &config, &client)),
                Err(e) => {
                    log::warn!("stored {} key cannot be opened: {}", provider, e);
                    None
                }
            });
            clients.insert(provider, built);
        }
        let provider_client = clients.get(&provider).cloned().flatten();
        checks.push(async move {
            let report = match provider_client {
                Some(c) => c.health_check(&identifier).await,
                None => HealthReport::unavailable(format!(
                    "API key not configured for {}",
                    provider
                )),
            };
            (model, provider, identifier, report)
        });
    }

    let results = futures::future::join_all(checks).await;
    let mut out = Vec::with_capacity(results.len());
    for (model, provider, identifier, report) in results {
        if let Err(e) =
            db::record_availability(pool.get_ref(), provider.as_str(), &identifier, report.available)
                .await
        {
            log::warn!("failed to record availability for {} {}: {}", provider, identifier, e);
        }
        out.push(json!({
            "id": model.id,
            "name": model.name,
            "provider": provider,
            "model_identifier": identifier,
            "success": report.success,
            "available": report.available,
            "error": report.error,
        }));
    }
    let available = out.iter().filter(|r| r["available"] == true).count();
    log::info!("model health check: {}/{} available", available, out.len());
    Ok(HttpResponse::Ok().json(json!({ "checked": out.len(), "available": available, "results": out })))
}
