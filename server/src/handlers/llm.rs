use std::time::Instant;

use actix_web::error::{ErrorBadGateway, ErrorBadRequest, ErrorInternalServerError, ErrorNotFound};
use actix_web::{web, HttpResponse};
use bytes::Bytes;
use common::catalog::{self, Provider};
use common::config::AppConfig;
use common::models::{ModelEntry, MODEL_TYPE_CUSTOM};
use common::secrets::SecretBox;
use common::GUEST_USER_ID;
use futures::StreamExt;
use proxy::{GenerateOutcome, GenerateParams, HealthReport, ProviderClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use super::db_error;

const DONE_FRAME: &[u8] = b"data: [DONE]\n\n";

#[derive(Deserialize)]
pub struct ApiKeyRequest {
    pub provider: String,
    pub api_key: String,
}

pub async fn add_api_key(
    pool: web::Data<SqlitePool>,
    secrets: web::Data<SecretBox>,
    body: web::Json<ApiKeyRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let provider = Provider::parse(&body.provider)
        .ok_or_else(|| ErrorBadRequest(format!("Unsupported provider: {}", body.provider)))?;
    if !proxy::validate_key_format(provider, &body.api_key) {
        log::warn!("submitted {} key has an unexpected format", provider.label());
    }

    let sealed = secrets.seal(&body.api_key).map_err(ErrorInternalServerError)?;
    let key = db::upsert_api_key(pool.get_ref(), GUEST_USER_ID, provider.as_str(), &sealed)
        .await
        .map_err(db_error)?;
    let added = db::register_catalog_models(pool.get_ref(), GUEST_USER_ID, provider)
        .await
        .map_err(db_error)?;
    log::info!("stored {} key, registered {} catalog models", provider, added);

    Ok(HttpResponse::Ok().json(&key))
}

pub async fn list_api_keys(pool: web::Data<SqlitePool>) -> Result<HttpResponse, actix_web::Error> {
    let keys = db::list_api_keys(pool.get_ref(), GUEST_USER_ID)
        .await
        .map_err(db_error)?;
    Ok(HttpResponse::Ok().json(&keys))
}

pub async fn delete_api_key(
    pool: web::Data<SqlitePool>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    let provider = path.into_inner();
    let removed = db::deactivate_api_key(pool.get_ref(), GUEST_USER_ID, &provider)
        .await
        .map_err(db_error)?;
    if !removed {
        return Err(ErrorNotFound("API key not found"));
    }
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": format!("API key for {} deactivated", provider),
    })))
}

pub async fn available_models() -> HttpResponse {
    HttpResponse::Ok().json(catalog::grouped())
}

pub async fn check_model_health(
    pool: web::Data<SqlitePool>,
    secrets: web::Data<SecretBox>,
    config: web::Data<AppConfig>,
    client: web::Data<reqwest::Client>,
    body: web::Json<Value>,
) -> Result<HttpResponse, actix_web::Error> {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("")
            .to_string()
    };
    let provider_name = field("provider");
    let model_id = field("model_id");
    if provider_name.is_empty() || model_id.is_empty() {
        return Err(ErrorBadRequest("Provider and model_id are required"));
    }

    let key = db::get_active_key(pool.get_ref(), GUEST_USER_ID, &provider_name)
        .await
        .map_err(db_error)?;
    let Some(key) = key else {
        return Ok(HttpResponse::Ok().json(HealthReport::unavailable(format!(
            "API key not configured for {}",
            provider_name
        ))));
    };
    let Some(provider) = Provider::parse(&provider_name) else {
        return Ok(HttpResponse::Ok().json(HealthReport::unavailable(format!(
            "Unsupported provider: {}",
            provider_name
        ))));
    };
    let api_key = match secrets.open(&key.encrypted_key) {
        Ok(k) => k,
        Err(e) => return Ok(HttpResponse::Ok().json(HealthReport::unavailable(e.to_string()))),
    };

    let report = ProviderClient::new(provider, api_key, &config, &client)
        .health_check(&model_id)
        .await;
    if let Err(e) =
        db::record_availability(pool.get_ref(), provider.as_str(), &model_id, report.available).await
    {
        log::warn!("failed to record availability for {} {}: {}", provider, model_id, e);
    }
    Ok(HttpResponse::Ok().json(report))
}

/// Where a generate request ends up.
enum Target {
    Provider {
        client: ProviderClient,
        key_id: String,
        identifier: String,
        model: Option<ModelEntry>,
    },
    MissingKey(String),
    /// The stored key exists but cannot be opened.
    Unusable(String),
    Custom(ModelEntry),
    NotFound,
}

async fn resolve(
    pool: &SqlitePool,
    secrets: &SecretBox,
    config: &AppConfig,
    http: &reqwest::Client,
    model_id: &str,
) -> Result<Target, actix_web::Error> {
    let model = db::get_model(pool, model_id).await.map_err(db_error)?;

    if let Some((provider_name, identifier)) = proxy::resolve_target(model.as_ref(), model_id) {
        if let Some(provider) = Provider::parse(&provider_name) {
            let key = db::get_active_key(pool, GUEST_USER_ID, provider.as_str())
                .await
                .map_err(db_error)?;
            let Some(key) = key else {
                return Ok(Target::MissingKey(provider_name));
            };
            let api_key = match secrets.open(&key.encrypted_key) {
                Ok(k) => k,
                Err(e) => {
                    log::error!("stored {} key cannot be opened: {}", provider, e);
                    return Ok(Target::Unusable(format!("Error calling {}: {}", provider_name, e)));
                }
            };
            let model = match model {
                Some(m) => Some(m),
                None => db::find_api_model(pool, GUEST_USER_ID, provider.as_str(), &identifier)
                    .await
                    .map_err(db_error)?,
            };
            return Ok(Target::Provider {
                client: ProviderClient::new(provider, api_key, config, http),
                key_id: key.id.to_string(),
                identifier,
                model,
            });
        }
    }

    match model {
        Some(m) if m.model_type == MODEL_TYPE_CUSTOM => Ok(Target::Custom(m)),
        _ => Ok(Target::NotFound),
    }
}

/// Bump key and model usage counters after a call.
async fn record_call(
    pool: &SqlitePool,
    key_id: Option<&str>,
    model: Option<&ModelEntry>,
    elapsed_secs: f64,
    success: bool,
) -> anyhow::Result<()> {
    if let Some(key_id) = key_id {
        db::touch_api_key(pool, key_id).await?;
    }
    if let Some(model) = model {
        db::record_usage(pool, &model.id.to_string(), elapsed_secs, success).await?;
    }
    Ok(())
}

#[derive(Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub model_id: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl GenerateRequest {
    fn params(&self, config: &AppConfig, model: String) -> GenerateParams {
        GenerateParams {
            prompt: self.prompt.clone(),
            model,
            temperature: self.temperature.unwrap_or(config.default_temperature),
            max_tokens: self.max_tokens.unwrap_or(config.default_max_tokens),
        }
    }
}

#[derive(Serialize)]
struct GenerateResponse {
    success: bool,
    response: Option<String>,
    usage: Option<Value>,
    model: String,
    error: Option<String>,
    execution_time: f64,
}

pub async fn generate(
    pool: web::Data<SqlitePool>,
    secrets: web::Data<SecretBox>,
    config: web::Data<AppConfig>,
    client: web::Data<reqwest::Client>,
    body: web::Json<GenerateRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let started = Instant::now();
    let req = body.into_inner();
    let target = resolve(pool.get_ref(), &secrets, &config, &client, &req.model_id).await?;

    let (outcome, model_label) = match target {
        Target::Provider {
            client,
            key_id,
            identifier,
            model,
        } => {
            let outcome = client.generate(&req.params(&config, identifier)).await;
            let elapsed = started.elapsed().as_secs_f64();
            if let Err(e) =
                record_call(pool.get_ref(), Some(&key_id), model.as_ref(), elapsed, outcome.success).await
            {
                log::warn!("failed to record usage for {}: {}", req.model_id, e);
            }
            (outcome, req.model_id.clone())
        }
        Target::MissingKey(provider) => (
            GenerateOutcome::failed(format!("Please configure API key for {}", provider)),
            req.model_id.clone(),
        ),
        Target::Unusable(error) => (GenerateOutcome::failed(error), req.model_id.clone()),
        Target::Custom(model) => {
            let reply = proxy::custom_model_reply(&config, &model.name, &req.prompt);
            let elapsed = started.elapsed().as_secs_f64();
            if let Err(e) = record_call(pool.get_ref(), None, Some(&model), elapsed, true).await {
                log::warn!("failed to record usage for {}: {}", model.name, e);
            }
            (GenerateOutcome::ok(reply, None), model.name)
        }
        Target::NotFound => (
            GenerateOutcome::failed("Model not found or API key not configured"),
            req.model_id.clone(),
        ),
    };

    Ok(HttpResponse::Ok().json(GenerateResponse {
        success: outcome.success,
        response: outcome.response,
        usage: outcome.usage,
        model: model_label,
        error: outcome.error,
        execution_time: started.elapsed().as_secs_f64(),
    }))
}

fn delta_frame(text: &str) -> Bytes {
    Bytes::from(format!("data: {}\n\n", json!({ "delta": text })))
}

fn error_frame(error: &str) -> Bytes {
    Bytes::from(format!("data: {}\n\n", json!({ "error": error })))
}

pub async fn generate_stream(
    pool: web::Data<SqlitePool>,
    secrets: web::Data<SecretBox>,
    config: web::Data<AppConfig>,
    client: web::Data<reqwest::Client>,
    body: web::Json<GenerateRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    let started = Instant::now();
    let req = body.into_inner();
    let (tx, rx) = futures::channel::mpsc::unbounded::<Result<Bytes, actix_web::Error>>();

    match resolve(pool.get_ref(), &secrets, &config, &client, &req.model_id).await? {
        Target::MissingKey(provider) => {
            return Err(ErrorBadRequest(format!("Please configure API key for {}", provider)));
        }
        Target::Unusable(error) => return Err(ErrorInternalServerError(error)),
        Target::NotFound => {
            return Err(ErrorNotFound("Model not found or API key not configured"));
        }
        Target::Custom(model) => {
            let reply = proxy::custom_model_reply(&config, &model.name, &req.prompt);
            let _ = tx.unbounded_send(Ok(delta_frame(&reply)));
            let _ = tx.unbounded_send(Ok(Bytes::from_static(DONE_FRAME)));
        }
        Target::Provider {
            client,
            key_id,
            identifier,
            model,
        } => {
            let mut deltas = client
                .stream(&req.params(&config, identifier))
                .await
                .map_err(|e| ErrorBadGateway(e.to_string()))?;
            let pool = pool.clone();
            actix_web::rt::spawn(async move {
                let mut success = true;
                while let Some(item) = deltas.next().await {
                    let frame = match item {
                        Ok(text) => delta_frame(&text),
                        Err(err) => {
                            success = false;
                            error_frame(&err)
                        }
                    };
                    if tx.unbounded_send(Ok(frame)).is_err() {
                        break;
                    }
                }
                let _ = tx.unbounded_send(Ok(Bytes::from_static(DONE_FRAME)));
                let elapsed = started.elapsed().as_secs_f64();
                if let Err(e) =
                    record_call(pool.get_ref(), Some(&key_id), model.as_ref(), elapsed, success).await
                {
                    log::error!("failed to record streamed usage: {}", e);
                }
            });
        }
    }

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(rx))
}
