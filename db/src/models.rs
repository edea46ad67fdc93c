use serde_json::Value;
use sqlx::sqlite::SqlitePool;

use common::catalog::{self, Provider};
use common::models::{ModelEntry, MODEL_TYPE_API};

const MODEL_COLUMNS: &str = "id, user_id, name, model_type, provider, model_identifier, \
     file_path, config_json, status, is_public, description, tags_json, available, \
     last_checked_at, avg_response_time, total_requests, success_rate, created_at, updated_at";

pub struct NewModel<'a> {
    pub user_id: &'a str,
    pub name: &'a str,
    pub model_type: &'a str,
    pub provider: Option<&'a str>,
    pub model_identifier: Option<&'a str>,
    pub file_path: Option<&'a str>,
    pub config: Option<&'a Value>,
    pub description: Option<&'a str>,
    pub tags: &'a [String],
    pub is_public: bool,
}

/// Register a user-supplied model. Uploaded models start in `uploaded` status.
pub async fn create_model(pool: &SqlitePool, model: &NewModel<'_>) -> anyhow::Result<ModelEntry> {
    let id = crate::generate_id();
    let config_json = model.config.map(serde_json::to_string).transpose()?;

    sqlx::query(
        "INSERT INTO models (id, user_id, name, model_type, provider, model_identifier, \
         file_path, config_json, status, is_public, description, tags_json) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'uploaded', ?, ?, ?)",
    )
    .bind(&id)
    .bind(model.user_id)
    .bind(model.name)
    .bind(model.model_type)
    .bind(model.provider)
    .bind(model.model_identifier)
    .bind(model.file_path)
    .bind(config_json)
    .bind(model.is_public)
    .bind(model.description)
    .bind(serde_json::to_string(model.tags)?)
    .execute(pool)
    .await?;

    get_model(pool, &id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("model {} vanished after insert", id))
}

/// Insert the provider's catalog models that the user does not have yet.
/// Returns how many rows were added.
pub async fn register_catalog_models(
    pool: &SqlitePool,
    user_id: &str,
    provider: Provider,
) -> anyhow::Result<usize> {
    let mut added = 0;
    for entry in catalog::models_for(provider) {
        if find_api_model(pool, user_id, provider.as_str(), entry.id)
            .await?
            .is_some()
        {
            continue;
        }
        let config = serde_json::json!({
            "context_length": entry.context,
            "vision": entry.vision,
        });
        sqlx::query(
            "INSERT INTO models (id, user_id, name, model_type, provider, model_identifier, \
             config_json, status, is_public, description, tags_json) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 'active', 0, ?, ?)",
        )
        .bind(crate::generate_id())
        .bind(user_id)
        .bind(entry.name)
        .bind(MODEL_TYPE_API)
        .bind(provider.as_str())
        .bind(entry.id)
        .bind(config.to_string())
        .bind(format!("{} from {}", entry.name, provider))
        .bind(serde_json::json!([provider.as_str()]).to_string())
        .execute(pool)
        .await?;
        added += 1;
    }
    Ok(added)
}

/// Models the playground offers: the user's own non-API models, API models
/// whose provider currently has an active key, and anything public.
pub async fn list_visible_models(pool: &SqlitePool, user_id: &str) -> anyhow::Result<Vec<ModelEntry>> {
    Ok(sqlx::query_as::<_, ModelEntry>(&format!(
        "SELECT {} FROM models WHERE is_public = 1 OR (user_id = ? AND (model_type <> ? OR provider IN \
         (SELECT provider FROM api_keys WHERE user_id = ? AND is_active = 1))) \
         ORDER BY created_at, rowid",
        MODEL_COLUMNS
    ))
    .bind(user_id)
    .bind(MODEL_TYPE_API)
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn list_all_models(pool: &SqlitePool) -> anyhow::Result<Vec<ModelEntry>> {
    Ok(sqlx::query_as::<_, ModelEntry>(&format!(
        "SELECT {} FROM models ORDER BY provider, created_at, rowid",
        MODEL_COLUMNS
    ))
    .fetch_all(pool)
    .await?)
}

pub async fn get_model(pool: &SqlitePool, id: &str) -> anyhow::Result<Option<ModelEntry>> {
    Ok(sqlx::query_as::<_, ModelEntry>(&format!(
        "SELECT {} FROM models WHERE id = ?",
        MODEL_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

pub async fn find_api_model(
    pool: &SqlitePool,
    user_id: &str,
    provider: &str,
    model_identifier: &str,
) -> anyhow::Result<Option<ModelEntry>> {
    Ok(sqlx::query_as::<_, ModelEntry>(&format!(
        "SELECT {} FROM models WHERE user_id = ? AND provider = ? AND model_identifier = ? LIMIT 1",
        MODEL_COLUMNS
    ))
    .bind(user_id)
    .bind(provider)
    .bind(model_identifier)
    .fetch_optional(pool)
    .await?)
}

pub async fn delete_model(pool: &SqlitePool, id: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM models WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Store a health check outcome on every row for this provider model.
pub async fn record_availability(
    pool: &SqlitePool,
    provider: &str,
    model_identifier: &str,
    available: bool,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        "UPDATE models SET available = ?, last_checked_at = strftime('%Y-%m-%d %H:%M:%f', 'now') \
         WHERE provider = ? AND model_identifier = ?",
    )
    .bind(available)
    .bind(provider)
    .bind(model_identifier)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Fold one request into the running response-time and success-rate averages.
pub async fn record_usage(
    pool: &SqlitePool,
    id: &str,
    elapsed_secs: f64,
    success: bool,
) -> anyhow::Result<()> {
    let outcome = if success { 100.0 } else { 0.0 };
    sqlx::query(
        "UPDATE models SET \
         avg_response_time = (avg_response_time * total_requests + ?) / (total_requests + 1), \
         success_rate = (success_rate * total_requests + ?) / (total_requests + 1), \
         total_requests = total_requests + 1, \
         updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') \
         WHERE id = ?",
    )
    .bind(elapsed_secs)
    .bind(outcome)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn count_models(pool: &SqlitePool) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM models")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
