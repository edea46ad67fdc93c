use sqlx::sqlite::SqlitePool;

use common::models::ApiKey;

const KEY_COLUMNS: &str =
    "id, user_id, provider, encrypted_key, is_active, created_at, last_used, usage_count";

/// Store a sealed key for `provider`, replacing and re-activating any previous one.
pub async fn upsert_api_key(
    pool: &SqlitePool,
    user_id: &str,
    provider: &str,
    encrypted_key: &str,
) -> anyhow::Result<ApiKey> {
    sqlx::query(
        "INSERT INTO api_keys (id, user_id, provider, encrypted_key, is_active) \
         VALUES (?, ?, ?, ?, 1) \
         ON CONFLICT (user_id, provider) DO UPDATE SET \
         encrypted_key = excluded.encrypted_key, is_active = 1",
    )
    .bind(crate::generate_id())
    .bind(user_id)
    .bind(provider)
    .bind(encrypted_key)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, ApiKey>(&format!(
        "SELECT {} FROM api_keys WHERE user_id = ? AND provider = ?",
        KEY_COLUMNS
    ))
    .bind(user_id)
    .bind(provider)
    .fetch_one(pool)
    .await
    .map_err(Into::into)
}

pub async fn list_api_keys(pool: &SqlitePool, user_id: &str) -> anyhow::Result<Vec<ApiKey>> {
    Ok(sqlx::query_as::<_, ApiKey>(&format!(
        "SELECT {} FROM api_keys WHERE user_id = ? ORDER BY provider",
        KEY_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_active_key(
    pool: &SqlitePool,
    user_id: &str,
    provider: &str,
) -> anyhow::Result<Option<ApiKey>> {
    Ok(sqlx::query_as::<_, ApiKey>(&format!(
        "SELECT {} FROM api_keys WHERE user_id = ? AND provider = ? AND is_active = 1",
        KEY_COLUMNS
    ))
    .bind(user_id)
    .bind(provider)
    .fetch_optional(pool)
    .await?)
}

/// The oldest active key of any provider.
pub async fn first_active_key(pool: &SqlitePool, user_id: &str) -> anyhow::Result<Option<ApiKey>> {
    Ok(sqlx::query_as::<_, ApiKey>(&format!(
        "SELECT {} FROM api_keys WHERE user_id = ? AND is_active = 1 \
         ORDER BY created_at, rowid LIMIT 1",
        KEY_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?)
}

pub async fn deactivate_api_key(
    pool: &SqlitePool,
    user_id: &str,
    provider: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE api_keys SET is_active = 0 WHERE user_id = ? AND provider = ? AND is_active = 1",
    )
    .bind(user_id)
    .bind(provider)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn touch_api_key(pool: &SqlitePool, id: &str) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE api_keys SET last_used = strftime('%Y-%m-%d %H:%M:%f', 'now'), \
         usage_count = usage_count + 1 WHERE id = ?",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn active_providers(pool: &SqlitePool, user_id: &str) -> anyhow::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT provider FROM api_keys WHERE user_id = ? AND is_active = 1 ORDER BY provider",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
