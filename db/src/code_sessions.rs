use sqlx::sqlite::SqlitePool;

use common::models::CodeSession;

const CODE_COLUMNS: &str =
    "id, user_id, name, code, language, test_code, analysis_json, created_at, updated_at";

pub async fn create_code_session(
    pool: &SqlitePool,
    user_id: &str,
    name: &str,
    code: &str,
    language: &str,
) -> anyhow::Result<CodeSession> {
    let id = crate::generate_id();
    sqlx::query(
        "INSERT INTO code_sessions (id, user_id, name, code, language) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(user_id)
    .bind(name)
    .bind(code)
    .bind(language)
    .execute(pool)
    .await?;

    get_code_session(pool, &id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("code session {} vanished after insert", id))
}

pub async fn list_code_sessions(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<CodeSession>> {
    Ok(sqlx::query_as::<_, CodeSession>(&format!(
        "SELECT {} FROM code_sessions WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        CODE_COLUMNS
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn get_code_session(pool: &SqlitePool, id: &str) -> anyhow::Result<Option<CodeSession>> {
    Ok(sqlx::query_as::<_, CodeSession>(&format!(
        "SELECT {} FROM code_sessions WHERE id = ?",
        CODE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?)
}

/// Attach generated tests and/or analysis output; `None` leaves a field as is.
pub async fn update_code_session_results(
    pool: &SqlitePool,
    id: &str,
    test_code: Option<&str>,
    analysis_json: Option<&str>,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE code_sessions SET test_code = COALESCE(?, test_code), \
         analysis_json = COALESCE(?, analysis_json), \
         updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') WHERE id = ?",
    )
    .bind(test_code)
    .bind(analysis_json)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
