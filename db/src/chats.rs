use serde_json::Value;
use sqlx::sqlite::SqlitePool;

use common::models::ChatHistory;

const CHAT_COLUMNS: &str =
    "id, user_id, session_id, model_id, model_name, messages_json, title, created_at, updated_at";

pub struct NewChat<'a> {
    pub user_id: &'a str,
    pub session_id: &'a str,
    pub model_id: Option<&'a str>,
    pub model_name: &'a str,
    pub messages: &'a [Value],
    pub title: Option<&'a str>,
}

/// Insert a chat or overwrite the existing one with the same session id.
pub async fn upsert_chat(pool: &SqlitePool, chat: &NewChat<'_>) -> anyhow::Result<ChatHistory> {
    let title = chat
        .title
        .map(|t| t.to_string())
        .unwrap_or_else(|| format!("Chat with {}", chat.model_name));
    let messages_json = serde_json::to_string(chat.messages)?;

    sqlx::query(
        "INSERT INTO chat_history (id, user_id, session_id, model_id, model_name, messages_json, title) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT (user_id, session_id) DO UPDATE SET \
         model_id = excluded.model_id, model_name = excluded.model_name, \
         messages_json = excluded.messages_json, title = excluded.title, \
         updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')",
    )
    .bind(crate::generate_id())
    .bind(chat.user_id)
    .bind(chat.session_id)
    .bind(chat.model_id)
    .bind(chat.model_name)
    .bind(&messages_json)
    .bind(&title)
    .execute(pool)
    .await?;

    get_chat(pool, chat.user_id, chat.session_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("chat {} vanished after upsert", chat.session_id))
}

pub async fn list_chats(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<ChatHistory>> {
    Ok(sqlx::query_as::<_, ChatHistory>(&format!(
        "SELECT {} FROM chat_history WHERE user_id = ? \
         ORDER BY updated_at DESC, rowid DESC LIMIT ?",
        CHAT_COLUMNS
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn get_chat(
    pool: &SqlitePool,
    user_id: &str,
    session_id: &str,
) -> anyhow::Result<Option<ChatHistory>> {
    Ok(sqlx::query_as::<_, ChatHistory>(&format!(
        "SELECT {} FROM chat_history WHERE user_id = ? AND session_id = ?",
        CHAT_COLUMNS
    ))
    .bind(user_id)
    .bind(session_id)
    .fetch_optional(pool)
    .await?)
}

/// Replace the transcript (and optionally the title). Returns `None` when the
/// session does not exist.
pub async fn replace_chat_messages(
    pool: &SqlitePool,
    user_id: &str,
    session_id: &str,
    messages: &[Value],
    title: Option<&str>,
) -> anyhow::Result<Option<ChatHistory>> {
    let result = sqlx::query(
        "UPDATE chat_history SET messages_json = ?, title = COALESCE(?, title), \
         updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') \
         WHERE user_id = ? AND session_id = ?",
    )
    .bind(serde_json::to_string(messages)?)
    .bind(title)
    .bind(user_id)
    .bind(session_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_chat(pool, user_id, session_id).await
}

/// Messages per `json_insert` call, keeping well under SQLite's function
/// argument limit.
const APPEND_BATCH: usize = 50;

fn append_sql(count: usize) -> String {
    let current = "CASE WHEN json_valid(messages_json) \
         THEN CASE WHEN json_type(messages_json) = 'array' THEN messages_json ELSE '[]' END \
         ELSE '[]' END";
    let value = if count == 0 {
        current.to_string()
    } else {
        format!("json_insert({}{})", current, ", '$[#]', json(?)".repeat(count))
    };
    format!(
        "UPDATE chat_history SET messages_json = {}, \
         updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') \
         WHERE user_id = ? AND session_id = ?",
        value
    )
}

/// Append messages to the end of an existing transcript.
///
/// The array is extended inside SQLite, so concurrent appends to the same
/// session never overwrite each other.
pub async fn append_chat_messages(
    pool: &SqlitePool,
    user_id: &str,
    session_id: &str,
    messages: &[Value],
) -> anyhow::Result<Option<ChatHistory>> {
    let batches: Vec<&[Value]> = if messages.is_empty() {
        vec![messages]
    } else {
        messages.chunks(APPEND_BATCH).collect()
    };

    let mut tx = pool.begin().await?;
    for batch in batches {
        let sql = append_sql(batch.len());
        let mut query = sqlx::query(&sql);
        for message in batch {
            query = query.bind(serde_json::to_string(message)?);
        }
        let result = query.bind(user_id).bind(session_id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
    }
    tx.commit().await?;

    get_chat(pool, user_id, session_id).await
}

pub async fn delete_chat(pool: &SqlitePool, user_id: &str, session_id: &str) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM chat_history WHERE user_id = ? AND session_id = ?")
        .bind(user_id)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_chats(pool: &SqlitePool) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_history")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
