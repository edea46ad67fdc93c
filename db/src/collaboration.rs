use sqlx::sqlite::SqlitePool;

use common::models::CollaborationSession;

const COLLAB_COLUMNS: &str = "id, name, session_id, created_by, description, is_active, \
     participants_json, shared_models_json, created_at, updated_at";

pub async fn create_collab_session(
    pool: &SqlitePool,
    created_by: &str,
    name: &str,
    description: Option<&str>,
) -> anyhow::Result<CollaborationSession> {
    let session_id = crate::generate_id();
    sqlx::query(
        "INSERT INTO collaboration_sessions \
         (id, name, session_id, created_by, description, is_active, participants_json, shared_models_json) \
         VALUES (?, ?, ?, ?, ?, 1, ?, '[]')",
    )
    .bind(crate::generate_id())
    .bind(name)
    .bind(&session_id)
    .bind(created_by)
    .bind(description)
    .bind(serde_json::json!([created_by]).to_string())
    .execute(pool)
    .await?;

    get_collab_session(pool, &session_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("collaboration session {} vanished after insert", session_id))
}

pub async fn list_active_collab_sessions(
    pool: &SqlitePool,
    limit: i64,
) -> anyhow::Result<Vec<CollaborationSession>> {
    Ok(sqlx::query_as::<_, CollaborationSession>(&format!(
        "SELECT {} FROM collaboration_sessions WHERE is_active = 1 \
         ORDER BY created_at DESC, rowid DESC LIMIT ?",
        COLLAB_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn get_collab_session(
    pool: &SqlitePool,
    session_id: &str,
) -> anyhow::Result<Option<CollaborationSession>> {
    Ok(sqlx::query_as::<_, CollaborationSession>(&format!(
        "SELECT {} FROM collaboration_sessions WHERE session_id = ?",
        COLLAB_COLUMNS
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await?)
}

/// Add `value` to a JSON string-set column of an active session. The
/// membership check and the insert run as one statement.
async fn add_to_set(
    pool: &SqlitePool,
    session_id: &str,
    column: &str,
    value: &str,
) -> anyhow::Result<Option<CollaborationSession>> {
    sqlx::query(&format!(
        "UPDATE collaboration_sessions SET {col} = json_insert(\
         CASE WHEN json_valid({col}) THEN {col} ELSE '[]' END, '$[#]', ?), \
         updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') \
         WHERE session_id = ? AND is_active = 1 \
         AND NOT EXISTS (SELECT 1 FROM json_each(\
         CASE WHEN json_valid(collaboration_sessions.{col}) THEN collaboration_sessions.{col} ELSE '[]' END) \
         WHERE value = ?)",
        col = column
    ))
    .bind(value)
    .bind(session_id)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(get_collab_session(pool, session_id)
        .await?
        .filter(|s| s.is_active))
}

pub async fn add_participant(
    pool: &SqlitePool,
    session_id: &str,
    user: &str,
) -> anyhow::Result<Option<CollaborationSession>> {
    add_to_set(pool, session_id, "participants_json", user).await
}

pub async fn share_model(
    pool: &SqlitePool,
    session_id: &str,
    model_id: &str,
) -> anyhow::Result<Option<CollaborationSession>> {
    add_to_set(pool, session_id, "shared_models_json", model_id).await
}

pub async fn deactivate_collab_session(pool: &SqlitePool, session_id: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE collaboration_sessions SET is_active = 0, \
         updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now') \
         WHERE session_id = ? AND is_active = 1",
    )
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_active_collab_sessions(pool: &SqlitePool) -> anyhow::Result<i64> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM collaboration_sessions WHERE is_active = 1")
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: &str = "guest-user";

    #[tokio::test]
    async fn new_session_has_creator_as_participant() {
        let pool = crate::test_pool().await;
        let s = create_collab_session(&pool, USER, "Pairing", Some("desc"))
            .await
            .unwrap();
        assert!(s.is_active);
        assert_eq!(s.participants(), vec![USER]);
        assert!(s.shared_models().is_empty());
        assert_ne!(s.session_id, s.id.to_string());
    }

    #[tokio::test]
    async fn participants_and_models_are_sets() {
        let pool = crate::test_pool().await;
        let s = create_collab_session(&pool, USER, "Pairing", None).await.unwrap();
        add_participant(&pool, &s.session_id, "alice").await.unwrap();
        let s2 = add_participant(&pool, &s.session_id, "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s2.participants(), vec![USER, "alice"]);

        share_model(&pool, &s.session_id, "m1").await.unwrap();
        let s3 = share_model(&pool, &s.session_id, "m1").await.unwrap().unwrap();
        assert_eq!(s3.shared_models(), vec!["m1"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_keep_every_participant() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("collab.db").display());
        let pool = crate::init_pool(&url).await.unwrap();
        let s = create_collab_session(&pool, USER, "Pairing", None).await.unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..8 {
            let pool = pool.clone();
            let session_id = s.session_id.clone();
            tasks.spawn(async move {
                let user = format!("user-{}", i % 4);
                add_participant(&pool, &session_id, &user).await.unwrap();
            });
        }
        while let Some(done) = tasks.join_next().await {
            done.unwrap();
        }

        let mut people = get_collab_session(&pool, &s.session_id)
            .await
            .unwrap()
            .unwrap()
            .participants();
        people.sort();
        assert_eq!(people, vec!["guest-user", "user-0", "user-1", "user-2", "user-3"]);
    }

    #[tokio::test]
    async fn deactivated_sessions_drop_out() {
        let pool = crate::test_pool().await;
        let a = create_collab_session(&pool, USER, "a", None).await.unwrap();
        create_collab_session(&pool, USER, "b", None).await.unwrap();
        assert_eq!(count_active_collab_sessions(&pool).await.unwrap(), 2);

        assert!(deactivate_collab_session(&pool, &a.session_id).await.unwrap());
        assert!(!deactivate_collab_session(&pool, &a.session_id).await.unwrap());
        assert!(add_participant(&pool, &a.session_id, "bob").await.unwrap().is_none());

        let active = list_active_collab_sessions(&pool, 10).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "b");
    }

    #[tokio::test]
    async fn list_is_capped() {
        let pool = crate::test_pool().await;
        for i in 0..12 {
            create_collab_session(&pool, USER, &format!("s{}", i), None)
                .await
                .unwrap();
        }
        assert_eq!(list_active_collab_sessions(&pool, 10).await.unwrap().len(), 10);
    }
}
