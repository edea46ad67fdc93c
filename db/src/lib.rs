use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

pub mod api_keys;
pub mod chats;
pub mod code_sessions;
pub mod collaboration;
pub mod models;

pub use api_keys::*;
pub use chats::*;
pub use code_sessions::*;
pub use collaboration::*;
pub use models::*;

const MIGRATIONS: &[&str] = &[
    include_str!("../../migrations/001_init.sql"),
    include_str!("../../migrations/002_code_sessions.sql"),
];

pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Open the SQLite pool and apply every migration.
///
/// `sqlite::memory:` gets a single connection, otherwise each pooled
/// connection would see its own empty database.
pub async fn init_pool(database_url: &str) -> anyhow::Result<SqlitePool> {
    if database_url.starts_with("postgres") {
        anyhow::bail!("only sqlite database URLs are supported, got {}", database_url);
    }
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    for migration in MIGRATIONS {
        for stmt in migration.split(';') {
            let stmt = stmt.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(pool).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    init_pool("sqlite::memory:").await.unwrap()
}
