//! Storage layer: SQLite pool setup, the migration runner and the `documents` repository.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub mod documents;

/// Turns a plain filesystem path into a `sqlite:` URL. URLs pass through untouched.
pub fn database_url(database: &str) -> String {
    if database.starts_with("sqlite:") {
        return database.to_string();
    }
    let path = Path::new(database);
    let norm = path.to_string_lossy().replace('\\', "/");
    if path.is_absolute() {
        format!("sqlite:///{}", norm.trim_start_matches('/'))
    } else {
        format!("sqlite://{}", norm)
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

pub async fn connect(database: &str) -> anyhow::Result<SqlitePool> {
    let url = database_url(database);
    let in_memory = is_in_memory(&url);
    if !in_memory && !database.starts_with("sqlite:") {
        if let Some(parent) = Path::new(database).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut opts = SqliteConnectOptions::from_str(&url)?.busy_timeout(Duration::from_secs(5));
    if !in_memory {
        opts = opts.create_if_missing(true).journal_mode(SqliteJournalMode::Wal);
    }
    // A second connection would see a different in-memory database.
    let max_connections = if in_memory { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await?;
    tracing::debug!(%url, max_connections, "sqlite pool ready");
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
