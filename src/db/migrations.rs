use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Run all pending migrations.
pub async fn run(pool: &SqlitePool) -> Result<()> {
    create_migration_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version < 1 {
        debug!("Running migration v1");
        run_migration_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    Ok(())
}

async fn create_migration_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS _schema_version (
            version INTEGER PRIMARY KEY
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create schema version table")?;

    Ok(())
}

async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT version FROM _schema_version LIMIT 1")
        .fetch_optional(pool)
        .await
        .context("Failed to get schema version")?;

    Ok(row.map_or(0, |(v,)| v))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("DELETE FROM _schema_version")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO _schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_migration_v1(pool: &SqlitePool) -> Result<()> {
    debug!("Running migration v1: creating initial schema");

    // Video registry. archive_identifier is the dedup key: at most one row
    // per archive item, enforced by the UNIQUE constraint.
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            archive_identifier TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT,
            movie_id INTEGER NOT NULL DEFAULT 0,
            tmdb_title TEXT,
            tmdb_overview TEXT,
            poster_path TEXT,
            release_year INTEGER,
            file_size INTEGER,
            duration INTEGER,
            upload_date TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create videos table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_videos_movie_id ON videos(movie_id)")
        .execute(pool)
        .await
        .context("Failed to create videos movie_id index")?;

    // Movie links. A video can be mapped to a movie more than once across
    // runs; only referential integrity is enforced here.
    sqlx::query(
        r"
        CREATE TABLE IF NOT EXISTS movie_video_mappings (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            movie_id INTEGER NOT NULL,
            video_id INTEGER NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
            is_primary INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        ",
    )
    .execute(pool)
    .await
    .context("Failed to create movie_video_mappings table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_mappings_movie_id ON movie_video_mappings(movie_id)",
    )
    .execute(pool)
    .await
    .context("Failed to create mappings movie_id index")?;

    Ok(())
}
