use std::collections::HashSet;

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{MovieVideoMapping, NewMapping, NewVideo, VideoRecord};

// ========== Videos ==========

/// Collect every archive identifier currently in the registry.
///
/// Used once per sync run to build the dedup filter.
pub async fn list_known_identifiers(pool: &SqlitePool) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT archive_identifier FROM videos")
        .fetch_all(pool)
        .await
        .context("Failed to list archive identifiers")?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Insert a new video record, returning its ID.
///
/// The UNIQUE constraint on `archive_identifier` rejects a second row for
/// the same archive item; detect that case with [`is_unique_violation`].
pub async fn insert_video(pool: &SqlitePool, video: &NewVideo) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO videos (
            archive_identifier, title, description, movie_id, tmdb_title,
            tmdb_overview, poster_path, release_year, file_size, duration,
            upload_date, is_active
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)
        ",
    )
    .bind(&video.archive_identifier)
    .bind(&video.title)
    .bind(&video.description)
    .bind(video.movie_id)
    .bind(&video.tmdb_title)
    .bind(&video.tmdb_overview)
    .bind(&video.poster_path)
    .bind(video.release_year)
    .bind(video.file_size)
    .bind(video.duration)
    .bind(&video.upload_date)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to insert video {}", video.archive_identifier))?;

    Ok(result.last_insert_rowid())
}

/// Get a video by its archive identifier.
pub async fn get_video_by_identifier(
    pool: &SqlitePool,
    identifier: &str,
) -> Result<Option<VideoRecord>> {
    sqlx::query_as("SELECT * FROM videos WHERE archive_identifier = ?")
        .bind(identifier)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch video by identifier")
}

/// Get the most recently uploaded active videos.
pub async fn get_recent_videos(pool: &SqlitePool, limit: i64) -> Result<Vec<VideoRecord>> {
    sqlx::query_as(
        r"
        SELECT * FROM videos
        WHERE is_active = 1
        ORDER BY upload_date DESC
        LIMIT ?
        ",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .context("Failed to fetch recent videos")
}

/// Get the active videos linked to a movie, either directly or through a
/// mapping row.
pub async fn get_videos_for_movie(pool: &SqlitePool, movie_id: i64) -> Result<Vec<VideoRecord>> {
    sqlx::query_as(
        r"
        SELECT DISTINCT v.*
        FROM videos v
        LEFT JOIN movie_video_mappings m ON m.video_id = v.id
        WHERE (v.movie_id = ? OR m.movie_id = ?) AND v.is_active = 1
        ORDER BY v.upload_date DESC
        ",
    )
    .bind(movie_id)
    .bind(movie_id)
    .fetch_all(pool)
    .await
    .context("Failed to fetch videos for movie")
}

// ========== Mappings ==========

/// Insert a new movie-video mapping, returning its ID.
pub async fn insert_mapping(pool: &SqlitePool, mapping: &NewMapping) -> Result<i64> {
    let result = sqlx::query(
        r"
        INSERT INTO movie_video_mappings (movie_id, video_id, is_primary)
        VALUES (?, ?, ?)
        ",
    )
    .bind(mapping.movie_id)
    .bind(mapping.video_id)
    .bind(mapping.is_primary)
    .execute(pool)
    .await
    .with_context(|| {
        format!(
            "Failed to insert mapping for movie {} -> video {}",
            mapping.movie_id, mapping.video_id
        )
    })?;

    Ok(result.last_insert_rowid())
}

/// Get all mappings for a movie.
pub async fn get_mappings_for_movie(
    pool: &SqlitePool,
    movie_id: i64,
) -> Result<Vec<MovieVideoMapping>> {
    sqlx::query_as("SELECT * FROM movie_video_mappings WHERE movie_id = ? ORDER BY created_at")
        .bind(movie_id)
        .fetch_all(pool)
        .await
        .context("Failed to fetch mappings for movie")
}

// ========== Errors ==========

/// Check whether an error is a SQLite unique-constraint violation.
#[must_use]
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(sqlx::Error::as_database_error)
        .is_some_and(|db| db.message().contains("UNIQUE constraint failed"))
}
