use serde::{Deserialize, Serialize};

/// A registered archive upload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoRecord {
    pub id: i64,
    pub archive_identifier: String,
    pub title: String,
    pub description: Option<String>,
    /// TMDB movie id; 0 means no canonical match has been linked.
    pub movie_id: i64,
    pub tmdb_title: Option<String>,
    pub tmdb_overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_year: Option<i64>,
    pub file_size: Option<i64>,
    /// Playable runtime in whole seconds.
    pub duration: Option<i64>,
    pub upload_date: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for inserting a new video record.
#[derive(Debug, Clone, Default)]
pub struct NewVideo {
    pub archive_identifier: String,
    pub title: String,
    pub description: Option<String>,
    pub movie_id: i64,
    pub tmdb_title: Option<String>,
    pub tmdb_overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_year: Option<i64>,
    pub file_size: Option<i64>,
    pub duration: Option<i64>,
    pub upload_date: String,
}

/// A link between a TMDB movie and a registered video.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MovieVideoMapping {
    pub id: i64,
    pub movie_id: i64,
    pub video_id: i64,
    pub is_primary: bool,
    pub created_at: String,
}

/// Fields for inserting a new movie-video mapping.
#[derive(Debug, Clone)]
pub struct NewMapping {
    pub movie_id: i64,
    pub video_id: i64,
    pub is_primary: bool,
}
