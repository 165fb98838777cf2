//! TMDB metadata lookup client.
//!
//! Resolves free-text archive titles to canonical movie records. Matching is
//! best-effort: the first search result wins, so false positives on common
//! titles are accepted in exchange for simplicity.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{Config, MatchStrategy};
use crate::constants::{POSTER_IMAGE_BASE, SYNC_USER_AGENT};

#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("movie search failed with status {0}")]
    SearchFailed(StatusCode),
    #[error("TMDB request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A canonical movie record from the TMDB search index.
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl TmdbMovie {
    /// Release year parsed from the leading segment of `release_date`.
    #[must_use]
    pub fn release_year(&self) -> Option<i64> {
        self.release_date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .and_then(|y| y.parse().ok())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

/// Client for the TMDB movie search endpoint.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
    strategy: MatchStrategy,
}

impl TmdbClient {
    /// Create a client when an API key is configured, `None` otherwise.
    #[must_use]
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.tmdb_api_key.clone()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(SYNC_USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Some(Self {
            client,
            base_url: config.tmdb_base_url.trim_end_matches('/').to_string(),
            api_key,
            strategy: config.tmdb_match_strategy,
        })
    }

    /// Search for the canonical movie record matching a free-text title.
    ///
    /// With the title-year strategy a trailing `(YYYY)` is stripped from the
    /// query and sent as the primary release year instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or answers with a non-success
    /// status. Callers treat any error as "no match".
    pub async fn search_movie(&self, title: &str) -> Result<Option<TmdbMovie>, TmdbError> {
        let (query, year) = match self.strategy {
            MatchStrategy::FirstResult => (title.to_string(), None),
            MatchStrategy::TitleYear => split_title_year(title),
        };

        let url = format!("{}/search/movie", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("query", query.as_str())]);
        if let Some(year) = year {
            request = request.query(&[("primary_release_year", year)]);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(TmdbError::SearchFailed(response.status()));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.results.into_iter().next())
    }
}

/// Build a full poster image URL from a TMDB poster path.
#[must_use]
pub fn poster_url(path: &str) -> String {
    format!("{POSTER_IMAGE_BASE}{path}")
}

/// Split a trailing `(YYYY)` year marker off an archive title.
///
/// Returns the trimmed title and the year when one is present.
#[must_use]
pub fn split_title_year(title: &str) -> (String, Option<i64>) {
    let trimmed = title.trim();
    if let Some(open) = trimmed.rfind('(') {
        if trimmed.ends_with(')') {
            let inner = &trimmed[open + 1..trimmed.len() - 1];
            if inner.len() == 4 && inner.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(year) = inner.parse() {
                    return (trimmed[..open].trim().to_string(), Some(year));
                }
            }
        }
    }
    (trimmed.to_string(), None)
}
