//! Catalog reconciliation engine.
//!
//! One run scans the configured uploader's archive inventory, registers
//! previously-unseen items in the video registry, and links them to TMDB
//! movie records when a canonical match is found. The pass is strictly
//! sequential: each item is fully processed before the next begins.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::db::{
    insert_mapping, insert_video, is_unique_violation, list_known_identifiers, Database,
    NewMapping, NewVideo,
};
use crate::ia::{self, IaClient, SearchDoc};
use crate::tmdb::{self, TmdbClient, TmdbMovie};

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub total_scanned: usize,
    pub new_videos_added: usize,
    pub duplicates_skipped: usize,
    pub new_videos: Vec<NewVideoSummary>,
    pub timestamp: DateTime<Utc>,
}

/// Summary entry for one newly registered video.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideoSummary {
    pub identifier: String,
    pub title: String,
    pub movie_id: Option<i64>,
    pub poster_url: Option<String>,
    pub release_year: Option<i64>,
}

/// The reconciliation engine.
pub struct SyncEngine {
    db: Database,
    ia: IaClient,
    tmdb: Option<TmdbClient>,
}

impl SyncEngine {
    /// Build an engine from configuration. The TMDB client is absent when no
    /// API key is configured, which disables canonical matching but not the
    /// run itself.
    #[must_use]
    pub fn new(config: &Config, db: Database) -> Self {
        let tmdb = TmdbClient::from_config(config);
        if tmdb.is_none() {
            info!("TMDB_API_KEY not configured - canonical matching disabled");
        }

        Self {
            db,
            ia: IaClient::new(config),
            tmdb,
        }
    }

    /// Run one reconciliation pass.
    ///
    /// Only the initial inventory fetch and the dedup-set load are fatal;
    /// every per-item failure is logged with its archive identifier and the
    /// loop continues with the next item.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive inventory cannot be fetched or the
    /// registry cannot be read.
    pub async fn run(&self) -> Result<SyncReport> {
        info!("Starting archive sync");

        let items = self
            .ia
            .list_uploads()
            .await
            .context("Failed to fetch uploads from archive")?;
        info!(count = items.len(), "Fetched archive inventory");

        let known = list_known_identifiers(self.db.pool()).await?;
        debug!(count = known.len(), "Loaded known identifiers");

        let mut duplicates_skipped = 0usize;
        let mut new_videos = Vec::new();

        for item in &items {
            if known.contains(&item.identifier) {
                debug!(identifier = %item.identifier, "Skipping duplicate");
                duplicates_skipped += 1;
                continue;
            }

            match self.process_item(item).await {
                Ok(summary) => new_videos.push(summary),
                Err(e) if is_unique_violation(&e) => {
                    warn!(identifier = %item.identifier, "Already registered by a concurrent run, skipping");
                }
                Err(e) => {
                    warn!(identifier = %item.identifier, "Failed to process item: {e:#}");
                }
            }
        }

        let report = SyncReport {
            total_scanned: items.len(),
            new_videos_added: new_videos.len(),
            duplicates_skipped,
            new_videos,
            timestamp: Utc::now(),
        };

        info!(
            total_scanned = report.total_scanned,
            new_videos_added = report.new_videos_added,
            duplicates_skipped = report.duplicates_skipped,
            "Sync completed"
        );

        Ok(report)
    }

    /// Register one previously-unseen archive item.
    async fn process_item(&self, item: &SearchDoc) -> Result<NewVideoSummary> {
        info!(identifier = %item.identifier, "Processing new video");

        let detail = self.ia.fetch_item_detail(&item.identifier).await?;

        // Without a playable file the item is still registered; size falls
        // back to the search index's item size and duration stays unset.
        let playable = ia::select_playable_file(&detail.files);
        let (file_size, duration) = match playable {
            Some(file) => (
                file.size_bytes().or(item.item_size),
                detail
                    .runtime_minutes
                    .map(|minutes| (minutes * 60.0).floor() as i64),
            ),
            None => (item.item_size, None),
        };

        let tmdb_match = self.lookup_movie(item).await;

        let title = item
            .title
            .clone()
            .unwrap_or_else(|| item.identifier.clone());

        let new_video = NewVideo {
            archive_identifier: item.identifier.clone(),
            title: title.clone(),
            description: item.description.clone().or(detail.description),
            movie_id: tmdb_match.as_ref().map_or(0, |m| m.id),
            tmdb_title: tmdb_match.as_ref().map(|m| m.title.clone()),
            tmdb_overview: tmdb_match.as_ref().and_then(|m| m.overview.clone()),
            poster_path: tmdb_match.as_ref().and_then(|m| m.poster_path.clone()),
            release_year: tmdb_match.as_ref().and_then(TmdbMovie::release_year),
            file_size,
            duration,
            upload_date: item
                .publicdate
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339()),
        };

        let video_id = insert_video(self.db.pool(), &new_video).await?;
        info!(identifier = %item.identifier, title = %new_video.title, "New video registered");

        let summary = NewVideoSummary {
            identifier: item.identifier.clone(),
            title: new_video.tmdb_title.clone().unwrap_or(title),
            movie_id: tmdb_match.as_ref().map(|m| m.id),
            poster_url: new_video.poster_path.as_deref().map(tmdb::poster_url),
            release_year: new_video.release_year,
        };

        if let Some(movie) = &tmdb_match {
            let mapping = NewMapping {
                movie_id: movie.id,
                video_id,
                is_primary: true,
            };
            // The video row is kept even when this fails; the mapping is
            // simply missing until linked manually.
            match insert_mapping(self.db.pool(), &mapping).await {
                Ok(_) => debug!(movie_id = movie.id, video_id, "Created movie mapping"),
                Err(e) => {
                    warn!(identifier = %item.identifier, movie_id = movie.id, "Failed to create movie mapping: {e:#}");
                }
            }
        }

        Ok(summary)
    }

    /// Resolve an item against TMDB, best effort. Lookup failures are
    /// logged and treated as "no match".
    async fn lookup_movie(&self, item: &SearchDoc) -> Option<TmdbMovie> {
        let tmdb = self.tmdb.as_ref()?;
        let title = item.title.as_deref().filter(|t| !t.is_empty())?;

        match tmdb.search_movie(title).await {
            Ok(Some(movie)) => {
                info!(
                    title = %title,
                    movie_id = movie.id,
                    canonical = %movie.title,
                    "Found TMDB match"
                );
                Some(movie)
            }
            Ok(None) => {
                info!(title = %title, "No TMDB match found");
                None
            }
            Err(e) => {
                warn!(title = %title, "TMDB search failed: {e:#}");
                None
            }
        }
    }
}

/// Run the reconciliation engine on a fixed interval, forever.
///
/// Errors are logged and never terminate the loop.
pub async fn run_loop(config: Arc<Config>, db: Database) {
    let interval = config.sync_interval;
    let engine = SyncEngine::new(&config, db);

    loop {
        match engine.run().await {
            Ok(report) => {
                if report.new_videos_added > 0 {
                    info!(
                        new_videos = report.new_videos_added,
                        "Scheduled sync added videos"
                    );
                }
            }
            Err(e) => error!("Scheduled sync failed: {e:#}"),
        }

        tokio::time::sleep(interval).await;
    }
}
