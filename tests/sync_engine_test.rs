//! Integration tests for the reconciliation engine.

use movie_archive_sync::config::Config;
use movie_archive_sync::db::{
    get_mappings_for_movie, get_video_by_identifier, list_known_identifiers, Database,
};
use movie_archive_sync::sync::SyncEngine;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

/// Config pointing both upstream base URLs at the mock server.
fn config_for(server: &MockServer, tmdb_key: Option<&str>) -> Config {
    Config {
        ia_base_url: server.uri(),
        tmdb_base_url: format!("{}/3", server.uri()),
        tmdb_api_key: tmdb_key.map(String::from),
        ..Config::for_testing()
    }
}

fn search_doc(identifier: &str, title: &str) -> serde_json::Value {
    json!({
        "identifier": identifier,
        "title": title,
        "description": "An old film",
        "publicdate": "2024-03-01T00:00:00Z",
        "item_size": 700_000_000_u64,
    })
}

fn search_body(docs: &[serde_json::Value]) -> serde_json::Value {
    json!({ "response": { "docs": docs } })
}

fn metadata_body() -> serde_json::Value {
    json!({
        "files": [
            { "name": "film_512kb.mp4", "size": "100", "format": "512Kb MPEG4" },
            { "name": "film.mp4", "size": "650000000", "format": "h.264" },
            { "name": "film.ogv", "size": "300", "format": "Ogg Video" }
        ],
        "metadata": { "runtime": "96", "description": "Full description" }
    })
}

async fn mount_search(server: &MockServer, docs: &[serde_json::Value]) {
    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body(docs)))
        .mount(server)
        .await;
}

async fn mount_metadata(server: &MockServer, identifier: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/metadata/{identifier}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(metadata_body()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_registers_new_items_without_tmdb() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    mount_search(
        &server,
        &[
            search_doc("film-one", "Film One"),
            search_doc("film-two", "Film Two"),
        ],
    )
    .await;
    mount_metadata(&server, "film-one").await;
    mount_metadata(&server, "film-two").await;

    let engine = SyncEngine::new(&config_for(&server, None), db.clone());
    let report = engine.run().await.expect("sync failed");

    assert_eq!(report.total_scanned, 2);
    assert_eq!(report.new_videos_added, 2);
    assert_eq!(report.duplicates_skipped, 0);

    let video = get_video_by_identifier(db.pool(), "film-one")
        .await
        .expect("Database error")
        .expect("Video not registered");
    assert_eq!(video.title, "Film One");
    assert_eq!(video.movie_id, 0);
    assert_eq!(video.file_size, Some(650_000_000));
    assert_eq!(video.duration, Some(96 * 60));
    assert_eq!(video.upload_date, "2024-03-01T00:00:00Z");
    assert!(video.is_active);

    // No TMDB key: no mappings, no canonical fields, null movie ids
    assert!(video.tmdb_title.is_none());
    for summary in &report.new_videos {
        assert!(summary.movie_id.is_none());
    }
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    mount_search(
        &server,
        &[
            search_doc("film-one", "Film One"),
            search_doc("film-two", "Film Two"),
        ],
    )
    .await;
    mount_metadata(&server, "film-one").await;
    mount_metadata(&server, "film-two").await;

    let engine = SyncEngine::new(&config_for(&server, None), db.clone());

    let first = engine.run().await.expect("first sync failed");
    assert_eq!(first.new_videos_added, 2);

    let second = engine.run().await.expect("second sync failed");
    assert_eq!(second.new_videos_added, 0);
    assert_eq!(second.duplicates_skipped, second.total_scanned);
    assert!(second.new_videos.is_empty());

    let known = list_known_identifiers(db.pool()).await.expect("list failed");
    assert_eq!(known.len(), 2);
}

#[tokio::test]
async fn test_detail_failure_isolated_to_one_item() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    mount_search(
        &server,
        &[
            search_doc("film-a", "Film A"),
            search_doc("film-b", "Film B"),
            search_doc("film-c", "Film C"),
        ],
    )
    .await;
    mount_metadata(&server, "film-a").await;
    Mock::given(method("GET"))
        .and(path("/metadata/film-b"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_metadata(&server, "film-c").await;

    let engine = SyncEngine::new(&config_for(&server, None), db.clone());
    let report = engine.run().await.expect("sync failed");

    // film-b is dropped for this run; the others still land
    assert_eq!(report.total_scanned, 3);
    assert_eq!(report.new_videos_added, 2);
    assert_eq!(report.duplicates_skipped, 0);

    let identifiers: Vec<&str> = report
        .new_videos
        .iter()
        .map(|v| v.identifier.as_str())
        .collect();
    assert_eq!(identifiers, vec!["film-a", "film-c"]);

    assert!(get_video_by_identifier(db.pool(), "film-b")
        .await
        .expect("Database error")
        .is_none());
}

#[tokio::test]
async fn test_links_matched_movies() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    mount_search(&server, &[search_doc("notld-1968", "Night of the Living Dead")]).await;
    mount_metadata(&server, "notld-1968").await;
    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": 10331,
                "title": "Night of the Living Dead",
                "overview": "Zombies besiege a farmhouse.",
                "poster_path": "/abc123.jpg",
                "release_date": "1968-10-01"
            }]
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(&config_for(&server, Some("test-key")), db.clone());
    let report = engine.run().await.expect("sync failed");

    assert_eq!(report.new_videos_added, 1);
    let summary = &report.new_videos[0];
    assert_eq!(summary.movie_id, Some(10331));
    assert_eq!(
        summary.poster_url.as_deref(),
        Some("https://image.tmdb.org/t/p/w500/abc123.jpg")
    );
    assert_eq!(summary.release_year, Some(1968));

    let video = get_video_by_identifier(db.pool(), "notld-1968")
        .await
        .expect("Database error")
        .expect("Video not registered");
    assert_eq!(video.movie_id, 10331);
    assert_eq!(video.tmdb_title.as_deref(), Some("Night of the Living Dead"));
    assert_eq!(video.release_year, Some(1968));

    let mappings = get_mappings_for_movie(db.pool(), 10331)
        .await
        .expect("Database error");
    assert_eq!(mappings.len(), 1);
    assert_eq!(mappings[0].video_id, video.id);
    assert!(mappings[0].is_primary);
}

#[tokio::test]
async fn test_tmdb_failure_treated_as_no_match() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    mount_search(&server, &[search_doc("film-one", "Film One")]).await;
    mount_metadata(&server, "film-one").await;
    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(&config_for(&server, Some("test-key")), db.clone());
    let report = engine.run().await.expect("sync failed");

    assert_eq!(report.new_videos_added, 1);
    let video = get_video_by_identifier(db.pool(), "film-one")
        .await
        .expect("Database error")
        .expect("Video not registered");
    assert_eq!(video.movie_id, 0);
    assert!(video.tmdb_title.is_none());

    let mappings = get_mappings_for_movie(db.pool(), 0)
        .await
        .expect("Database error");
    assert!(mappings.is_empty());
}

#[tokio::test]
async fn test_untitled_item_skips_lookup_and_uses_identifier() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    mount_search(
        &server,
        &[json!({
            "identifier": "untitled-reel",
            "publicdate": "2024-03-01T00:00:00Z",
            "item_size": 1000
        })],
    )
    .await;
    mount_metadata(&server, "untitled-reel").await;
    // The lookup must not fire for an item without a title
    Mock::given(method("GET"))
        .and(path("/3/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(0)
        .mount(&server)
        .await;

    let engine = SyncEngine::new(&config_for(&server, Some("test-key")), db.clone());
    let report = engine.run().await.expect("sync failed");

    assert_eq!(report.new_videos_added, 1);
    let video = get_video_by_identifier(db.pool(), "untitled-reel")
        .await
        .expect("Database error")
        .expect("Video not registered");
    assert_eq!(video.title, "untitled-reel");
    assert_eq!(video.movie_id, 0);
}

#[tokio::test]
async fn test_no_playable_file_falls_back_to_item_size() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    mount_search(&server, &[search_doc("derivatives-only", "Derivatives Only")]).await;
    Mock::given(method("GET"))
        .and(path("/metadata/derivatives-only"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                { "name": "film_512kb.mp4", "size": "100" },
                { "name": "film.ogv", "size": "300" }
            ],
            "metadata": { "runtime": "96" }
        })))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(&config_for(&server, None), db.clone());
    engine.run().await.expect("sync failed");

    let video = get_video_by_identifier(db.pool(), "derivatives-only")
        .await
        .expect("Database error")
        .expect("Video not registered");
    assert_eq!(video.file_size, Some(700_000_000));
    assert_eq!(video.duration, None);
}

#[tokio::test]
async fn test_search_failure_is_fatal() {
    let (db, _temp_dir) = setup_db().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/advancedsearch.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let engine = SyncEngine::new(&config_for(&server, None), db.clone());
    let err = engine.run().await.expect_err("run should fail");
    assert!(format!("{err:#}").contains("Failed to fetch uploads"));

    let known = list_known_identifiers(db.pool()).await.expect("list failed");
    assert!(known.is_empty());
}
