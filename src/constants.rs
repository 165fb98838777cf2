//! Shared constants used across the application.

/// User agent string sent with outbound archive and metadata requests.
pub const SYNC_USER_AGENT: &str = concat!("movie-archive-sync/", env!("CARGO_PKG_VERSION"));

/// Number of archive search results requested per reconciliation run.
/// The scan covers a single page; older items are picked up by earlier runs.
pub const SEARCH_PAGE_SIZE: u32 = 50;

/// File extension of playable video files.
pub const VIDEO_EXTENSION: &str = ".mp4";

/// File name marker for low-bitrate derivative encodes, which are never
/// selected as the playable file.
pub const LOW_BITRATE_MARKER: &str = "_512kb";

/// Base URL for TMDB poster images (w500 rendition).
pub const POSTER_IMAGE_BASE: &str = "https://image.tmdb.org/t/p/w500";
