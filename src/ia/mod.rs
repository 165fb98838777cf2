//! Internet Archive inventory client.
//!
//! Talks to the archive's advanced-search index for uploader inventory and
//! to the per-item metadata endpoint for file listings and runtime.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::config::Config;
use crate::constants::{LOW_BITRATE_MARKER, SEARCH_PAGE_SIZE, SYNC_USER_AGENT, VIDEO_EXTENSION};

#[derive(Debug, Error)]
pub enum IaError {
    #[error("archive search failed with status {0}")]
    SearchFailed(StatusCode),
    #[error("metadata fetch for {identifier} failed with status {status}")]
    DetailFailed {
        identifier: String,
        status: StatusCode,
    },
    #[error("archive request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// An item from the archive search index.
///
/// The index returns text fields either as a plain string or as a list of
/// strings; both forms are accepted and collapsed to the first value.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchDoc {
    pub identifier: String,
    #[serde(default, deserialize_with = "de_first_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "de_first_text")]
    pub description: Option<String>,
    #[serde(default)]
    pub publicdate: Option<String>,
    #[serde(default)]
    pub item_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    response: SearchBody,
}

#[derive(Debug, Default, Deserialize)]
struct SearchBody {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

/// A file entry from an item's metadata listing. Sizes arrive as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_first_text")]
    pub size: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

impl FileEntry {
    /// Parsed file size in bytes, if present and numeric.
    #[must_use]
    pub fn size_bytes(&self) -> Option<i64> {
        self.size.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

/// Technical metadata for a single archive item.
#[derive(Debug, Clone, Default)]
pub struct ItemDetail {
    pub files: Vec<FileEntry>,
    pub runtime_minutes: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    files: Vec<FileEntry>,
    #[serde(default)]
    metadata: MetadataBlock,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataBlock {
    #[serde(default, deserialize_with = "de_first_text")]
    runtime: Option<String>,
    #[serde(default, deserialize_with = "de_first_text")]
    description: Option<String>,
}

/// Client for the Internet Archive search and metadata endpoints.
#[derive(Debug, Clone)]
pub struct IaClient {
    client: Client,
    base_url: String,
    uploader: String,
}

impl IaClient {
    /// Create a client for the configured uploader account.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(SYNC_USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.ia_base_url.trim_end_matches('/').to_string(),
            uploader: config.ia_uploader.clone(),
        }
    }

    /// List movie items uploaded by the configured account, newest first,
    /// capped at a single page of [`SEARCH_PAGE_SIZE`] results.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the index answers with a
    /// non-success status. Callers treat this as fatal for the whole run.
    pub async fn list_uploads(&self) -> Result<Vec<SearchDoc>, IaError> {
        let query = format!("uploader:{} AND mediatype:movies", self.uploader);
        let url = format!("{}/advancedsearch.php", self.base_url);
        let rows = SEARCH_PAGE_SIZE.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("fl[]", "identifier,title,description,publicdate,item_size"),
                ("sort[]", "publicdate desc"),
                ("rows", rows.as_str()),
                ("page", "1"),
                ("output", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IaError::SearchFailed(response.status()));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.response.docs)
    }

    /// Fetch the file listing and technical metadata for one item.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or answers with a non-success
    /// status. Callers skip the single item and continue.
    pub async fn fetch_item_detail(&self, identifier: &str) -> Result<ItemDetail, IaError> {
        let url = format!("{}/metadata/{identifier}", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(IaError::DetailFailed {
                identifier: identifier.to_string(),
                status: response.status(),
            });
        }

        let body: MetadataResponse = response.json().await?;

        Ok(ItemDetail {
            runtime_minutes: body.metadata.runtime.as_deref().and_then(parse_leading_f64),
            description: body.metadata.description,
            files: body.files,
        })
    }
}

/// Pick the best playable file from an item's listing: the first `.mp4`
/// that is not a low-bitrate derivative.
#[must_use]
pub fn select_playable_file(files: &[FileEntry]) -> Option<&FileEntry> {
    files.iter().find(|f| {
        f.name.as_deref().is_some_and(|name| {
            name.ends_with(VIDEO_EXTENSION) && !name.contains(LOW_BITRATE_MARKER)
        })
    })
}

/// Parse the longest leading decimal prefix of a string, if any.
///
/// Archive runtime values are free-form ("96", "96.5 minutes", "1:36:00");
/// only the leading number is meaningful.
#[must_use]
pub fn parse_leading_f64(s: &str) -> Option<f64> {
    let s = s.trim();
    let mut end = 0;
    for (i, c) in s.char_indices() {
        let valid = c.is_ascii_digit() || c == '.' || (i == 0 && (c == '-' || c == '+'));
        if !valid {
            break;
        }
        end = i + c.len_utf8();
    }
    s[..end].parse().ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextValue {
    One(String),
    Many(Vec<String>),
    Number(f64),
}

fn de_first_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<TextValue>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        TextValue::One(s) => Some(s),
        TextValue::Many(items) => items.into_iter().next(),
        TextValue::Number(n) => Some(n.to_string()),
    }))
}
