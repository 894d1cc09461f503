use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub type TmdbId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            other => Err(format!("unsupported media type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    #[default]
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

/// One movie or TV entry as returned by list endpoints. Fields the client
/// does not interpret are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogItem {
    pub id: TmdbId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogItem {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    pub fn date(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
            .filter(|d| !d.is_empty())
    }

    pub fn year(&self) -> Option<i32> {
        self.date().and_then(extract_year)
    }

    /// TV-only fields decide the kind; list payloads rarely carry `media_type`.
    pub fn kind(&self) -> MediaKind {
        let tv = self.first_air_date.as_deref().is_some_and(|d| !d.is_empty())
            || self.name.is_some()
            || self.media_type.as_deref() == Some("tv");
        if tv {
            MediaKind::Tv
        } else {
            MediaKind::Movie
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CatalogPage {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<CatalogItem>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Video {
    pub key: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VideoList {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Season {
    #[serde(default)]
    pub id: i64,
    pub season_number: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

/// Movie or TV detail payload with its appended resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MediaDetails {
    #[serde(flatten)]
    pub item: CatalogItem,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub videos: Option<VideoList>,
    #[serde(default)]
    pub seasons: Vec<Season>,
    #[serde(default)]
    pub runtime: Option<u32>,
}

impl MediaDetails {
    pub fn videos(&self) -> &[Video] {
        self.videos
            .as_ref()
            .map(|v| v.results.as_slice())
            .unwrap_or_default()
    }

    pub fn genre_ids(&self) -> Vec<i64> {
        self.genres.iter().map(|g| g.id).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersonDetails {
    pub id: TmdbId,
    pub name: String,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub birthday: Option<String>,
    #[serde(default)]
    pub place_of_birth: Option<String>,
    #[serde(default)]
    pub known_for_department: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// A saved watchlist record as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FavoriteEntry {
    pub id: i64,
    pub tmdb_id: TmdbId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub media_type: MediaKind,
    pub user_id: i64,
    pub added_at: DateTime<Utc>,
}

/// The normalized subset posted when creating a favorite.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewFavorite {
    pub tmdb_id: TmdbId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub media_type: MediaKind,
}

impl NewFavorite {
    pub fn from_item(item: &CatalogItem, kind: MediaKind) -> Self {
        Self {
            tmdb_id: item.id,
            title: item.display_title().to_string(),
            poster_path: item.poster_path.clone(),
            media_type: kind,
        }
    }
}

impl From<&FavoriteEntry> for NewFavorite {
    fn from(entry: &FavoriteEntry) -> Self {
        Self {
            tmdb_id: entry.tmdb_id,
            title: entry.title.clone(),
            poster_path: entry.poster_path.clone(),
            media_type: entry.media_type,
        }
    }
}

/// A playable item found on the public archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveMatch {
    pub identifier: String,
    pub title: String,
    pub embed_url: String,
}

pub fn extract_year(date: &str) -> Option<i32> {
    date.split('-').next().and_then(|y| y.parse().ok())
}
