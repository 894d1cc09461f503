use async_trait::async_trait;

use crate::error::ApiResult;
use crate::models::{
    ArchiveMatch, CatalogPage, FavoriteEntry, Genre, MediaDetails, MediaKind, NewFavorite,
    PersonDetails, TimeWindow, TmdbId, TokenResponse, User,
};

mod archive;
mod client;

pub use archive::{archive_query, ArchiveLookup};
pub use client::ApiClient;

pub const DEFAULT_REGION: &str = "IN";

/// Everything the pages ask of the backend. Each call is a single request:
/// no retries, no caching, no deduplication.
#[async_trait]
pub trait CineApi: Send + Sync {
    /// Whether a bearer token is currently persisted.
    fn has_token(&self) -> bool;
    /// Drops the persisted token. Purely local.
    fn logout(&self) -> ApiResult<()>;

    async fn login(&self, username: &str, password: &str) -> ApiResult<TokenResponse>;
    async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<User>;
    async fn current_user(&self) -> ApiResult<User>;

    async fn trending(&self, kind: MediaKind, window: TimeWindow, page: u32)
        -> ApiResult<CatalogPage>;
    async fn search_movies(&self, query: &str, page: u32) -> ApiResult<CatalogPage>;
    async fn search_tv(&self, query: &str, page: u32) -> ApiResult<CatalogPage>;
    async fn movie_details(&self, id: TmdbId) -> ApiResult<MediaDetails>;
    async fn tv_details(&self, id: TmdbId) -> ApiResult<MediaDetails>;
    async fn person_details(&self, id: TmdbId) -> ApiResult<PersonDetails>;
    async fn genres(&self, kind: MediaKind) -> ApiResult<Vec<Genre>>;
    async fn movies_by_genre(&self, genre_id: i64, page: u32) -> ApiResult<CatalogPage>;
    async fn tv_by_genre(&self, genre_id: i64, page: u32) -> ApiResult<CatalogPage>;
    async fn upcoming(&self, page: u32, region: &str) -> ApiResult<CatalogPage>;
    async fn upcoming_by_language(&self, language: &str, page: u32) -> ApiResult<CatalogPage>;
    async fn top_rated(&self, kind: MediaKind, page: u32) -> ApiResult<CatalogPage>;
    async fn discover(&self, kind: MediaKind, params: &DiscoverParams) -> ApiResult<CatalogPage>;

    async fn favorites(&self) -> ApiResult<Vec<FavoriteEntry>>;
    async fn add_favorite(&self, favorite: &NewFavorite) -> ApiResult<FavoriteEntry>;
    async fn remove_favorite(&self, tmdb_id: TmdbId) -> ApiResult<()>;

    async fn lookup_full_movie(&self, title: &str, year: Option<i32>) -> ArchiveLookup;

    /// Collapses lookup failures into "no result".
    async fn find_full_movie(&self, title: &str, year: Option<i32>) -> Option<ArchiveMatch> {
        self.lookup_full_movie(title, year).await.into_match()
    }
}

/// Ordered query parameter bag for the discover endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverParams {
    pairs: Vec<(String, String)>,
}

impl DiscoverParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Replaces an existing key in place so the bag never repeats a parameter.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}
