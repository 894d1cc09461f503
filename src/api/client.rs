use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::archive::{archive_query, parse_search, ArchiveLookup};
use super::{CineApi, DiscoverParams};
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    CatalogPage, FavoriteEntry, Genre, MediaDetails, MediaKind, NewFavorite, PersonDetails,
    TimeWindow, TmdbId, TokenResponse, User,
};
use crate::store::{FileStore, KeyValueStore, TOKEN_KEY};

const TMDB_PROXY: &str = "/api/tmdb";
const BYPASS_HEADER: &str = "ngrok-skip-browser-warning";
const MOVIE_APPENDS: &str = "videos,credits,watch/providers,similar,images";
const TV_APPENDS: &str = "videos,credits,watch/providers,similar,images,content_ratings";
const PERSON_APPENDS: &str = "movie_credits,tv_credits,images";

/// HTTP client for the proxy backend and the archive search index. The bearer
/// token is read from the store at send time, never cached here, and only
/// ever sent to the backend.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    backend_url: String,
    archive_url: String,
    store: Arc<dyn KeyValueStore>,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, store: Arc<dyn KeyValueStore>) -> ApiResult<Self> {
        let user_agent = format!("cinescope/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            backend_url: config.backend_url.trim_end_matches('/').to_string(),
            archive_url: config.archive_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let config = ClientConfig::from_env();
        let store = Arc::new(FileStore::open(&config.state_file)?);
        Ok(Self::new(&config, store)?)
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    /// Bare request for any host: only the bypass header is attached.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(BYPASS_HEADER, "any")
    }

    /// Backend request; carries the bearer token when one is stored.
    fn backend(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.backend_url, path);
        debug!("{} {}", method, url);
        let builder = self.request(method, &url);
        match self.store.get(TOKEN_KEY) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let res = builder.send().await?;
        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &text));
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn tmdb<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T> {
        let builder = self
            .backend(Method::GET, &format!("{TMDB_PROXY}{path}"))
            .query(query);
        self.send_json(builder).await
    }

    async fn archive_search(&self, title: &str, year: Option<i32>) -> Result<ArchiveLookup, String> {
        let url = format!("{}/advancedsearch.php", self.archive_url);
        let query = [
            ("q", archive_query(title, year)),
            ("fl", "identifier,title,year".to_string()),
            ("output", "json".to_string()),
            ("rows", "1".to_string()),
        ];
        let res = self
            .request(Method::GET, &url)
            .query(&query)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = res.status();
        let body = res.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("archive search returned {}", status));
        }
        match parse_search(&body).map_err(|e| e.to_string())? {
            Some(found) => Ok(ArchiveLookup::Found(found)),
            None => Ok(ArchiveLookup::NoMatch),
        }
    }
}

#[derive(Serialize)]
struct Registration<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct GenreList {
    #[serde(default)]
    genres: Vec<Genre>,
}

fn page_query(page: u32) -> Vec<(&'static str, String)> {
    vec![("page", page.to_string())]
}

#[async_trait]
impl CineApi for ApiClient {
    fn has_token(&self) -> bool {
        self.store.get(TOKEN_KEY).is_some()
    }

    fn logout(&self) -> ApiResult<()> {
        self.store.remove(TOKEN_KEY)?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> ApiResult<TokenResponse> {
        let builder = self
            .backend(Method::POST, "/token")
            .form(&[("username", username), ("password", password)]);
        let token: TokenResponse = self.send_json(builder).await?;
        self.store.set(TOKEN_KEY, &token.access_token)?;
        Ok(token)
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<User> {
        let builder = self.backend(Method::POST, "/register").json(&Registration {
            username,
            email,
            password,
        });
        self.send_json(builder).await
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.send_json(self.backend(Method::GET, "/users/me")).await
    }

    async fn trending(
        &self,
        kind: MediaKind,
        window: TimeWindow,
        page: u32,
    ) -> ApiResult<CatalogPage> {
        let path = format!("/trending/{}/{}", kind, window.as_str());
        self.tmdb(&path, &page_query(page)).await
    }

    async fn search_movies(&self, query: &str, page: u32) -> ApiResult<CatalogPage> {
        let params = [("query", query.to_string()), ("page", page.to_string())];
        self.tmdb("/search/movie", &params).await
    }

    async fn search_tv(&self, query: &str, page: u32) -> ApiResult<CatalogPage> {
        let params = [("query", query.to_string()), ("page", page.to_string())];
        self.tmdb("/search/tv", &params).await
    }

    async fn movie_details(&self, id: TmdbId) -> ApiResult<MediaDetails> {
        let params = [("append_to_response", MOVIE_APPENDS.to_string())];
        self.tmdb(&format!("/movie/{id}"), &params).await
    }

    async fn tv_details(&self, id: TmdbId) -> ApiResult<MediaDetails> {
        let params = [("append_to_response", TV_APPENDS.to_string())];
        self.tmdb(&format!("/tv/{id}"), &params).await
    }

    async fn person_details(&self, id: TmdbId) -> ApiResult<PersonDetails> {
        let params = [("append_to_response", PERSON_APPENDS.to_string())];
        self.tmdb(&format!("/person/{id}"), &params).await
    }

    async fn genres(&self, kind: MediaKind) -> ApiResult<Vec<Genre>> {
        let list: GenreList = self.tmdb(&format!("/genre/{kind}/list"), &[]).await?;
        Ok(list.genres)
    }

    async fn movies_by_genre(&self, genre_id: i64, page: u32) -> ApiResult<CatalogPage> {
        let params = DiscoverParams::new()
            .param("with_genres", genre_id)
            .param("page", page)
            .param("sort_by", "popularity.desc");
        self.discover(MediaKind::Movie, &params).await
    }

    async fn tv_by_genre(&self, genre_id: i64, page: u32) -> ApiResult<CatalogPage> {
        let params = DiscoverParams::new()
            .param("with_genres", genre_id)
            .param("page", page)
            .param("sort_by", "popularity.desc");
        self.discover(MediaKind::Tv, &params).await
    }

    async fn upcoming(&self, page: u32, region: &str) -> ApiResult<CatalogPage> {
        let params = [("page", page.to_string()), ("region", region.to_string())];
        self.tmdb("/movie/upcoming", &params).await
    }

    async fn upcoming_by_language(&self, language: &str, page: u32) -> ApiResult<CatalogPage> {
        let today = Utc::now().date_naive().format("%Y-%m-%d");
        let params = DiscoverParams::new()
            .param("page", page)
            .param("primary_release_date.gte", today)
            .param("with_original_language", language)
            .param("sort_by", "primary_release_date.asc")
            .param("region", super::DEFAULT_REGION);
        self.discover(MediaKind::Movie, &params).await
    }

    async fn top_rated(&self, kind: MediaKind, page: u32) -> ApiResult<CatalogPage> {
        self.tmdb(&format!("/{kind}/top_rated"), &page_query(page))
            .await
    }

    async fn discover(&self, kind: MediaKind, params: &DiscoverParams) -> ApiResult<CatalogPage> {
        let builder = self
            .backend(Method::GET, &format!("{TMDB_PROXY}/discover/{kind}"))
            .query(params.pairs());
        self.send_json(builder).await
    }

    async fn favorites(&self) -> ApiResult<Vec<FavoriteEntry>> {
        self.send_json(self.backend(Method::GET, "/api/favorites"))
            .await
    }

    async fn add_favorite(&self, favorite: &NewFavorite) -> ApiResult<FavoriteEntry> {
        let builder = self.backend(Method::POST, "/api/favorites").json(favorite);
        self.send_json(builder).await
    }

    async fn remove_favorite(&self, tmdb_id: TmdbId) -> ApiResult<()> {
        let builder = self.backend(Method::DELETE, &format!("/api/favorites/{tmdb_id}"));
        match self.send_json::<serde_json::Value>(builder).await {
            Ok(_) => Ok(()),
            Err(ApiError::NotFound(detail)) => {
                debug!("Favorite {} already absent: {}", tmdb_id, detail);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup_full_movie(&self, title: &str, year: Option<i32>) -> ArchiveLookup {
        match self.archive_search(title, year).await {
            Ok(lookup) => lookup,
            Err(reason) => {
                warn!("Archive search failed for '{}': {}", title, reason);
                ArchiveLookup::Failed(reason)
            }
        }
    }
}
