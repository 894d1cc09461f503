#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use cinescope::api::{ArchiveLookup, CineApi, DiscoverParams};
use cinescope::error::{ApiError, ApiResult};
use cinescope::models::{
    ArchiveMatch, CatalogItem, CatalogPage, FavoriteEntry, Genre, MediaDetails, MediaKind,
    NewFavorite, PersonDetails, TimeWindow, TmdbId, TokenResponse, User,
};
use cinescope::notify::RecordingNotifier;
use cinescope::pages::PageContext;
use cinescope::session::Session;
use cinescope::store::MemoryStore;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const VALID_TOKEN: &str = "valid-token";

/// In-memory stand-in for the backend. Every call is recorded by name.
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<String>>,
    pub discover_calls: Mutex<Vec<DiscoverParams>>,
    pub token: Mutex<Option<String>>,
    pub users: Mutex<HashMap<String, String>>,
    pub trending: Vec<CatalogItem>,
    pub search_results: Vec<CatalogItem>,
    pub genres: Vec<Genre>,
    pub discover_results: Vec<CatalogItem>,
    pub upcoming: Vec<CatalogItem>,
    pub details: HashMap<TmdbId, MediaDetails>,
    pub favorites: Mutex<Vec<FavoriteEntry>>,
    pub fail_mutations: AtomicBool,
    pub fail_discover: AtomicBool,
    pub archive: Option<ArchiveMatch>,
    /// When set, `search_movies` waits for one notification before answering.
    pub search_gate: Option<Arc<Notify>>,
}

impl FakeApi {
    pub fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == call)
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn logged_in(self) -> Self {
        *self.token.lock().unwrap() = Some(VALID_TOKEN.to_string());
        self
    }

    pub fn favorite_ids(&self) -> Vec<TmdbId> {
        self.favorites.lock().unwrap().iter().map(|f| f.tmdb_id).collect()
    }

    fn page(results: &[CatalogItem]) -> CatalogPage {
        CatalogPage {
            page: 1,
            results: results.to_vec(),
            total_pages: 3,
            total_results: results.len() as u32,
        }
    }

    fn mutation_result(&self) -> ApiResult<()> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(ApiError::Server {
                status: 500,
                body: "boom".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

pub fn user() -> User {
    User {
        id: 1,
        username: "ana".to_string(),
        email: "ana@example.com".to_string(),
    }
}

#[async_trait]
impl CineApi for FakeApi {
    fn has_token(&self) -> bool {
        self.token.lock().unwrap().is_some()
    }

    fn logout(&self) -> ApiResult<()> {
        self.record("logout");
        *self.token.lock().unwrap() = None;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> ApiResult<TokenResponse> {
        self.record("login");
        let known = self.users.lock().unwrap().get(username).cloned();
        if known.as_deref() != Some(password) && !(username == "ana" && password == "secret") {
            return Err(ApiError::Unauthorized(
                "Incorrect username or password".to_string(),
            ));
        }
        *self.token.lock().unwrap() = Some(VALID_TOKEN.to_string());
        Ok(TokenResponse {
            access_token: VALID_TOKEN.to_string(),
            token_type: "bearer".to_string(),
        })
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<User> {
        self.record("register");
        let mut users = self.users.lock().unwrap();
        if users.contains_key(username) {
            return Err(ApiError::Validation {
                status: 400,
                detail: "Username already registered".to_string(),
            });
        }
        users.insert(username.to_string(), password.to_string());
        Ok(User {
            id: 2,
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.record("current_user");
        match self.token.lock().unwrap().as_deref() {
            Some(VALID_TOKEN) => Ok(user()),
            _ => Err(ApiError::Unauthorized(
                "Could not validate credentials".to_string(),
            )),
        }
    }

    async fn trending(
        &self,
        kind: MediaKind,
        window: TimeWindow,
        _page: u32,
    ) -> ApiResult<CatalogPage> {
        self.record(&format!("trending/{}/{}", kind, window.as_str()));
        Ok(Self::page(&self.trending))
    }

    async fn search_movies(&self, query: &str, _page: u32) -> ApiResult<CatalogPage> {
        self.record("search_movies");
        if let Some(gate) = &self.search_gate {
            gate.notified().await;
        }
        let hits: Vec<CatalogItem> = self
            .search_results
            .iter()
            .filter(|i| i.display_title().to_lowercase().contains(&query.to_lowercase()))
            .cloned()
            .collect();
        Ok(Self::page(&hits))
    }

    async fn search_tv(&self, _query: &str, _page: u32) -> ApiResult<CatalogPage> {
        self.record("search_tv");
        Ok(Self::page(&self.search_results))
    }

    async fn movie_details(&self, id: TmdbId) -> ApiResult<MediaDetails> {
        self.record("movie_details");
        self.details
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("could not be found".into()))
    }

    async fn tv_details(&self, id: TmdbId) -> ApiResult<MediaDetails> {
        self.record("tv_details");
        self.details
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("missing".into()))
    }

    async fn person_details(&self, id: TmdbId) -> ApiResult<PersonDetails> {
        self.record("person_details");
        Ok(serde_json::from_value(json!({
            "id": id,
            "name": "Song Kang-ho",
            "movie_credits": {"cast": [{"id": 496243, "title": "Parasite", "release_date": "2019-05-30"}]}
        }))
        .unwrap())
    }

    async fn genres(&self, kind: MediaKind) -> ApiResult<Vec<Genre>> {
        self.record(&format!("genres/{kind}"));
        Ok(self.genres.clone())
    }

    async fn movies_by_genre(&self, genre_id: i64, _page: u32) -> ApiResult<CatalogPage> {
        self.record(&format!("movies_by_genre/{genre_id}"));
        Ok(Self::page(&self.discover_results))
    }

    async fn tv_by_genre(&self, genre_id: i64, _page: u32) -> ApiResult<CatalogPage> {
        self.record(&format!("tv_by_genre/{genre_id}"));
        Ok(Self::page(&self.discover_results))
    }

    async fn upcoming(&self, _page: u32, region: &str) -> ApiResult<CatalogPage> {
        self.record(&format!("upcoming/{region}"));
        Ok(Self::page(&self.upcoming))
    }

    async fn upcoming_by_language(&self, language: &str, _page: u32) -> ApiResult<CatalogPage> {
        self.record(&format!("upcoming_by_language/{language}"));
        Ok(Self::page(&self.upcoming))
    }

    async fn top_rated(&self, kind: MediaKind, _page: u32) -> ApiResult<CatalogPage> {
        self.record(&format!("top_rated/{kind}"));
        Ok(Self::page(&self.trending))
    }

    async fn discover(&self, kind: MediaKind, params: &DiscoverParams) -> ApiResult<CatalogPage> {
        self.record(&format!("discover/{kind}"));
        self.discover_calls.lock().unwrap().push(params.clone());
        if self.fail_discover.load(Ordering::SeqCst) {
            return Err(ApiError::Server {
                status: 502,
                body: "upstream down".to_string(),
            });
        }
        Ok(Self::page(&self.discover_results))
    }

    async fn favorites(&self) -> ApiResult<Vec<FavoriteEntry>> {
        self.record("favorites");
        Ok(self.favorites.lock().unwrap().clone())
    }

    async fn add_favorite(&self, favorite: &NewFavorite) -> ApiResult<FavoriteEntry> {
        self.record("add_favorite");
        self.mutation_result()?;
        let entry = FavoriteEntry {
            id: favorite.tmdb_id,
            tmdb_id: favorite.tmdb_id,
            title: favorite.title.clone(),
            poster_path: favorite.poster_path.clone(),
            media_type: favorite.media_type,
            user_id: 1,
            added_at: Utc::now(),
        };
        self.favorites.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn remove_favorite(&self, tmdb_id: TmdbId) -> ApiResult<()> {
        self.record("remove_favorite");
        self.mutation_result()?;
        self.favorites.lock().unwrap().retain(|f| f.tmdb_id != tmdb_id);
        Ok(())
    }

    async fn lookup_full_movie(&self, _title: &str, _year: Option<i32>) -> ArchiveLookup {
        self.record("lookup_full_movie");
        match &self.archive {
            Some(found) => ArchiveLookup::Found(found.clone()),
            None => ArchiveLookup::NoMatch,
        }
    }
}

pub fn movie(id: TmdbId, title: &str, date: &str) -> CatalogItem {
    CatalogItem {
        id,
        title: Some(title.to_string()),
        release_date: Some(date.to_string()),
        poster_path: Some(format!("/{id}.jpg")),
        original_language: Some("en".to_string()),
        ..Default::default()
    }
}

pub fn favorite_entry(tmdb_id: TmdbId, title: &str) -> FavoriteEntry {
    FavoriteEntry {
        id: tmdb_id,
        tmdb_id,
        title: title.to_string(),
        poster_path: None,
        media_type: MediaKind::Movie,
        user_id: 1,
        added_at: Utc::now(),
    }
}

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub session: Arc<Session>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<MemoryStore>,
}

impl Harness {
    /// Wires the fake into a context and validates whatever token it holds.
    pub async fn new(api: FakeApi) -> Self {
        let api = Arc::new(api);
        let session = Arc::new(Session::new(api.clone()));
        session.init().await;
        Self {
            api,
            session,
            notifier: Arc::new(RecordingNotifier::new()),
            store: Arc::new(MemoryStore::new()),
        }
    }

    pub fn ctx(&self) -> PageContext {
        PageContext {
            api: self.api.clone(),
            session: self.session.clone(),
            notifier: self.notifier.clone(),
            store: self.store.clone(),
        }
    }
}
