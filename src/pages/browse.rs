//! Home (movies) and TV browse pages: trending grid, genre filter, search.

use tracing::debug;

use super::{toggle_favorite, LoadTracker, PageContext, PageState};
use crate::favorites::{CardFavorites, FavoriteIds, ToggleOutcome};
use crate::models::{CatalogItem, Genre, MediaKind, TimeWindow};

const TRENDING_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseView {
    pub kind: MediaKind,
    /// The grid currently shown: trending, a genre or search results.
    pub items: Vec<CatalogItem>,
    pub trending: Vec<CatalogItem>,
    pub genres: Vec<Genre>,
    pub selected_genre: Option<Genre>,
    pub cards: CardFavorites,
    pub loading: bool,
    pub searching: bool,
}

impl BrowseView {
    pub fn heading(&self) -> String {
        match (&self.selected_genre, self.kind) {
            (Some(genre), _) => genre.name.clone(),
            (None, MediaKind::Movie) => "Popular Movies".to_string(),
            (None, MediaKind::Tv) => "Popular TV Shows".to_string(),
        }
    }
}

pub struct BrowsePage {
    ctx: PageContext,
    kind: MediaKind,
    /// Guards the trending and genre lists; `state` guards `items`.
    base: LoadTracker,
    state: PageState<BrowseView>,
}

impl BrowsePage {
    pub fn home(ctx: PageContext) -> Self {
        Self::new(ctx, MediaKind::Movie)
    }

    pub fn tv(ctx: PageContext) -> Self {
        Self::new(ctx, MediaKind::Tv)
    }

    fn new(ctx: PageContext, kind: MediaKind) -> Self {
        Self {
            ctx,
            kind,
            base: LoadTracker::default(),
            state: PageState::new(BrowseView {
                kind,
                ..Default::default()
            }),
        }
    }

    pub fn view(&self) -> BrowseView {
        self.state.snapshot()
    }

    /// Trending list and genres together, then the favorite badges.
    pub async fn load(&self) {
        let base = self.base.begin();
        let ticket = self.state.begin();
        self.state.update(|v| v.loading = true);

        let api = self.ctx.api.as_ref();
        let fetched = tokio::try_join!(
            api.trending(self.kind, TimeWindow::Day, 1),
            api.genres(self.kind)
        );
        match fetched {
            Ok((page, genres)) if self.base.is_current(base) => {
                let trending: Vec<CatalogItem> =
                    page.results.iter().take(TRENDING_LIMIT).cloned().collect();
                self.state.update(|v| {
                    v.trending = trending;
                    v.genres = genres;
                    v.loading = false;
                });
                // A search or genre pick started meanwhile keeps its grid.
                self.state.apply(ticket, |v| v.items = page.results);
            }
            Ok(_) => debug!("Dropping superseded {} browse load", self.kind),
            Err(e) => {
                if self.base.is_current(base) {
                    self.state.update(|v| v.loading = false);
                    self.ctx.report("trending titles", &e);
                }
                return;
            }
        }

        if self.ctx.is_authenticated() {
            self.refresh_favorites().await;
        }
    }

    pub async fn refresh_favorites(&self) {
        let base = self.base.current();
        match FavoriteIds::refetch(self.ctx.api.as_ref()).await {
            Ok(ids) if self.base.is_current(base) => {
                self.state.update(|v| v.cards.replace_ids(ids))
            }
            Ok(_) => {}
            Err(e) => self.ctx.report("favorites", &e),
        }
    }

    /// Returns whether a request was made; blank queries leave the grid alone.
    pub async fn search(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            debug!("Ignoring empty search");
            return false;
        }
        let ticket = self.state.begin();
        self.state.update(|v| v.searching = true);

        let api = self.ctx.api.as_ref();
        let result = match self.kind {
            MediaKind::Movie => api.search_movies(query, 1).await,
            MediaKind::Tv => api.search_tv(query, 1).await,
        };
        match result {
            Ok(page) => {
                self.state.apply(ticket, |v| {
                    v.items = page.results;
                    v.selected_genre = None;
                    v.searching = false;
                });
            }
            Err(e) => {
                if self.state.apply(ticket, |v| v.searching = false) {
                    self.ctx.report("search results", &e);
                }
            }
        }
        true
    }

    pub async fn select_genre(&self, genre_id: i64) {
        let ticket = self.state.begin();
        let genre = self.state.update(|v| {
            v.loading = true;
            v.genres.iter().find(|g| g.id == genre_id).cloned()
        });

        let api = self.ctx.api.as_ref();
        let result = match self.kind {
            MediaKind::Movie => api.movies_by_genre(genre_id, 1).await,
            MediaKind::Tv => api.tv_by_genre(genre_id, 1).await,
        };
        match result {
            Ok(page) => {
                self.state.apply(ticket, |v| {
                    v.items = page.results;
                    v.selected_genre = Some(genre.unwrap_or_else(|| Genre {
                        id: genre_id,
                        name: format!("Genre {genre_id}"),
                    }));
                    v.loading = false;
                });
            }
            Err(e) => {
                if self.state.apply(ticket, |v| v.loading = false) {
                    self.ctx.report("genre titles", &e);
                }
            }
        }
    }

    /// Back to the trending grid; any in-flight search or genre load is dropped.
    pub fn show_trending(&self) {
        self.state.cancel();
        self.state.update(|v| {
            v.selected_genre = None;
            v.items = v.trending.clone();
            v.searching = false;
            v.loading = false;
        });
    }

    pub async fn toggle_favorite(&self, item: &CatalogItem) -> ToggleOutcome {
        let kind = self.kind;
        toggle_favorite(
            &self.state,
            &self.ctx,
            |v| v.cards.begin(item, kind),
            |v, ticket, ok| v.cards.settle(ticket, ok),
        )
        .await
    }

    /// Navigation away; late responses are discarded.
    pub fn leave(&self) {
        self.base.cancel();
        self.state.cancel();
    }
}
