//! Popular drama series filtered by country of origin, paged.

use tracing::{debug, warn};

use super::{toggle_favorite, PageContext, PageState};
use crate::api::DiscoverParams;
use crate::favorites::{CardFavorites, FavoriteIds, ToggleOutcome};
use crate::models::{CatalogItem, MediaKind};

const DRAMA_GENRE: i64 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
    pub label: &'static str,
}

const fn country(code: &'static str, name: &'static str, label: &'static str) -> Country {
    Country { code, name, label }
}

/// The first entry is the default filter.
pub const COUNTRIES: &[Country] = &[
    country("KR", "South Korea", "K-Drama"),
    country("TR", "Turkey", "Turkish"),
    country("JP", "Japan", "J-Drama"),
    country("CN", "China", "C-Drama"),
    country("TH", "Thailand", "Thai"),
    country("IN", "India", "Indian"),
    country("PK", "Pakistan", "Pakistani"),
    country("PH", "Philippines", "Pinoy"),
    country("ES", "Spain", "Spanish"),
    country("GB", "UK", "British"),
    country("FR", "France", "French"),
    country("US", "USA", "American"),
    country("BR", "Brazil", "Brazilian"),
    country("EG", "Egypt", "Arabic"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct WorldDramasView {
    pub country: Country,
    pub page: u32,
    pub total_pages: u32,
    pub items: Vec<CatalogItem>,
    pub cards: CardFavorites,
    pub loading: bool,
}

impl Default for WorldDramasView {
    fn default() -> Self {
        Self {
            country: COUNTRIES[0],
            page: 1,
            total_pages: 0,
            items: Vec::new(),
            cards: CardFavorites::default(),
            loading: false,
        }
    }
}

pub(crate) fn drama_params(country: &str, page: u32) -> DiscoverParams {
    DiscoverParams::new()
        .param("with_genres", DRAMA_GENRE)
        .param("with_origin_country", country)
        .param("sort_by", "popularity.desc")
        .param("page", page)
}

pub struct WorldDramasPage {
    ctx: PageContext,
    state: PageState<WorldDramasView>,
}

impl WorldDramasPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            state: PageState::default(),
        }
    }

    pub fn view(&self) -> WorldDramasView {
        self.state.snapshot()
    }

    pub async fn load(&self) {
        self.load_page(None).await;
    }

    /// A failed fetch puts `page` back to `fallback` when one is given.
    async fn load_page(&self, fallback: Option<u32>) {
        let ticket = self.state.begin();
        let params = self.state.update(|v| {
            v.loading = true;
            drama_params(v.country.code, v.page)
        });

        let api = self.ctx.api.as_ref();
        match api.discover(MediaKind::Tv, &params).await {
            Ok(page) => {
                let applied = self.state.apply(ticket, |v| {
                    v.items = page.results;
                    v.total_pages = page.total_pages;
                    v.loading = false;
                });
                if !applied {
                    return;
                }
            }
            Err(e) => {
                let applied = self.state.apply(ticket, |v| {
                    v.loading = false;
                    if let Some(page) = fallback {
                        v.page = page;
                    }
                });
                if applied {
                    self.ctx.report("dramas", &e);
                }
                return;
            }
        }

        if self.ctx.is_authenticated() {
            match FavoriteIds::refetch(api).await {
                Ok(ids) => {
                    self.state.apply(ticket, |v| v.cards.replace_ids(ids));
                }
                Err(e) => warn!("Could not load favorites for dramas page: {}", e),
            }
        }
    }

    /// A new country starts again from the first page.
    pub async fn select_country(&self, code: &str) -> bool {
        let Some(country) = COUNTRIES.iter().find(|c| c.code == code).copied() else {
            debug!("Ignoring unknown country '{}'", code);
            return false;
        };
        self.state.update(|v| {
            v.country = country;
            v.page = 1;
        });
        self.load().await;
        true
    }

    /// Returns false once the last known page is showing.
    pub async fn next_page(&self) -> bool {
        let from = self.state.update(|v| {
            if v.total_pages > 0 && v.page >= v.total_pages {
                None
            } else {
                v.page += 1;
                Some(v.page - 1)
            }
        });
        match from {
            Some(from) => {
                self.load_page(Some(from)).await;
                true
            }
            None => false,
        }
    }

    /// Returns false on the first page, where there is nothing to go back to.
    pub async fn prev_page(&self) -> bool {
        let from = self.state.update(|v| {
            if v.page > 1 {
                v.page -= 1;
                Some(v.page + 1)
            } else {
                None
            }
        });
        if let Some(from) = from {
            self.load_page(Some(from)).await;
        }
        from.is_some()
    }

    pub async fn toggle_favorite(&self, item: &CatalogItem) -> ToggleOutcome {
        toggle_favorite(
            &self.state,
            &self.ctx,
            |v| v.cards.begin(item, MediaKind::Tv),
            |v, ticket, ok| v.cards.settle(ticket, ok),
        )
        .await
    }

    pub fn leave(&self) {
        self.state.cancel();
    }
}
