//! Movie and TV detail pages.

use tracing::{debug, warn};

use super::{toggle_favorite, LoadTicket, PageContext, PageState};
use crate::api::{ArchiveLookup, DiscoverParams};
use crate::error::{ApiError, ApiResult};
use crate::favorites::{FavoriteIds, FavoriteToggle, ToggleOutcome};
use crate::media::trailer_url;
use crate::models::{CatalogItem, MediaDetails, MediaKind, NewFavorite, Season, TmdbId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieView {
    pub details: Option<MediaDetails>,
    /// Same original language, overlapping genres, never the movie itself.
    pub similar_by_language: Vec<CatalogItem>,
    pub favorite: Option<FavoriteToggle>,
    pub trailer_url: Option<String>,
    pub full_movie: Option<ArchiveLookup>,
    pub loading: bool,
    pub not_found: bool,
}

impl MovieView {
    pub fn is_favorite(&self) -> bool {
        self.favorite.as_ref().is_some_and(FavoriteToggle::is_favorite)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TvView {
    pub details: Option<MediaDetails>,
    pub favorite: Option<FavoriteToggle>,
    pub trailer_url: Option<String>,
    pub selected_season: Option<i32>,
    pub loading: bool,
    pub not_found: bool,
}

impl TvView {
    pub fn is_favorite(&self) -> bool {
        self.favorite.as_ref().is_some_and(FavoriteToggle::is_favorite)
    }

    pub fn season(&self) -> Option<&Season> {
        let number = self.selected_season?;
        self.details
            .as_ref()?
            .seasons
            .iter()
            .find(|s| s.season_number == number)
    }
}

fn language_params(details: &MediaDetails) -> Option<DiscoverParams> {
    let language = details.item.original_language.as_deref()?;
    let mut params = DiscoverParams::new().param("with_original_language", language);
    let genres = details.genre_ids();
    if !genres.is_empty() {
        let joined: Vec<String> = genres.iter().map(|g| g.to_string()).collect();
        params.set("with_genres", joined.join(","));
    }
    params.set("sort_by", "popularity.desc");
    Some(params)
}

/// Detail load failures: a missing title is a view state, anything else is
/// reported once.
fn load_failed<V: Clone>(
    state: &PageState<V>,
    ctx: &PageContext,
    ticket: LoadTicket,
    err: ApiError,
    mark: impl FnOnce(&mut V, bool),
) {
    let not_found = matches!(err, ApiError::NotFound(_));
    if state.apply(ticket, |v| mark(v, not_found)) && !not_found {
        ctx.report("details", &err);
    }
}

async fn favorite_ids(ctx: &PageContext) -> Option<FavoriteIds> {
    if !ctx.is_authenticated() {
        return None;
    }
    match FavoriteIds::refetch(ctx.api.as_ref()).await {
        Ok(ids) => Some(ids),
        Err(e) => {
            warn!("Could not load favorites for detail page: {}", e);
            None
        }
    }
}

pub struct MovieDetailPage {
    ctx: PageContext,
    id: TmdbId,
    state: PageState<MovieView>,
}

impl MovieDetailPage {
    pub fn new(ctx: PageContext, id: TmdbId) -> Self {
        Self {
            ctx,
            id,
            state: PageState::default(),
        }
    }

    pub fn id(&self) -> TmdbId {
        self.id
    }

    pub fn view(&self) -> MovieView {
        self.state.snapshot()
    }

    /// Details first, then similar titles, favorites and the archive lookup
    /// side by side. Only the details request can fail the page.
    pub async fn load(&self) {
        let ticket = self.state.begin();
        self.state.update(|v| {
            v.loading = true;
            v.not_found = false;
        });

        let details = match self.ctx.api.movie_details(self.id).await {
            Ok(details) => details,
            Err(e) => {
                load_failed(&self.state, &self.ctx, ticket, e, |v, missing| {
                    v.loading = false;
                    v.not_found = missing;
                });
                return;
            }
        };

        let trailer = trailer_url(details.videos());
        let item = NewFavorite::from_item(&details.item, MediaKind::Movie);
        let fresh = FavoriteToggle::new(item, false);
        let applied = self.state.apply(ticket, |v| {
            v.trailer_url = trailer;
            v.favorite.get_or_insert(fresh);
            v.details = Some(details.clone());
            v.loading = false;
        });
        if !applied {
            return;
        }

        let api = self.ctx.api.as_ref();
        let similar = async {
            match language_params(&details) {
                Some(params) => api
                    .discover(MediaKind::Movie, &params)
                    .await
                    .map(|p| p.results),
                None => Ok(Vec::new()),
            }
        };
        let archive = api.lookup_full_movie(details.item.display_title(), details.item.year());
        let (similar, ids, archive): (ApiResult<Vec<CatalogItem>>, _, _) =
            tokio::join!(similar, favorite_ids(&self.ctx), archive);

        let id = self.id;
        self.state.apply(ticket, |v| {
            match similar {
                Ok(items) => {
                    v.similar_by_language = items.into_iter().filter(|i| i.id != id).collect()
                }
                Err(e) => warn!("Could not load similar titles for {}: {}", id, e),
            }
            if let (Some(ids), Some(favorite)) = (ids, v.favorite.as_mut()) {
                favorite.sync(ids.contains(id));
            }
            if let ArchiveLookup::Found(found) = &archive {
                debug!("Full movie available as {}", found.identifier);
            }
            v.full_movie = Some(archive);
        });
    }

    pub async fn toggle_favorite(&self) -> ToggleOutcome {
        toggle_favorite(
            &self.state,
            &self.ctx,
            |v| v.favorite.as_mut().and_then(|f| f.begin(true)),
            |v, ticket, ok| match v.favorite.as_mut() {
                Some(favorite) => favorite.settle(ticket, ok),
                None => ToggleOutcome::Stale,
            },
        )
        .await
    }

    pub fn leave(&self) {
        self.state.cancel();
    }
}

pub struct TvDetailPage {
    ctx: PageContext,
    id: TmdbId,
    state: PageState<TvView>,
}

impl TvDetailPage {
    pub fn new(ctx: PageContext, id: TmdbId) -> Self {
        Self {
            ctx,
            id,
            state: PageState::default(),
        }
    }

    pub fn id(&self) -> TmdbId {
        self.id
    }

    pub fn view(&self) -> TvView {
        self.state.snapshot()
    }

    pub async fn load(&self) {
        let ticket = self.state.begin();
        self.state.update(|v| {
            v.loading = true;
            v.not_found = false;
        });

        let details = match self.ctx.api.tv_details(self.id).await {
            Ok(details) => details,
            Err(e) => {
                load_failed(&self.state, &self.ctx, ticket, e, |v, missing| {
                    v.loading = false;
                    v.not_found = missing;
                });
                return;
            }
        };

        let trailer = trailer_url(details.videos());
        let first_season = details.seasons.first().map(|s| s.season_number);
        let item = NewFavorite::from_item(&details.item, MediaKind::Tv);
        let fresh = FavoriteToggle::new(item, false);
        let applied = self.state.apply(ticket, |v| {
            v.trailer_url = trailer;
            v.favorite.get_or_insert(fresh);
            v.selected_season = first_season;
            v.details = Some(details);
            v.loading = false;
        });
        if !applied {
            return;
        }

        if let Some(ids) = favorite_ids(&self.ctx).await {
            let id = self.id;
            self.state.apply(ticket, |v| {
                if let Some(favorite) = v.favorite.as_mut() {
                    favorite.sync(ids.contains(id));
                }
            });
        }
    }

    /// Only seasons the show actually has can be selected.
    pub fn select_season(&self, number: i32) -> bool {
        self.state.update(|v| {
            let exists = v
                .details
                .as_ref()
                .is_some_and(|d| d.seasons.iter().any(|s| s.season_number == number));
            if exists {
                v.selected_season = Some(number);
            }
            exists
        })
    }

    pub async fn toggle_favorite(&self) -> ToggleOutcome {
        toggle_favorite(
            &self.state,
            &self.ctx,
            |v| v.favorite.as_mut().and_then(|f| f.begin(true)),
            |v, ticket, ok| match v.favorite.as_mut() {
                Some(favorite) => favorite.settle(ticket, ok),
                None => ToggleOutcome::Stale,
            },
        )
        .await
    }

    pub fn leave(&self) {
        self.state.cancel();
    }
}
