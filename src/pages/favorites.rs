use tracing::warn;

use super::{PageContext, PageState};
use crate::favorites::TOGGLE_FAILED;
use crate::models::{FavoriteEntry, TmdbId};
use crate::notify::Notice;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesView {
    pub entries: Vec<FavoriteEntry>,
    pub loading: bool,
}

pub struct FavoritesPage {
    ctx: PageContext,
    state: PageState<FavoritesView>,
}

impl FavoritesPage {
    pub fn new(ctx: PageContext) -> Self {
        Self {
            ctx,
            state: PageState::default(),
        }
    }

    pub fn view(&self) -> FavoritesView {
        self.state.snapshot()
    }

    pub async fn load(&self) {
        let ticket = self.state.begin();
        self.state.update(|v| v.loading = true);
        match self.ctx.api.favorites().await {
            Ok(entries) => {
                self.state.apply(ticket, |v| {
                    v.entries = entries;
                    v.loading = false;
                });
            }
            Err(e) => {
                if self.state.apply(ticket, |v| v.loading = false) {
                    self.ctx.report("favorites", &e);
                }
            }
        }
    }

    /// Removes on the backend first; the list only changes on success.
    pub async fn remove(&self, tmdb_id: TmdbId) -> bool {
        let title = self.state.update(|v| {
            v.entries
                .iter()
                .find(|e| e.tmdb_id == tmdb_id)
                .map(|e| e.title.clone())
        });
        match self.ctx.api.remove_favorite(tmdb_id).await {
            Ok(()) => {
                self.state.update(|v| v.entries.retain(|e| e.tmdb_id != tmdb_id));
                if let Some(title) = title {
                    self.ctx
                        .notifier
                        .notify(Notice::info(format!("'{}' removed from watchlist!", title)));
                }
                true
            }
            Err(e) => {
                warn!("Could not remove favorite {}: {}", tmdb_id, e);
                self.ctx.notifier.notify(Notice::error(TOGGLE_FAILED));
                false
            }
        }
    }

    pub fn leave(&self) {
        self.state.cancel();
    }
}
