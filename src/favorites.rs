//! Watchlist membership with optimistic toggling.
//!
//! A toggle flips the visible state immediately and remembers the last state
//! the backend confirmed. Each mutation carries a generation; only the newest
//! one may settle the visible state, older outcomes just refresh what we know
//! about the server.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::api::CineApi;
use crate::error::ApiResult;
use crate::models::{CatalogItem, FavoriteEntry, MediaKind, NewFavorite, TmdbId};
use crate::notify::{Notice, Notifier};

pub const LOGIN_REQUIRED: &str = "Please login to add favorites";
pub const TOGGLE_FAILED: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteState {
    Committed(bool),
    PendingAdd,
    PendingRemove,
}

impl FavoriteState {
    /// What the user sees right now.
    pub fn is_favorite(&self) -> bool {
        match self {
            FavoriteState::Committed(v) => *v,
            FavoriteState::PendingAdd => true,
            FavoriteState::PendingRemove => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        !matches!(self, FavoriteState::Committed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteAction {
    Add,
    Remove,
}

/// Proof of an in-flight mutation, handed back to [`FavoriteToggle::settle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleTicket {
    generation: u64,
    pub action: FavoriteAction,
    pub item: NewFavorite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The mutation succeeded; carries the new membership.
    Committed(bool),
    /// The mutation failed; carries the restored membership.
    Reverted(bool),
    /// A newer toggle owned the visible state when this one was sent. Read
    /// the toggle again: a settled one is resynced to the confirmed state.
    Stale,
    /// Anonymous users cannot toggle.
    Refused,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoriteToggle {
    item: NewFavorite,
    state: FavoriteState,
    confirmed: bool,
    generation: u64,
}

impl FavoriteToggle {
    pub fn new(item: NewFavorite, is_favorite: bool) -> Self {
        Self {
            item,
            state: FavoriteState::Committed(is_favorite),
            confirmed: is_favorite,
            generation: 0,
        }
    }

    pub fn item(&self) -> &NewFavorite {
        &self.item
    }

    pub fn state(&self) -> FavoriteState {
        self.state
    }

    pub fn is_favorite(&self) -> bool {
        self.state.is_favorite()
    }

    /// Membership as of the last mutation the backend accepted.
    pub fn confirmed(&self) -> bool {
        self.confirmed
    }

    /// Re-syncs with a fresh favorites fetch. Ignored while a mutation is in
    /// flight so the optimistic view is not clobbered.
    pub fn sync(&mut self, is_favorite: bool) {
        self.confirmed = is_favorite;
        if !self.state.is_pending() {
            self.state = FavoriteState::Committed(is_favorite);
        }
    }

    /// Flips the visible state and returns the mutation to perform.
    pub fn begin(&mut self, authenticated: bool) -> Option<ToggleTicket> {
        if !authenticated {
            return None;
        }
        let action = if self.state.is_favorite() {
            FavoriteAction::Remove
        } else {
            FavoriteAction::Add
        };
        self.generation += 1;
        self.state = match action {
            FavoriteAction::Add => FavoriteState::PendingAdd,
            FavoriteAction::Remove => FavoriteState::PendingRemove,
        };
        Some(ToggleTicket {
            generation: self.generation,
            action,
            item: self.item.clone(),
        })
    }

    pub fn settle(&mut self, ticket: &ToggleTicket, succeeded: bool) -> ToggleOutcome {
        if succeeded {
            self.confirmed = ticket.action == FavoriteAction::Add;
        }
        if ticket.generation != self.generation {
            debug!(
                tmdb_id = self.item.tmdb_id,
                generation = ticket.generation,
                latest = self.generation,
                "Discarding superseded favorite outcome"
            );
            // Once the newest toggle has settled, a late success still decides
            // what the server holds.
            if !self.state.is_pending() {
                self.state = FavoriteState::Committed(self.confirmed);
            }
            return ToggleOutcome::Stale;
        }
        self.state = FavoriteState::Committed(self.confirmed);
        if succeeded {
            ToggleOutcome::Committed(self.confirmed)
        } else {
            ToggleOutcome::Reverted(self.confirmed)
        }
    }

    /// Runs one complete toggle: optimistic flip, mutation, settle, notice.
    pub async fn toggle(
        &mut self,
        api: &dyn CineApi,
        authenticated: bool,
        notifier: &dyn Notifier,
    ) -> ToggleOutcome {
        let Some(ticket) = self.begin(authenticated) else {
            notifier.notify(Notice::error(LOGIN_REQUIRED));
            return ToggleOutcome::Refused;
        };
        let result = perform(api, &ticket).await;
        let outcome = self.settle(&ticket, result.is_ok());
        announce(notifier, &ticket, outcome);
        outcome
    }
}

/// Sends the mutation a ticket describes.
pub async fn perform(api: &dyn CineApi, ticket: &ToggleTicket) -> ApiResult<()> {
    let result = match ticket.action {
        FavoriteAction::Add => api.add_favorite(&ticket.item).await.map(|_| ()),
        FavoriteAction::Remove => api.remove_favorite(ticket.item.tmdb_id).await,
    };
    if let Err(e) = &result {
        warn!(
            "Favorite {:?} failed for '{}': {}",
            ticket.action, ticket.item.title, e
        );
    }
    result
}

/// One notice per visible outcome; stale outcomes stay silent.
pub fn announce(notifier: &dyn Notifier, ticket: &ToggleTicket, outcome: ToggleOutcome) {
    match outcome {
        ToggleOutcome::Committed(true) => {
            notifier.notify(Notice::info(format!("'{}' added to watchlist!", ticket.item.title)))
        }
        ToggleOutcome::Committed(false) => notifier.notify(Notice::info(format!(
            "'{}' removed from watchlist!",
            ticket.item.title
        ))),
        ToggleOutcome::Reverted(_) => notifier.notify(Notice::error(TOGGLE_FAILED)),
        ToggleOutcome::Stale | ToggleOutcome::Refused => {}
    }
}

/// Cached membership of the user's watchlist, keyed by catalog id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteIds {
    ids: HashSet<TmdbId>,
}

impl FavoriteIds {
    pub fn from_entries(entries: &[FavoriteEntry]) -> Self {
        Self {
            ids: entries.iter().map(|e| e.tmdb_id).collect(),
        }
    }

    pub async fn refetch(api: &dyn CineApi) -> ApiResult<Self> {
        Ok(Self::from_entries(&api.favorites().await?))
    }

    pub fn contains(&self, id: TmdbId) -> bool {
        self.ids.contains(&id)
    }

    pub fn insert(&mut self, id: TmdbId) {
        self.ids.insert(id);
    }

    pub fn remove(&mut self, id: TmdbId) {
        self.ids.remove(&id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Favorite badges for a grid of cards: the fetched membership plus one
/// toggle per card the user has touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFavorites {
    ids: FavoriteIds,
    toggles: HashMap<TmdbId, FavoriteToggle>,
}

impl CardFavorites {
    pub fn ids(&self) -> &FavoriteIds {
        &self.ids
    }

    pub fn replace_ids(&mut self, ids: FavoriteIds) {
        for (id, toggle) in self.toggles.iter_mut() {
            toggle.sync(ids.contains(*id));
        }
        self.ids = ids;
    }

    pub fn is_favorite(&self, id: TmdbId) -> bool {
        match self.toggles.get(&id) {
            Some(toggle) => toggle.is_favorite(),
            None => self.ids.contains(id),
        }
    }

    pub fn begin(&mut self, item: &CatalogItem, kind: MediaKind) -> Option<ToggleTicket> {
        let current = self.ids.contains(item.id);
        self.toggles
            .entry(item.id)
            .or_insert_with(|| FavoriteToggle::new(NewFavorite::from_item(item, kind), current))
            .begin(true)
    }

    pub fn settle(&mut self, ticket: &ToggleTicket, succeeded: bool) -> ToggleOutcome {
        let id = ticket.item.tmdb_id;
        let Some(toggle) = self.toggles.get_mut(&id) else {
            return ToggleOutcome::Stale;
        };
        let outcome = toggle.settle(ticket, succeeded);
        if toggle.confirmed() {
            self.ids.insert(id);
        } else {
            self.ids.remove(id);
        }
        outcome
    }
}
