//! Upcoming releases with a language filter and locally stored reminders.

use std::cmp::Ordering;
use tracing::{debug, warn};

use super::{PageContext, PageState};
use crate::api::DEFAULT_REGION;
use crate::favorites::{FavoriteIds, ToggleOutcome, LOGIN_REQUIRED, TOGGLE_FAILED};
use crate::models::{CatalogItem, MediaKind, NewFavorite, TmdbId};
use crate::notify::Notice;
use crate::store::{load_reminders, save_reminders};

/// Filter codes with their labels; `all` is the regional upcoming list.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("all", "All Languages"),
    ("hi", "Hindi"),
    ("mr", "Marathi"),
    ("en", "English"),
    ("te", "Telugu"),
    ("ta", "Tamil"),
    ("ml", "Malayalam"),
    ("kn", "Kannada"),
    ("pa", "Punjabi"),
];

pub const REMINDER_SET: &str = "Reminder set! We'll notify you when this movie releases.";

#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingView {
    pub language: String,
    pub items: Vec<CatalogItem>,
    pub reminders: Vec<TmdbId>,
    pub favorites: FavoriteIds,
    pub loading: bool,
}

impl Default for UpcomingView {
    fn default() -> Self {
        Self {
            language: "all".to_string(),
            items: Vec::new(),
            reminders: Vec::new(),
            favorites: FavoriteIds::default(),
            loading: false,
        }
    }
}

impl UpcomingView {
    pub fn has_reminder(&self, id: TmdbId) -> bool {
        self.reminders.contains(&id)
    }
}

/// Soonest first; undated entries sink to the end.
fn by_release_date(a: &CatalogItem, b: &CatalogItem) -> Ordering {
    match (a.date(), b.date()) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct UpcomingPage {
    ctx: PageContext,
    state: PageState<UpcomingView>,
}

impl UpcomingPage {
    pub fn new(ctx: PageContext) -> Self {
        let reminders = load_reminders(ctx.store.as_ref());
        Self {
            ctx,
            state: PageState::new(UpcomingView {
                reminders,
                ..Default::default()
            }),
        }
    }

    pub fn view(&self) -> UpcomingView {
        self.state.snapshot()
    }

    pub async fn load(&self) {
        let ticket = self.state.begin();
        let language = self.state.update(|v| {
            v.loading = true;
            v.language.clone()
        });

        let api = self.ctx.api.as_ref();
        let result = if language == "all" {
            api.upcoming(1, DEFAULT_REGION).await
        } else {
            api.upcoming_by_language(&language, 1).await
        };
        let mut items = match result {
            Ok(page) => page.results,
            Err(e) => {
                if self.state.apply(ticket, |v| v.loading = false) {
                    self.ctx.report("upcoming releases", &e);
                }
                return;
            }
        };
        items.sort_by(by_release_date);
        if !self.state.apply(ticket, |v| {
            v.items = items;
            v.loading = false;
        }) {
            return;
        }

        if self.ctx.is_authenticated() {
            match FavoriteIds::refetch(api).await {
                Ok(ids) => {
                    self.state.apply(ticket, |v| v.favorites = ids);
                }
                Err(e) => warn!("Could not load favorites for upcoming page: {}", e),
            }
        }
    }

    /// Switches the filter and reloads. Unknown codes are ignored.
    pub async fn select_language(&self, code: &str) -> bool {
        if !LANGUAGES.iter().any(|(c, _)| *c == code) {
            debug!("Ignoring unknown language filter '{}'", code);
            return false;
        }
        self.state.update(|v| v.language = code.to_string());
        self.load().await;
        true
    }

    /// Adds or removes a reminder and persists the list. Returns whether the
    /// reminder is now set.
    pub fn toggle_reminder(&self, id: TmdbId) -> bool {
        let (reminders, set) = self.state.update(|v| {
            let set = if v.has_reminder(id) {
                v.reminders.retain(|r| *r != id);
                false
            } else {
                v.reminders.push(id);
                true
            };
            (v.reminders.clone(), set)
        });
        if let Err(e) = save_reminders(self.ctx.store.as_ref(), &reminders) {
            warn!("Could not persist reminders: {}", e);
        }
        if set {
            self.ctx.notifier.notify(Notice::info(REMINDER_SET));
        }
        set
    }

    /// Waits for the backend before touching the badge.
    pub async fn toggle_favorite(&self, item: &CatalogItem) -> ToggleOutcome {
        if !self.ctx.is_authenticated() {
            self.ctx.notifier.notify(Notice::error(LOGIN_REQUIRED));
            return ToggleOutcome::Refused;
        }
        let was_favorite = self.state.update(|v| v.favorites.contains(item.id));
        let api = self.ctx.api.as_ref();
        let result = if was_favorite {
            api.remove_favorite(item.id).await
        } else {
            api.add_favorite(&NewFavorite::from_item(item, MediaKind::Movie))
                .await
                .map(|_| ())
        };
        match result {
            Ok(()) => {
                self.state.update(|v| {
                    if was_favorite {
                        v.favorites.remove(item.id);
                    } else {
                        v.favorites.insert(item.id);
                    }
                });
                let verb = if was_favorite { "removed from" } else { "added to" };
                self.ctx.notifier.notify(Notice::info(format!(
                    "'{}' {} watchlist!",
                    item.display_title(),
                    verb
                )));
                ToggleOutcome::Committed(!was_favorite)
            }
            Err(e) => {
                warn!("Favorite update failed for {}: {}", item.id, e);
                self.ctx.notifier.notify(Notice::error(TOGGLE_FAILED));
                ToggleOutcome::Reverted(was_favorite)
            }
        }
    }

    pub fn leave(&self) {
        self.state.cancel();
    }
}
