//! Headless per-route controllers. Each one owns its view state behind a
//! short-lived lock and never holds that lock across a request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

use crate::api::CineApi;
use crate::error::ApiError;
use crate::favorites::{announce, perform, ToggleOutcome, ToggleTicket, LOGIN_REQUIRED};
use crate::notify::{Notice, Notifier};
use crate::session::Session;
use crate::store::KeyValueStore;

pub mod auth;
pub mod browse;
pub mod detail;
pub mod favorites;
pub mod person;
pub mod upcoming;
pub mod world_dramas;

pub use auth::{LoginPage, SignupPage};
pub use browse::{BrowsePage, BrowseView};
pub use detail::{MovieDetailPage, MovieView, TvDetailPage, TvView};
pub use favorites::{FavoritesPage, FavoritesView};
pub use person::{PersonPage, PersonView};
pub use upcoming::{UpcomingPage, UpcomingView, LANGUAGES};
pub use world_dramas::{WorldDramasPage, WorldDramasView, COUNTRIES};

/// Everything a page needs, passed in explicitly.
#[derive(Clone)]
pub struct PageContext {
    pub api: Arc<dyn CineApi>,
    pub session: Arc<Session>,
    pub notifier: Arc<dyn Notifier>,
    pub store: Arc<dyn KeyValueStore>,
}

impl PageContext {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Page-boundary error handling: log it and tell the user once.
    pub fn report(&self, what: &str, err: &ApiError) {
        warn!("{} failed: {}", what, err);
        self.notifier
            .notify(Notice::error(format!("Could not load {}: {}", what, err)));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

/// Generation counter; starting a load or leaving the page invalidates
/// every earlier ticket.
#[derive(Debug, Default)]
pub struct LoadTracker {
    current: AtomicU64,
}

impl LoadTracker {
    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The latest ticket, without starting a new load.
    pub fn current(&self) -> LoadTicket {
        LoadTicket(self.current.load(Ordering::SeqCst))
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.current.load(Ordering::SeqCst) == ticket.0
    }

    pub fn cancel(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// View state plus the load generation guarding it.
#[derive(Debug, Default)]
pub struct PageState<V> {
    view: Mutex<V>,
    loads: LoadTracker,
}

impl<V: Clone> PageState<V> {
    pub fn new(view: V) -> Self {
        Self {
            view: Mutex::new(view),
            loads: LoadTracker::default(),
        }
    }

    pub fn snapshot(&self) -> V {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut V) -> R) -> R {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut view)
    }

    pub fn begin(&self) -> LoadTicket {
        self.loads.begin()
    }

    /// Applies `f` only if no newer load started since `ticket` was issued.
    pub fn apply(&self, ticket: LoadTicket, f: impl FnOnce(&mut V)) -> bool {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.loads.is_current(ticket) {
            debug!("Dropping stale page response");
            return false;
        }
        f(&mut view);
        true
    }

    pub fn cancel(&self) {
        self.loads.cancel();
    }
}

/// Optimistic toggle against a page's view: `begin` flips under the lock,
/// the request runs unlocked, `settle` applies the outcome under the lock.
pub(crate) async fn toggle_favorite<V: Clone>(
    state: &PageState<V>,
    ctx: &PageContext,
    begin: impl FnOnce(&mut V) -> Option<ToggleTicket>,
    settle: impl FnOnce(&mut V, &ToggleTicket, bool) -> ToggleOutcome,
) -> ToggleOutcome {
    if !ctx.is_authenticated() {
        ctx.notifier.notify(Notice::error(LOGIN_REQUIRED));
        return ToggleOutcome::Refused;
    }
    let Some(ticket) = state.update(begin) else {
        debug!("Nothing to toggle yet");
        return ToggleOutcome::Refused;
    };
    let result = perform(ctx.api.as_ref(), &ticket).await;
    let outcome = state.update(|v| settle(v, &ticket, result.is_ok()));
    announce(ctx.notifier.as_ref(), &ticket, outcome);
    outcome
}
