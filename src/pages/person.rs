use serde_json::Value;

use super::{PageContext, PageState};
use crate::error::ApiError;
use crate::models::{CatalogItem, PersonDetails, TmdbId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonView {
    pub person: Option<PersonDetails>,
    pub loading: bool,
    pub not_found: bool,
}

impl PersonView {
    /// Cast credits from the appended `movie_credits`, newest first.
    pub fn movie_credits(&self) -> Vec<CatalogItem> {
        self.credits("movie_credits")
    }

    pub fn tv_credits(&self) -> Vec<CatalogItem> {
        self.credits("tv_credits")
    }

    fn credits(&self, key: &str) -> Vec<CatalogItem> {
        let cast = self
            .person
            .as_ref()
            .and_then(|p| p.extra.get(key))
            .and_then(|c| c.get("cast"))
            .cloned()
            .unwrap_or(Value::Null);
        let mut items: Vec<CatalogItem> = serde_json::from_value(cast).unwrap_or_default();
        items.sort_by(|a, b| b.date().cmp(&a.date()));
        items
    }
}

pub struct PersonPage {
    ctx: PageContext,
    id: TmdbId,
    state: PageState<PersonView>,
}

impl PersonPage {
    pub fn new(ctx: PageContext, id: TmdbId) -> Self {
        Self {
            ctx,
            id,
            state: PageState::default(),
        }
    }

    pub fn view(&self) -> PersonView {
        self.state.snapshot()
    }

    pub async fn load(&self) {
        let ticket = self.state.begin();
        self.state.update(|v| {
            v.loading = true;
            v.not_found = false;
        });
        match self.ctx.api.person_details(self.id).await {
            Ok(person) => {
                self.state.apply(ticket, |v| {
                    v.person = Some(person);
                    v.loading = false;
                });
            }
            Err(e) => {
                let not_found = matches!(e, ApiError::NotFound(_));
                let applied = self.state.apply(ticket, |v| {
                    v.loading = false;
                    v.not_found = not_found;
                });
                if applied && !not_found {
                    self.ctx.report("person", &e);
                }
            }
        }
    }

    pub fn leave(&self) {
        self.state.cancel();
    }
}
