use crate::models::TmdbId;
use crate::session::AuthState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Signup,
    Login,
    Home,
    Movie(TmdbId),
    TvBrowse,
    Tv(TmdbId),
    Person(TmdbId),
    Upcoming,
    WorldDramas,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
    /// Session validation still running.
    Wait,
}

impl Route {
    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::Home),
            ["signup"] => Some(Route::Signup),
            ["login"] => Some(Route::Login),
            ["tv"] => Some(Route::TvBrowse),
            ["upcoming"] => Some(Route::Upcoming),
            ["world-dramas"] => Some(Route::WorldDramas),
            ["favorites"] => Some(Route::Favorites),
            ["movie", raw] => raw.parse().ok().map(Route::Movie),
            ["tv", raw] => raw.parse().ok().map(Route::Tv),
            ["person", raw] => raw.parse().ok().map(Route::Person),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Signup => "/signup".to_string(),
            Route::Login => "/login".to_string(),
            Route::Home => "/".to_string(),
            Route::Movie(id) => format!("/movie/{id}"),
            Route::TvBrowse => "/tv".to_string(),
            Route::Tv(id) => format!("/tv/{id}"),
            Route::Person(id) => format!("/person/{id}"),
            Route::Upcoming => "/upcoming".to_string(),
            Route::WorldDramas => "/world-dramas".to_string(),
            Route::Favorites => "/favorites".to_string(),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Signup | Route::Login)
    }
}

/// Anonymous visitors of protected routes are sent to signup.
pub fn guard(route: Route, auth: &AuthState) -> Navigation {
    match auth {
        AuthState::Uninitialized | AuthState::Validating => Navigation::Wait,
        AuthState::Anonymous if route.is_protected() => Navigation::Redirect(Route::Signup),
        _ => Navigation::Render(route),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    #[test]
    fn parses_every_route_path() {
        let routes = [
            Route::Signup,
            Route::Login,
            Route::Home,
            Route::Movie(550),
            Route::TvBrowse,
            Route::Tv(1399),
            Route::Person(287),
            Route::Upcoming,
            Route::WorldDramas,
            Route::Favorites,
        ];
        for route in routes {
            assert_eq!(Route::parse(&route.path()), Some(route));
        }
        assert_eq!(Route::parse("/movie/abc"), None);
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn anonymous_protected_visit_redirects_to_signup() {
        assert_eq!(
            guard(Route::Favorites, &AuthState::Anonymous),
            Navigation::Redirect(Route::Signup)
        );
        assert_eq!(
            guard(Route::Login, &AuthState::Anonymous),
            Navigation::Render(Route::Login)
        );
        assert_eq!(guard(Route::Home, &AuthState::Validating), Navigation::Wait);

        let user = User {
            id: 1,
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
        };
        assert_eq!(
            guard(Route::Movie(1), &AuthState::Authenticated(user)),
            Navigation::Render(Route::Movie(1))
        );
    }
}
