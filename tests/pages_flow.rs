mod common;

use cinescope::api::ArchiveLookup;
use cinescope::favorites::{ToggleOutcome, LOGIN_REQUIRED, TOGGLE_FAILED};
use cinescope::models::{
    ArchiveMatch, CatalogItem, Genre, MediaDetails, Season, Video, VideoList,
};
use cinescope::notify::{Notice, NoticeLevel};
use cinescope::pages::{
    BrowsePage, FavoritesPage, LoginPage, MovieDetailPage, PersonPage, SignupPage, TvDetailPage,
    UpcomingPage, WorldDramasPage,
};
use cinescope::routes::{guard, Navigation, Route};
use cinescope::session::AuthState;
use cinescope::store::{load_reminders, KeyValueStore};
use common::{favorite_entry, movie, FakeApi, Harness};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Notify;

fn trending(n: i64) -> Vec<CatalogItem> {
    (1..=n)
        .map(|i| movie(i, &format!("Movie {i}"), "2024-01-01"))
        .collect()
}

fn inception() -> MediaDetails {
    MediaDetails {
        item: movie(27205, "Inception", "2010-07-15"),
        genres: vec![Genre {
            id: 878,
            name: "Science Fiction".to_string(),
        }],
        videos: Some(VideoList {
            results: vec![
                Video {
                    key: "teaser1".to_string(),
                    site: "YouTube".to_string(),
                    kind: "Teaser".to_string(),
                    name: None,
                },
                Video {
                    key: "trailer1".to_string(),
                    site: "YouTube".to_string(),
                    kind: "Trailer".to_string(),
                    name: None,
                },
            ],
        }),
        ..Default::default()
    }
}

fn with_details(mut api: FakeApi, details: MediaDetails) -> FakeApi {
    api.details.insert(details.item.id, details);
    api
}

#[tokio::test]
async fn home_load_fills_trending_genres_and_badges() {
    let api = FakeApi {
        trending: trending(12),
        genres: vec![Genre {
            id: 28,
            name: "Action".to_string(),
        }],
        ..Default::default()
    }
    .logged_in();
    api.favorites.lock().unwrap().push(favorite_entry(3, "Movie 3"));
    let h = Harness::new(api).await;

    let page = BrowsePage::home(h.ctx());
    page.load().await;
    let view = page.view();

    assert_eq!(view.items.len(), 12);
    assert_eq!(view.trending.len(), 10);
    assert_eq!(view.genres.len(), 1);
    assert_eq!(view.heading(), "Popular Movies");
    assert!(view.cards.is_favorite(3));
    assert!(!view.cards.is_favorite(4));
    assert!(h.api.called("trending/movie/day"));
    assert!(h.api.called("genres/movie"));
}

#[tokio::test]
async fn empty_search_makes_no_request() {
    let h = Harness::new(
        FakeApi {
            trending: trending(3),
            ..Default::default()
        }
        .logged_in(),
    )
    .await;
    let page = BrowsePage::home(h.ctx());
    page.load().await;
    let before = page.view().items;

    assert!(!page.search("").await);
    assert!(!page.search("   \t").await);

    assert_eq!(h.api.count("search_movies"), 0);
    assert_eq!(page.view().items, before);
}

#[tokio::test]
async fn search_and_genre_drive_the_grid() {
    let h = Harness::new(
        FakeApi {
            trending: trending(3),
            genres: vec![Genre {
                id: 18,
                name: "Drama".to_string(),
            }],
            search_results: vec![
                movie(99, "Heat", "1995-12-15"),
                movie(98, "Alien", "1979-05-25"),
            ],
            discover_results: vec![movie(50, "Whiplash", "2014-10-10")],
            ..Default::default()
        }
        .logged_in(),
    )
    .await;
    let page = BrowsePage::home(h.ctx());
    page.load().await;

    page.select_genre(18).await;
    let view = page.view();
    assert_eq!(view.heading(), "Drama");
    assert_eq!(view.items[0].id, 50);

    assert!(page.search("heat").await);
    let view = page.view();
    assert_eq!(view.selected_genre, None);
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].id, 99);

    page.show_trending();
    assert_eq!(page.view().items, page.view().trending);
}

#[tokio::test]
async fn tv_browse_uses_tv_endpoints() {
    let h = Harness::new(
        FakeApi {
            trending: trending(2),
            ..Default::default()
        }
        .logged_in(),
    )
    .await;
    let page = BrowsePage::tv(h.ctx());
    page.load().await;
    page.search("dark").await;
    page.select_genre(18).await;

    assert!(h.api.called("trending/tv/day"));
    assert!(h.api.called("genres/tv"));
    assert!(h.api.called("search_tv"));
    assert!(h.api.called("tv_by_genre/18"));
    assert_eq!(BrowsePage::tv(h.ctx()).view().heading(), "Popular TV Shows");
}

#[tokio::test]
async fn superseded_search_never_touches_the_grid() {
    let gate = Arc::new(Notify::new());
    let h = Harness::new(
        FakeApi {
            trending: trending(2),
            search_results: vec![movie(99, "Slow Horses", "2022-04-01")],
            search_gate: Some(gate.clone()),
            ..Default::default()
        }
        .logged_in(),
    )
    .await;
    let page = BrowsePage::home(h.ctx());
    page.load().await;

    let navigate_away = async {
        while !h.api.called("search_movies") {
            tokio::task::yield_now().await;
        }
        page.show_trending();
        gate.notify_one();
    };
    let (searched, _) = tokio::join!(page.search("slow"), navigate_away);

    assert!(searched);
    let ids: Vec<i64> = page.view().items.iter().map(|i| i.id).collect();
    assert_eq!(ids, [1, 2]);
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn favorite_add_commits_and_stays() {
    let h = Harness::new(with_details(FakeApi::default().logged_in(), inception())).await;
    let page = MovieDetailPage::new(h.ctx(), 27205);
    page.load().await;
    assert!(!page.view().is_favorite());

    assert_eq!(page.toggle_favorite().await, ToggleOutcome::Committed(true));
    assert!(page.view().is_favorite());
    assert_eq!(h.api.favorite_ids(), [27205]);
    assert_eq!(
        h.notifier.notices(),
        [Notice::info("'Inception' added to watchlist!")]
    );

    // A reload reflects the server and keeps the badge on.
    page.load().await;
    assert!(page.view().is_favorite());
}

#[tokio::test]
async fn failed_toggle_reverts_with_exactly_one_notice() {
    let api = with_details(FakeApi::default().logged_in(), inception());
    api.fail_mutations.store(true, Ordering::SeqCst);
    let h = Harness::new(api).await;
    let page = MovieDetailPage::new(h.ctx(), 27205);
    page.load().await;

    assert_eq!(page.toggle_favorite().await, ToggleOutcome::Reverted(false));
    assert!(!page.view().is_favorite());
    assert_eq!(h.notifier.errors(), [Notice::error(TOGGLE_FAILED)]);
    assert_eq!(h.notifier.notices().len(), 1);
}

#[tokio::test]
async fn anonymous_toggle_asks_for_login() {
    let h = Harness::new(with_details(FakeApi::default(), inception())).await;
    let page = MovieDetailPage::new(h.ctx(), 27205);
    page.load().await;

    assert_eq!(page.toggle_favorite().await, ToggleOutcome::Refused);
    assert_eq!(h.notifier.errors(), [Notice::error(LOGIN_REQUIRED)]);
    assert!(!h.api.called("add_favorite"));
}

#[tokio::test]
async fn movie_detail_collects_trailer_similar_and_archive() {
    let found = ArchiveMatch {
        identifier: "inception_2010".to_string(),
        title: "Inception".to_string(),
        embed_url: "https://archive.org/embed/inception_2010".to_string(),
    };
    let api = FakeApi {
        discover_results: vec![
            movie(27205, "Inception", "2010-07-15"),
            movie(157336, "Interstellar", "2014-11-05"),
        ],
        archive: Some(found.clone()),
        ..Default::default()
    }
    .logged_in();
    let h = Harness::new(with_details(api, inception())).await;
    let page = MovieDetailPage::new(h.ctx(), 27205);
    page.load().await;
    let view = page.view();

    assert_eq!(
        view.trailer_url.as_deref(),
        Some("https://www.youtube.com/embed/trailer1?autoplay=1&mute=0")
    );
    let similar: Vec<i64> = view.similar_by_language.iter().map(|i| i.id).collect();
    assert_eq!(similar, [157336]);
    assert_eq!(view.full_movie, Some(ArchiveLookup::Found(found)));

    let params = h.api.discover_calls.lock().unwrap()[0].clone();
    assert_eq!(params.get("with_original_language"), Some("en"));
    assert_eq!(params.get("with_genres"), Some("878"));
}

#[tokio::test]
async fn missing_movie_is_a_view_state_not_a_notice() {
    let h = Harness::new(FakeApi::default().logged_in()).await;
    let page = MovieDetailPage::new(h.ctx(), 1);
    page.load().await;
    let view = page.view();
    assert!(view.not_found);
    assert!(view.details.is_none());
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn tv_detail_selects_existing_seasons_only() {
    let season = |n: i32| Season {
        id: n as i64,
        season_number: n,
        name: format!("Season {n}"),
        episode_count: Some(8),
        air_date: None,
        poster_path: None,
        overview: None,
    };
    let show = MediaDetails {
        item: CatalogItem {
            id: 1396,
            name: Some("Breaking Bad".to_string()),
            first_air_date: Some("2008-01-20".to_string()),
            ..Default::default()
        },
        seasons: vec![season(1), season(2)],
        ..Default::default()
    };
    let h = Harness::new(with_details(FakeApi::default().logged_in(), show)).await;
    let page = TvDetailPage::new(h.ctx(), 1396);
    page.load().await;

    assert_eq!(page.view().selected_season, Some(1));
    assert!(page.select_season(2));
    assert!(!page.select_season(7));
    assert_eq!(page.view().season().map(|s| s.season_number), Some(2));

    assert_eq!(page.toggle_favorite().await, ToggleOutcome::Committed(true));
    let saved = h.api.favorites.lock().unwrap()[0].clone();
    assert_eq!(saved.title, "Breaking Bad");
    assert_eq!(saved.media_type.as_str(), "tv");
}

#[tokio::test]
async fn person_page_loads_credits() {
    let h = Harness::new(FakeApi::default().logged_in()).await;
    let page = PersonPage::new(h.ctx(), 20738);
    page.load().await;
    let view = page.view();
    assert_eq!(view.person.as_ref().map(|p| p.name.as_str()), Some("Song Kang-ho"));
    assert_eq!(view.movie_credits()[0].id, 496243);
}

#[tokio::test]
async fn upcoming_sorts_filters_and_remembers() {
    let h = Harness::new(
        FakeApi {
            upcoming: vec![
                movie(1, "Later", "2026-12-24"),
                CatalogItem {
                    id: 2,
                    title: Some("Undated".to_string()),
                    ..Default::default()
                },
                movie(3, "Sooner", "2026-10-30"),
            ],
            ..Default::default()
        }
        .logged_in(),
    )
    .await;
    let page = UpcomingPage::new(h.ctx());
    page.load().await;
    let ids: Vec<i64> = page.view().items.iter().map(|i| i.id).collect();
    assert_eq!(ids, [3, 1, 2]);
    assert!(h.api.called("upcoming/IN"));

    assert!(page.select_language("ta").await);
    assert!(h.api.called("upcoming_by_language/ta"));
    assert!(!page.select_language("xx").await);

    assert!(page.toggle_reminder(3));
    assert_eq!(load_reminders(h.store.as_ref()), [3]);
    assert_eq!(h.notifier.notices()[0].level, NoticeLevel::Info);
    assert!(!page.toggle_reminder(3));
    assert!(load_reminders(h.store.as_ref()).is_empty());

    // Reminders survive a new page instance.
    page.toggle_reminder(1);
    assert!(UpcomingPage::new(h.ctx()).view().has_reminder(1));
    assert!(h.store.get("reminders").is_some());
}

#[tokio::test]
async fn upcoming_favorite_waits_for_the_backend() {
    let api = FakeApi {
        upcoming: vec![movie(7, "Coolie", "2026-11-01")],
        ..Default::default()
    }
    .logged_in();
    let h = Harness::new(api).await;
    let page = UpcomingPage::new(h.ctx());
    page.load().await;
    let item = page.view().items[0].clone();

    assert_eq!(page.toggle_favorite(&item).await, ToggleOutcome::Committed(true));
    assert!(page.view().favorites.contains(7));

    h.api.fail_mutations.store(true, Ordering::SeqCst);
    assert_eq!(page.toggle_favorite(&item).await, ToggleOutcome::Reverted(true));
    assert!(page.view().favorites.contains(7));
    assert_eq!(h.notifier.errors().len(), 1);
}

#[tokio::test]
async fn world_dramas_paging_and_country() {
    let h = Harness::new(
        FakeApi {
            discover_results: vec![CatalogItem {
                id: 93405,
                name: Some("Squid Game".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
        .logged_in(),
    )
    .await;
    let page = WorldDramasPage::new(h.ctx());
    page.load().await;
    assert!(!page.prev_page().await);

    assert!(page.next_page().await);
    assert!(page.next_page().await);
    assert_eq!(page.view().page, 3);
    assert!(page.prev_page().await);
    assert_eq!(page.view().page, 2);

    assert!(page.select_country("JP").await);
    let view = page.view();
    assert_eq!(view.page, 1);
    assert_eq!(view.country.label, "J-Drama");
    assert!(!page.select_country("ZZ").await);

    let last = h.api.discover_calls.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.get("with_origin_country"), Some("JP"));
    assert_eq!(last.get("with_genres"), Some("18"));
    assert_eq!(last.get("page"), Some("1"));

    let show = view.items[0].clone();
    assert_eq!(page.toggle_favorite(&show).await, ToggleOutcome::Committed(true));
    assert!(page.view().cards.is_favorite(93405));
}

#[tokio::test]
async fn world_dramas_stop_at_last_page_and_roll_back_failed_moves() {
    let h = Harness::new(FakeApi::default()).await;
    let page = WorldDramasPage::new(h.ctx());
    page.load().await;
    assert_eq!(page.view().total_pages, 3);

    assert!(page.next_page().await);
    assert!(page.next_page().await);
    let calls = h.api.count("discover/tv");
    assert!(!page.next_page().await);
    assert_eq!(page.view().page, 3);
    assert_eq!(h.api.count("discover/tv"), calls);

    h.api.fail_discover.store(true, Ordering::SeqCst);
    assert!(page.prev_page().await);
    let view = page.view();
    assert_eq!(view.page, 3);
    assert!(!view.loading);
    assert_eq!(h.notifier.errors().len(), 1);

    h.api.fail_discover.store(false, Ordering::SeqCst);
    assert!(page.prev_page().await);
    assert_eq!(page.view().page, 2);
}

#[tokio::test]
async fn favorites_page_keeps_list_when_removal_fails() {
    let api = FakeApi::default().logged_in();
    api.favorites
        .lock()
        .unwrap()
        .extend([favorite_entry(1, "Heat"), favorite_entry(2, "Alien")]);
    let h = Harness::new(api).await;
    let page = FavoritesPage::new(h.ctx());
    page.load().await;
    assert_eq!(page.view().entries.len(), 2);

    h.api.fail_mutations.store(true, Ordering::SeqCst);
    assert!(!page.remove(1).await);
    assert_eq!(page.view().entries.len(), 2);
    assert_eq!(h.notifier.errors().len(), 1);

    h.api.fail_mutations.store(false, Ordering::SeqCst);
    assert!(page.remove(1).await);
    let titles: Vec<String> = page.view().entries.into_iter().map(|e| e.title).collect();
    assert_eq!(titles, ["Alien"]);
}

#[tokio::test]
async fn logout_clears_token_and_redirects_to_signup() {
    let h = Harness::new(FakeApi::default().logged_in()).await;
    assert_eq!(h.session.state(), AuthState::Authenticated(common::user()));
    assert_eq!(
        guard(Route::Favorites, &h.session.state()),
        Navigation::Render(Route::Favorites)
    );

    h.session.logout();
    assert!(h.session.user().is_none());
    assert!(h.api.token.lock().unwrap().is_none());
    assert_eq!(
        guard(Route::Favorites, &h.session.state()),
        Navigation::Redirect(Route::Signup)
    );
}

#[tokio::test]
async fn rejected_stored_token_is_cleared_on_startup() {
    let api = FakeApi::default();
    *api.token.lock().unwrap() = Some("expired".to_string());
    let h = Harness::new(api).await;
    assert_eq!(h.session.state(), AuthState::Anonymous);
    assert!(h.api.called("logout"));
    assert!(h.api.token.lock().unwrap().is_none());
}

#[tokio::test]
async fn login_and_signup_forms() {
    let h = Harness::new(FakeApi::default()).await;

    let mut login = LoginPage {
        username: "ana".to_string(),
        password: "wrong".to_string(),
        ..Default::default()
    };
    assert_eq!(login.submit(&h.session).await, None);
    assert_eq!(login.error.as_deref(), Some("Invalid username or password"));

    let mut signup = SignupPage {
        username: "bo".to_string(),
        email: "bo@example.com".to_string(),
        password: "pw1".to_string(),
        confirm_password: "pw2".to_string(),
        ..Default::default()
    };
    assert_eq!(signup.submit(&h.session).await, None);
    assert_eq!(signup.error.as_deref(), Some("Passwords do not match"));
    assert!(!h.api.called("register"));

    signup.confirm_password = "pw1".to_string();
    assert_eq!(signup.submit(&h.session).await, Some(Route::Home));
    assert!(h.session.is_authenticated());

    let mut again = SignupPage {
        confirm_password: "pw1".to_string(),
        ..signup.clone()
    };
    again.error = None;
    assert_eq!(again.submit(&h.session).await, None);
    assert_eq!(again.error.as_deref(), Some("Username already registered"));

    let mut login = LoginPage {
        username: "ana".to_string(),
        password: "secret".to_string(),
        ..Default::default()
    };
    assert_eq!(login.submit(&h.session).await, Some(Route::Home));
}
