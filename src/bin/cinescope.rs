//! Terminal front end for a running CineScope backend.
//! Usage:
//!   cargo run --bin cinescope -- login <username> <password>
//!   cargo run --bin cinescope -- signup <username> <email> <password> <confirm>
//!   cargo run --bin cinescope -- logout | whoami
//!   cargo run --bin cinescope -- trending [movie|tv]
//!   cargo run --bin cinescope -- search <movie|tv> <query...>
//!   cargo run --bin cinescope -- genre <movie|tv> <genre_id>
//!   cargo run --bin cinescope -- movie <tmdb_id> | tv <tmdb_id> [season] | person <tmdb_id>
//!   cargo run --bin cinescope -- favorites | fav <movie|tv> <tmdb_id> | unfav <tmdb_id>
//!   cargo run --bin cinescope -- upcoming [language] | remind <tmdb_id>
//!   cargo run --bin cinescope -- dramas [country] [page]
//! Reads CINESCOPE_BACKEND_URL and CINESCOPE_STATE_FILE (.env supported).

use anyhow::{anyhow, Context, Result};
use cinescope::api::{ApiClient, ArchiveLookup, CineApi};
use cinescope::media::{image_url, ImageSize};
use cinescope::models::{CatalogItem, MediaKind, TmdbId};
use cinescope::notify::LogNotifier;
use cinescope::pages::{
    BrowsePage, FavoritesPage, LoginPage, MovieDetailPage, PageContext, PersonPage, SignupPage,
    TvDetailPage, UpcomingPage, WorldDramasPage,
};
use cinescope::routes::{guard, Navigation, Route};
use cinescope::session::Session;
use dotenvy::dotenv;
use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn usage() -> ! {
    eprintln!("Usage: cinescope <command> [args]");
    eprintln!("  login <username> <password>");
    eprintln!("  signup <username> <email> <password> <confirm>");
    eprintln!("  logout | whoami");
    eprintln!("  trending [movie|tv] | search <movie|tv> <query...> | genre <movie|tv> <id>");
    eprintln!("  movie <id> | tv <id> [season] | person <id>");
    eprintln!("  favorites | fav <movie|tv> <id> | unfav <id>");
    eprintln!("  upcoming [language] | remind <id> | dramas [country] [page]");
    std::process::exit(1);
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("missing {}", name))
}

fn id_arg(args: &[String], index: usize) -> Result<TmdbId> {
    arg(args, index, "tmdb_id")?
        .parse()
        .context("tmdb_id must be an integer")
}

fn kind_arg(args: &[String], index: usize) -> Result<MediaKind> {
    match args.get(index) {
        None => Ok(MediaKind::Movie),
        Some(raw) => raw.to_lowercase().parse().map_err(|e: String| anyhow!(e)),
    }
}

fn print_items(items: &[CatalogItem]) {
    for item in items {
        let year = item
            .year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "----".to_string());
        println!(
            "{:>8}  {}  {:.1}  {}",
            item.id,
            year,
            item.vote_average,
            item.display_title()
        );
    }
}

/// Refuses protected routes for anonymous users, the way the UI redirects.
fn enter(route: Route, session: &Session) -> Result<()> {
    match guard(route, &session.state()) {
        Navigation::Render(_) => Ok(()),
        Navigation::Redirect(to) => Err(anyhow!(
            "{} requires an account; go to {} first",
            route.path(),
            to.path()
        )),
        Navigation::Wait => Err(anyhow!("session is still being validated")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();
    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1).map(String::as_str) else {
        usage();
    };

    let client = ApiClient::from_env()?;
    let store = client.store();
    let api: Arc<dyn CineApi> = Arc::new(client);
    let session = Arc::new(Session::new(api.clone()));
    session.init().await;
    let ctx = PageContext {
        api,
        session: session.clone(),
        notifier: Arc::new(LogNotifier),
        store,
    };

    match command {
        "login" => {
            enter(Route::Login, &session)?;
            let mut page = LoginPage {
                username: arg(&args, 2, "username")?.to_string(),
                password: arg(&args, 3, "password")?.to_string(),
                ..Default::default()
            };
            match page.submit(&session).await {
                Some(_) => println!("Welcome back, {}", page.username),
                None => return Err(anyhow!(page.error.unwrap_or_default())),
            }
        }
        "signup" => {
            enter(Route::Signup, &session)?;
            let mut page = SignupPage {
                username: arg(&args, 2, "username")?.to_string(),
                email: arg(&args, 3, "email")?.to_string(),
                password: arg(&args, 4, "password")?.to_string(),
                confirm_password: arg(&args, 5, "confirm")?.to_string(),
                ..Default::default()
            };
            match page.submit(&session).await {
                Some(_) => println!("Account created for {}", page.username),
                None => return Err(anyhow!(page.error.unwrap_or_default())),
            }
        }
        "logout" => {
            session.logout();
            println!("Logged out");
        }
        "whoami" => match session.user() {
            Some(user) => println!("{} <{}>", user.username, user.email),
            None => println!("Not logged in"),
        },
        "trending" | "search" | "genre" => {
            let kind = kind_arg(&args, 2)?;
            let route = match kind {
                MediaKind::Movie => Route::Home,
                MediaKind::Tv => Route::TvBrowse,
            };
            enter(route, &session)?;
            let page = match kind {
                MediaKind::Movie => BrowsePage::home(ctx),
                MediaKind::Tv => BrowsePage::tv(ctx),
            };
            page.load().await;
            if command == "search" {
                let query = args.get(3..).unwrap_or_default().join(" ");
                if !page.search(&query).await {
                    return Err(anyhow!("search query is empty"));
                }
            } else if command == "genre" {
                let genre_id = arg(&args, 3, "genre_id")?
                    .parse()
                    .context("genre_id must be an integer")?;
                page.select_genre(genre_id).await;
            }
            let view = page.view();
            println!("{}", view.heading());
            print_items(&view.items);
        }
        "movie" => {
            let id = id_arg(&args, 2)?;
            enter(Route::Movie(id), &session)?;
            let page = MovieDetailPage::new(ctx, id);
            page.load().await;
            let view = page.view();
            let Some(details) = view.details.as_ref() else {
                return Err(anyhow!("movie {} not found", id));
            };
            println!(
                "{} ({})",
                details.item.display_title(),
                details.item.date().unwrap_or("TBA")
            );
            let poster = image_url(details.item.poster_path.as_deref(), ImageSize::W500);
            println!("Poster:  {}", poster);
            if let Some(trailer) = &view.trailer_url {
                println!("Trailer: {}", trailer);
            }
            if let Some(ArchiveLookup::Found(found)) = &view.full_movie {
                println!("Watch:   {}", found.embed_url);
            }
            println!("In your watchlist: {}", view.is_favorite());
            if !view.similar_by_language.is_empty() {
                println!("More in this language:");
                print_items(&view.similar_by_language);
            }
        }
        "tv" => {
            let id = id_arg(&args, 2)?;
            enter(Route::Tv(id), &session)?;
            let page = TvDetailPage::new(ctx, id);
            page.load().await;
            if let Some(raw) = args.get(3) {
                let season: i32 = raw.parse().context("season must be an integer")?;
                if !page.select_season(season) {
                    return Err(anyhow!("show has no season {}", season));
                }
            }
            let view = page.view();
            let Some(details) = view.details.as_ref() else {
                return Err(anyhow!("show {} not found", id));
            };
            println!(
                "{} ({})",
                details.item.display_title(),
                details.item.date().unwrap_or("TBA")
            );
            if let Some(trailer) = &view.trailer_url {
                println!("Trailer: {}", trailer);
            }
            if let Some(season) = view.season() {
                println!(
                    "{}: {} episodes",
                    season.name,
                    season.episode_count.unwrap_or_default()
                );
            }
            println!("In your watchlist: {}", view.is_favorite());
        }
        "person" => {
            let id = id_arg(&args, 2)?;
            enter(Route::Person(id), &session)?;
            let page = PersonPage::new(ctx, id);
            page.load().await;
            let view = page.view();
            let Some(person) = view.person.as_ref() else {
                return Err(anyhow!("person {} not found", id));
            };
            println!("{}", person.name);
            if let Some(bio) = person.biography.as_deref().filter(|b| !b.is_empty()) {
                println!("{}", bio);
            }
            print_items(&view.movie_credits());
        }
        "favorites" => {
            enter(Route::Favorites, &session)?;
            let page = FavoritesPage::new(ctx);
            page.load().await;
            for entry in page.view().entries {
                println!("{:>8}  {:<5}  {}", entry.tmdb_id, entry.media_type, entry.title);
            }
        }
        "fav" => {
            let kind = kind_arg(&args, 2)?;
            let id = id_arg(&args, 3)?;
            match kind {
                MediaKind::Movie => {
                    enter(Route::Movie(id), &session)?;
                    let page = MovieDetailPage::new(ctx, id);
                    page.load().await;
                    page.toggle_favorite().await;
                }
                MediaKind::Tv => {
                    enter(Route::Tv(id), &session)?;
                    let page = TvDetailPage::new(ctx, id);
                    page.load().await;
                    page.toggle_favorite().await;
                }
            }
        }
        "unfav" => {
            let id = id_arg(&args, 2)?;
            enter(Route::Favorites, &session)?;
            let page = FavoritesPage::new(ctx);
            page.load().await;
            page.remove(id).await;
        }
        "upcoming" => {
            enter(Route::Upcoming, &session)?;
            let page = UpcomingPage::new(ctx);
            match args.get(2) {
                Some(code) => {
                    if !page.select_language(code).await {
                        return Err(anyhow!("unknown language '{}'", code));
                    }
                }
                None => page.load().await,
            }
            let view = page.view();
            for item in &view.items {
                let bell = if view.has_reminder(item.id) { "*" } else { " " };
                println!(
                    "{} {:>8}  {}  {}",
                    bell,
                    item.id,
                    item.date().unwrap_or("TBA"),
                    item.display_title()
                );
            }
        }
        "remind" => {
            let id = id_arg(&args, 2)?;
            enter(Route::Upcoming, &session)?;
            let page = UpcomingPage::new(ctx);
            let set = page.toggle_reminder(id);
            println!("Reminder for {} {}", id, if set { "set" } else { "cleared" });
        }
        "dramas" => {
            enter(Route::WorldDramas, &session)?;
            let page = WorldDramasPage::new(ctx);
            let code = args.get(2).map(String::as_str).unwrap_or("KR");
            if !page.select_country(&code.to_uppercase()).await {
                return Err(anyhow!("unknown country '{}'", code));
            }
            if let Some(raw) = args.get(3) {
                let target: u32 = raw.parse().context("page must be an integer")?;
                for _ in 1..target {
                    if !page.next_page().await {
                        break;
                    }
                }
            }
            let view = page.view();
            println!(
                "{} ({}) page {} of {}",
                view.country.label, view.country.name, view.page, view.total_pages
            );
            print_items(&view.items);
        }
        _ => usage(),
    }
    Ok(())
}
