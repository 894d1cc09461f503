//! SQLite tables behind the backend: users, favorites and the login log.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{info, warn};

use crate::models::{FavoriteEntry, MediaKind, NewFavorite, TmdbId, User};

/// Login events kept per user; older ones are pruned on each login.
pub const LOGIN_HISTORY_LIMIT: i64 = 50;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS favorites (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        tmdb_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        poster_path TEXT,
        media_type TEXT NOT NULL DEFAULT 'movie',
        added_at TEXT NOT NULL,
        UNIQUE (user_id, tmdb_id)
    )",
    "CREATE TABLE IF NOT EXISTS login_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        ip_address TEXT NOT NULL,
        user_agent TEXT,
        login_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS login_logs_user ON login_logs (user_id, id)",
];

#[derive(Debug, Clone, FromRow)]
pub struct StoredUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl StoredUser {
    pub fn public(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct LoginEvent {
    pub user_id: i64,
    pub ip_address: String,
    pub user_agent: Option<String>,
    #[sqlx(rename = "login_at")]
    pub at: DateTime<Utc>,
}

#[derive(FromRow)]
struct FavoriteRow {
    id: i64,
    tmdb_id: TmdbId,
    title: String,
    poster_path: Option<String>,
    media_type: String,
    user_id: i64,
    added_at: DateTime<Utc>,
}

impl From<FavoriteRow> for FavoriteEntry {
    fn from(row: FavoriteRow) -> Self {
        let media_type = MediaKind::from_str(&row.media_type).unwrap_or_else(|e| {
            warn!("Favorite {} has {}, reading it as a movie", row.id, e);
            MediaKind::Movie
        });
        FavoriteEntry {
            id: row.id,
            tmdb_id: row.tmdb_id,
            title: row.title,
            poster_path: row.poster_path,
            media_type,
            user_id: row.user_id,
            added_at: row.added_at,
        }
    }
}

/// Why a registration was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    Username,
    Email,
}

#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Opens (creating if needed) the database at `url` and applies the schema.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        info!("Database ready at {}", url);
        Ok(db)
    }

    /// Private in-memory database. A single connection that never expires,
    /// since the data lives only as long as that connection.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn user_by_name(&self, username: &str) -> Result<Option<StoredUser>, sqlx::Error> {
        sqlx::query_as::<_, StoredUser>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// `Err(Conflict)` when the username or email is already registered.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Result<StoredUser, Conflict>, sqlx::Error> {
        let created = sqlx::query_as::<_, StoredUser>(
            "INSERT INTO users (username, email, password_hash, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT DO NOTHING
             RETURNING id, username, email, password_hash, created_at",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        match created {
            Some(user) => Ok(Ok(user)),
            None if self.user_by_name(username).await?.is_some() => Ok(Err(Conflict::Username)),
            None => Ok(Err(Conflict::Email)),
        }
    }

    /// Appends to the user's login log and drops entries past the history limit.
    pub async fn record_login(&self, event: &LoginEvent) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO login_logs (user_id, ip_address, user_agent, login_at) VALUES (?, ?, ?, ?)",
        )
        .bind(event.user_id)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(event.at)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "DELETE FROM login_logs WHERE user_id = ? AND id NOT IN
             (SELECT id FROM login_logs WHERE user_id = ? ORDER BY id DESC LIMIT ?)",
        )
        .bind(event.user_id)
        .bind(event.user_id)
        .bind(LOGIN_HISTORY_LIMIT)
        .execute(&mut *tx)
        .await?;
        tx.commit().await
    }

    /// Newest first.
    pub async fn logins_for(&self, user_id: i64) -> Result<Vec<LoginEvent>, sqlx::Error> {
        sqlx::query_as::<_, LoginEvent>(
            "SELECT user_id, ip_address, user_agent, login_at FROM login_logs
             WHERE user_id = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn favorites_for(&self, user_id: i64) -> Result<Vec<FavoriteEntry>, sqlx::Error> {
        let rows = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, tmdb_id, title, poster_path, media_type, user_id, added_at
             FROM favorites WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(FavoriteEntry::from).collect())
    }

    /// Idempotent per `(user, tmdb_id)`: an existing record comes back as is.
    pub async fn add_favorite(
        &self,
        user_id: i64,
        favorite: &NewFavorite,
    ) -> Result<FavoriteEntry, sqlx::Error> {
        sqlx::query(
            "INSERT INTO favorites (user_id, tmdb_id, title, poster_path, media_type, added_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT (user_id, tmdb_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(favorite.tmdb_id)
        .bind(&favorite.title)
        .bind(&favorite.poster_path)
        .bind(favorite.media_type.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        let row = sqlx::query_as::<_, FavoriteRow>(
            "SELECT id, tmdb_id, title, poster_path, media_type, user_id, added_at
             FROM favorites WHERE user_id = ? AND tmdb_id = ?",
        )
        .bind(user_id)
        .bind(favorite.tmdb_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Returns whether a record was removed.
    pub async fn remove_favorite(&self, user_id: i64, tmdb_id: TmdbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = ? AND tmdb_id = ?")
            .bind(user_id)
            .bind(tmdb_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
