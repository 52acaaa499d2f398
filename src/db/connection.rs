//! Database connection pool and management.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::time::Duration;

/// Type alias for our connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Type alias for a pooled connection.
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout in seconds.
    pub connection_timeout: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "music-rating.db".to_string(),
            max_connections: 10,
            connection_timeout: 30,
        }
    }
}

/// Per-connection pragmas. Cascading deletes depend on `foreign_keys`.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions {
    in_memory: bool,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        let pragmas = if self.in_memory {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;"
        };
        conn.batch_execute(pragmas)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

impl DbConfig {
    /// Create a new database configuration.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Configuration for a private in-memory database.
    ///
    /// Every SQLite `:memory:` connection is its own database, so the pool
    /// is pinned to a single connection that is never recycled.
    pub fn in_memory() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            max_connections: 1,
            connection_timeout: 5,
        }
    }

    fn is_in_memory(&self) -> bool {
        self.database_url == ":memory:"
    }

    /// Build a connection pool from this configuration.
    pub fn build_pool(&self) -> Result<DbPool, diesel::r2d2::PoolError> {
        let manager = ConnectionManager::<SqliteConnection>::new(&self.database_url);
        let in_memory = self.is_in_memory();

        let mut builder = Pool::builder()
            .max_size(self.max_connections)
            .connection_timeout(Duration::from_secs(self.connection_timeout))
            .connection_customizer(Box::new(ConnectionOptions { in_memory }));
        if in_memory {
            builder = builder.idle_timeout(None).max_lifetime(None);
        }
        builder.build(manager)
    }
}

/// Build an in-memory pool with the schema applied.
///
/// Used by tests and by `--database :memory:` runs.
pub fn in_memory_pool() -> Result<DbPool, Box<dyn std::error::Error + Send + Sync>> {
    let pool = DbConfig::in_memory().build_pool()?;
    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;
    drop(conn);
    Ok(pool)
}

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        google_id TEXT NOT NULL UNIQUE,
        email TEXT,
        nickname TEXT COLLATE NOCASE,
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_nickname ON users(nickname COLLATE NOCASE) WHERE nickname IS NOT NULL",
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        csrf_token TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        expires_at TIMESTAMP NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
    r#"
    CREATE TABLE IF NOT EXISTS artists (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        name TEXT NOT NULL,
        deezer_id TEXT,
        itunes_id TEXT,
        yandex_id TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_artists_name ON artists(name)",
    r#"
    CREATE TABLE IF NOT EXISTS releases (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        title TEXT NOT NULL,
        artist_id INTEGER NOT NULL REFERENCES artists(id) ON DELETE CASCADE,
        release_date DATE,
        release_type TEXT NOT NULL CHECK (release_type IN ('album', 'single')),
        cover_url TEXT,
        yandex_music_url TEXT,
        apple_music_url TEXT,
        spotify_url TEXT,
        deezer_url TEXT,
        is_test_data BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_releases_artist_id ON releases(artist_id)",
    "CREATE INDEX IF NOT EXISTS idx_releases_release_date ON releases(release_date)",
    r#"
    CREATE TABLE IF NOT EXISTS ratings (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        release_id INTEGER NOT NULL REFERENCES releases(id) ON DELETE CASCADE,
        score INTEGER NOT NULL CHECK (score BETWEEN 1 AND 10),
        text TEXT,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        UNIQUE (user_id, release_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ratings_release_id ON ratings(release_id)",
    r#"
    CREATE TABLE IF NOT EXISTS comment_reactions (
        rating_id INTEGER NOT NULL REFERENCES ratings(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        kind TEXT NOT NULL CHECK (kind IN ('like', 'dislike')),
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (rating_id, user_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        rating_id INTEGER NOT NULL REFERENCES ratings(id) ON DELETE CASCADE,
        reporter_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        reason TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'resolved')),
        resolution TEXT,
        resolved_by INTEGER REFERENCES users(id) ON DELETE SET NULL,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        resolved_at TIMESTAMP
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_reports_status ON reports(status)",
    "CREATE INDEX IF NOT EXISTS idx_reports_reporter_created ON reports(reporter_id, created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS collections (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        is_active BOOLEAN NOT NULL DEFAULT FALSE,
        position INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS collection_releases (
        collection_id INTEGER NOT NULL REFERENCES collections(id) ON DELETE CASCADE,
        release_id INTEGER NOT NULL REFERENCES releases(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        PRIMARY KEY (collection_id, release_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_collection_releases_release_id ON collection_releases(release_id)",
];

/// Run the SQL migrations to set up the database schema.
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    conn.transaction(|conn| {
        for statement in MIGRATIONS {
            diesel::sql_query(*statement).execute(conn)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(QueryableByName)]
    struct CountResult {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        cnt: i64,
    }

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.database_url, "music-rating.db");
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let pool = in_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        run_migrations(&mut conn).unwrap();

        let tables = diesel::sql_query(
            "SELECT COUNT(*) AS cnt FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .get_result::<CountResult>(&mut conn)
        .unwrap();
        assert_eq!(tables.cnt, 9);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let pool = in_memory_pool().unwrap();
        let mut conn = pool.get().unwrap();
        let fk = diesel::sql_query("SELECT foreign_keys AS cnt FROM pragma_foreign_keys")
            .get_result::<CountResult>(&mut conn)
            .unwrap();
        assert_eq!(fk.cnt, 1);
    }
}
