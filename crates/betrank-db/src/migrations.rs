use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE profiles (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'user',
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE ranking_categories (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT '',
                position    INTEGER NOT NULL,
                created_by  TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- categories and labels hold JSON arrays of names, not foreign keys
            CREATE TABLE betting_sites (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                url         TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                logo_url    TEXT,
                categories  TEXT NOT NULL DEFAULT '[]',
                labels      TEXT NOT NULL DEFAULT '[]',
                commission  REAL,
                ltv         REAL,
                created_by  TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE site_labels (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                color       TEXT NOT NULL,
                created_by  TEXT,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE ranking_configs (
                category_id TEXT PRIMARY KEY REFERENCES ranking_categories(id) ON DELETE CASCADE,
                site_count  INTEGER NOT NULL,
                min_votes   INTEGER NOT NULL,
                max_votes   INTEGER NOT NULL,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE daily_rankings (
                id            TEXT PRIMARY KEY,
                category_id   TEXT NOT NULL REFERENCES ranking_categories(id) ON DELETE CASCADE,
                category_name TEXT NOT NULL,
                generated_at  TEXT NOT NULL,
                expires_at    TEXT NOT NULL
            );

            CREATE INDEX idx_daily_rankings_category
                ON daily_rankings(category_id, generated_at);

            -- entries snapshot the site; site_id survives site deletion
            CREATE TABLE ranked_sites (
                ranking_id       TEXT NOT NULL REFERENCES daily_rankings(id) ON DELETE CASCADE,
                site_id          TEXT NOT NULL,
                site_name        TEXT NOT NULL,
                site_url         TEXT NOT NULL,
                site_logo_url    TEXT,
                site_description TEXT NOT NULL DEFAULT '',
                votes            INTEGER NOT NULL DEFAULT 0,
                position         INTEGER NOT NULL,
                PRIMARY KEY (ranking_id, site_id)
            );

            CREATE TABLE votes (
                id          TEXT PRIMARY KEY,
                user_id     TEXT REFERENCES profiles(id) ON DELETE SET NULL,
                ranking_id  TEXT NOT NULL REFERENCES daily_rankings(id) ON DELETE CASCADE,
                site_id     TEXT NOT NULL,
                voted_at    TEXT NOT NULL,
                ip          TEXT
            );

            CREATE INDEX idx_votes_user_day
                ON votes(user_id, voted_at);

            CREATE TABLE site_suggestions (
                id           TEXT PRIMARY KEY,
                name         TEXT NOT NULL,
                url          TEXT NOT NULL,
                description  TEXT NOT NULL DEFAULT '',
                suggested_by TEXT REFERENCES profiles(id) ON DELETE SET NULL,
                status       TEXT NOT NULL DEFAULT 'pending',
                created_at   TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE shared_rankings (
                id          TEXT PRIMARY KEY,
                ranking_id  TEXT NOT NULL REFERENCES daily_rankings(id) ON DELETE CASCADE,
                shared_by   TEXT REFERENCES profiles(id) ON DELETE SET NULL,
                token       TEXT NOT NULL UNIQUE,
                shared_at   TEXT NOT NULL,
                expires_at  TEXT NOT NULL
            );

            CREATE TABLE online_users (
                session_id  TEXT PRIMARY KEY,
                user_id     TEXT,
                last_seen   TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
