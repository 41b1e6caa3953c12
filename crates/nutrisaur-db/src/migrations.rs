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
            CREATE TABLE users (
                user_id     INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                last_login  TEXT
            );

            CREATE TABLE admin (
                admin_id    INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL DEFAULT 'admin',
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                last_login  TEXT
            );

            CREATE TABLE user_preferences (
                id                       INTEGER PRIMARY KEY AUTOINCREMENT,
                user_email               TEXT,
                name                     TEXT,
                age                      INTEGER,
                gender                   TEXT,
                barangay                 TEXT,
                municipality             TEXT,
                bmi                      REAL,
                muac                     REAL,
                whz_score                REAL,
                risk_score               INTEGER NOT NULL DEFAULT 0
                                         CHECK (risk_score BETWEEN 0 AND 100),
                dietary_diversity_score  INTEGER,
                swelling                 TEXT,
                weight_loss              TEXT,
                feeding_behavior         TEXT,
                created_at               TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at               TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_user_preferences_barangay
                ON user_preferences(barangay, created_at);
            CREATE INDEX idx_user_preferences_risk
                ON user_preferences(risk_score, created_at);

            CREATE TABLE notification_logs (
                id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id           INTEGER,
                notification_type  TEXT NOT NULL,
                target_type        TEXT NOT NULL,
                target_value       TEXT,
                tokens_sent        INTEGER NOT NULL DEFAULT 0,
                success            INTEGER NOT NULL DEFAULT 0,
                error_message      TEXT,
                created_at         TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_notification_logs_created
                ON notification_logs(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
