use std::fs;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{BlockedEvent, BlockedNumber, NewBlockedEvent, NewPrefixRule, PrefixRule, PrefixScope, RuleSnapshot, Settings};
use crate::repository::{EventLog, RuleRepository};
use crate::schema::{blocked_events, blocked_numbers, blocked_prefix_rules, settings};
use crate::validation::InputValidator;

// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// SQLite-backed rule store and event log
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    default_region: Option<String>,
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}

/// Strip an optional `sqlite:` / `sqlite://` scheme from a database URL
fn database_path(database_url: &str) -> &str {
    database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url)
}

impl Database {
    /// Open (creating if needed) the database at `database_url` with a default pool
    pub fn new(database_url: &str) -> Result<Self> {
        Self::open(database_url, 10, Duration::from_secs(30))
    }

    /// Open the database described by `config`
    pub fn from_config(config: &DatabaseConfig, default_region: Option<String>) -> Result<Self> {
        let db = Self::open(
            &config.url,
            config.max_connections,
            Duration::from_secs(config.connection_timeout_secs),
        )?;
        Ok(db.with_default_region(default_region))
    }

    fn open(database_url: &str, max_connections: u32, timeout: Duration) -> Result<Self> {
        let path = database_path(database_url);

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder()
            .max_size(max_connections)
            .connection_timeout(timeout)
            .build(manager)?;

        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        debug!(path, "Database opened");

        Ok(Self {
            pool,
            default_region: None,
        })
    }

    /// Set the region used to resolve numbers without a country code
    #[must_use]
    pub fn with_default_region(mut self, default_region: Option<String>) -> Self {
        self.default_region = default_region;
        self
    }

    /// Create tables if they don't exist
    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2025-10-01-000000_create_tables/up.sql"))?;
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    fn map_settings(row: &Row<'_>) -> rusqlite::Result<Settings> {
        Ok(Settings {
            block_unknown_enabled: row.get(0)?,
            skip_call_log_on_block: row.get(1)?,
            skip_notification_on_block: row.get(2)?,
        })
    }

    fn map_blocked_number(row: &Row<'_>) -> rusqlite::Result<BlockedNumber> {
        Ok(BlockedNumber {
            e164: row.get(0)?,
            created_at: millis_to_datetime(row.get(1)?),
        })
    }

    fn map_prefix_rule(row: &Row<'_>) -> rusqlite::Result<PrefixRule> {
        let scope: String = row.get(1)?;
        let scope = scope.parse::<PrefixScope>().map_err(|_| {
            rusqlite::Error::InvalidColumnType(
                1,
                blocked_prefix_rules::SCOPE.to_string(),
                rusqlite::types::Type::Text,
            )
        })?;
        Ok(PrefixRule {
            id: row.get(0)?,
            scope,
            country_code: row.get(2)?,
            prefix_digits: row.get(3)?,
            created_at: millis_to_datetime(row.get(4)?),
        })
    }

    fn map_event(row: &Row<'_>) -> rusqlite::Result<BlockedEvent> {
        Ok(BlockedEvent {
            id: row.get(0)?,
            e164: row.get(1)?,
            timestamp: millis_to_datetime(row.get(2)?),
        })
    }

    /// Current settings; a missing row is recreated with defaults
    pub fn get_settings(&self) -> Result<Settings> {
        let conn = self.get_connection()?;
        let existing = conn
            .query_row(
                &format!(
                    "SELECT {}, {}, {} FROM {} WHERE {} = ?1",
                    settings::BLOCK_UNKNOWN_ENABLED,
                    settings::SKIP_CALL_LOG_ON_BLOCK,
                    settings::SKIP_NOTIFICATION_ON_BLOCK,
                    settings::TABLE,
                    settings::ID
                ),
                params![settings::SINGLETON_ID],
                Self::map_settings,
            )
            .optional()?;

        match existing {
            Some(current) => Ok(current),
            None => {
                let defaults = Settings::default();
                Self::write_settings(&conn, &defaults)?;
                info!("Settings missing, seeded defaults");
                Ok(defaults)
            }
        }
    }

    fn write_settings(conn: &Connection, value: &Settings) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT INTO {table} ({id}, {bu}, {scl}, {sn}) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT({id}) DO UPDATE SET {bu} = excluded.{bu}, {scl} = excluded.{scl}, {sn} = excluded.{sn}",
                table = settings::TABLE,
                id = settings::ID,
                bu = settings::BLOCK_UNKNOWN_ENABLED,
                scl = settings::SKIP_CALL_LOG_ON_BLOCK,
                sn = settings::SKIP_NOTIFICATION_ON_BLOCK,
            ),
            params![
                settings::SINGLETON_ID,
                value.block_unknown_enabled,
                value.skip_call_log_on_block,
                value.skip_notification_on_block
            ],
        )?;
        Ok(())
    }

    /// Overwrite the settings singleton
    pub fn update_settings(&self, value: &Settings) -> Result<()> {
        let conn = self.get_connection()?;
        Self::write_settings(&conn, value)?;
        info!(
            block_unknown = value.block_unknown_enabled,
            skip_call_log = value.skip_call_log_on_block,
            skip_notification = value.skip_notification_on_block,
            "Settings updated"
        );
        Ok(())
    }

    /// Normalize `raw` and add it to the block list.
    ///
    /// Adding a number that is already blocked returns the stored entry.
    pub fn add_blocked_number(&self, raw: &str, region: Option<&str>) -> Result<BlockedNumber> {
        let e164 = InputValidator::normalize_blocked_number(raw, region)?;
        let conn = self.get_connection()?;

        let inserted = conn.execute(
            &format!(
                "INSERT INTO {table} ({e164}, {created}) VALUES (?1, ?2) ON CONFLICT({e164}) DO NOTHING",
                table = blocked_numbers::TABLE,
                e164 = blocked_numbers::E164,
                created = blocked_numbers::CREATED_AT,
            ),
            params![e164, Utc::now().timestamp_millis()],
        )?;
        if inserted == 0 {
            debug!(e164 = %e164, "Number already blocked");
        } else {
            info!(e164 = %e164, "Number blocked");
        }

        let stored = conn.query_row(
            &format!(
                "SELECT {}, {} FROM {} WHERE {} = ?1",
                blocked_numbers::E164,
                blocked_numbers::CREATED_AT,
                blocked_numbers::TABLE,
                blocked_numbers::E164
            ),
            params![e164],
            Self::map_blocked_number,
        )?;
        Ok(stored)
    }

    /// Remove a number from the block list; returns false if it was not there
    pub fn remove_blocked_number(&self, e164: &str) -> Result<bool> {
        let conn = self.get_connection()?;
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", blocked_numbers::TABLE, blocked_numbers::E164),
            params![e164],
        )?;
        if removed > 0 {
            info!(e164, "Number unblocked");
        }
        Ok(removed > 0)
    }

    fn load_blocked_numbers(conn: &Connection) -> Result<Vec<BlockedNumber>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {} FROM {} ORDER BY {}",
            blocked_numbers::E164,
            blocked_numbers::CREATED_AT,
            blocked_numbers::TABLE,
            blocked_numbers::E164
        ))?;
        let rows = stmt.query_map([], Self::map_blocked_number)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// All blocked numbers, sorted by E.164
    pub fn list_blocked_numbers(&self) -> Result<Vec<BlockedNumber>> {
        let conn = self.get_connection()?;
        Self::load_blocked_numbers(&conn)
    }

    /// Store a validated prefix rule and return it with its generated id
    pub fn add_prefix_rule(&self, rule: NewPrefixRule) -> Result<PrefixRule> {
        let conn = self.get_connection()?;
        let created_at = Utc::now();
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4)",
                blocked_prefix_rules::TABLE,
                blocked_prefix_rules::SCOPE,
                blocked_prefix_rules::COUNTRY_CODE,
                blocked_prefix_rules::PREFIX_DIGITS,
                blocked_prefix_rules::CREATED_AT
            ),
            params![
                rule.scope.as_str(),
                rule.country_code,
                rule.prefix_digits,
                created_at.timestamp_millis()
            ],
        )?;
        let stored = rule.into_rule(conn.last_insert_rowid(), created_at);
        info!(id = stored.id, rule = %stored.label(), "Prefix rule added");
        Ok(stored)
    }

    /// Remove a prefix rule by id; returns false if no such rule exists
    pub fn remove_prefix_rule(&self, id: i64) -> Result<bool> {
        let conn = self.get_connection()?;
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1", blocked_prefix_rules::TABLE, blocked_prefix_rules::ID),
            params![id],
        )?;
        if removed > 0 {
            info!(id, "Prefix rule removed");
        }
        Ok(removed > 0)
    }

    /// Prefix rules in insertion order
    fn load_prefix_rules(conn: &Connection) -> Result<Vec<PrefixRule>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {}, {}, {}, {} FROM {} ORDER BY {}",
            blocked_prefix_rules::ID,
            blocked_prefix_rules::SCOPE,
            blocked_prefix_rules::COUNTRY_CODE,
            blocked_prefix_rules::PREFIX_DIGITS,
            blocked_prefix_rules::CREATED_AT,
            blocked_prefix_rules::TABLE,
            blocked_prefix_rules::ID
        ))?;
        let rows = stmt.query_map([], Self::map_prefix_rule)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// All prefix rules, sorted by their display label
    pub fn list_prefix_rules(&self) -> Result<Vec<PrefixRule>> {
        let conn = self.get_connection()?;
        let mut rules = Self::load_prefix_rules(&conn)?;
        rules.sort_by_key(PrefixRule::label);
        Ok(rules)
    }

    /// Append a blocked-call event
    pub fn append_event(&self, event: &NewBlockedEvent) -> Result<BlockedEvent> {
        let conn = self.get_connection()?;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
                blocked_events::TABLE,
                blocked_events::E164,
                blocked_events::TS
            ),
            params![event.e164, event.timestamp.timestamp_millis()],
        )?;
        Ok(BlockedEvent {
            id: conn.last_insert_rowid(),
            e164: event.e164.clone(),
            timestamp: millis_to_datetime(event.timestamp.timestamp_millis()),
        })
    }

    /// Events at or after `since`, newest first
    pub fn list_events_since(&self, since: DateTime<Utc>) -> Result<Vec<BlockedEvent>> {
        let conn = self.get_connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {id}, {e164}, {ts} FROM {table} WHERE {ts} >= ?1 ORDER BY {ts} DESC, {id} DESC",
            id = blocked_events::ID,
            e164 = blocked_events::E164,
            ts = blocked_events::TS,
            table = blocked_events::TABLE,
        ))?;
        let rows = stmt.query_map(params![since.timestamp_millis()], Self::map_event)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl RuleRepository for Database {
    fn default_region(&self) -> Option<String> {
        self.default_region.clone()
    }

    fn settings(&self) -> Result<Settings> {
        self.get_settings()
    }

    fn blocked_numbers(&self) -> Result<Vec<String>> {
        let conn = self.get_connection()?;
        Ok(Self::load_blocked_numbers(&conn)?.into_iter().map(|n| n.e164).collect())
    }

    fn prefix_rules(&self) -> Result<Vec<PrefixRule>> {
        let conn = self.get_connection()?;
        Self::load_prefix_rules(&conn)
    }

    /// Numbers and prefix rules read inside one transaction
    fn snapshot(&self) -> Result<RuleSnapshot> {
        let conn = self.get_connection()?;
        let tx = conn.unchecked_transaction()?;
        let blocked_numbers = Self::load_blocked_numbers(&tx)?
            .into_iter()
            .map(|n| n.e164)
            .collect();
        let prefix_rules = Self::load_prefix_rules(&tx)?;
        tx.commit()?;

        Ok(RuleSnapshot {
            default_region: self.default_region.clone(),
            blocked_numbers,
            prefix_rules,
        })
    }
}

#[async_trait]
impl EventLog for Database {
    async fn append(&self, event: NewBlockedEvent) -> Result<BlockedEvent> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.append_event(&event)).await?
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<BlockedEvent>> {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.list_events_since(since)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_path_strips_scheme() {
        assert_eq!(database_path("sqlite://data/a.db"), "data/a.db");
        assert_eq!(database_path("sqlite:data/a.db"), "data/a.db");
        assert_eq!(database_path("/tmp/a.db"), "/tmp/a.db");
    }

    #[test]
    fn test_millis_round_trip() {
        let now = Utc::now();
        let restored = millis_to_datetime(now.timestamp_millis());
        assert_eq!(restored.timestamp_millis(), now.timestamp_millis());
    }
}
