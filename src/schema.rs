//! Database schema definitions
//!
//! Table and column names used with rusqlite. Timestamps are stored as Unix
//! epoch milliseconds.

/// Settings singleton table
pub mod settings {
    /// Table name
    pub const TABLE: &str = "settings";
    /// Primary key column, always 0
    pub const ID: &str = "id";
    /// Block anonymous callers
    pub const BLOCK_UNKNOWN_ENABLED: &str = "block_unknown_enabled";
    /// Keep blocked calls out of the call log
    pub const SKIP_CALL_LOG_ON_BLOCK: &str = "skip_call_log_on_block";
    /// Suppress notifications for blocked calls
    pub const SKIP_NOTIFICATION_ON_BLOCK: &str = "skip_notification_on_block";
    /// Row id of the singleton
    pub const SINGLETON_ID: i64 = 0;
}

/// Blocked numbers table
pub mod blocked_numbers {
    /// Table name
    pub const TABLE: &str = "blocked_numbers";
    /// Canonical E.164 number, primary key
    pub const E164: &str = "e164";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Prefix rules table
pub mod blocked_prefix_rules {
    /// Table name
    pub const TABLE: &str = "blocked_prefix_rules";
    /// Primary key column
    pub const ID: &str = "id";
    /// `BY_COUNTRY` or `NATIONAL`
    pub const SCOPE: &str = "scope";
    /// Country calling code, NULL for national rules
    pub const COUNTRY_CODE: &str = "country_code";
    /// Prefix digits column
    pub const PREFIX_DIGITS: &str = "prefix_digits";
    /// Creation timestamp column
    pub const CREATED_AT: &str = "created_at";
}

/// Blocked call events table
pub mod blocked_events {
    /// Table name
    pub const TABLE: &str = "blocked_events";
    /// Primary key column
    pub const ID: &str = "id";
    /// Caller number, NULL for anonymous callers
    pub const E164: &str = "e164";
    /// Event timestamp column
    pub const TS: &str = "ts";
}
