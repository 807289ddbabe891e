//! Daily summary of blocked calls
//!
//! Builds the text of the end-of-day digest from the event log. Delivering it
//! (notifications, mail) and running it on a schedule are left to the host.

use std::fmt::Write;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::BlockedEvent;
use crate::repository::EventLog;

/// Label used for events without a caller number
pub const UNKNOWN_CALLER: &str = "Unknown";

/// Summary of the calls blocked since the start of the day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyDigest {
    /// Number of blocked calls
    pub total: usize,
    /// Distinct callers, most recent first, at most `max_listed` of them
    pub listed: Vec<String>,
    /// Calls beyond the listing limit
    pub remaining: usize,
}

impl DailyDigest {
    /// Summarize `events` (newest first). Returns `None` when nothing was blocked.
    #[must_use]
    pub fn from_events(events: &[BlockedEvent], max_listed: usize) -> Option<Self> {
        if events.is_empty() {
            return None;
        }

        let mut listed: Vec<String> = Vec::with_capacity(max_listed.min(events.len()));
        for label in events.iter().map(|e| e.e164.as_deref().unwrap_or(UNKNOWN_CALLER)) {
            if listed.len() == max_listed {
                break;
            }
            if !listed.iter().any(|l| l == label) {
                listed.push(label.to_string());
            }
        }

        Some(Self {
            total: events.len(),
            listed,
            remaining: events.len().saturating_sub(max_listed),
        })
    }

    #[must_use]
    pub fn title(&self) -> String {
        format!("Blocked calls today: {}", self.total)
    }

    #[must_use]
    pub fn body(&self) -> String {
        let mut body = self.listed.join("\n");
        if self.remaining > 0 {
            let _ = write!(body, "\n… and {} more", self.remaining);
        }
        body
    }
}

/// Local midnight of the day containing `now`, as a UTC instant.
///
/// Falls back to `now` when midnight does not exist locally (a DST jump at 00:00).
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let tz = now.timezone();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).earliest())
        .map_or_else(|| now.with_timezone(&Utc), |start| start.with_timezone(&Utc))
}

/// Next time the digest is due: today at `hour:minute` if that is still ahead
/// of `now`, otherwise tomorrow
pub fn next_run<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive().and_hms_opt(hour, minute, 0)?;
    match tz.from_local_datetime(&today).earliest() {
        Some(candidate) if candidate > *now => Some(candidate),
        _ => tz.from_local_datetime(&(today + Duration::days(1))).earliest(),
    }
}

/// Build today's digest from an event log
pub async fn todays_digest<L, Tz>(log: &L, now: &DateTime<Tz>, max_listed: usize) -> Result<Option<DailyDigest>>
where
    L: EventLog + ?Sized,
    Tz: TimeZone,
{
    let events = log.events_since(start_of_day(now)).await?;
    Ok(DailyDigest::from_events(&events, max_listed))
}
