//! crates/aura_tarot_core/src/testing.rs
//!
//! Helpers for driving the session layer deterministically in tests.

use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::ports::Clock;

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// A clock set to noon UTC on the given day.
    pub fn at_date(year: i32, month: u32, day: u32) -> Self {
        let now = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(|naive| naive.and_utc())
            .unwrap_or_else(Utc::now);
        Self::new(now)
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }

    /// The calendar date of `now` in UTC, so tests do not depend on the host zone.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}
