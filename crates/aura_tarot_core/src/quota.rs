//! crates/aura_tarot_core/src/quota.rs
//!
//! The guest's daily allowance of gated actions.
//!
//! Rollover is by calendar day in local time, observed lazily: a stored day
//! that is not today simply counts as zero used. Nothing resets on a timer.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::domain::{GuestQuotaState, GUEST_READINGS_PER_DAY};
use crate::keys::{GUEST_DAILY_COUNT_KEY, GUEST_DAILY_DATE_KEY};
use crate::ports::{Clock, KeyValueStore, PortResult};

/// `<year>-<zero based month>-<day>`, the format the web client writes.
pub fn day_key(date: NaiveDate) -> String {
    format!("{}-{}-{}", date.year(), date.month0(), date.day())
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    let mut parts = key.split('-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month0 = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.parse::<u32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month0 + 1, day)
}

pub struct GuestQuota {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl GuestQuota {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// The stored counter, if the date it belongs to can be read.
    pub fn state(&self) -> PortResult<Option<GuestQuotaState>> {
        let (date, count) = self.load()?;
        Ok(date
            .as_deref()
            .and_then(parse_day_key)
            .map(|date| GuestQuotaState { date, count }))
    }

    pub fn remaining_today(&self) -> PortResult<u32> {
        Ok(match self.state()? {
            Some(state) => state.remaining_on(self.clock.today()),
            None => GUEST_READINGS_PER_DAY,
        })
    }

    pub fn can_consume(&self) -> PortResult<bool> {
        Ok(self.remaining_today()? > 0)
    }

    /// Records one gated action and returns today's new count.
    ///
    /// Not atomic with `can_consume`; callers serialize gated actions.
    pub fn consume(&self) -> PortResult<u32> {
        let today = self.clock.today();
        let count = match self.state()? {
            Some(state) if state.date == today => state.count,
            _ => {
                self.store.set(GUEST_DAILY_DATE_KEY, &day_key(today))?;
                0
            }
        }
        .saturating_add(1);
        self.store.set(GUEST_DAILY_COUNT_KEY, &count.to_string())?;
        debug!(count, day = %today, "Guest action recorded");
        Ok(count)
    }

    fn load(&self) -> PortResult<(Option<String>, u32)> {
        let date = self.store.get(GUEST_DAILY_DATE_KEY)?;
        let count = match self.store.get(GUEST_DAILY_COUNT_KEY)? {
            Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|_| {
                warn!(value = %raw, "Guest counter is unreadable, treating as 0");
                0
            }),
            None => 0,
        };
        Ok((date, count))
    }
}
