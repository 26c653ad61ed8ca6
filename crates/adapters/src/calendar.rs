// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Venue calendar port.
//!
//! The real backend (shared venue calendar) is out of scope; the static
//! implementation is driven from config and in-memory bookings.

use chrono::{Datelike, NaiveDate, Weekday};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use vd_core::SiteVisitConfig;

/// Read/write view of the venue's operating calendar.
pub trait CalendarPort: Send + Sync {
    /// Date is inside the venue's operating calendar and not blocked.
    fn is_bookable(&self, date: NaiveDate) -> bool;

    /// Concrete candidate dates starting at `from`, skipping blocked and
    /// already-booked days.
    fn candidate_dates(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate>;

    /// Record a confirmed event on the calendar.
    fn mark_booked(&self, date: NaiveDate);

    /// Dates with a confirmed event.
    fn booked_dates(&self) -> Vec<NaiveDate>;

    fn is_booked(&self, date: NaiveDate) -> bool {
        self.booked_dates().contains(&date)
    }
}

/// Config-driven calendar with in-memory bookings.
pub struct StaticCalendar {
    blocked: BTreeSet<NaiveDate>,
    weekdays_only: bool,
    booked: Mutex<BTreeSet<NaiveDate>>,
}

impl StaticCalendar {
    pub fn new(blocked: Vec<NaiveDate>, weekdays_only: bool) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
            weekdays_only,
            booked: Mutex::new(BTreeSet::new()),
        }
    }

    /// Build from the site-visit section of the deployment config.
    pub fn from_config(config: &SiteVisitConfig) -> Self {
        let blocked = config
            .blocked_dates
            .iter()
            .filter_map(|d| vd_core::dates::parse_iso(d))
            .collect();
        Self::new(blocked, false)
    }

    fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl Default for StaticCalendar {
    fn default() -> Self {
        Self::new(Vec::new(), false)
    }
}

impl CalendarPort for StaticCalendar {
    fn is_bookable(&self, date: NaiveDate) -> bool {
        if self.blocked.contains(&date) {
            return false;
        }
        if self.weekdays_only && Self::is_weekend(date) {
            return false;
        }
        true
    }

    fn candidate_dates(&self, from: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut candidates = Vec::with_capacity(count);
        let mut date = from;
        // Bounded scan; a year without a bookable day means a misconfigured
        // calendar.
        for _ in 0..366 {
            if candidates.len() == count {
                break;
            }
            if self.is_bookable(date) && !self.is_booked(date) {
                candidates.push(date);
            }
            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        candidates
    }

    fn mark_booked(&self, date: NaiveDate) {
        self.booked.lock().insert(date);
    }

    fn booked_dates(&self) -> Vec<NaiveDate> {
        self.booked.lock().iter().copied().collect()
    }
}

#[cfg(test)]
#[path = "calendar_tests.rs"]
mod tests;
