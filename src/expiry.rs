//! Membership date arithmetic.
//!
//! Plans run for whole calendar months. When the start day does not exist
//! in the target month the expiry is clamped to that month's last day, so
//! Jan 31 + 1 month is Feb 28 (or 29), never Mar 2/3.

use chrono::{DateTime, Months, NaiveDate};
use thiserror::Error;
use tracing::warn;

use crate::models::PlanName;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DateError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Unparseable(String),

    #[error("date {0} is out of range for a {1} plan")]
    OutOfRange(NaiveDate, PlanName),
}

/// Parse a backend date. Plain `YYYY-MM-DD` and RFC 3339 timestamps are
/// both accepted; for timestamps only the date part is kept.
pub fn parse_date(raw: &str) -> Result<NaiveDate, DateError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| DateError::Unparseable(raw.to_string()))
}

/// Expiry of a plan starting on `start`.
pub fn compute_expiry(start: NaiveDate, plan: PlanName) -> NaiveDate {
    checked_expiry(start, plan).unwrap_or(NaiveDate::MAX)
}

fn checked_expiry(start: NaiveDate, plan: PlanName) -> Result<NaiveDate, DateError> {
    start
        .checked_add_months(Months::new(plan.months()))
        .ok_or(DateError::OutOfRange(start, plan))
}

pub fn expiry_from_str(start: &str, plan: PlanName) -> Result<NaiveDate, DateError> {
    checked_expiry(parse_date(start)?, plan)
}

/// Like [`expiry_from_str`] but always yields a date: `today` when the
/// start cannot be used. The failure is logged rather than hidden.
pub fn expiry_or_fallback(start: &str, plan: PlanName, today: NaiveDate) -> NaiveDate {
    match expiry_from_str(start, plan) {
        Ok(date) => date,
        Err(e) => {
            warn!(error = %e, start, %plan, "expiry calculation failed, falling back to today");
            today
        }
    }
}

/// Whole days from `today` until `expiry`, never negative.
pub fn days_left(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days().max(0)
}

/// Share of the plan already used, as a percentage in `0..=100`.
pub fn plan_progress(start: NaiveDate, expiry: NaiveDate, today: NaiveDate) -> u8 {
    let total = (expiry - start).num_days();
    if total <= 0 {
        return 100;
    }
    let used = total - days_left(expiry, today);
    let pct = (used as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipStatus {
    Active,
    ExpiringSoon,
    Expired,
}

impl MembershipStatus {
    pub fn from_days_left(days: i64) -> Self {
        if days > 7 {
            MembershipStatus::Active
        } else if days > 0 {
            MembershipStatus::ExpiringSoon
        } else {
            MembershipStatus::Expired
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MembershipStatus::Active => "Active",
            MembershipStatus::ExpiringSoon => "Expiring Soon",
            MembershipStatus::Expired => "Expired",
        }
    }
}
