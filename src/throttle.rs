//! Decides what to fetch before a pipeline is built: the history backfill
//! window, and whether a forecast is still fresh enough to skip.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone};

/// Inclusive range of days a history backfill covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Number of days in the window, both ends included. Zero when `start > end`.
    pub fn days(&self) -> usize {
        let span = (self.end - self.start).num_days() + 1;
        span.max(0) as usize
    }

    /// Every day of the window, in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.days() as i64).map(move |offset| start + Duration::days(offset))
    }
}

/// Resolves the backfill window.
///
/// Without explicit bounds a run resumes on the day the dataset's last
/// observation was taken and ends today, so repeated runs stay incremental.
pub fn backfill_window(
    explicit_start: Option<NaiveDate>,
    explicit_end: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
    default_start: NaiveDate,
    today: NaiveDate,
) -> DateWindow {
    let start = explicit_start.or(last_date).unwrap_or(default_start);
    let end = explicit_end.unwrap_or(today);
    DateWindow::new(start, end)
}

/// Outcome of the forecast cooldown check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Fetch,
    Skip {
        /// When the stored batch was requested, inferred from its horizon.
        last_request: DateTime<FixedOffset>,
        /// Earliest instant a new batch will be requested.
        fresh_until: DateTime<FixedOffset>,
    },
}

/// Decides whether a new forecast batch should be requested.
///
/// The stored batch ends at `last_valid_time`; with a horizon of
/// `horizon_hours` it was requested at `last_valid_time - horizon`. A new
/// batch is only requested once `cooldown_hours` have passed since then.
/// `now` is compared in the offset of `last_valid_time`. Hour counts that
/// overflow the calendar never block a fetch.
pub fn forecast_cooldown<Tz: TimeZone>(
    last_valid_time: Option<DateTime<FixedOffset>>,
    horizon_hours: i64,
    cooldown_hours: i64,
    now: DateTime<Tz>,
) -> CooldownDecision {
    let Some(last_valid_time) = last_valid_time else {
        return CooldownDecision::Fetch;
    };

    let Some((last_request, fresh_until)) = Duration::try_hours(horizon_hours)
        .and_then(|horizon| last_valid_time.checked_sub_signed(horizon))
        .and_then(|last_request| {
            let cooldown = Duration::try_hours(cooldown_hours)?;
            Some((last_request, last_request.checked_add_signed(cooldown)?))
        })
    else {
        return CooldownDecision::Fetch;
    };
    let now = now.with_timezone(&last_valid_time.timezone());

    if now < fresh_until {
        CooldownDecision::Skip {
            last_request,
            fresh_until,
        }
    } else {
        CooldownDecision::Fetch
    }
}

/// Hours covered by a forecast mode label: its digits, read as days (`"2day"` -> 48).
pub fn horizon_hours(label: &str) -> Option<i64> {
    let digits: String = label.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<i64>().ok().and_then(|days| days.checked_mul(24))
}
