//! Per-run bookkeeping. Counters are owned by a single pipeline run and only
//! ever reported, never used for control flow.

use chrono::NaiveDate;
use std::fmt;
use std::ops::AddAssign;

/// Row counts of one backfill day, or running totals when summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounts {
    /// Observations in the fetched payload.
    pub observations_len: usize,
    /// Observations dropped because their timestamp was already stored.
    pub observations_existing: usize,
    /// Observations appended to the dataset.
    pub observations_stored: usize,
}

impl AddAssign for DayCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.observations_len += rhs.observations_len;
        self.observations_existing += rhs.observations_existing;
        self.observations_stored += rhs.observations_stored;
    }
}

impl fmt::Display for DayCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Observations: {}, Existing: {}, Inserted: {}",
            self.observations_len, self.observations_existing, self.observations_stored
        )
    }
}

/// Outcome of one backfill day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayReport {
    pub date: NaiveDate,
    /// `false` when the API returned nothing for the day.
    pub fetched: bool,
    pub counts: DayCounts,
}

/// Outcome of a whole history backfill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryReport {
    pub days: Vec<DayReport>,
    pub totals: DayCounts,
}

impl HistoryReport {
    pub(crate) fn record(&mut self, day: DayReport) {
        self.totals += day.counts;
        self.days.push(day);
    }

    /// Days for which the API returned no payload.
    pub fn missed_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.iter().filter(|day| !day.fetched).map(|day| day.date)
    }
}

/// Outcome of a single forecast fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForecastReport {
    pub fetched: bool,
    pub rows_stored: usize,
}
