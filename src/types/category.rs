use std::fmt;

/// The kind of data a dataset holds. Selects the storage variant and names the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Past observations, fetched one day at a time.
    History,
    /// Hourly forecasts, fetched as a single batch.
    ForecastHourly,
}

impl Category {
    pub(crate) const fn path_segment(&self) -> &'static str {
        match self {
            Category::History => "history",
            Category::ForecastHourly => "forecast_hourly",
        }
    }

    /// Name of the column every row of this category is keyed by.
    pub const fn timestamp_field(&self) -> &'static str {
        match self {
            Category::History => "obsTimeLocal",
            Category::ForecastHourly => "validTimeLocal",
        }
    }

    /// `chrono` format of [`Category::timestamp_field`].
    pub const fn timestamp_format(&self) -> &'static str {
        match self {
            Category::History => "%Y-%m-%d %H:%M:%S",
            Category::ForecastHourly => "%Y-%m-%dT%H:%M:%S%z",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path_segment())
    }
}
