pub mod category;
pub mod mode;
pub mod station;
pub mod units;
