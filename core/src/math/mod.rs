pub mod stats;
pub mod units;

pub use stats::StatsHelper;
pub use units::{db_to_linear, linear_to_db};
