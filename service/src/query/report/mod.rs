//! Report [`Query`]s.
//!
//! [`Query`]: crate::Query

pub mod user_stats;

pub use self::user_stats::UserStats;
