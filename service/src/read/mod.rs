//! Read entities definitions.

pub mod court;
pub mod payment;
pub mod reservation;
