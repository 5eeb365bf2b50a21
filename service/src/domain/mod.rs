//! Domain definitions.

pub mod court;
pub mod payment;
pub mod reservation;
pub mod user;

pub use self::{
    court::Court, payment::Payment, reservation::Reservation, user::User,
};
