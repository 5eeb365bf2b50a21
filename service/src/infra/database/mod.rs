//! [`Database`]-related implementations.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use derive_more::{Display, Error as StdError, From};

pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Names of the constraints guarding the stored data.
pub mod constraint {
    /// Uniqueness of a [`User`] email.
    ///
    /// [`User`]: crate::domain::User
    pub const USERS_EMAIL: &str = "users_email_key";

    /// Absence of overlapping active [`Reservation`]s on the same [`Court`].
    ///
    /// [`Court`]: crate::domain::Court
    /// [`Reservation`]: crate::domain::Reservation
    pub const RESERVATIONS_NO_OVERLAP: &str = "reservations_no_overlap";

    /// Uniqueness of a [`Payment`] transaction ID.
    ///
    /// [`Payment`]: crate::domain::Payment
    pub const PAYMENTS_TRANSACTION_ID: &str = "payments_transaction_id_key";
}

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Memory`] error.
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Memory(e) => e.is_unique_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_unique_violation(constraint),
        }
    }

    /// Checks if the error is an exclusion violation of the specified
    /// constraint.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::Memory(e) => e.is_exclusion_violation(constraint),
            #[cfg(feature = "postgres")]
            Self::Postgres(e) => e.is_exclusion_violation(constraint),
        }
    }
}
