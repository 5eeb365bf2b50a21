//! [`Payment`] read model definition.
//!
//! [`Payment`]: crate::domain::Payment

pub mod list {
    //! [`Payment`]s list definitions.

    use crate::domain::{payment, reservation, user, Payment};
    #[cfg(doc)]
    use crate::domain::{Reservation, User};

    /// Selector of [`Payment`]s, newest first.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct Selector {
        /// ID of the [`User`] who made the [`Payment`]s, if any.
        pub user_id: Option<user::Id>,

        /// ID of the paid [`Reservation`], if any.
        pub reservation_id: Option<reservation::Id>,

        /// [`payment::Status`] of the [`Payment`]s, if any.
        pub status: Option<payment::Status>,
    }

    impl Selector {
        /// Selects all the [`Payment`]s of the provided [`Reservation`].
        #[must_use]
        pub fn of_reservation(id: reservation::Id) -> Self {
            Self {
                reservation_id: Some(id),
                ..Self::default()
            }
        }

        /// Checks whether the provided [`Payment`] is selected by this
        /// [`Selector`].
        #[must_use]
        pub fn matches(&self, payment: &Payment) -> bool {
            self.user_id.map_or(true, |id| id == payment.user_id)
                && self
                    .reservation_id
                    .map_or(true, |id| id == payment.reservation_id)
                && self.status.map_or(true, |s| s == payment.status)
        }
    }
}
