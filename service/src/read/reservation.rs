//! [`Reservation`] read model definition.

use common::Date;

use crate::domain::{
    court,
    reservation::{self, Slot},
    Reservation,
};
#[cfg(doc)]
use crate::domain::Court;

/// Selector of active [`Reservation`]s overlapping a [`Slot`] of a [`Court`],
/// ordered by their start.
#[derive(Clone, Copy, Debug)]
pub struct Overlapping {
    /// ID of the [`Court`] to check.
    pub court_id: court::Id,

    /// [`Slot`] to check.
    pub slot: Slot,

    /// ID of the [`Reservation`] to ignore, if any.
    pub exclude: Option<reservation::Id>,
}

impl Overlapping {
    /// Checks whether the provided [`Reservation`] is selected by this
    /// [`Overlapping`] selector.
    #[must_use]
    pub fn matches(&self, r: &Reservation) -> bool {
        r.court_id == self.court_id
            && r.is_active()
            && self.exclude != Some(r.id)
            && r.slot.overlaps(&self.slot)
    }
}

/// Selector of not cancelled [`Reservation`]s of a [`Court`] starting at the
/// provided UTC [`Date`], ordered by their start.
#[derive(Clone, Copy, Debug)]
pub struct Schedule {
    /// ID of the [`Court`] to list the [`Reservation`]s of.
    pub court_id: court::Id,

    /// [`Date`] to list the [`Reservation`]s at.
    pub date: Date,
}

impl Schedule {
    /// Checks whether the provided [`Reservation`] is selected by this
    /// [`Schedule`].
    #[must_use]
    pub fn matches(&self, r: &Reservation) -> bool {
        r.court_id == self.court_id
            && r.status != reservation::Status::Cancelled
            && r.slot.starts_at().date() == self.date
    }
}

pub mod list {
    //! [`Reservation`]s list definitions.

    use std::cmp::Ordering;

    use common::DateTime;

    use crate::domain::{reservation, user, Reservation};
    #[cfg(doc)]
    use crate::domain::User;

    /// Selector of [`Reservation`]s.
    #[derive(Clone, Debug, Default)]
    pub struct Selector {
        /// ID of the [`User`] owning the [`Reservation`]s, if any.
        pub user_id: Option<user::Id>,

        /// [`reservation::Status`]es of the [`Reservation`]s.
        ///
        /// Empty means any.
        pub statuses: Vec<reservation::Status>,

        /// [`DateTime`] the [`Reservation`]s start strictly after, if any.
        pub starts_after: Option<DateTime>,

        /// [`DateTime`] the [`Reservation`]s end at or before, if any.
        pub ends_by: Option<DateTime>,

        /// [`Order`] of the [`Reservation`]s.
        pub order: Order,

        /// Maximum number of the [`Reservation`]s, if any.
        pub limit: Option<usize>,
    }

    impl Selector {
        /// Checks whether the provided [`Reservation`] is selected by this
        /// [`Selector`].
        #[must_use]
        pub fn matches(&self, r: &Reservation) -> bool {
            self.user_id.map_or(true, |id| id == r.user_id)
                && (self.statuses.is_empty()
                    || self.statuses.contains(&r.status))
                && self
                    .starts_after
                    .map_or(true, |at| r.slot.starts_at().coerce::<()>() > at)
                && self
                    .ends_by
                    .map_or(true, |at| r.slot.ends_at().coerce::<()>() <= at)
        }
    }

    /// Order of [`Reservation`]s in a list.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub enum Order {
        /// Earliest start first.
        #[default]
        StartAsc,

        /// Latest start first.
        StartDesc,
    }

    impl Order {
        /// Compares the provided [`Reservation`]s according to this [`Order`].
        #[must_use]
        pub fn compare(self, a: &Reservation, b: &Reservation) -> Ordering {
            let by_start = a
                .slot
                .starts_at()
                .cmp(&b.slot.starts_at())
                .then_with(|| a.created_at.cmp(&b.created_at));
            match self {
                Self::StartAsc => by_start,
                Self::StartDesc => by_start.reverse(),
            }
        }

        /// Returns SQL representation of this [`Order`].
        #[must_use]
        pub fn sql(self) -> &'static str {
            match self {
                Self::StartAsc => "ASC",
                Self::StartDesc => "DESC",
            }
        }
    }
}
