//! [`Reservation`] definitions.

use std::time::Duration;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Court, User};
use crate::domain::{court, user};

/// Booking of a [`Court`] by a [`User`] for a [`Slot`].
#[derive(Clone, Debug)]
pub struct Reservation {
    /// ID of this [`Reservation`].
    pub id: Id,

    /// ID of the [`User`] owning this [`Reservation`].
    pub user_id: user::Id,

    /// ID of the booked [`Court`].
    pub court_id: court::Id,

    /// Booked [`Slot`].
    pub slot: Slot,

    /// Total price of this [`Reservation`].
    pub total: Money,

    /// [`Status`] of this [`Reservation`].
    pub status: Status,

    /// [`Notes`] left by the [`User`], if any.
    pub notes: Option<Notes>,

    /// [`DateTime`] when this [`Reservation`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Reservation`] was last modified.
    pub updated_at: ModificationDateTime,
}

impl Reservation {
    /// Indicates whether this [`Reservation`] occupies its [`Slot`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Moves this [`Reservation`] into the [`Status::Confirmed`] one.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is not [`Status::Pending`].
    pub fn confirm(&mut self) -> Result<(), TransitionError> {
        self.transit(Status::confirm)
    }

    /// Moves this [`Reservation`] into the [`Status::Cancelled`] one.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is already [`Status::Completed`].
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.transit(Status::cancel)
    }

    /// Moves this [`Reservation`] into the [`Status::Completed`] one.
    ///
    /// # Errors
    ///
    /// If this [`Reservation`] is not [`Status::Confirmed`].
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        self.transit(Status::complete)
    }

    /// Applies the provided [`Status`] transition to this [`Reservation`].
    fn transit(
        &mut self,
        f: impl FnOnce(Status) -> Result<Status, TransitionError>,
    ) -> Result<(), TransitionError> {
        self.status = f(self.status)?;
        self.updated_at = ModificationDateTime::now();
        Ok(())
    }
}

/// ID of a [`Reservation`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Half-open `[starts_at, ends_at)` time interval of a [`Court`] usage.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Slot {
    /// [`DateTime`] this [`Slot`] starts at (inclusive).
    starts_at: StartDateTime,

    /// [`DateTime`] this [`Slot`] ends at (exclusive).
    ends_at: EndDateTime,
}

impl Slot {
    /// Shortest allowed booking.
    pub const MIN_DURATION: Duration = Duration::from_secs(60 * 60);

    /// Longest allowed booking.
    pub const MAX_DURATION: Duration = Duration::from_secs(4 * 60 * 60);

    /// Creates a new [`Slot`] if `starts_at` is strictly before `ends_at`.
    #[must_use]
    pub fn new(starts_at: StartDateTime, ends_at: EndDateTime) -> Option<Self> {
        (starts_at.coerce::<()>() < ends_at.coerce())
            .then_some(Self { starts_at, ends_at })
    }

    /// Returns the [`DateTime`] this [`Slot`] starts at.
    #[must_use]
    pub fn starts_at(&self) -> StartDateTime {
        self.starts_at
    }

    /// Returns the [`DateTime`] this [`Slot`] ends at.
    #[must_use]
    pub fn ends_at(&self) -> EndDateTime {
        self.ends_at
    }

    /// Returns the [`Duration`] of this [`Slot`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.ends_at
            .coerce::<()>()
            .duration_since(self.starts_at.coerce())
            .unwrap_or_default()
    }

    /// Returns the length of this [`Slot`] in hours.
    #[must_use]
    pub fn hours(&self) -> Decimal {
        Decimal::from(self.duration().as_secs()) / Decimal::from(3600)
    }

    /// Indicates whether this [`Slot`] lasts from [`Slot::MIN_DURATION`] to
    /// [`Slot::MAX_DURATION`] inclusively.
    #[must_use]
    pub fn has_allowed_duration(&self) -> bool {
        (Self::MIN_DURATION..=Self::MAX_DURATION).contains(&self.duration())
    }

    /// Indicates whether this [`Slot`] overlaps the `other` one.
    ///
    /// Slots touching each other don't overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.starts_at.coerce::<()>() < other.ends_at.coerce()
            && other.starts_at.coerce::<()>() < self.ends_at.coerce()
    }
}

define_kind! {
    #[doc = "Status of a [`Reservation`]."]
    enum Status {
        #[doc = "Awaiting a payment."]
        Pending = 1,

        #[doc = "Paid and guaranteed."]
        Confirmed = 2,

        #[doc = "Cancelled by its owner or an administrator."]
        Cancelled = 3,

        #[doc = "Took place already."]
        Completed = 4,
    }
}

impl Status {
    /// [`Status`]es occupying a [`Slot`] of a [`Court`].
    pub const ACTIVE: [Self; 2] = [Self::Pending, Self::Confirmed];

    /// Indicates whether this [`Status`] occupies a [`Slot`] of a [`Court`].
    #[must_use]
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    /// Transits this [`Status`] into the [`Status::Confirmed`] one.
    ///
    /// # Errors
    ///
    /// If this [`Status`] is not [`Status::Pending`].
    pub fn confirm(self) -> Result<Self, TransitionError> {
        match self {
            Self::Pending => Ok(Self::Confirmed),
            Self::Confirmed | Self::Cancelled | Self::Completed => {
                Err(TransitionError::new(self, Self::Confirmed))
            }
        }
    }

    /// Transits this [`Status`] into the [`Status::Cancelled`] one.
    ///
    /// # Errors
    ///
    /// If this [`Status`] is [`Status::Completed`].
    pub fn cancel(self) -> Result<Self, TransitionError> {
        match self {
            Self::Pending | Self::Confirmed | Self::Cancelled => {
                Ok(Self::Cancelled)
            }
            Self::Completed => Err(TransitionError::new(self, Self::Cancelled)),
        }
    }

    /// Transits this [`Status`] into the [`Status::Completed`] one.
    ///
    /// # Errors
    ///
    /// If this [`Status`] is not [`Status::Confirmed`].
    pub fn complete(self) -> Result<Self, TransitionError> {
        match self {
            Self::Confirmed => Ok(Self::Completed),
            Self::Pending | Self::Cancelled | Self::Completed => {
                Err(TransitionError::new(self, Self::Completed))
            }
        }
    }
}

/// Error of a prohibited [`Status`] transition.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("`Reservation` cannot transit from `{from}` to `{to}`")]
pub struct TransitionError {
    /// [`Status`] the transition was attempted from.
    #[error(not(source))]
    pub from: Status,

    /// [`Status`] the transition was attempted to.
    #[error(not(source))]
    pub to: Status,
}

impl TransitionError {
    /// Creates a new [`TransitionError`].
    const fn new(from: Status, to: Status) -> Self {
        Self { from, to }
    }
}

/// Notes left on a [`Reservation`] by its owner.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Notes(String);

impl Notes {
    /// Maximum number of characters in [`Notes`].
    pub const MAX_LEN: usize = 500;

    /// Creates new [`Notes`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        Self::check(&text).then_some(Self(text))
    }

    /// Checks whether the given `text` represents valid [`Notes`].
    fn check(text: impl AsRef<str>) -> bool {
        let text = text.as_ref();
        !text.trim().is_empty() && text.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for Notes {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Notes`")
    }
}

/// Marker type describing a [`Slot`] start.
#[derive(Clone, Copy, Debug)]
pub struct Start;

/// Marker type describing a [`Slot`] end.
#[derive(Clone, Copy, Debug)]
pub struct End;

/// [`DateTime`] when a [`Slot`] starts.
pub type StartDateTime = DateTimeOf<(Slot, Start)>;

/// [`DateTime`] when a [`Slot`] ends.
pub type EndDateTime = DateTimeOf<(Slot, End)>;

/// [`DateTime`] when a [`Reservation`] was created.
pub type CreationDateTime = DateTimeOf<(Reservation, unit::Creation)>;

/// [`DateTime`] when a [`Reservation`] was last modified.
pub type ModificationDateTime = DateTimeOf<(Reservation, unit::Modification)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{money::Currency, Date, DateTime, Money, TimeOfDay};
    use rust_decimal::Decimal;

    use super::{Notes, Slot, Status};

    fn at(h: u8, m: u8) -> DateTime {
        DateTime::from_date_and_time(
            Date::from_ymd(2030, 5, 10).unwrap(),
            TimeOfDay::from_hm(h, m).unwrap(),
        )
    }

    fn slot(from: (u8, u8), to: (u8, u8)) -> Slot {
        Slot::new(at(from.0, from.1).coerce(), at(to.0, to.1).coerce())
            .unwrap()
    }

    #[test]
    fn requires_start_before_end() {
        assert!(Slot::new(at(10, 0).coerce(), at(10, 0).coerce()).is_none());
        assert!(Slot::new(at(11, 0).coerce(), at(10, 0).coerce()).is_none());
    }

    #[test]
    fn detects_every_kind_of_overlap() {
        let existing = slot((10, 0), (12, 0));

        // Starts inside.
        assert!(slot((11, 0), (13, 0)).overlaps(&existing));
        // Ends inside.
        assert!(slot((9, 0), (10, 30)).overlaps(&existing));
        // Contains.
        assert!(slot((9, 0), (13, 0)).overlaps(&existing));
        // Contained.
        assert!(slot((10, 30), (11, 0)).overlaps(&existing));
        // Identical.
        assert!(existing.overlaps(&existing));

        // Disjoint.
        assert!(!slot((13, 0), (14, 0)).overlaps(&existing));
        // Touching at both ends.
        assert!(!slot((12, 0), (13, 0)).overlaps(&existing));
        assert!(!slot((9, 0), (10, 0)).overlaps(&existing));
    }

    #[test]
    fn checks_duration_bounds_inclusively() {
        assert!(slot((10, 0), (11, 0)).has_allowed_duration());
        assert!(slot((10, 0), (14, 0)).has_allowed_duration());
        assert!(!slot((10, 0), (10, 59)).has_allowed_duration());
        assert!(!slot((10, 0), (14, 1)).has_allowed_duration());

        assert_eq!(
            slot((10, 0), (11, 30)).duration(),
            Duration::from_secs(90 * 60),
        );
    }

    #[test]
    fn prices_fractional_hours() {
        let rate = Money {
            amount: Decimal::from(50),
            currency: Currency::Usd,
        };

        let total = rate.times(slot((10, 0), (11, 30)).hours());
        assert_eq!(total.amount, Decimal::from(75));

        let rate = Money {
            amount: Decimal::new(3333, 2),
            currency: Currency::Usd,
        };
        let total = rate.times(slot((10, 0), (11, 10)).hours());
        assert_eq!(total.amount, Decimal::new(3889, 2));
    }

    #[test]
    fn allows_only_documented_transitions() {
        use Status as S;

        assert_eq!(S::Pending.confirm(), Ok(S::Confirmed));
        assert!(S::Confirmed.confirm().is_err());
        assert!(S::Cancelled.confirm().is_err());
        assert!(S::Completed.confirm().is_err());

        assert_eq!(S::Pending.cancel(), Ok(S::Cancelled));
        assert_eq!(S::Confirmed.cancel(), Ok(S::Cancelled));
        assert_eq!(S::Cancelled.cancel(), Ok(S::Cancelled));
        assert!(S::Completed.cancel().is_err());

        assert_eq!(S::Confirmed.complete(), Ok(S::Completed));
        assert!(S::Pending.complete().is_err());
        assert!(S::Cancelled.complete().is_err());

        assert!(S::Pending.is_active());
        assert!(S::Confirmed.is_active());
        assert!(!S::Cancelled.is_active());
        assert!(!S::Completed.is_active());
    }

    #[test]
    fn limits_notes_length() {
        assert!(Notes::new("Bring the net").is_some());
        assert!(Notes::new("   ").is_none());
        assert!(Notes::new("x".repeat(500)).is_some());
        assert!(Notes::new("x".repeat(501)).is_none());
    }
}
