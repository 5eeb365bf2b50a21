//! [`Court`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money, TimeOfDay};
use derive_more::{AsRef, Deref, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::reservation::Slot;

/// Sports court available for booking.
#[derive(Clone, Debug)]
pub struct Court {
    /// ID of this [`Court`].
    pub id: Id,

    /// [`Name`] of this [`Court`].
    pub name: Name,

    /// [`Sport`] played on this [`Court`].
    pub sport: Sport,

    /// Maximum number of players on this [`Court`].
    pub capacity: Capacity,

    /// Price of one hour on this [`Court`].
    pub hourly_rate: HourlyRate,

    /// [`Description`] of this [`Court`], if any.
    pub description: Option<Description>,

    /// [`ImageUrl`] of this [`Court`], if any.
    pub image_url: Option<ImageUrl>,

    /// Indicator whether this [`Court`] accepts new bookings.
    pub is_active: bool,

    /// [`OpeningHours`] of this [`Court`].
    pub opening_hours: OpeningHours,

    /// [`DateTime`] when this [`Court`] was created.
    pub created_at: CreationDateTime,
}

impl Court {
    /// Calculates the total price of booking this [`Court`] for the provided
    /// [`Slot`].
    #[must_use]
    pub fn price_of(&self, slot: &Slot) -> Money {
        self.hourly_rate.times(slot.hours())
    }
}

/// ID of a [`Court`].
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

/// Name of a [`Court`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && (2..=100).contains(&name.chars().count())
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

define_kind! {
    #[doc = "Sport played on a [`Court`]."]
    enum Sport {
        #[doc = "Football."]
        Football = 1,

        #[doc = "Tennis."]
        Tennis = 2,

        #[doc = "Basketball."]
        Basketball = 3,

        #[doc = "Paddle tennis."]
        Paddle = 4,

        #[doc = "Volleyball."]
        Volleyball = 5,
    }
}

/// Maximum number of players on a [`Court`].
#[derive(Clone, Copy, Debug, Display, Eq, Into, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Capacity(i16);

impl Capacity {
    /// Greatest allowed [`Capacity`].
    pub const MAX: i16 = 1000;

    /// Creates a new [`Capacity`] if the given `value` is in `1..=1000`.
    #[must_use]
    pub fn new(value: impl Into<i32>) -> Option<Self> {
        i16::try_from(value.into())
            .ok()
            .filter(|v| (1..=Self::MAX).contains(v))
            .map(Self)
    }
}

/// Price of one hour on a [`Court`].
#[derive(Clone, Copy, Debug, Deref, Display, Eq, PartialEq)]
pub struct HourlyRate(Money);

impl HourlyRate {
    /// Creates a new [`HourlyRate`] if the given `price` is non-negative and
    /// doesn't exceed `10000`.
    #[must_use]
    pub fn new(price: Money) -> Option<Self> {
        let max = Decimal::from(10_000);
        (price.amount >= Decimal::ZERO && price.amount <= max)
            .then_some(Self(price))
    }
}

impl From<HourlyRate> for Money {
    fn from(rate: HourlyRate) -> Self {
        rate.0
    }
}

/// Description of a [`Court`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Description(String);

impl Description {
    /// Creates a new [`Description`] if the given `text` is valid.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty() && text.chars().count() <= 2000)
            .then_some(Self(text))
    }
}

impl FromStr for Description {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Description`")
    }
}

/// URL of a [`Court`] image.
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct ImageUrl(String);

impl ImageUrl {
    /// Creates a new [`ImageUrl`] if the given `url` looks like an HTTP(S)
    /// one.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Option<Self> {
        let url = url.into();
        let valid = (url.starts_with("https://") || url.starts_with("http://"))
            && !url.chars().any(char::is_whitespace)
            && url.len() <= 255;
        valid.then_some(Self(url))
    }
}

impl FromStr for ImageUrl {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `ImageUrl`")
    }
}

/// Daily opening hours of a [`Court`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OpeningHours {
    /// [`TimeOfDay`] the [`Court`] opens at.
    opens_at: TimeOfDay,

    /// [`TimeOfDay`] the [`Court`] closes at.
    closes_at: TimeOfDay,
}

impl Default for OpeningHours {
    fn default() -> Self {
        Self {
            opens_at: TimeOfDay::from_hm(8, 0).unwrap_or(TimeOfDay::MIDNIGHT),
            closes_at: TimeOfDay::from_hm(22, 0)
                .unwrap_or(TimeOfDay::MIDNIGHT),
        }
    }
}

impl OpeningHours {
    /// Creates new [`OpeningHours`] if `opens_at` is strictly before
    /// `closes_at`.
    ///
    /// [`TimeOfDay::MIDNIGHT`] as `closes_at` means the end of the day.
    #[must_use]
    pub fn new(opens_at: TimeOfDay, closes_at: TimeOfDay) -> Option<Self> {
        let valid = opens_at < closes_at || closes_at == TimeOfDay::MIDNIGHT;
        valid.then_some(Self {
            opens_at,
            closes_at,
        })
    }

    /// Returns the [`TimeOfDay`] the [`Court`] opens at.
    #[must_use]
    pub fn opens_at(&self) -> TimeOfDay {
        self.opens_at
    }

    /// Returns the [`TimeOfDay`] the [`Court`] closes at.
    #[must_use]
    pub fn closes_at(&self) -> TimeOfDay {
        self.closes_at
    }

    /// Checks whether the provided [`Slot`] lies within these
    /// [`OpeningHours`] of a single day.
    #[must_use]
    pub fn contain(&self, slot: &Slot) -> bool {
        let (start, end) = (slot.starts_at(), slot.ends_at());
        let till_midnight = self.closes_at == TimeOfDay::MIDNIGHT;
        if start.time_of_day() < self.opens_at {
            return false;
        }
        if start.date() == end.date() {
            till_midnight || end.time_of_day() <= self.closes_at
        } else {
            till_midnight
                && end.time_of_day() == TimeOfDay::MIDNIGHT
                && start.date().next() == Some(end.date())
        }
    }
}

/// [`DateTime`] when a [`Court`] was created.
pub type CreationDateTime = DateTimeOf<(Court, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, Date, DateTime, Money, TimeOfDay};
    use rust_decimal::Decimal;

    use crate::domain::reservation::Slot;

    use super::{Capacity, HourlyRate, Name, OpeningHours};

    fn at(h: u8, m: u8) -> DateTime {
        DateTime::from_date_and_time(
            Date::from_ymd(2030, 5, 10).unwrap(),
            TimeOfDay::from_hm(h, m).unwrap(),
        )
    }

    fn hm(h: u8, m: u8) -> TimeOfDay {
        TimeOfDay::from_hm(h, m).unwrap()
    }

    #[test]
    fn opening_hours_require_opening_before_closing() {
        assert!(OpeningHours::new(hm(8, 0), hm(22, 0)).is_some());
        assert!(OpeningHours::new(hm(22, 0), hm(8, 0)).is_none());
        assert!(OpeningHours::new(hm(8, 0), hm(8, 0)).is_none());

        let default = OpeningHours::default();
        assert_eq!(default.opens_at(), hm(8, 0));
        assert_eq!(default.closes_at(), hm(22, 0));
    }

    #[test]
    fn opening_hours_contain_slots_inside_bounds_only() {
        let hours = OpeningHours::new(hm(8, 0), hm(22, 0)).unwrap();

        let inside = Slot::new(at(8, 0).coerce(), at(9, 0).coerce()).unwrap();
        let closing = Slot::new(at(21, 0).coerce(), at(22, 0).coerce()).unwrap();
        let early = Slot::new(at(7, 30).coerce(), at(8, 30).coerce()).unwrap();
        let late = Slot::new(at(21, 30).coerce(), at(22, 30).coerce()).unwrap();

        assert!(hours.contain(&inside));
        assert!(hours.contain(&closing));
        assert!(!hours.contain(&early));
        assert!(!hours.contain(&late));
    }

    #[test]
    fn opening_hours_may_last_till_midnight() {
        let hours = OpeningHours::new(hm(18, 0), TimeOfDay::MIDNIGHT).unwrap();
        let next_day = |h, m| {
            DateTime::from_date_and_time(
                Date::from_ymd(2030, 5, 11).unwrap(),
                hm(h, m),
            )
        };

        let last = Slot::new(at(22, 0).coerce(), next_day(0, 0).coerce())
            .unwrap();
        let evening = Slot::new(at(20, 0).coerce(), at(21, 30).coerce())
            .unwrap();
        let overnight = Slot::new(at(23, 0).coerce(), next_day(1, 0).coerce())
            .unwrap();

        assert!(hours.contain(&last));
        assert!(hours.contain(&evening));
        assert!(!hours.contain(&overnight));
        assert!(OpeningHours::new(TimeOfDay::MIDNIGHT, TimeOfDay::MIDNIGHT)
            .is_some());
    }

    #[test]
    fn validates_plain_fields() {
        assert!(Name::new("Centre Court").is_some());
        assert!(Name::new("A").is_none());
        assert!(Name::new(" padded ").is_none());

        assert!(Capacity::new(1).is_some());
        assert!(Capacity::new(1000).is_some());
        assert!(Capacity::new(0).is_none());
        assert!(Capacity::new(1001).is_none());

        let money = |a: i64| Money {
            amount: Decimal::from(a),
            currency: Currency::Eur,
        };
        assert!(HourlyRate::new(money(0)).is_some());
        assert!(HourlyRate::new(money(10_000)).is_some());
        assert!(HourlyRate::new(money(-1)).is_none());
        assert!(HourlyRate::new(money(10_001)).is_none());
    }
}
