//! Calendar [`Date`] and [`TimeOfDay`] definitions.

use std::{fmt, str::FromStr, time::Duration};

#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use time::macros::format_description;

/// Calendar date without a time zone.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Date(time::Date);

impl Date {
    /// Returns the current [`Date`] in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self(time::OffsetDateTime::now_utc().date())
    }

    /// Creates a new [`Date`] from the provided calendar components.
    ///
    /// [`None`] is returned if the components don't form a valid date.
    #[must_use]
    pub fn from_ymd(year: i32, month: u8, day: u8) -> Option<Self> {
        let month = time::Month::try_from(month).ok()?;
        time::Date::from_calendar_date(year, month, day).ok().map(Self)
    }

    /// Returns the [`Date`] following this one.
    ///
    /// [`None`] is returned on calendar overflow.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        self.0.next_day().map(Self)
    }

    /// Returns the first [`Date`] of the month this [`Date`] belongs to.
    #[must_use]
    pub fn month_start(self) -> Self {
        Self(self.0.replace_day(1).unwrap_or(self.0))
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day(),
        )
    }
}

impl FromStr for Date {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time::Date::parse(s, format_description!("[year]-[month]-[day]"))
            .map(Self)
            .map_err(|_| "invalid `Date`, expected `YYYY-MM-DD`")
    }
}

impl From<time::Date> for Date {
    fn from(date: time::Date) -> Self {
        Self(date)
    }
}

impl From<Date> for time::Date {
    fn from(date: Date) -> Self {
        date.0
    }
}

/// Time of a day with a second precision.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct TimeOfDay(time::Time);

impl TimeOfDay {
    /// Beginning of a day.
    pub const MIDNIGHT: Self = Self(time::Time::MIDNIGHT);

    /// Creates a new [`TimeOfDay`] from the provided hour and minute.
    ///
    /// [`None`] is returned if the components are out of range.
    #[must_use]
    pub fn from_hm(hour: u8, minute: u8) -> Option<Self> {
        time::Time::from_hms(hour, minute, 0).ok().map(Self)
    }

    /// Returns the hour of this [`TimeOfDay`].
    #[must_use]
    pub fn hour(self) -> u8 {
        self.0.hour()
    }

    /// Returns the minute of this [`TimeOfDay`].
    #[must_use]
    pub fn minute(self) -> u8 {
        self.0.minute()
    }

    /// Returns the [`Duration`] elapsed since [`TimeOfDay::MIDNIGHT`].
    #[must_use]
    pub fn since_midnight(self) -> Duration {
        let (h, m, s) = self.0.as_hms();
        Duration::from_secs(
            u64::from(h) * 3600 + u64::from(m) * 60 + u64::from(s),
        )
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = self.0.as_hms();
        if s == 0 {
            write!(f, "{h:02}:{m:02}")
        } else {
            write!(f, "{h:02}:{m:02}:{s:02}")
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        time::Time::parse(s, format_description!("[hour]:[minute]"))
            .or_else(|_| {
                time::Time::parse(
                    s,
                    format_description!("[hour]:[minute]:[second]"),
                )
            })
            .map(Self)
            .map_err(|_| "invalid `TimeOfDay`, expected `HH:MM`")
    }
}

impl From<time::Time> for TimeOfDay {
    fn from(time: time::Time) -> Self {
        Self(time.replace_nanosecond(0).unwrap_or(time))
    }
}

impl From<TimeOfDay> for time::Time {
    fn from(time: TimeOfDay) -> Self {
        time.0
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use std::str::FromStr as _;

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Calendar date in `YYYY-MM-DD` format.
    #[graphql_scalar(with = Self, parse_token(String))]
    type Date = super::Date;

    impl Date {
        fn to_output<S: ScalarValue>(d: &Date) -> Value<S> {
            Value::scalar(d.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `Date` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `Date` input scalar: {e}")
                    })
                })
        }
    }

    /// Time of a day in `HH:MM` format.
    #[graphql_scalar(with = Self, parse_token(String))]
    type TimeOfDay = super::TimeOfDay;

    impl TimeOfDay {
        fn to_output<S: ScalarValue>(t: &TimeOfDay) -> Value<S> {
            Value::scalar(t.to_string())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `TimeOfDay` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::from_str(s).map_err(|e| {
                        format!("Cannot parse `TimeOfDay` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use std::{str::FromStr as _, time::Duration};

    use super::{Date, TimeOfDay};

    #[test]
    fn parses_and_prints_date() {
        let date = Date::from_str("2024-03-09").unwrap();
        assert_eq!(date, Date::from_ymd(2024, 3, 9).unwrap());
        assert_eq!(date.to_string(), "2024-03-09");
        assert_eq!(date.next().unwrap().to_string(), "2024-03-10");

        assert!(Date::from_str("2024-13-01").is_err());
        assert!(Date::from_str("09.03.2024").is_err());
        assert!(Date::from_ymd(2023, 2, 29).is_none());
    }

    #[test]
    fn finds_month_start() {
        let date = Date::from_ymd(2024, 2, 29).unwrap();
        assert_eq!(date.month_start(), Date::from_ymd(2024, 2, 1).unwrap());
        assert_eq!(date.month_start().month_start(), date.month_start());
    }

    #[test]
    fn parses_and_prints_time_of_day() {
        let time = TimeOfDay::from_str("08:30").unwrap();
        assert_eq!(time, TimeOfDay::from_hm(8, 30).unwrap());
        assert_eq!(time.to_string(), "08:30");
        assert_eq!(TimeOfDay::from_str("22:00:00").unwrap().to_string(), "22:00");
        assert_eq!(TimeOfDay::from_str("07:05:30").unwrap().to_string(), "07:05:30");

        assert!(TimeOfDay::from_str("24:00").is_err());
        assert!(TimeOfDay::from_str("8h").is_err());
        assert!(TimeOfDay::from_hm(12, 60).is_none());
    }

    #[test]
    fn measures_time_since_midnight() {
        assert_eq!(TimeOfDay::MIDNIGHT.since_midnight(), Duration::ZERO);
        assert_eq!(
            TimeOfDay::from_hm(10, 30).unwrap().since_midnight(),
            Duration::from_secs(10 * 3600 + 30 * 60),
        );
    }
}
