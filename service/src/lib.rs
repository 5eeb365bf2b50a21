//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod notification;
pub mod query;
pub mod read;
pub mod task;

use std::{error::Error, time::Duration};

use common::operations::{By, Start};
use derive_more::Debug;
use smart_default::SmartDefault;

#[cfg(doc)]
use infra::{Database, Gateway, Mailer};

pub use self::{
    command::Command, notification::Notifier, query::Query, task::Task,
};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] encoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,

    /// [JWT] decoding key.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// Booking rules.
    pub booking: BookingConfig,

    /// [`task::CompletePastReservations`] configuration.
    pub complete_past_reservations: task::complete_past_reservations::Config,
}

/// Booking rules of a [`Service`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct BookingConfig {
    /// How far ahead of now a [`domain::Reservation`] may start.
    #[default(Duration::from_secs(30 * 24 * 60 * 60))]
    pub horizon: Duration,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db, Gw = infra::gateway::Simulated> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,

    /// Payment [`Gateway`] of this [`Service`].
    gateway: Gw,

    /// [`Notifier`] of this [`Service`].
    notifier: Notifier,
}

impl<Db, Gw> Service<Db, Gw> {
    /// Creates a new [`Service`] with the provided parameters, along with the
    /// [`task::Background`] running its [`Task`]s.
    ///
    /// [`Notification`]s of the [`Service`] are delivered via the provided
    /// [`Mailer`].
    ///
    /// [`Notification`]: notification::Notification
    pub fn new<M>(
        config: Config,
        database: Db,
        gateway: Gw,
        mailer: M,
    ) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::CompletePastReservations<Self>,
                        task::complete_past_reservations::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Task<
                Start<
                    By<
                        task::DeliverNotifications<Self, M>,
                        task::deliver_notifications::Setup<M>,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
        M: 'static,
    {
        let (notifier, queue) = notification::channel();
        let this = Self::from_parts(config, database, gateway, notifier);

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(svc.config().complete_past_reservations)))
                .await
        });
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(task::deliver_notifications::Setup {
                queue,
                mailer,
            })))
            .await
        });

        (this, bg)
    }

    /// Assembles a [`Service`] from the provided parts, without running any
    /// [`Task`]s.
    #[must_use]
    pub fn from_parts(
        config: Config,
        database: Db,
        gateway: Gw,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            database,
            gateway,
            notifier,
        }
    }

    /// Returns [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Returns payment [`Gateway`] of this [`Service`].
    #[must_use]
    pub fn gateway(&self) -> &Gw {
        &self.gateway
    }

    /// Returns [`Notifier`] of this [`Service`].
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

#[cfg(test)]
mod test_util {
    //! Fixtures shared by the tests of this crate.

    use std::{sync::LazyLock, time::Duration};

    use common::{
        money::Currency, operations::Insert, Date, DateTime, Money, TimeOfDay,
    };
    use rust_decimal::Decimal;

    use crate::{
        domain::{court, user, Court, User},
        infra::{gateway::Fixed, Database as _, Memory},
        notification::{self, Queue},
        BookingConfig, Config, Service,
    };

    /// [`Service`] over an in-memory database used in tests.
    pub(crate) type TestService = Service<Memory, Fixed>;

    /// Creates a new [`TestService`] with the provided [`Fixed`] gateway
    /// outcome, along with its notification [`Queue`].
    pub(crate) fn service(gateway: Fixed) -> (TestService, Queue) {
        let secret = b"test-secret";
        let (notifier, queue) = notification::channel();
        let config = Config {
            jwt_encoding_key: jsonwebtoken::EncodingKey::from_secret(secret),
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(secret),
            booking: BookingConfig::default(),
            complete_past_reservations:
                crate::task::complete_past_reservations::Config {
                    interval: Duration::from_secs(60),
                },
        };
        let svc =
            Service::from_parts(config, Memory::new(), gateway, notifier);
        (svc, queue)
    }

    /// Returns US dollars of the provided amount.
    pub(crate) fn usd(amount: impl Into<Decimal>) -> Money {
        Money {
            amount: amount.into(),
            currency: Currency::Usd,
        }
    }

    /// Returns the [`DateTime`] of tomorrow at the provided UTC time.
    pub(crate) fn tomorrow_at(hour: u8, minute: u8) -> DateTime {
        let tomorrow = (DateTime::now() + Duration::from_secs(24 * 60 * 60))
            .date();
        at(tomorrow, hour, minute)
    }

    /// Returns the [`DateTime`] of the provided [`Date`] at the provided UTC
    /// time.
    pub(crate) fn at(date: Date, hour: u8, minute: u8) -> DateTime {
        DateTime::from_date_and_time(
            date,
            TimeOfDay::from_hm(hour, minute).expect("valid time"),
        )
    }

    /// Stores a new active [`Court`] open 08:00-22:00 with the provided
    /// hourly rate.
    pub(crate) async fn court(svc: &TestService, hourly_rate: i64) -> Court {
        let court = Court {
            id: court::Id::new(),
            name: court::Name::new("Center court").expect("valid name"),
            sport: court::Sport::Tennis,
            capacity: court::Capacity::new(4).expect("valid capacity"),
            hourly_rate: court::HourlyRate::new(usd(hourly_rate))
                .expect("valid rate"),
            description: None,
            image_url: None,
            is_active: true,
            opening_hours: court::OpeningHours::default(),
            created_at: DateTime::now().coerce(),
        };
        svc.database()
            .execute(Insert(court.clone()))
            .await
            .expect("stored");
        court
    }

    /// Password of the [`User`]s created by [`user()`].
    pub(crate) const PASSWORD: &str = "Passw0rd!";

    /// Hash of the [`PASSWORD`], computed once.
    static PASSWORD_HASH: LazyLock<user::PasswordHash> = LazyLock::new(|| {
        user::PasswordHash::new(&user::Password::new_unchecked(PASSWORD))
            .expect("hashed")
    });

    /// Stores a new active [`User`] with the provided email and the
    /// [`PASSWORD`].
    pub(crate) async fn user(svc: &TestService, email: &str) -> User {
        let user = User {
            id: user::Id::new(),
            name: user::Name::new("Test user").expect("valid name"),
            email: user::Email::new(email).expect("valid email"),
            password_hash: PASSWORD_HASH.clone(),
            phone: None,
            is_admin: false,
            is_active: true,
            password_reset: None,
            created_at: DateTime::now().coerce(),
        };
        svc.database()
            .execute(Insert(user.clone()))
            .await
            .expect("stored");
        user
    }
}
