//! [`Reservation`]-related definitions.

use common::{DateTime, Money};
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{domain, query, read, Query as _};
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A booking of a `Court` time slot.
///
/// Only its owner or an administrator may obtain it.
#[derive(Clone, Debug, From, Into)]
pub struct Reservation(domain::Reservation);

/// A booking of a `Court` time slot.
#[graphql_object(context = Context)]
impl Reservation {
    /// Unique identifier of this `Reservation`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `User` who made this `Reservation`.
    #[must_use]
    pub fn user(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Reservation` loaded from repository guarantees `User` \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.user_id)
        }
    }

    /// Booked `Court`.
    #[must_use]
    pub fn court(&self) -> api::Court {
        #[expect(
            unsafe_code,
            reason = "`Reservation` loaded from repository guarantees `Court` \
                      existence"
        )]
        unsafe {
            api::Court::new_unchecked(self.0.court_id)
        }
    }

    /// `DateTime` this `Reservation` starts at.
    #[must_use]
    pub fn starts_at(&self) -> DateTime {
        self.0.slot.starts_at().coerce()
    }

    /// `DateTime` this `Reservation` ends at.
    #[must_use]
    pub fn ends_at(&self) -> DateTime {
        self.0.slot.ends_at().coerce()
    }

    /// Price of this `Reservation`, fixed at the moment of booking.
    #[must_use]
    pub fn total(&self) -> Money {
        self.0.total
    }

    /// Current status of this `Reservation`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Notes left by the `User` on booking.
    #[must_use]
    pub fn notes(&self) -> Option<Notes> {
        self.0.notes.clone().map(Into::into)
    }

    /// `Payment`s made for this `Reservation`, newest first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Reservation.payments",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn payments(
        &self,
        ctx: &Context,
    ) -> Result<Vec<api::Payment>, Error> {
        ctx.service()
            .execute(query::payments::List::by(
                read::payment::list::Selector::of_reservation(self.0.id),
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ps| ps.into_iter().map(Into::into).collect())
    }

    /// `DateTime` when this `Reservation` was made.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Reservation` was modified last time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime {
        self.0.updated_at.coerce()
    }
}

/// Unique identifier of a `Reservation`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::reservation::Id)]
#[into(domain::reservation::Id)]
#[graphql(name = "ReservationId", transparent)]
pub struct Id(Uuid);

/// Notes of a `Reservation`, up to 500 characters.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "ReservationNotes",
    with = scalar::Via::<domain::reservation::Notes>,
)]
pub struct Notes(domain::reservation::Notes);

/// Status of a `Reservation`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "ReservationStatus")]
pub enum Status {
    /// Awaiting payment.
    Pending,

    /// Paid or confirmed by an administrator.
    Confirmed,

    /// Cancelled by its owner or an administrator.
    Cancelled,

    /// Already took place.
    Completed,
}

impl From<domain::reservation::Status> for Status {
    fn from(status: domain::reservation::Status) -> Self {
        use domain::reservation::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Confirmed => Self::Confirmed,
            S::Cancelled => Self::Cancelled,
            S::Completed => Self::Completed,
        }
    }
}

impl From<Status> for domain::reservation::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::Confirmed => Self::Confirmed,
            Status::Cancelled => Self::Cancelled,
            Status::Completed => Self::Completed,
        }
    }
}
