//! [`Court`]-related definitions.

use std::future;

use common::{Date, DateTime, Handler as _, Money, TimeOfDay};
use derive_more::{AsRef, Display, From, Into};
use futures::TryFutureExt as _;
use juniper::{graphql_object, GraphQLEnum, GraphQLObject, GraphQLScalar};
use service::{domain, query};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{api, api::scalar, AsError, Context, Error};

/// A bookable court.
#[derive(Clone, Debug, From)]
pub struct Court {
    /// ID of this [`Court`].
    id: Id,

    /// Underlying [`domain::Court`].
    court: OnceCell<domain::Court>,
}

impl From<domain::Court> for Court {
    fn from(court: domain::Court) -> Self {
        Self {
            id: court.id.into(),
            court: OnceCell::new_with(Some(court)),
        }
    }
}

impl Court {
    /// Creates a new [`Court`] with the provided ID.
    ///
    /// # Safety
    ///
    /// Caller must ensure that [`Court`] with the provided ID exists,
    /// otherwise accessing this [`Court`] will result with an error.
    #[expect(unsafe_code, reason = "bypass")]
    #[must_use]
    pub unsafe fn new_unchecked(id: impl Into<Id>) -> Self {
        Self {
            id: id.into(),
            court: OnceCell::new(),
        }
    }

    /// Returns the underlying [`domain::Court`].
    ///
    /// # Errors
    ///
    /// Errors if the [`domain::Court`] doesn't exist.
    async fn court(&self, ctx: &Context) -> Result<&domain::Court, Error> {
        let id = self.id.into();
        self.court
            .get_or_try_init(|| {
                ctx.service()
                    .execute(query::court::ById::by(id))
                    .map_err(AsError::into_error)
                    .map_err(ctx.error())
                    .and_then(|c| {
                        future::ready(c.ok_or_else(|| {
                            api::query::CourtError::NotExists.into()
                        }))
                    })
            })
            .await
    }
}

/// A bookable court.
#[graphql_object(context = Context)]
impl Court {
    /// Unique identifier of this `Court`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Name of this `Court`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.name",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn name(&self, ctx: &Context) -> Result<Name, Error> {
        Ok(self.court(ctx).await?.name.clone().into())
    }

    /// Sport played on this `Court`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.sport",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn sport(&self, ctx: &Context) -> Result<Sport, Error> {
        Ok(self.court(ctx).await?.sport.into())
    }

    /// Maximum number of players on this `Court`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.capacity",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn capacity(&self, ctx: &Context) -> Result<i32, Error> {
        Ok(i16::from(self.court(ctx).await?.capacity).into())
    }

    /// Price of one hour on this `Court`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.hourlyRate",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn hourly_rate(&self, ctx: &Context) -> Result<Money, Error> {
        Ok(self.court(ctx).await?.hourly_rate.into())
    }

    /// Description of this `Court`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.description",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn description(
        &self,
        ctx: &Context,
    ) -> Result<Option<Description>, Error> {
        Ok(self.court(ctx).await?.description.clone().map(Into::into))
    }

    /// URL of this `Court` image.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.imageUrl",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn image_url(
        &self,
        ctx: &Context,
    ) -> Result<Option<ImageUrl>, Error> {
        Ok(self.court(ctx).await?.image_url.clone().map(Into::into))
    }

    /// Indicator whether this `Court` accepts new reservations.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.isActive",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn is_active(&self, ctx: &Context) -> Result<bool, Error> {
        Ok(self.court(ctx).await?.is_active)
    }

    /// UTC time this `Court` opens at every day.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.opensAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn opens_at(&self, ctx: &Context) -> Result<TimeOfDay, Error> {
        Ok(self.court(ctx).await?.opening_hours.opens_at())
    }

    /// UTC time this `Court` closes at every day.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.closesAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn closes_at(&self, ctx: &Context) -> Result<TimeOfDay, Error> {
        Ok(self.court(ctx).await?.opening_hours.closes_at())
    }

    /// Free one-hour `TimeSlot`s of this `Court` at the provided UTC `Date`.
    #[tracing::instrument(
        skip_all,
        fields(
            date = %date,
            gql.name = "Court.availableSlots",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn available_slots(
        &self,
        date: Date,
        ctx: &Context,
    ) -> Result<Vec<TimeSlot>, Error> {
        api::Query::available_slots(self.id, date, ctx).await
    }

    /// `DateTime` when this `Court` was created.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Court.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn created_at(&self, ctx: &Context) -> Result<DateTime, Error> {
        Ok(self.court(ctx).await?.created_at.coerce())
    }
}

/// Time interval of a `Court` booking.
#[derive(Clone, Copy, Debug, GraphQLObject)]
pub struct TimeSlot {
    /// `DateTime` this `TimeSlot` starts at.
    pub starts_at: DateTime,

    /// `DateTime` this `TimeSlot` ends at.
    pub ends_at: DateTime,
}

impl From<domain::reservation::Slot> for TimeSlot {
    fn from(slot: domain::reservation::Slot) -> Self {
        Self {
            starts_at: slot.starts_at().coerce(),
            ends_at: slot.ends_at().coerce(),
        }
    }
}

/// Unique identifier of a `Court`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::court::Id)]
#[into(domain::court::Id)]
#[graphql(name = "CourtId", transparent)]
pub struct Id(Uuid);

/// Name of a `Court`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "CourtName",
    with = scalar::Via::<domain::court::Name>,
)]
pub struct Name(domain::court::Name);

/// Description of a `Court`.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "CourtDescription",
    with = scalar::Via::<domain::court::Description>,
)]
pub struct Description(domain::court::Description);

/// URL of a `Court` image.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "CourtImageUrl",
    with = scalar::Via::<domain::court::ImageUrl>,
)]
pub struct ImageUrl(domain::court::ImageUrl);

/// Sport played on a `Court`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "CourtSport")]
pub enum Sport {
    /// Football.
    Football,

    /// Tennis.
    Tennis,

    /// Basketball.
    Basketball,

    /// Paddle tennis.
    Paddle,

    /// Volleyball.
    Volleyball,
}

impl From<domain::court::Sport> for Sport {
    fn from(sport: domain::court::Sport) -> Self {
        use domain::court::Sport as S;
        match sport {
            S::Football => Self::Football,
            S::Tennis => Self::Tennis,
            S::Basketball => Self::Basketball,
            S::Paddle => Self::Paddle,
            S::Volleyball => Self::Volleyball,
        }
    }
}

impl From<Sport> for domain::court::Sport {
    fn from(sport: Sport) -> Self {
        match sport {
            Sport::Football => Self::Football,
            Sport::Tennis => Self::Tennis,
            Sport::Basketball => Self::Basketball,
            Sport::Paddle => Self::Paddle,
            Sport::Volleyball => Self::Volleyball,
        }
    }
}
