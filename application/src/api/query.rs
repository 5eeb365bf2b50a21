//! GraphQL [`Query`]s definitions.

use common::{Date, DateTime};
use juniper::graphql_object;
use service::{query, read, Query as _};

use crate::{api, define_error, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";

    /// Default maximum number of `Reservation`s in short lists.
    const DEFAULT_LIMIT: i32 = 5;
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently authenticated `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myUser",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_user(ctx: &Context) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;
        ctx.service()
            .execute(query::user::ById::by(my_id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| UserError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Returns the `Court` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `COURT_NOT_EXISTS` - the `Court` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "court",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn court(
        id: api::court::Id,
        ctx: &Context,
    ) -> Result<api::Court, Error> {
        ctx.service()
            .execute(query::court::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| CourtError::NotExists.into())
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Lists `Court`s ordered by their names.
    ///
    /// Deactivated `Court`s are listed only if `includeInactive` is `true`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "courts",
            include_inactive = ?include_inactive,
            otel.name = Self::SPAN_NAME,
            sport = ?sport,
        ),
    )]
    pub async fn courts(
        sport: Option<api::court::Sport>,
        include_inactive: Option<bool>,
        ctx: &Context,
    ) -> Result<Vec<api::Court>, Error> {
        ctx.service()
            .execute(query::courts::List::by(read::court::list::Filter {
                only_active: !include_inactive.unwrap_or(false),
                sport: sport.map(Into::into),
            }))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|cs| cs.into_iter().map(Into::into).collect())
    }

    /// Lists not cancelled `Reservation`s of the `Court` at the provided UTC
    /// `Date`, ordered by their start.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an administrator;
    /// - `COURT_NOT_EXISTS` - the `Court` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            court_id = %court_id,
            date = %date,
            gql.name = "courtSchedule",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn court_schedule(
        court_id: api::court::Id,
        date: Date,
        ctx: &Context,
    ) -> Result<Vec<api::Reservation>, Error> {
        _ = ctx.admin_session().await?;

        ctx.service()
            .execute(query::CourtSchedule {
                court_id: court_id.into(),
                date,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|rs| rs.into_iter().map(Into::into).collect())
    }

    /// Lists free one-hour `TimeSlot`s of the `Court` at the provided UTC
    /// `Date`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `COURT_NOT_EXISTS` - the `Court` with the specified ID does not
    ///                        exist.
    #[tracing::instrument(
        skip_all,
        fields(
            court_id = %court_id,
            date = %date,
            gql.name = "availableSlots",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn available_slots(
        court_id: api::court::Id,
        date: Date,
        ctx: &Context,
    ) -> Result<Vec<api::court::TimeSlot>, Error> {
        ctx.service()
            .execute(query::AvailableSlots {
                court_id: court_id.into(),
                date,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ss| ss.into_iter().map(Into::into).collect())
    }

    /// Checks whether the `Court` has no active `Reservation`s overlapping
    /// the provided interval.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_SLOT` - `startsAt` is not before `endsAt`.
    #[tracing::instrument(
        skip_all,
        fields(
            court_id = %court_id,
            ends_at = %ends_at.to_rfc3339(),
            gql.name = "checkAvailability",
            otel.name = Self::SPAN_NAME,
            starts_at = %starts_at.to_rfc3339(),
        ),
    )]
    pub async fn check_availability(
        court_id: api::court::Id,
        starts_at: DateTime,
        ends_at: DateTime,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(query::CheckAvailability {
                court_id: court_id.into(),
                starts_at,
                ends_at,
                exclude: None,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
    }

    /// Returns the `Reservation` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_EXISTS` - the `Reservation` with the specified ID
    ///                              does not exist;
    /// - `NOT_OWNER` - the current `User` neither owns the `Reservation` nor
    ///                 is an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "reservation",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reservation(
        id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let me = ctx.current_user().await?;

        let reservation = ctx
            .service()
            .execute(query::reservation::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| ReservationError::NotExists.into())
            .map_err(ctx.error())?;
        if reservation.user_id != me.id && !me.is_admin {
            return Err(api::PrivilegeError::Owner.into()).map_err(ctx.error());
        }

        Ok(reservation.into())
    }

    /// Lists `Reservation`s of the current `User`, latest start first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "myReservations",
            include_cancelled = ?include_cancelled,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn my_reservations(
        include_cancelled: Option<bool>,
        ctx: &Context,
    ) -> Result<Vec<api::Reservation>, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(query::reservations::ByUser {
                user_id: my_id.into(),
                include_cancelled: include_cancelled.unwrap_or(false),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|rs| rs.into_iter().map(Into::into).collect())
    }

    /// Lists confirmed `Reservation`s of the current `User` yet to start,
    /// earliest first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "upcomingReservations",
            limit = ?limit,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn upcoming_reservations(
        limit: Option<i32>,
        ctx: &Context,
    ) -> Result<Vec<api::Reservation>, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(query::reservations::Upcoming {
                user_id: my_id.into(),
                limit: Self::limit(limit, ctx)?,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|rs| rs.into_iter().map(Into::into).collect())
    }

    /// Lists confirmed or completed `Reservation`s of the current `User`
    /// which have already ended, latest first.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "recentReservations",
            limit = ?limit,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn recent_reservations(
        limit: Option<i32>,
        ctx: &Context,
    ) -> Result<Vec<api::Reservation>, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(query::reservations::Recent {
                user_id: my_id.into(),
                limit: Self::limit(limit, ctx)?,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|rs| rs.into_iter().map(Into::into).collect())
    }

    /// Lists `Reservation`s of all `User`s, earliest start first.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an administrator.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "reservations",
            otel.name = Self::SPAN_NAME,
            statuses = ?statuses,
            user_id = ?user_id,
        ),
    )]
    pub async fn reservations(
        user_id: Option<api::user::Id>,
        statuses: Option<Vec<api::reservation::Status>>,
        ctx: &Context,
    ) -> Result<Vec<api::Reservation>, Error> {
        _ = ctx.admin_session().await?;

        ctx.service()
            .execute(query::reservations::List::by(
                read::reservation::list::Selector {
                    user_id: user_id.map(Into::into),
                    statuses: statuses
                        .unwrap_or_default()
                        .into_iter()
                        .map(Into::into)
                        .collect(),
                    ..read::reservation::list::Selector::default()
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|rs| rs.into_iter().map(Into::into).collect())
    }

    /// Lists `Payment`s, newest first.
    ///
    /// Non-administrators see only their own `Payment`s.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "payments",
            otel.name = Self::SPAN_NAME,
            reservation_id = ?reservation_id,
            status = ?status,
            user_id = ?user_id,
        ),
    )]
    pub async fn payments(
        user_id: Option<api::user::Id>,
        reservation_id: Option<api::reservation::Id>,
        status: Option<api::payment::Status>,
        ctx: &Context,
    ) -> Result<Vec<api::Payment>, Error> {
        let me = ctx.current_user().await?;
        let user_id = if me.is_admin {
            user_id.map(Into::into)
        } else {
            Some(me.id)
        };

        ctx.service()
            .execute(query::payments::List::by(
                read::payment::list::Selector {
                    user_id,
                    reservation_id: reservation_id.map(Into::into),
                    status: status.map(Into::into),
                },
            ))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|ps| ps.into_iter().map(Into::into).collect())
    }
}

impl Query {
    /// Converts the provided GraphQL list `limit` into a [`usize`].
    ///
    /// # Errors
    ///
    /// Errors if the `limit` is negative.
    fn limit(limit: Option<i32>, ctx: &Context) -> Result<usize, Error> {
        usize::try_from(limit.unwrap_or(Self::DEFAULT_LIMIT))
            .map_err(|_| LimitError::Negative.into())
            .map_err(ctx.error())
    }
}

impl AsError for query::availability::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::CourtNotExists(_) => CourtError::NotExists.into(),
            Self::InvalidSlot => SlotError::Invalid.into(),
        })
    }
}

impl AsError for query::schedule::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CourtNotExists(_) => Some(CourtError::NotExists.into()),
        }
    }
}

define_error! {
    enum CourtError {
        #[code = "COURT_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Court` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum LimitError {
        #[code = "NEGATIVE_LIMIT"]
        #[status = BAD_REQUEST]
        #[message = "`limit` must not be negative"]
        Negative,
    }
}

define_error! {
    enum ReservationError {
        #[code = "RESERVATION_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Reservation` with the specified ID does not exist"]
        NotExists,
    }
}

define_error! {
    enum SlotError {
        #[code = "INVALID_SLOT"]
        #[status = BAD_REQUEST]
        #[message = "`startsAt` must be before `endsAt`"]
        Invalid,
    }
}

define_error! {
    enum UserError {
        #[code = "USER_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`User` with the specified ID does not exist"]
        NotExists,
    }
}
