//! GraphQL [`Mutation`]s definitions.

use common::{DateTime, Money, TimeOfDay};
use juniper::{graphql_object, Nullable};
use secrecy::SecretBox;
use service::{command, domain, query, Command as _};

use crate::{api, define_error, AsError, Context, Error, Session};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Registers a new `User` and signs it in.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `EMAIL_OCCUPIED` - provided `UserEmail` is occupied by another
    ///                      `User`.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "createUser",
            name = %name,
            otel.name = Self::SPAN_NAME,
            phone = ?phone,
        ),
    )]
    pub async fn create_user(
        name: api::user::Name,
        email: api::user::Email,
        password: api::user::Password,
        phone: Option<api::user::Phone>,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let email: domain::user::Email = email.into();
        let user = ctx
            .service()
            .execute(command::CreateUser {
                name: name.into(),
                is_admin: ctx.is_admin_email(&email),
                email,
                password: SecretBox::init_with(move || password.into()),
                phone: phone.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;
        let output = ctx
            .service()
            .execute(command::CreateUserSession::ByUserId(user.id))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
        })
        .await;

        Ok(output.into())
    }

    /// Creates a new `UserSession` with the provided credentials.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `WRONG_CREDENTIALS` - provided credentials does not match any `User`;
    /// - `USER_DEACTIVATED` - the `User` is deactivated.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "createUserSession",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_user_session(
        email: api::user::Email,
        password: String,
        ctx: &Context,
    ) -> Result<api::user::session::CreateResult, Error> {
        let output = ctx
            .service()
            .execute(command::CreateUserSession::ByCredentials {
                email: email.into(),
                password: SecretBox::init_with(move || {
                    domain::user::Password::new_unchecked(password)
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        ctx.set_current_session(Session {
            user_id: output.user.id.into(),
            token: output.token.clone(),
            expires_at: output.expires_at.coerce(),
        })
        .await;

        Ok(output.into())
    }

    /// Updates the current `User`'s password to the provided one.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `WRONG_PASSWORD` - provided `oldPassword` does not match the current
    ///                      `User` password.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateUserPassword",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn update_user_password(
        new_password: api::user::Password,
        old_password: String,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::UpdateUserPassword {
                user_id: my_id.into(),
                new_password: SecretBox::init_with(move || new_password.into()),
                old_password: SecretBox::init_with(move || {
                    domain::user::Password::new_unchecked(old_password)
                }),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Emails a password reset token to the `User` with the provided email.
    ///
    /// Succeeds even if no active `User` has the provided email.
    #[tracing::instrument(
        skip_all,
        fields(
            email = %email,
            gql.name = "requestPasswordReset",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn request_password_reset(
        email: api::user::Email,
        ctx: &Context,
    ) -> Result<bool, Error> {
        ctx.service()
            .execute(command::RequestPasswordReset {
                email: email.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|()| true)
    }

    /// Sets a new password of the `User` by a password reset token.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `INVALID_RESET_TOKEN` - provided token matches no `User`;
    /// - `EXPIRED_RESET_TOKEN` - provided token has expired.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "resetPassword",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn reset_password(
        token: api::user::ResetToken,
        new_password: api::user::Password,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        ctx.service()
            .execute(command::ResetPassword {
                token: token.into(),
                new_password: SecretBox::init_with(move || new_password.into()),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Grants or revokes privileges of the `User` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an administrator;
    /// - `USER_NOT_EXISTS` - the `User` with the specified ID does not exist.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateUserPrivileges",
            is_active = ?is_active,
            is_admin = ?is_admin,
            otel.name = Self::SPAN_NAME,
            user_id = %user_id,
        ),
    )]
    pub async fn update_user_privileges(
        user_id: api::user::Id,
        is_admin: Option<bool>,
        is_active: Option<bool>,
        ctx: &Context,
    ) -> Result<api::User, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::UpdateUserPrivileges {
                by: my_id.into(),
                user_id: user_id.into(),
                is_admin,
                is_active,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Creates a new active `Court`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an administrator;
    /// - `INVALID_CAPACITY` - `capacity` is not in `1..=1000`;
    /// - `INVALID_HOURLY_RATE` - `hourlyRate` is negative or too big;
    /// - `INVALID_OPENING_HOURS` - `opensAt` is not before `closesAt`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createCourt",
            name = %name,
            otel.name = Self::SPAN_NAME,
            sport = ?sport,
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    pub async fn create_court(
        name: api::court::Name,
        sport: api::court::Sport,
        capacity: i32,
        hourly_rate: Money,
        opens_at: TimeOfDay,
        closes_at: TimeOfDay,
        description: Option<api::court::Description>,
        image_url: Option<api::court::ImageUrl>,
        ctx: &Context,
    ) -> Result<api::Court, Error> {
        _ = ctx.admin_session().await?;

        ctx.service()
            .execute(command::CreateCourt {
                name: name.into(),
                sport: sport.into(),
                capacity: court_capacity(capacity, ctx)?,
                hourly_rate: court_hourly_rate(hourly_rate, ctx)?,
                description: description.map(Into::into),
                image_url: image_url.map(Into::into),
                opening_hours: court_opening_hours(opens_at, closes_at, ctx)?,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Updates the `Court` with the specified ID.
    ///
    /// Omitted arguments leave the `Court` as is, while explicit `null`
    /// `description` or `imageUrl` removes them.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an administrator;
    /// - `COURT_NOT_EXISTS` - the `Court` with the specified ID does not
    ///                        exist;
    /// - `INVALID_CAPACITY` - `capacity` is not in `1..=1000`;
    /// - `INVALID_HOURLY_RATE` - `hourlyRate` is negative or too big;
    /// - `INVALID_OPENING_HOURS` - `opensAt` is not before `closesAt`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "updateCourt",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    #[expect(clippy::too_many_arguments, reason = "GraphQL arguments")]
    pub async fn update_court(
        id: api::court::Id,
        name: Option<api::court::Name>,
        sport: Option<api::court::Sport>,
        capacity: Option<i32>,
        hourly_rate: Option<Money>,
        opens_at: Option<TimeOfDay>,
        closes_at: Option<TimeOfDay>,
        description: Nullable<api::court::Description>,
        image_url: Nullable<api::court::ImageUrl>,
        is_active: Option<bool>,
        ctx: &Context,
    ) -> Result<api::Court, Error> {
        _ = ctx.admin_session().await?;

        let opening_hours = if opens_at.is_some() || closes_at.is_some() {
            let current = ctx
                .service()
                .execute(query::court::ById::by(id.into()))
                .await
                .map_err(AsError::into_error)
                .map_err(ctx.error())?
                .ok_or_else(|| api::query::CourtError::NotExists.into())
                .map_err(ctx.error())?
                .opening_hours;
            Some(court_opening_hours(
                opens_at.unwrap_or(current.opens_at()),
                closes_at.unwrap_or(current.closes_at()),
                ctx,
            )?)
        } else {
            None
        };

        ctx.service()
            .execute(command::UpdateCourt {
                court_id: id.into(),
                name: name.map(Into::into),
                sport: sport.map(Into::into),
                capacity: capacity
                    .map(|c| court_capacity(c, ctx))
                    .transpose()?,
                hourly_rate: hourly_rate
                    .map(|r| court_hourly_rate(r, ctx))
                    .transpose()?,
                description: description
                    .explicit()
                    .map(|d| d.map(Into::into)),
                image_url: image_url.explicit().map(|u| u.map(Into::into)),
                opening_hours,
                is_active,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Books the `Court` for the current `User`.
    ///
    /// The created `Reservation` is `PENDING` until paid or confirmed by an
    /// administrator.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `COURT_NOT_EXISTS` - the `Court` with the specified ID does not
    ///                        exist;
    /// - `COURT_INACTIVE` - the `Court` doesn't accept reservations;
    /// - `INVALID_SLOT` - `startsAt` is not before `endsAt`;
    /// - `INVALID_DURATION` - the booking is shorter than 1 hour or longer
    ///                        than 4 hours;
    /// - `OUTSIDE_OPENING_HOURS` - the booking doesn't fit the `Court`
    ///                             opening hours;
    /// - `NOT_IN_FUTURE` - the booking doesn't start in the future;
    /// - `BEYOND_HORIZON` - the booking starts too far in the future;
    /// - `SLOT_UNAVAILABLE` - the booking overlaps an existing one.
    #[tracing::instrument(
        skip_all,
        fields(
            court_id = %court_id,
            ends_at = %ends_at.to_rfc3339(),
            gql.name = "createReservation",
            otel.name = Self::SPAN_NAME,
            starts_at = %starts_at.to_rfc3339(),
        ),
    )]
    pub async fn create_reservation(
        court_id: api::court::Id,
        starts_at: DateTime,
        ends_at: DateTime,
        notes: Option<api::reservation::Notes>,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::CreateReservation {
                user_id: my_id.into(),
                court_id: court_id.into(),
                starts_at,
                ends_at,
                notes: notes.map(Into::into),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Cancels the `Reservation` with the specified ID, refunding its
    /// completed `Payment`s.
    ///
    /// Administrators may cancel any `Reservation`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_EXISTS` - the `Reservation` with the specified ID
    ///                              does not exist;
    /// - `NOT_OWNER` - the current `User` doesn't own the `Reservation`;
    /// - `INVALID_TRANSITION` - the `Reservation` is already completed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "cancelReservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn cancel_reservation(
        id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        let me = ctx.current_user().await?;

        ctx.service()
            .execute(command::CancelReservation {
                reservation_id: id.into(),
                by: (!me.is_admin).then_some(me.id),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Confirms the pending `Reservation` with the specified ID without a
    /// payment.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an administrator;
    /// - `RESERVATION_NOT_EXISTS` - the `Reservation` with the specified ID
    ///                              does not exist;
    /// - `INVALID_TRANSITION` - the `Reservation` is not pending.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "confirmReservation",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn confirm_reservation(
        id: api::reservation::Id,
        ctx: &Context,
    ) -> Result<api::Reservation, Error> {
        _ = ctx.admin_session().await?;

        ctx.service()
            .execute(command::ConfirmReservation {
                reservation_id: id.into(),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Pays for the pending `Reservation` of the current `User`.
    ///
    /// A `Payment` declined by the payment gateway is returned as `FAILED`
    /// rather than raised as an error.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `RESERVATION_NOT_EXISTS` - the `Reservation` with the specified ID
    ///                              does not exist;
    /// - `NOT_OWNER` - the current `User` doesn't own the `Reservation`;
    /// - `INVALID_TRANSITION` - the `Reservation` is not pending;
    /// - `INVALID_AMOUNT` - `amount` is not positive;
    /// - `AMOUNT_MISMATCH` - `amount` differs from the `Reservation` total;
    /// - `INVALID_INSTRUMENT` - a card `method` lacks a valid `cardNumber`.
    #[tracing::instrument(
        skip_all,
        fields(
            amount = %amount,
            gql.name = "processPayment",
            method = ?method,
            otel.name = Self::SPAN_NAME,
            reservation_id = %reservation_id,
        ),
    )]
    pub async fn process_payment(
        reservation_id: api::reservation::Id,
        method: api::payment::Method,
        amount: Money,
        card_number: Option<String>,
        ctx: &Context,
    ) -> Result<api::Payment, Error> {
        let my_id = ctx.current_session().await?.user_id;

        ctx.service()
            .execute(command::ProcessPayment {
                user_id: my_id.into(),
                reservation_id: reservation_id.into(),
                method: method.into(),
                amount,
                card: card_number.and_then(domain::payment::CardNumber::new),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Refunds the completed `Payment` with the specified ID.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `NOT_ADMIN` - the current `User` is not an administrator;
    /// - `PAYMENT_NOT_EXISTS` - the `Payment` with the specified ID does not
    ///                          exist;
    /// - `INVALID_TRANSITION` - the `Payment` is not completed.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "refundPayment",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn refund_payment(
        id: api::payment::Id,
        reason: Option<String>,
        ctx: &Context,
    ) -> Result<api::Payment, Error> {
        _ = ctx.admin_session().await?;

        ctx.service()
            .execute(command::RefundPayment {
                payment_id: id.into(),
                reason,
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }
}

/// Parses the provided `capacity` of a [`domain::Court`].
fn court_capacity(
    capacity: i32,
    ctx: &Context,
) -> Result<domain::court::Capacity, Error> {
    domain::court::Capacity::new(capacity)
        .ok_or_else(|| CourtInputError::Capacity.into())
        .map_err(ctx.error())
}

/// Parses the provided `rate` of a [`domain::Court`].
fn court_hourly_rate(
    rate: Money,
    ctx: &Context,
) -> Result<domain::court::HourlyRate, Error> {
    domain::court::HourlyRate::new(rate)
        .ok_or_else(|| CourtInputError::HourlyRate.into())
        .map_err(ctx.error())
}

/// Parses the provided opening hours of a [`domain::Court`].
fn court_opening_hours(
    opens_at: TimeOfDay,
    closes_at: TimeOfDay,
    ctx: &Context,
) -> Result<domain::court::OpeningHours, Error> {
    domain::court::OpeningHours::new(opens_at, closes_at)
        .ok_or_else(|| CourtInputError::OpeningHours.into())
        .map_err(ctx.error())
}

define_error! {
    enum CourtInputError {
        #[code = "INVALID_CAPACITY"]
        #[status = BAD_REQUEST]
        #[message = "`capacity` must be in `1..=1000` range"]
        Capacity,

        #[code = "INVALID_HOURLY_RATE"]
        #[status = BAD_REQUEST]
        #[message = "`hourlyRate` must be in `0..=10000` range"]
        HourlyRate,

        #[code = "INVALID_OPENING_HOURS"]
        #[status = BAD_REQUEST]
        #[message = "`opensAt` must be before `closesAt`"]
        OpeningHours,
    }
}

define_error! {
    enum TransitionError {
        #[code = "INVALID_TRANSITION"]
        #[status = CONFLICT]
        #[message = "Requested status change is not allowed"]
        Invalid,
    }
}

impl AsError for command::create_user::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EMAIL_OCCUPIED"]
                #[status = CONFLICT]
                #[message = "`UserEmail` is occupied by another `User`"]
                EmailOccupied,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::EmailOccupied(_) => Some(Error::EmailOccupied.into()),
            Self::PasswordHashing(_) => None,
        }
    }
}

impl AsError for command::create_user_session::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_CREDENTIALS"]
                #[status = FORBIDDEN]
                #[message = "Provided credentials does not match any `User`"]
                WrongCredentials,

                #[code = "USER_DEACTIVATED"]
                #[status = FORBIDDEN]
                #[message = "`User` is deactivated"]
                UserDeactivated,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::JsonWebTokenEncodeError(_) => None,
            Self::UserDeactivated(_) => Some(Error::UserDeactivated.into()),
            Self::UserNotExists(_) | Self::WrongCredentials => {
                Some(Error::WrongCredentials.into())
            }
        }
    }
}

impl AsError for command::update_user_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "WRONG_PASSWORD"]
                #[status = CONFLICT]
                #[message = "Provided `oldPassword` does not match the \
                             current `User` password"]
                WrongPassword,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::PasswordHashing(_) | Self::UserNotExists(_) => None,
            Self::WrongPassword => Some(Error::WrongPassword.into()),
        }
    }
}

impl AsError for command::request_password_reset::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::reset_password::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "EXPIRED_RESET_TOKEN"]
                #[status = GONE]
                #[message = "Password reset token has expired"]
                Expired,

                #[code = "INVALID_RESET_TOKEN"]
                #[status = BAD_REQUEST]
                #[message = "Password reset token is invalid"]
                Invalid,
            }
        }

        match self {
            Self::Db(e) => e.try_as_error(),
            Self::ExpiredToken => Some(Error::Expired.into()),
            Self::InvalidToken => Some(Error::Invalid.into()),
            Self::PasswordHashing(_) => None,
        }
    }
}

impl AsError for command::update_user_privileges::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::NotAdmin(_) => api::PrivilegeError::Admin.into(),
            Self::UserNotExists(_) => api::query::UserError::NotExists.into(),
        })
    }
}

impl AsError for command::create_court::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
        }
    }
}

impl AsError for command::update_court::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::Db(e) => e.try_as_error(),
            Self::CourtNotExists(_) => {
                Some(api::query::CourtError::NotExists.into())
            }
        }
    }
}

impl AsError for command::create_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "BEYOND_HORIZON"]
                #[status = BAD_REQUEST]
                #[message = "Booking starts too far in the future"]
                BeyondHorizon,

                #[code = "COURT_INACTIVE"]
                #[status = CONFLICT]
                #[message = "`Court` doesn't accept reservations"]
                CourtInactive,

                #[code = "INVALID_DURATION"]
                #[status = BAD_REQUEST]
                #[message = "Booking must last from 1 to 4 hours"]
                InvalidDuration,

                #[code = "NOT_IN_FUTURE"]
                #[status = BAD_REQUEST]
                #[message = "Booking must start in the future"]
                NotInFuture,

                #[code = "OUTSIDE_OPENING_HOURS"]
                #[status = BAD_REQUEST]
                #[message = "Booking doesn't fit the `Court` opening hours"]
                OutsideOpeningHours,

                #[code = "SLOT_UNAVAILABLE"]
                #[status = CONFLICT]
                #[message = "Booking overlaps an existing `Reservation`"]
                SlotUnavailable,

                #[code = "USER_DEACTIVATED"]
                #[status = FORBIDDEN]
                #[message = "`User` is deactivated"]
                UserDeactivated,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::BeyondHorizon(_) => Error::BeyondHorizon.into(),
            Self::CourtInactive(_) => Error::CourtInactive.into(),
            Self::CourtNotExists(_) => api::query::CourtError::NotExists.into(),
            Self::InvalidDuration(_) => Error::InvalidDuration.into(),
            Self::InvalidSlot => api::query::SlotError::Invalid.into(),
            Self::NotInFuture => Error::NotInFuture.into(),
            Self::OutsideOpeningHours => Error::OutsideOpeningHours.into(),
            Self::SlotUnavailable => Error::SlotUnavailable.into(),
            Self::UserDeactivated(_) => Error::UserDeactivated.into(),
            Self::UserNotExists(_) => api::query::UserError::NotExists.into(),
        })
    }
}

impl AsError for command::cancel_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::NotOwner(_) => api::PrivilegeError::Owner.into(),
            Self::PaymentTransition(_) => return None,
            Self::ReservationNotExists(_) => {
                api::query::ReservationError::NotExists.into()
            }
            Self::Transition(_) => TransitionError::Invalid.into(),
        })
    }
}

impl AsError for command::confirm_reservation::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::ReservationNotExists(_) => {
                api::query::ReservationError::NotExists.into()
            }
            Self::Transition(_) => TransitionError::Invalid.into(),
        })
    }
}

impl AsError for command::process_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "AMOUNT_MISMATCH"]
                #[status = BAD_REQUEST]
                #[message = "`amount` differs from the `Reservation` total"]
                AmountMismatch,

                #[code = "INVALID_AMOUNT"]
                #[status = BAD_REQUEST]
                #[message = "`amount` must be positive"]
                InvalidAmount,

                #[code = "INVALID_INSTRUMENT"]
                #[status = BAD_REQUEST]
                #[message = "Card payments require a valid `cardNumber`"]
                InvalidInstrument,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::AmountMismatch { .. } => Error::AmountMismatch.into(),
            Self::InvalidAmount(_) => Error::InvalidAmount.into(),
            Self::InvalidInstrument(_) => Error::InvalidInstrument.into(),
            Self::NotOwner(_) => api::PrivilegeError::Owner.into(),
            Self::PaymentTransition(_) => return None,
            Self::ReservationNotExists(_) => {
                api::query::ReservationError::NotExists.into()
            }
            Self::Transition(_) => TransitionError::Invalid.into(),
        })
    }
}

impl AsError for command::refund_payment::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "PAYMENT_NOT_EXISTS"]
                #[status = NOT_FOUND]
                #[message = "`Payment` with the specified ID does not exist"]
                NotExists,
            }
        }

        Some(match self {
            Self::Db(e) => return e.try_as_error(),
            Self::PaymentNotExists(_) => Error::NotExists.into(),
            Self::Transition(_) => TransitionError::Invalid.into(),
        })
    }
}
