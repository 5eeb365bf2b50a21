//! [`Command`] for creating a new [`Reservation`].

use std::time::Duration;

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::reservation::Status;
use crate::{
    domain::{
        court,
        reservation::{self, Slot},
        user, Court, Reservation, User,
    },
    infra::{
        database::{self, constraint},
        Database,
    },
    read, Service,
};

use super::Command;

/// [`Command`] for booking a [`Court`] by a [`User`].
///
/// The created [`Reservation`] is [`Status::Pending`] until paid.
#[derive(Clone, Debug)]
pub struct CreateReservation {
    /// ID of the [`User`] booking the [`Court`].
    pub user_id: user::Id,

    /// ID of the [`Court`] to book.
    pub court_id: court::Id,

    /// [`DateTime`] the booking starts at.
    pub starts_at: DateTime,

    /// [`DateTime`] the booking ends at.
    pub ends_at: DateTime,

    /// [`reservation::Notes`] of the booking, if any.
    pub notes: Option<reservation::Notes>,
}

impl<Db, Gw> Command<CreateReservation> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Court>, court::Id>>,
            Ok = Option<Court>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Court, court::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::Overlapping>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Insert<Reservation>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CreateReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateReservation {
            user_id,
            court_id,
            starts_at,
            ends_at,
            notes,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if !user.is_active {
            return Err(tracerr::new!(E::UserDeactivated(user_id)));
        }

        let slot = Slot::new(starts_at.coerce(), ends_at.coerce())
            .ok_or(E::InvalidSlot)
            .map_err(tracerr::wrap!())?;

        // Lock rows reference existing `Court`s only.
        _ = tx
            .execute(Select(By::<Option<Court>, _>::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CourtNotExists(court_id))
            .map_err(tracerr::wrap!())?;

        // Serialize bookings of the same `Court`.
        tx.execute(Lock(By::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let court = tx
            .execute(Select(By::<Option<Court>, _>::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CourtNotExists(court_id))
            .map_err(tracerr::wrap!())?;
        if !court.is_active {
            return Err(tracerr::new!(E::CourtInactive(court_id)));
        }

        let overlapping = tx
            .execute(Select(By::new(read::reservation::Overlapping {
                court_id,
                slot,
                exclude: None,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !overlapping.is_empty() {
            return Err(tracerr::new!(E::SlotUnavailable));
        }

        if !slot.has_allowed_duration() {
            return Err(tracerr::new!(E::InvalidDuration(slot.duration())));
        }
        if !court.opening_hours.contain(&slot) {
            return Err(tracerr::new!(E::OutsideOpeningHours));
        }
        let now = DateTime::now();
        if starts_at <= now {
            return Err(tracerr::new!(E::NotInFuture));
        }
        let horizon = self.config().booking.horizon;
        if starts_at > now + horizon {
            return Err(tracerr::new!(E::BeyondHorizon(horizon)));
        }

        let now = reservation::CreationDateTime::now();
        let reservation = Reservation {
            id: reservation::Id::new(),
            user_id,
            court_id,
            slot,
            total: court.price_of(&slot),
            status: reservation::Status::Pending,
            notes,
            created_at: now,
            updated_at: now.coerce(),
        };

        let inserted = tx.execute(Insert(reservation.clone())).await;
        if let Err(e) = &inserted {
            if e.as_ref().is_exclusion_violation(Some(
                constraint::RESERVATIONS_NO_OVERLAP,
            )) {
                return Err(tracerr::new!(E::SlotUnavailable));
            }
        }
        inserted.map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            reservation_id = %reservation.id,
            %court_id,
            %user_id,
            "reservation created",
        );
        Ok(reservation)
    }
}

/// Error of [`CreateReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Slot`] starts further than the allowed booking horizon.
    #[display("Bookings are allowed at most {_0:?} ahead")]
    #[from(ignore)]
    BeyondHorizon(#[error(not(source))] Duration),

    /// [`Court`] doesn't accept new bookings.
    #[display("`Court(id: {_0})` is not active")]
    #[from(ignore)]
    CourtInactive(#[error(not(source))] court::Id),

    /// [`Court`] doesn't exist.
    #[display("`Court(id: {_0})` does not exist")]
    #[from(ignore)]
    CourtNotExists(#[error(not(source))] court::Id),

    /// [`Slot`] is shorter than [`Slot::MIN_DURATION`] or longer than
    /// [`Slot::MAX_DURATION`].
    #[display("Booking of {_0:?} is not allowed")]
    #[from(ignore)]
    InvalidDuration(#[error(not(source))] Duration),

    /// Booking doesn't start before it ends.
    #[display("Booking must start before it ends")]
    InvalidSlot,

    /// Booking starts in the past or right now.
    #[display("Booking must start in the future")]
    NotInFuture,

    /// [`Slot`] lies outside of the [`Court`] opening hours.
    #[display("Booking is outside of the court opening hours")]
    OutsideOpeningHours,

    /// [`Slot`] overlaps another active [`Reservation`] of the [`Court`].
    #[display("Requested slot is unavailable")]
    SlotUnavailable,

    /// [`User`] is deactivated.
    #[display("`User(id: {_0})` is deactivated")]
    #[from(ignore)]
    UserDeactivated(#[error(not(source))] user::Id),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Commit, Insert, Lock, Select, Transact, Update},
        DateTime,
    };
    use rust_decimal::Decimal;
    use tracerr::Traced;

    use crate::{
        domain::{court, reservation, user, Court, Reservation, User},
        infra::{database, gateway::Fixed, Database},
        notification,
        query::CheckAvailability,
        read,
        test_util::{self, TestService},
        Command as _, Query as _, Service,
    };

    use super::{CreateReservation, ExecutionError};

    async fn setup() -> (TestService, User, Court) {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 50).await;
        (svc, user, court)
    }

    fn book(
        user: &User,
        court: &Court,
        from: (u8, u8),
        to: (u8, u8),
    ) -> CreateReservation {
        CreateReservation {
            user_id: user.id,
            court_id: court.id,
            starts_at: test_util::tomorrow_at(from.0, from.1),
            ends_at: test_util::tomorrow_at(to.0, to.1),
            notes: None,
        }
    }

    #[tokio::test]
    async fn prices_and_stores_pending_reservation() {
        let (svc, user, court) = setup().await;

        let r = svc
            .execute(book(&user, &court, (10, 0), (11, 30)))
            .await
            .unwrap();

        assert_eq!(r.status, reservation::Status::Pending);
        assert_eq!(r.total, test_util::usd(Decimal::new(750, 1)));
        assert_eq!(r.total, court.price_of(&r.slot));
    }

    #[tokio::test]
    async fn rejects_overlapping_booking() {
        let (svc, user, court) = setup().await;
        drop(
            svc.execute(book(&user, &court, (10, 0), (11, 30)))
                .await
                .unwrap(),
        );

        let available = svc
            .execute(CheckAvailability {
                court_id: court.id,
                starts_at: test_util::tomorrow_at(10, 30),
                ends_at: test_util::tomorrow_at(11, 0),
                exclude: None,
            })
            .await
            .unwrap();
        assert!(!available);

        for (from, to) in
            [((10, 30), (11, 0)), ((10, 30), (11, 30)), ((9, 0), (10, 30))]
        {
            let err = svc
                .execute(book(&user, &court, from, to))
                .await
                .unwrap_err();
            assert!(matches!(err.as_ref(), ExecutionError::SlotUnavailable));
        }
    }

    #[tokio::test]
    async fn accepts_adjacent_booking() {
        let (svc, user, court) = setup().await;
        drop(
            svc.execute(book(&user, &court, (10, 0), (11, 30)))
                .await
                .unwrap(),
        );

        assert!(svc
            .execute(book(&user, &court, (11, 30), (12, 30)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn allows_only_one_of_concurrent_overlapping_bookings() {
        let (svc, user, court) = setup().await;
        let other = test_util::user(&svc, "other@example.com").await;

        let (a, b) = tokio::join!(
            svc.execute(book(&user, &court, (10, 0), (12, 0))),
            svc.execute(book(&other, &court, (11, 0), (13, 0))),
        );

        assert_eq!(
            usize::from(a.is_ok()) + usize::from(b.is_ok()),
            1,
            "exactly one booking must succeed",
        );
        let err = a.err().or(b.err()).unwrap();
        assert!(matches!(err.as_ref(), ExecutionError::SlotUnavailable));
    }

    #[tokio::test]
    async fn checks_duration_bounds_inclusively() {
        let (svc, user, court) = setup().await;

        assert!(svc
            .execute(book(&user, &court, (8, 0), (9, 0)))
            .await
            .is_ok());
        assert!(svc
            .execute(book(&user, &court, (10, 0), (14, 0)))
            .await
            .is_ok());

        for (from, to) in [((15, 0), (15, 59)), ((15, 0), (19, 1))] {
            let err = svc
                .execute(book(&user, &court, from, to))
                .await
                .unwrap_err();
            assert!(
                matches!(err.as_ref(), ExecutionError::InvalidDuration(_)),
                "{from:?}-{to:?} accepted",
            );
        }
    }

    #[tokio::test]
    async fn rejects_bookings_outside_opening_hours() {
        let (svc, user, court) = setup().await;

        for (from, to) in [((7, 0), (9, 0)), ((21, 0), (22, 30))] {
            let err = svc
                .execute(book(&user, &court, from, to))
                .await
                .unwrap_err();
            assert!(matches!(
                err.as_ref(),
                ExecutionError::OutsideOpeningHours,
            ));
        }
        assert!(svc
            .execute(book(&user, &court, (21, 0), (22, 0)))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn rejects_inverted_past_and_distant_slots() {
        let (svc, user, court) = setup().await;

        let err = svc
            .execute(book(&user, &court, (11, 0), (10, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidSlot));

        let yesterday = (DateTime::now() - Duration::from_secs(24 * 60 * 60))
            .date();
        let err = svc
            .execute(CreateReservation {
                starts_at: test_util::at(yesterday, 10, 0),
                ends_at: test_util::at(yesterday, 11, 0),
                ..book(&user, &court, (10, 0), (11, 0))
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotInFuture));

        let distant = (DateTime::now()
            + Duration::from_secs(40 * 24 * 60 * 60))
        .date();
        let err = svc
            .execute(CreateReservation {
                starts_at: test_util::at(distant, 10, 0),
                ends_at: test_util::at(distant, 11, 0),
                ..book(&user, &court, (10, 0), (11, 0))
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::BeyondHorizon(_)));
    }

    #[tokio::test]
    async fn rejects_unknown_and_inactive_courts() {
        let (svc, user, mut court) = setup().await;

        let err = svc
            .execute(CreateReservation {
                court_id: court::Id::new(),
                ..book(&user, &court, (10, 0), (11, 0))
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::CourtNotExists(_)));

        court.is_active = false;
        svc.database().execute(Update(court.clone())).await.unwrap();
        let err = svc
            .execute(book(&user, &court, (10, 0), (11, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::CourtInactive(_)));
    }

    /// [`Database`] not seeing the overlapping [`Reservation`]s committed by
    /// concurrent transactions.
    #[derive(Clone, Debug)]
    struct Stale<D>(D);

    impl<D> Database<Transact> for Stale<D>
    where
        D: Database<Transact, Err = Traced<database::Error>>,
    {
        type Ok = Stale<D::Ok>;
        type Err = Traced<database::Error>;

        async fn execute(&self, op: Transact) -> Result<Self::Ok, Self::Err> {
            self.0.execute(op).await.map(Stale)
        }
    }

    impl<D>
        Database<Select<By<Vec<Reservation>, read::reservation::Overlapping>>>
        for Stale<D>
    {
        type Ok = Vec<Reservation>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Select<By<Vec<Reservation>, read::reservation::Overlapping>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(vec![])
        }
    }

    macro_rules! delegate {
        ($($op:ty => $ok:ty),* $(,)?) => {$(
            impl<D> Database<$op> for Stale<D>
            where
                D: Database<$op, Ok = $ok, Err = Traced<database::Error>>,
            {
                type Ok = $ok;
                type Err = Traced<database::Error>;

                async fn execute(
                    &self,
                    op: $op,
                ) -> Result<Self::Ok, Self::Err> {
                    self.0.execute(op).await
                }
            }
        )*};
    }

    delegate! {
        Select<By<Option<User>, user::Id>> => Option<User>,
        Select<By<Option<Court>, court::Id>> => Option<Court>,
        Lock<By<Court, court::Id>> => (),
        Insert<Reservation> => (),
        Commit => (),
    }

    #[tokio::test]
    async fn reports_overlap_rejected_on_insert_as_unavailable() {
        let (svc, user, court) = setup().await;
        let taken = svc
            .execute(book(&user, &court, (10, 0), (12, 0)))
            .await
            .unwrap();

        let (notifier, _queue) = notification::channel();
        let stale = Service::from_parts(
            svc.config().clone(),
            Stale(svc.database().clone()),
            Fixed::Approve,
            notifier,
        );
        let err = stale
            .execute(book(&user, &court, (11, 0), (13, 0)))
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::SlotUnavailable));
        let stored: Vec<Reservation> = svc
            .database()
            .execute(Select(By::new(read::reservation::Overlapping {
                court_id: court.id,
                slot: taken.slot,
                exclude: None,
            })))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }
}
