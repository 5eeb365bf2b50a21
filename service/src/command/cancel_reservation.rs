//! [`Command`] for cancelling a [`Reservation`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::{payment::Status as PaymentStatus, reservation::Status};
use crate::{
    domain::{payment, reservation, user, Payment, Reservation},
    infra::{database, Database},
    notification::Notification,
    read, Service,
};

use super::Command;

/// [`Command`] for cancelling a [`Reservation`].
///
/// Every [`PaymentStatus::Completed`] [`Payment`] of the cancelled
/// [`Reservation`] is refunded. Cancelling an already [`Status::Cancelled`]
/// [`Reservation`] changes nothing.
#[derive(Clone, Copy, Debug)]
pub struct CancelReservation {
    /// ID of the [`Reservation`] to cancel.
    pub reservation_id: reservation::Id,

    /// ID of the [`User`] requesting the cancellation, if it must be the
    /// owner of the [`Reservation`].
    ///
    /// [`User`]: crate::domain::User
    pub by: Option<user::Id>,
}

impl CancelReservation {
    /// Reason of refunds caused by a cancellation.
    pub const REFUND_REASON: &'static str = "reservation cancelled";
}

impl<Db, Gw> Command<CancelReservation> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Reservation, reservation::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Update<Reservation>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Payment>, read::payment::list::Selector>>,
            Ok = Vec<Payment>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Payment, payment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Payment>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: CancelReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CancelReservation { reservation_id, by } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Lock rows reference existing `Reservation`s only.
        _ = tx
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;

        // Avoid concurrent actions upon the same `Reservation`.
        tx.execute(Lock(By::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;
        if let Some(user_id) = by {
            if user_id != reservation.user_id {
                return Err(tracerr::new!(E::NotOwner(user_id)));
            }
        }
        if reservation.status == reservation::Status::Cancelled {
            return Ok(reservation);
        }
        reservation
            .cancel()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let payments = tx
            .execute(Select(By::new(read::payment::list::Selector {
                status: Some(payment::Status::Completed),
                ..read::payment::list::Selector::of_reservation(reservation_id)
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        for mut payment in payments {
            tx.execute(Lock(By::new(payment.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            payment
                .refund(Some(CancelReservation::REFUND_REASON))
                .map_err(tracerr::from_and_wrap!(=> E))?;
            tx.execute(Update(payment.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            log::info!(
                payment_id = %payment.id,
                %reservation_id,
                "payment refunded on cancellation",
            );
        }

        tx.execute(Update(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        self.notifier()
            .notify(Notification::ReservationCancelled(reservation.clone()));

        Ok(reservation)
    }
}

/// Error of [`CancelReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] requesting the cancellation doesn't own the [`Reservation`].
    ///
    /// [`User`]: crate::domain::User
    #[display("`User(id: {_0})` doesn't own the reservation")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] user::Id),

    /// [`Payment`] of the [`Reservation`] cannot be refunded.
    #[display("{_0}")]
    PaymentTransition(payment::TransitionError),

    /// [`Reservation`] doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    #[from(ignore)]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Reservation`] cannot be cancelled in its current [`Status`].
    #[display("{_0}")]
    Transition(reservation::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select, Update};

    use crate::{
        command::CreateReservation,
        domain::{payment, reservation, Payment, Reservation},
        infra::{gateway::Fixed, Database as _},
        notification::Notification,
        test_util::{self, TestService},
        Command as _,
    };

    use super::{CancelReservation, ExecutionError};

    async fn reserve(svc: &TestService) -> Reservation {
        let user = test_util::user(svc, "player@example.com").await;
        let court = test_util::court(svc, 40).await;
        svc.execute(CreateReservation {
            user_id: user.id,
            court_id: court.id,
            starts_at: test_util::tomorrow_at(18, 0),
            ends_at: test_util::tomorrow_at(19, 0),
            notes: None,
        })
        .await
        .unwrap()
    }

    async fn stored(svc: &TestService, id: payment::Id) -> Payment {
        svc.database()
            .execute(Select(By::<Option<Payment>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn refunds_completed_payments() {
        let (svc, mut queue) = test_util::service(Fixed::Approve);
        let mut r = reserve(&svc).await;
        r.confirm().unwrap();
        svc.database().execute(Update(r.clone())).await.unwrap();
        let payment = Payment {
            id: payment::Id::new(),
            user_id: r.user_id,
            reservation_id: r.id,
            amount: r.total,
            method: payment::Method::PayPal,
            status: payment::Status::Completed,
            transaction_id: payment::TransactionId::generate(),
            gateway_response: Some("Approved".into()),
            created_at: payment::CreationDateTime::now(),
            completed_at: Some(payment::CompletionDateTime::now()),
        };
        svc.database().execute(Insert(payment.clone())).await.unwrap();

        let cancelled = svc
            .execute(CancelReservation {
                reservation_id: r.id,
                by: Some(r.user_id),
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, reservation::Status::Cancelled);
        let refunded = stored(&svc, payment.id).await;
        assert_eq!(refunded.status, payment::Status::Refunded);
        assert_eq!(
            refunded.gateway_response.map(|r| r.to_string()).as_deref(),
            Some("Refunded: reservation cancelled"),
        );
        assert!(matches!(
            queue.try_next(),
            Some(Notification::ReservationCancelled(_)),
        ));
    }

    #[tokio::test]
    async fn cancelling_twice_changes_nothing() {
        let (svc, mut queue) = test_util::service(Fixed::Approve);
        let r = reserve(&svc).await;
        let cmd = CancelReservation {
            reservation_id: r.id,
            by: None,
        };

        let first = svc.execute(cmd).await.unwrap();
        drop(queue.try_next());
        let second = svc.execute(cmd).await.unwrap();

        assert_eq!(second.status, reservation::Status::Cancelled);
        assert_eq!(second.updated_at, first.updated_at);
        assert!(queue.try_next().is_none());
    }

    #[tokio::test]
    async fn forbids_cancelling_foreign_reservations() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let r = reserve(&svc).await;
        let stranger = test_util::user(&svc, "stranger@example.com").await;

        let err = svc
            .execute(CancelReservation {
                reservation_id: r.id,
                by: Some(stranger.id),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));
    }

    #[tokio::test]
    async fn refuses_to_cancel_completed_reservation() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let mut r = reserve(&svc).await;
        r.confirm().unwrap();
        r.complete().unwrap();
        svc.database().execute(Update(r.clone())).await.unwrap();

        let err = svc
            .execute(CancelReservation {
                reservation_id: r.id,
                by: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::Transition(_)));
    }

    #[tokio::test]
    async fn fails_for_unknown_reservation() {
        let (svc, _queue) = test_util::service(Fixed::Approve);

        let err = svc
            .execute(CancelReservation {
                reservation_id: reservation::Id::new(),
                by: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ReservationNotExists(_),
        ));
    }
}
