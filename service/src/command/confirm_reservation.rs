//! [`Command`] for confirming a [`Reservation`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::reservation::Status;
use crate::{
    domain::{reservation, Reservation},
    infra::{database, Database},
    notification::Notification,
    Service,
};

use super::Command;

/// [`Command`] for confirming a [`Status::Pending`] [`Reservation`] without
/// a payment.
#[derive(Clone, Copy, Debug, From)]
pub struct ConfirmReservation {
    /// ID of the [`Reservation`] to confirm.
    pub reservation_id: reservation::Id,
}

impl<Db, Gw> Command<ConfirmReservation> for Service<Db, Gw>
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
        > + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Reservation;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ConfirmReservation,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ConfirmReservation { reservation_id } = cmd;

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
        reservation
            .confirm()
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(reservation.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        self.notifier()
            .notify(Notification::ReservationConfirmed(reservation.clone()));

        Ok(reservation)
    }
}

/// Error of [`ConfirmReservation`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Reservation`] doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    #[from(ignore)]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Reservation`] cannot be confirmed in its current [`Status`].
    #[display("{_0}")]
    Transition(reservation::TransitionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::CreateReservation,
        domain::reservation,
        infra::gateway::Fixed,
        notification::Notification,
        test_util, Command as _,
    };

    use super::{ConfirmReservation, ExecutionError};

    #[tokio::test]
    async fn confirms_pending_reservation_only_once() {
        let (svc, mut queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 30).await;
        let r = svc
            .execute(CreateReservation {
                user_id: user.id,
                court_id: court.id,
                starts_at: test_util::tomorrow_at(9, 0),
                ends_at: test_util::tomorrow_at(10, 0),
                notes: None,
            })
            .await
            .unwrap();

        let confirmed = svc.execute(ConfirmReservation::from(r.id)).await.unwrap();
        assert_eq!(confirmed.status, reservation::Status::Confirmed);
        assert!(matches!(
            queue.try_next(),
            Some(Notification::ReservationConfirmed(n)) if n.id == r.id,
        ));

        let err = svc
            .execute(ConfirmReservation::from(r.id))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Transition(_)));
        assert!(queue.try_next().is_none());
    }

    #[tokio::test]
    async fn fails_for_unknown_reservation() {
        let (svc, _queue) = test_util::service(Fixed::Approve);

        let err = svc
            .execute(ConfirmReservation::from(reservation::Id::new()))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ReservationNotExists(_),
        ));
    }
}
