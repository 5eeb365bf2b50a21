//! [`Command`] for paying a [`Reservation`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted, Update},
    Money,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::{payment::Status as PaymentStatus, reservation::Status};
use crate::{
    domain::{
        payment::{self, CardNumber, GatewayResponse},
        reservation, user, Payment, Reservation,
    },
    infra::{
        database,
        gateway::{self, Authorize, Decision},
        Database, Gateway,
    },
    notification::Notification,
    Service,
};

use super::Command;

/// [`Command`] for paying a [`Status::Pending`] [`Reservation`] via the
/// payment [`Gateway`].
///
/// The [`Payment`] is stored as [`PaymentStatus::Pending`] before the
/// [`Gateway`] is asked, so it exists even if the [`Gateway`] fails. A
/// declined or failed authorization is not an error: the returned [`Payment`]
/// is [`PaymentStatus::Failed`] and the [`Reservation`] stays unchanged.
#[derive(Clone, Debug)]
pub struct ProcessPayment {
    /// ID of the [`User`] paying.
    ///
    /// [`User`]: crate::domain::User
    pub user_id: user::Id,

    /// ID of the [`Reservation`] being paid.
    pub reservation_id: reservation::Id,

    /// [`payment::Method`] of the [`Payment`].
    pub method: payment::Method,

    /// Amount to pay, which must equal the [`Reservation::total`].
    pub amount: Money,

    /// [`CardNumber`] to charge, required by card [`payment::Method`]s.
    pub card: Option<CardNumber>,
}

impl ProcessPayment {
    /// Reason of refunds of [`Payment`]s approved after their
    /// [`Reservation`] stopped awaiting a payment.
    pub const LATE_APPROVAL_REASON: &'static str =
        "reservation is no longer pending";
}

impl<Db, Gw> Command<ProcessPayment> for Service<Db, Gw>
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
            Lock<By<Payment, payment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Insert<Payment>, Ok = (), Err = Traced<database::Error>>
        + Database<Update<Payment>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
    Gw: Gateway<Authorize, Ok = Decision, Err = Traced<gateway::Error>>,
{
    type Ok = Payment;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: ProcessPayment,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ProcessPayment {
            user_id,
            reservation_id,
            method,
            amount,
            card,
        } = cmd;

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

        // Avoid concurrent payments of the same `Reservation`.
        tx.execute(Lock(By::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let reservation = tx
            .execute(Select(By::<Option<Reservation>, _>::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReservationNotExists(reservation_id))
            .map_err(tracerr::wrap!())?;
        if reservation.user_id != user_id {
            return Err(tracerr::new!(E::NotOwner(user_id)));
        }
        _ = reservation
            .status
            .confirm()
            .map_err(tracerr::from_and_wrap!(=> E))?;
        if payment::Amount::new(amount).is_none() {
            return Err(tracerr::new!(E::InvalidAmount(amount)));
        }
        if amount != reservation.total {
            return Err(tracerr::new!(E::AmountMismatch {
                expected: reservation.total,
                actual: amount,
            }));
        }
        let card = if method.requires_card() {
            Some(
                card.ok_or(E::InvalidInstrument(method))
                    .map_err(tracerr::wrap!())?,
            )
        } else {
            None
        };

        let mut payment = Payment {
            id: payment::Id::new(),
            user_id,
            reservation_id,
            amount,
            method,
            status: payment::Status::Pending,
            transaction_id: payment::TransactionId::generate(),
            gateway_response: None,
            created_at: payment::CreationDateTime::now(),
            completed_at: None,
        };
        tx.execute(Insert(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        drop(tx);

        let decision = self
            .gateway()
            .execute(Authorize {
                transaction_id: payment.transaction_id.clone(),
                method,
                amount,
                card,
            })
            .await
            .unwrap_or_else(|e| {
                log::warn!(
                    payment_id = %payment.id,
                    "payment gateway failed: {e}",
                );
                Decision::Declined(GatewayResponse::from(format!(
                    "Failed: {}",
                    e.as_ref(),
                )))
            });

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::new(reservation_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::new(payment.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut confirmed = None;
        match decision {
            Decision::Approved(response) => {
                payment
                    .complete(response)
                    .map_err(tracerr::from_and_wrap!(=> E))?;

                let mut reservation = tx
                    .execute(Select(By::<Option<Reservation>, _>::new(
                        reservation_id,
                    )))
                    .await
                    .map_err(tracerr::map_from_and_wrap!(=> E))?
                    .ok_or(E::ReservationNotExists(reservation_id))
                    .map_err(tracerr::wrap!())?;
                if reservation.confirm().is_ok() {
                    tx.execute(Update(reservation.clone()))
                        .await
                        .map_err(tracerr::map_from_and_wrap!(=> E))?;
                    confirmed = Some(reservation);
                } else {
                    log::warn!(
                        payment_id = %payment.id,
                        %reservation_id,
                        status = %reservation.status,
                        "payment approved for non-pending reservation, \
                         refunding",
                    );
                    payment
                        .refund(Some(ProcessPayment::LATE_APPROVAL_REASON))
                        .map_err(tracerr::from_and_wrap!(=> E))?;
                }
            }
            Decision::Declined(reason) => {
                payment
                    .fail(reason)
                    .map_err(tracerr::from_and_wrap!(=> E))?;
            }
        }

        tx.execute(Update(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            payment_id = %payment.id,
            %reservation_id,
            status = %payment.status,
            "payment processed",
        );
        if let Some(reservation) = confirmed {
            self.notifier()
                .notify(Notification::PaymentCompleted(payment.clone()));
            self.notifier()
                .notify(Notification::ReservationConfirmed(reservation));
        }

        Ok(payment)
    }
}

/// Error of [`ProcessPayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Paid amount differs from the [`Reservation::total`].
    #[display("Expected payment of {expected}, but got {actual}")]
    #[from(ignore)]
    AmountMismatch {
        /// [`Reservation::total`].
        #[error(not(source))]
        expected: Money,

        /// Requested amount.
        #[error(not(source))]
        actual: Money,
    },

    /// Paid amount is not allowed in a single [`Payment`].
    #[display("Payment of {_0} is not allowed")]
    #[from(ignore)]
    InvalidAmount(#[error(not(source))] Money),

    /// [`payment::Method`] requires a [`CardNumber`], which is missing.
    #[display("`{_0}` payment requires a valid card number")]
    #[from(ignore)]
    InvalidInstrument(#[error(not(source))] payment::Method),

    /// [`User`] doesn't own the [`Reservation`].
    ///
    /// [`User`]: crate::domain::User
    #[display("`User(id: {_0})` doesn't own the reservation")]
    #[from(ignore)]
    NotOwner(#[error(not(source))] user::Id),

    /// [`Payment`] cannot transit into the decided [`PaymentStatus`].
    #[display("{_0}")]
    PaymentTransition(payment::TransitionError),

    /// [`Reservation`] doesn't exist.
    #[display("`Reservation(id: {_0})` does not exist")]
    #[from(ignore)]
    ReservationNotExists(#[error(not(source))] reservation::Id),

    /// [`Reservation`] doesn't await a payment.
    #[display("{_0}")]
    Transition(reservation::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        command::CreateReservation,
        domain::{
            payment::{self, CardNumber},
            reservation, Payment, Reservation,
        },
        infra::{gateway::Fixed, Database as _},
        notification::{Notification, Queue},
        read,
        test_util::{self, TestService},
        Command as _,
    };

    use super::{ExecutionError, ProcessPayment};

    async fn setup(gateway: Fixed) -> (TestService, Queue, Reservation) {
        let (svc, queue) = test_util::service(gateway);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 50).await;
        let r = svc
            .execute(CreateReservation {
                user_id: user.id,
                court_id: court.id,
                starts_at: test_util::tomorrow_at(10, 0),
                ends_at: test_util::tomorrow_at(11, 30),
                notes: None,
            })
            .await
            .unwrap();
        (svc, queue, r)
    }

    fn pay(r: &Reservation) -> ProcessPayment {
        ProcessPayment {
            user_id: r.user_id,
            reservation_id: r.id,
            method: payment::Method::CreditCard,
            amount: r.total,
            card: CardNumber::new("4242 4242 4242 4242"),
        }
    }

    async fn reservation(svc: &TestService, id: reservation::Id) -> Reservation {
        svc.database()
            .execute(Select(By::<Option<Reservation>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
    }

    async fn payments(svc: &TestService, id: reservation::Id) -> Vec<Payment> {
        svc.database()
            .execute(Select(By::new(
                read::payment::list::Selector::of_reservation(id),
            )))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn approved_payment_confirms_reservation() {
        let (svc, mut queue, r) = setup(Fixed::Approve).await;

        let p = svc.execute(pay(&r)).await.unwrap();

        assert_eq!(p.status, payment::Status::Completed);
        assert!(p.completed_at.is_some());
        assert_eq!(
            reservation(&svc, r.id).await.status,
            reservation::Status::Confirmed,
        );
        assert!(matches!(
            queue.try_next(),
            Some(Notification::PaymentCompleted(_)),
        ));
        assert!(matches!(
            queue.try_next(),
            Some(Notification::ReservationConfirmed(_)),
        ));
    }

    #[tokio::test]
    async fn declined_payment_leaves_reservation_pending() {
        let (svc, mut queue, r) = setup(Fixed::Decline).await;

        let p = svc.execute(pay(&r)).await.unwrap();

        assert_eq!(p.status, payment::Status::Failed);
        assert!(p.completed_at.is_none());
        assert!(p.gateway_response.is_some());
        assert_eq!(
            reservation(&svc, r.id).await.status,
            reservation::Status::Pending,
        );
        assert!(queue.try_next().is_none());
    }

    #[tokio::test]
    async fn gateway_failure_is_recorded_not_raised() {
        let (svc, _queue, r) = setup(Fixed::Fail).await;

        let p = svc.execute(pay(&r)).await.unwrap();

        assert_eq!(p.status, payment::Status::Failed);
        let stored = payments(&svc, r.id).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, payment::Status::Failed);
        assert_eq!(
            reservation(&svc, r.id).await.status,
            reservation::Status::Pending,
        );
    }

    #[tokio::test]
    async fn rejects_invalid_requests_without_storing_payment() {
        let (svc, _queue, r) = setup(Fixed::Approve).await;
        let stranger = test_util::user(&svc, "stranger@example.com").await;

        let err = svc
            .execute(ProcessPayment {
                amount: test_util::usd(10),
                ..pay(&r)
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::AmountMismatch { .. },
        ));

        let err = svc
            .execute(ProcessPayment {
                card: None,
                ..pay(&r)
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidInstrument(_)));

        let err = svc
            .execute(ProcessPayment {
                user_id: stranger.id,
                ..pay(&r)
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotOwner(_)));

        assert!(payments(&svc, r.id).await.is_empty());
    }

    #[tokio::test]
    async fn accepts_cardless_methods_and_rejects_repeated_payment() {
        let (svc, _queue, r) = setup(Fixed::Approve).await;

        let p = svc
            .execute(ProcessPayment {
                method: payment::Method::PayPal,
                card: None,
                ..pay(&r)
            })
            .await
            .unwrap();
        assert_eq!(p.status, payment::Status::Completed);

        let err = svc.execute(pay(&r)).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Transition(_)));
    }

    #[tokio::test]
    async fn fails_for_unknown_reservation() {
        let (svc, _queue, r) = setup(Fixed::Approve).await;

        let err = svc
            .execute(ProcessPayment {
                user_id: r.user_id,
                reservation_id: reservation::Id::new(),
                method: payment::Method::PayPal,
                amount: r.total,
                card: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ReservationNotExists(_),
        ));
    }
}
