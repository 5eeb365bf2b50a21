//! [`Command`] for refunding a [`Payment`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::payment::Status;
use crate::{
    domain::{payment, Payment},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for refunding a [`Status::Completed`] [`Payment`].
#[derive(Clone, Debug)]
pub struct RefundPayment {
    /// ID of the [`Payment`] to refund.
    pub payment_id: payment::Id,

    /// Reason of the refund, if any.
    pub reason: Option<String>,
}

impl<Db, Gw> Command<RefundPayment> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Payment>, payment::Id>>,
            Ok = Option<Payment>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Payment, payment::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Payment>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Payment;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: RefundPayment) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RefundPayment { payment_id, reason } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Lock rows reference existing `Payment`s only.
        _ = tx
            .execute(Select(By::<Option<Payment>, _>::new(payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PaymentNotExists(payment_id))
            .map_err(tracerr::wrap!())?;

        // Avoid concurrent actions upon the same `Payment`.
        tx.execute(Lock(By::new(payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut payment = tx
            .execute(Select(By::<Option<Payment>, _>::new(payment_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::PaymentNotExists(payment_id))
            .map_err(tracerr::wrap!())?;
        payment
            .refund(reason.as_deref())
            .map_err(tracerr::from_and_wrap!(=> E))?;

        tx.execute(Update(payment.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(%payment_id, "payment refunded");
        Ok(payment)
    }
}

/// Error of [`RefundPayment`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Payment`] doesn't exist.
    #[display("`Payment(id: {_0})` does not exist")]
    #[from(ignore)]
    PaymentNotExists(#[error(not(source))] payment::Id),

    /// [`Payment`] is not [`Status::Completed`].
    #[display("{_0}")]
    Transition(payment::TransitionError),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{CreateReservation, ProcessPayment},
        domain::payment,
        infra::gateway::Fixed,
        test_util, Command as _,
    };

    use super::{ExecutionError, RefundPayment};

    #[tokio::test]
    async fn refunds_completed_payment_once() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 25).await;
        let r = svc
            .execute(CreateReservation {
                user_id: user.id,
                court_id: court.id,
                starts_at: test_util::tomorrow_at(12, 0),
                ends_at: test_util::tomorrow_at(14, 0),
                notes: None,
            })
            .await
            .unwrap();
        let p = svc
            .execute(ProcessPayment {
                user_id: user.id,
                reservation_id: r.id,
                method: payment::Method::BankTransfer,
                amount: r.total,
                card: None,
            })
            .await
            .unwrap();

        let refunded = svc
            .execute(RefundPayment {
                payment_id: p.id,
                reason: Some("court closed".into()),
            })
            .await
            .unwrap();
        assert_eq!(refunded.status, payment::Status::Refunded);
        assert_eq!(
            refunded.gateway_response.map(|r| r.to_string()).as_deref(),
            Some("Refunded: court closed"),
        );

        let err = svc
            .execute(RefundPayment {
                payment_id: p.id,
                reason: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::Transition(_)));
    }

    #[tokio::test]
    async fn fails_for_unknown_payment() {
        let (svc, _queue) = test_util::service(Fixed::Approve);

        let err = svc
            .execute(RefundPayment {
                payment_id: payment::Id::new(),
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::PaymentNotExists(_)));
    }
}
