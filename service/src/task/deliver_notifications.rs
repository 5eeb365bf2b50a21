//! [`DeliverNotifications`] [`Task`].

use std::{convert::Infallible, error::Error};

use common::operations::{By, Perform, Select, Start};
use derive_more::{Display, Error as StdError, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user, User},
    infra::{
        database,
        mailer::{self, Email},
        Database, Mailer,
    },
    notification::{Notification, Queue},
    Service,
};

use super::Task;

/// Setup of [`DeliverNotifications`] [`Task`].
#[derive(Debug)]
pub struct Setup<M> {
    /// [`Queue`] to consume [`Notification`]s from.
    pub queue: Queue,

    /// [`Mailer`] to deliver [`Notification`]s with.
    pub mailer: M,
}

/// [`Task`] delivering enqueued [`Notification`]s to their recipients by
/// email.
#[derive(Clone, Copy, Debug)]
pub struct DeliverNotifications<S, M> {
    /// [`Service`] instance.
    service: S,

    /// [`Mailer`] to send [`Email`]s with.
    mailer: M,
}

impl<S, M> DeliverNotifications<S, M> {
    /// Creates a new [`DeliverNotifications`] [`Task`].
    #[must_use]
    pub fn new(service: S, mailer: M) -> Self {
        Self { service, mailer }
    }
}

impl<Db, Gw, M> Task<Start<By<DeliverNotifications<Self, M>, Setup<M>>>>
    for Service<Db, Gw>
where
    DeliverNotifications<Self, M>:
        Task<Perform<Notification>, Ok = (), Err: Error>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<DeliverNotifications<Self, M>, Setup<M>>>,
    ) -> Result<Self::Ok, Self::Err> {
        let Setup { mut queue, mailer } = by.into_inner();
        let task = DeliverNotifications::new(self.clone(), mailer);

        while let Some(notification) = queue.next().await {
            let recipient = notification.recipient();
            if let Err(e) = task.execute(Perform(notification)).await {
                log::error!(
                    %recipient,
                    "`task::DeliverNotifications` failed: {e}",
                );
            }
        }
        log::debug!("notification queue is closed");
        Ok(())
    }
}

impl<Db, Gw, M> Task<Perform<Notification>>
    for DeliverNotifications<Service<Db, Gw>, M>
where
    Db: Database<
        Select<By<Option<User>, user::Id>>,
        Ok = Option<User>,
        Err = Traced<database::Error>,
    >,
    M: Mailer<Perform<Email>, Ok = (), Err = Traced<mailer::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Perform(notification): Perform<Notification>,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let user_id = notification.recipient();
        let user = self
            .service
            .database()
            .execute(Select(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        let email = render(&notification, &user);
        self.mailer
            .execute(Perform(email))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::debug!(%user_id, "{notification} notification delivered");
        Ok(())
    }
}

/// Renders the provided [`Notification`] as an [`Email`] to the provided
/// [`User`].
fn render(notification: &Notification, user: &User) -> Email {
    let (subject, details) = match notification {
        Notification::ReservationConfirmed(r) => (
            "Your reservation is confirmed",
            format!(
                "your reservation {} from {} to {} is confirmed.\n\
                 Total: {}.",
                r.id,
                r.slot.starts_at().to_rfc3339(),
                r.slot.ends_at().to_rfc3339(),
                r.total,
            ),
        ),
        Notification::ReservationCancelled(r) => (
            "Your reservation is cancelled",
            format!(
                "your reservation {} from {} to {} has been cancelled.\n\
                 Completed payments of it are refunded.",
                r.id,
                r.slot.starts_at().to_rfc3339(),
                r.slot.ends_at().to_rfc3339(),
            ),
        ),
        Notification::PaymentCompleted(p) => (
            "Payment received",
            format!(
                "we have received your payment of {} for reservation {}.\n\
                 Transaction: {}.",
                p.amount, p.reservation_id, p.transaction_id,
            ),
        ),
        Notification::PasswordReset { reset, .. } => (
            "Password reset requested",
            format!(
                "use the following token to reset your password: {}\n\
                 It expires at {}. Ignore this email if you didn't request \
                 the reset.",
                reset.token,
                reset.expires_at.to_rfc3339(),
            ),
        ),
    };
    Email {
        to: user.email.clone(),
        subject: subject.into(),
        body: format!("Hello {},\n\n{details}\n", user.name),
    }
}

/// Error of [`DeliverNotifications`] execution.
#[derive(Debug, Display, From, StdError)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Mailer`] error.
    #[display("`Mailer` failed: {_0}")]
    Mailer(mailer::Error),

    /// Recipient [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use std::sync::{Arc, Mutex};

    use common::operations::Perform;
    use tracerr::Traced;

    use crate::{
        domain::user::{self, PasswordReset},
        infra::{
            gateway::Fixed,
            mailer::{self, Email},
            Mailer,
        },
        notification::Notification,
        test_util,
    };

    use super::{DeliverNotifications, Task as _};

    /// [`Mailer`] remembering the sent [`Email`]s.
    #[derive(Clone, Debug, Default)]
    struct Outbox(Arc<Mutex<Vec<Email>>>);

    impl Mailer<Perform<Email>> for Outbox {
        type Ok = ();
        type Err = Traced<mailer::Error>;

        async fn execute(
            &self,
            Perform(email): Perform<Email>,
        ) -> Result<Self::Ok, Self::Err> {
            self.0.lock().unwrap().push(email);
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_to_recipient_email() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let outbox = Outbox::default();
        let task = DeliverNotifications::new(svc.clone(), outbox.clone());

        let reset = PasswordReset::issue();
        task.execute(Perform(Notification::PasswordReset {
            user_id: user.id,
            reset: reset.clone(),
        }))
        .await
        .unwrap();

        let sent = outbox.0.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, user.email);
        assert!(sent[0].body.contains(&reset.token.to_string()));
    }

    #[tokio::test]
    async fn fails_for_unknown_recipient() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let outbox = Outbox::default();
        let task = DeliverNotifications::new(svc, outbox.clone());

        let res = task
            .execute(Perform(Notification::PasswordReset {
                user_id: user::Id::new(),
                reset: PasswordReset::issue(),
            }))
            .await;

        assert!(res.is_err());
        assert!(outbox.0.lock().unwrap().is_empty());
    }
}
