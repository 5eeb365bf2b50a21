//! [`Command`] for requesting a [`PasswordReset`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

#[cfg(doc)]
use crate::domain::user::{Email, Password};
use crate::{
    domain::{user, user::PasswordReset, User},
    infra::{database, Database},
    notification::Notification,
    Service,
};

use super::Command;

/// [`Command`] for requesting a [`PasswordReset`] of a [`User`] by its
/// [`Email`].
///
/// Succeeds silently if no active [`User`] has the provided [`Email`], so the
/// registered [`Email`]s cannot be enumerated.
#[derive(Clone, Debug, From)]
pub struct RequestPasswordReset {
    /// [`Email`] of the [`User`] who forgot its [`Password`].
    pub email: user::Email,
}

impl<Db, Gw> Command<RequestPasswordReset> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RequestPasswordReset,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RequestPasswordReset { email } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let Some(mut user) = tx
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|u| u.is_active)
        else {
            log::debug!("password reset requested for unknown `{email}`");
            return Ok(());
        };

        tx.execute(Lock(By::new(user.id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let reset = PasswordReset::issue();
        user.password_reset = Some(reset.clone());
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        self.notifier().notify(Notification::PasswordReset {
            user_id: user.id,
            reset,
        });

        Ok(())
    }
}

/// Error of [`RequestPasswordReset`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Select};

    use crate::{
        domain::{user, User},
        infra::{gateway::Fixed, Database as _},
        notification::Notification,
        test_util, Command as _,
    };

    use super::RequestPasswordReset;

    #[tokio::test]
    async fn stores_and_sends_reset_token() {
        let (svc, mut queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;

        svc.execute(RequestPasswordReset {
            email: user.email.clone(),
        })
        .await
        .unwrap();

        let Some(Notification::PasswordReset { user_id, reset }) =
            queue.try_next()
        else {
            panic!("expected password reset notification");
        };
        assert_eq!(user_id, user.id);

        let stored = svc
            .database()
            .execute(Select(By::<Option<User>, _>::new(user.id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.password_reset, Some(reset));
    }

    #[tokio::test]
    async fn succeeds_silently_for_unknown_email() {
        let (svc, mut queue) = test_util::service(Fixed::Approve);

        svc.execute(RequestPasswordReset {
            email: user::Email::new("nobody@example.com").unwrap(),
        })
        .await
        .unwrap();

        assert!(queue.try_next().is_none());
    }
}
