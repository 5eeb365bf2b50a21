//! [`Command`] for resetting a [`user::Password`] with a [`ResetToken`].

use argon2::password_hash;
use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Password, PasswordReset};
use crate::{
    domain::{user, user::ResetToken, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for resetting a [`Password`] of a [`User`] with the
/// [`ResetToken`] of its pending [`PasswordReset`].
#[derive(Clone, Debug)]
pub struct ResetPassword {
    /// [`ResetToken`] authorizing the reset.
    pub token: ResetToken,

    /// New [`Password`] of the [`User`].
    pub new_password: SecretBox<user::Password>,
}

impl<Db, Gw> Command<ResetPassword> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'l> Database<
            Select<By<Option<User>, &'l ResetToken>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<User>, user::Id>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<User, user::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ResetPassword) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ResetPassword {
            token,
            new_password,
        } = cmd;

        let password_hash =
            user::PasswordHash::new(new_password.expose_secret())
                .map_err(E::PasswordHashing)
                .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let user_id = tx
            .execute(Select(By::new(&token)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvalidToken)
            .map_err(tracerr::wrap!())?
            .id;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::InvalidToken)
            .map_err(tracerr::wrap!())?;
        match &user.password_reset {
            Some(reset) if reset.token == token => {
                if reset.is_expired() {
                    return Err(tracerr::new!(E::ExpiredToken));
                }
            }
            Some(_) | None => return Err(tracerr::new!(E::InvalidToken)),
        }

        user.password_hash = password_hash;
        user.password_reset = None;
        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`ResetPassword`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`ResetToken`] is expired.
    #[display("Password reset token is expired")]
    ExpiredToken,

    /// [`ResetToken`] doesn't match any pending [`PasswordReset`].
    #[display("Password reset token is invalid")]
    InvalidToken,

    /// New [`Password`] cannot be hashed.
    #[display("Failed to hash password: {_0}")]
    #[from(ignore)]
    PasswordHashing(#[error(not(source))] password_hash::Error),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::operations::Update;
    use secrecy::SecretBox;

    use crate::{
        domain::user::{self, PasswordReset, ResetExpirationDateTime},
        infra::{gateway::Fixed, Database as _},
        test_util, Command as _,
    };

    use super::{ExecutionError, ResetPassword};

    fn cmd(reset: &PasswordReset) -> ResetPassword {
        ResetPassword {
            token: reset.token.clone(),
            new_password: SecretBox::new(Box::new(
                user::Password::new("Brand1New").unwrap(),
            )),
        }
    }

    #[tokio::test]
    async fn resets_password_once() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let mut user = test_util::user(&svc, "player@example.com").await;
        let reset = PasswordReset::issue();
        user.password_reset = Some(reset.clone());
        svc.database().execute(Update(user)).await.unwrap();

        let updated = svc.execute(cmd(&reset)).await.unwrap();
        assert!(updated.password_reset.is_none());
        assert!(updated
            .password_hash
            .verify(&user::Password::new_unchecked("Brand1New")));

        let err = svc.execute(cmd(&reset)).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidToken));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let mut user = test_util::user(&svc, "player@example.com").await;
        let mut reset = PasswordReset::issue();
        reset.expires_at =
            ResetExpirationDateTime::now() - Duration::from_secs(1);
        user.password_reset = Some(reset.clone());
        svc.database().execute(Update(user)).await.unwrap();

        let err = svc.execute(cmd(&reset)).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::ExpiredToken));
    }
}
