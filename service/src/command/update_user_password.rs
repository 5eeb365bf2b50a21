//! [`Command`] for updating an [`user::Password`].

use argon2::password_hash;
use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret as _, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::Password;
use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating an [`user::Password`].
#[derive(Clone, Debug)]
pub struct UpdateUserPassword {
    /// ID of the [`User`] which [`Password`] should be updated.
    pub user_id: user::Id,

    /// New [`Password`] of the [`User`].
    pub new_password: SecretBox<user::Password>,

    /// Old [`Password`] of the [`User`].
    pub old_password: SecretBox<user::Password>,
}

impl<Db, Gw> Command<UpdateUserPassword> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
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

    async fn execute(
        &self,
        cmd: UpdateUserPassword,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserPassword {
            user_id,
            new_password,
            old_password,
        } = cmd;

        let new_password_hash =
            user::PasswordHash::new(new_password.expose_secret())
                .map_err(E::PasswordHashing)
                .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Lock rows reference existing `User`s only.
        _ = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;

        // Avoid concurrent actions upon the same `User`.
        tx.execute(Lock(By::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut user = tx
            .execute(Select(By::<Option<User>, _>::new(user_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(user_id))
            .map_err(tracerr::wrap!())?;
        if !user.password_hash.verify(old_password.expose_secret()) {
            return Err(tracerr::new!(E::WrongPassword));
        }

        user.password_hash = new_password_hash;
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

/// Error of [`UpdateUserPassword`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// New [`Password`] cannot be hashed.
    #[display("Failed to hash password: {_0}")]
    #[from(ignore)]
    PasswordHashing(#[error(not(source))] password_hash::Error),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),

    /// Wrong old [`Password`] provided.
    #[display("Wrong old password")]
    WrongPassword,
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        domain::user, infra::gateway::Fixed, test_util, Command as _,
    };

    use super::{ExecutionError, UpdateUserPassword};

    fn secret(password: &str) -> SecretBox<user::Password> {
        SecretBox::new(Box::new(user::Password::new_unchecked(password)))
    }

    #[tokio::test]
    async fn changes_password_when_old_one_matches() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;

        let updated = svc
            .execute(UpdateUserPassword {
                user_id: user.id,
                new_password: secret("NewSecret1"),
                old_password: secret(test_util::PASSWORD),
            })
            .await
            .unwrap();

        assert!(updated
            .password_hash
            .verify(&user::Password::new_unchecked("NewSecret1")));
    }

    #[tokio::test]
    async fn rejects_wrong_old_password() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;

        let err = svc
            .execute(UpdateUserPassword {
                user_id: user.id,
                new_password: secret("NewSecret1"),
                old_password: secret("Wrong1234"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::WrongPassword));
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let (svc, _queue) = test_util::service(Fixed::Approve);

        let err = svc
            .execute(UpdateUserPassword {
                user_id: user::Id::new(),
                new_password: secret("N3wPassword"),
                old_password: secret(test_util::PASSWORD),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
