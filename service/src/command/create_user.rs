//! [`Command`] for creating a new [`User`].

use argon2::password_hash;
use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use secrecy::{ExposeSecret, SecretBox};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::user::{Email, Name, Password, Phone};
use crate::{
    domain::{user, User},
    infra::{
        database::{self, constraint},
        Database,
    },
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`User`].
#[derive(Clone, Debug)]
pub struct CreateUser {
    /// [`Name`] of a new [`User`].
    pub name: user::Name,

    /// [`Email`] of a new [`User`].
    pub email: user::Email,

    /// [`Password`] of a new [`User`].
    pub password: SecretBox<user::Password>,

    /// [`Phone`] of a new [`User`].
    pub phone: Option<user::Phone>,

    /// Indicator whether a new [`User`] is an administrator.
    pub is_admin: bool,
}

impl<Db, Gw> Command<CreateUser> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: for<'l> Database<
            Select<By<Option<User>, &'l user::Email>>,
            Ok = Option<User>,
            Err = Traced<database::Error>,
        > + Database<Insert<User>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = User;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateUser) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateUser {
            name,
            email,
            password,
            phone,
            is_admin,
        } = cmd;

        let password_hash = user::PasswordHash::new(password.expose_secret())
            .map_err(E::PasswordHashing)
            .map_err(tracerr::wrap!())?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let existing = tx
            .execute(Select(By::new(&email)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if existing.is_some() {
            return Err(tracerr::new!(E::EmailOccupied(email)));
        }

        let user = User {
            id: user::Id::new(),
            name,
            email,
            password_hash,
            phone,
            is_admin,
            is_active: true,
            password_reset: None,
            created_at: DateTime::now().coerce(),
        };

        // Concurrent registration may still win the race for the `Email`.
        let inserted = tx.execute(Insert(user.clone())).await;
        if let Err(e) = &inserted {
            if e.as_ref().is_unique_violation(Some(constraint::USERS_EMAIL)) {
                return Err(tracerr::new!(E::EmailOccupied(user.email)));
            }
        }
        inserted.map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(user)
    }
}

/// Error of [`CreateUser`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`user::Email`] is already occupied.
    #[display("`{_0}` email is occupied")]
    #[from(ignore)]
    EmailOccupied(#[error(not(source))] user::Email),

    /// [`user::Password`] cannot be hashed.
    #[display("Failed to hash password: {_0}")]
    #[from(ignore)]
    PasswordHashing(#[error(not(source))] password_hash::Error),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        domain::user, infra::gateway::Fixed, test_util, Command as _,
    };

    use super::{CreateUser, ExecutionError};

    fn cmd(email: &str) -> CreateUser {
        CreateUser {
            name: user::Name::new("Jane Roe").unwrap(),
            email: user::Email::new(email).unwrap(),
            password: SecretBox::new(Box::new(
                user::Password::new("Secret123").unwrap(),
            )),
            phone: None,
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn registers_active_user() {
        let (svc, _queue) = test_util::service(Fixed::Approve);

        let user = svc.execute(cmd("jane@example.com")).await.unwrap();

        assert!(user.is_active);
        assert!(!user.is_admin);
        assert!(user
            .password_hash
            .verify(&user::Password::new_unchecked("Secret123")));
    }

    #[tokio::test]
    async fn rejects_occupied_email_case_insensitively() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        drop(svc.execute(cmd("jane@example.com")).await.unwrap());

        let err = svc.execute(cmd("JANE@example.com")).await.unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::EmailOccupied(_)));
    }
}
