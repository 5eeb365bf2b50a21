//! [`Command`] for updating privileges of a [`User`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{user, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for granting or revoking administrator rights of a [`User`],
/// or (de)activating it.
///
/// Only administrators are allowed to execute it.
#[derive(Clone, Copy, Debug)]
pub struct UpdateUserPrivileges {
    /// ID of the administrator [`User`] performing the update.
    pub by: user::Id,

    /// ID of the [`User`] to update.
    pub user_id: user::Id,

    /// New value of the [`User::is_admin`] indicator, if it changes.
    pub is_admin: Option<bool>,

    /// New value of the [`User::is_active`] indicator, if it changes.
    pub is_active: Option<bool>,
}

impl<Db, Gw> Command<UpdateUserPrivileges> for Service<Db, Gw>
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
        cmd: UpdateUserPrivileges,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateUserPrivileges {
            by,
            user_id,
            is_admin,
            is_active,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let admin = tx
            .execute(Select(By::<Option<User>, _>::new(by)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::UserNotExists(by))
            .map_err(tracerr::wrap!())?;
        if !admin.is_admin || !admin.is_active {
            return Err(tracerr::new!(E::NotAdmin(by)));
        }

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

        let before = (user.is_admin, user.is_active);
        if let Some(is_admin) = is_admin {
            user.is_admin = is_admin;
        }
        if let Some(is_active) = is_active {
            user.is_active = is_active;
        }
        if before == (user.is_admin, user.is_active) {
            return Ok(user);
        }

        tx.execute(Update(user.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(
            %user_id,
            admin_id = %by,
            is_admin = user.is_admin,
            is_active = user.is_active,
            "user privileges updated",
        );
        Ok(user)
    }
}

/// Error of [`UpdateUserPrivileges`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`User`] performing the update is not an administrator.
    #[display("`User(id: {_0})` is not an administrator")]
    #[from(ignore)]
    NotAdmin(#[error(not(source))] user::Id),

    /// [`User`] doesn't exist.
    #[display("`User(id: {_0})` does not exist")]
    #[from(ignore)]
    UserNotExists(#[error(not(source))] user::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::Update;

    use crate::{
        domain::user,
        infra::{gateway::Fixed, Database as _},
        test_util, Command as _,
    };

    use super::{ExecutionError, UpdateUserPrivileges};

    #[tokio::test]
    async fn lets_admins_deactivate_users() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let mut admin = test_util::user(&svc, "admin@example.com").await;
        admin.is_admin = true;
        svc.database().execute(Update(admin.clone())).await.unwrap();
        let user = test_util::user(&svc, "player@example.com").await;

        let updated = svc
            .execute(UpdateUserPrivileges {
                by: admin.id,
                user_id: user.id,
                is_admin: None,
                is_active: Some(false),
            })
            .await
            .unwrap();

        assert!(!updated.is_active);
        assert!(!updated.is_admin);
    }

    #[tokio::test]
    async fn forbids_non_admins() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;

        let err = svc
            .execute(UpdateUserPrivileges {
                by: user.id,
                user_id: user.id,
                is_admin: Some(true),
                is_active: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotAdmin(_)));
    }

    #[tokio::test]
    async fn fails_for_unknown_user() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let mut admin = test_util::user(&svc, "admin@example.com").await;
        admin.is_admin = true;
        svc.database().execute(Update(admin.clone())).await.unwrap();

        let err = svc
            .execute(UpdateUserPrivileges {
                by: admin.id,
                user_id: user::Id::new(),
                is_admin: Some(true),
                is_active: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::UserNotExists(_)));
    }
}
