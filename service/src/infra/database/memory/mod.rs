//! In-memory [`Database`] implementation.
//!
//! Transactions are serializable: a [`Tx`] holds the whole store exclusively
//! until it's committed or dropped, and its writes are applied only on commit.

mod impls;

use std::{collections::HashMap, future::Future, sync::Arc};

use derive_more::{Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{court, payment, reservation, user, Court, Payment, Reservation, User},
    infra::database::{self, constraint},
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self(NonTx {
            state: Arc::new(Mutex::new(State::default())),
        })
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// Committed [`State`] of the store.
    state: Arc<Mutex<State>>,
}

/// Transactional [`Memory`] client.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`Staged`] changes, or [`None`] once committed.
    staged: Arc<Mutex<Option<Staged>>>,
}

/// Changes of a [`Tx`] not committed yet.
#[derive(Debug)]
struct Staged {
    /// Exclusive access to the committed [`State`].
    guard: OwnedMutexGuard<State>,

    /// Working copy of the [`State`].
    state: State,
}

impl NonTx {
    /// Starts a new [`Tx`], waiting for all the other ones to finish.
    async fn begin(&self) -> Tx {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let state = guard.clone();
        Tx {
            staged: Arc::new(Mutex::new(Some(Staged { guard, state }))),
        }
    }
}

impl Tx {
    /// Applies the changes of this [`Tx`] to the store.
    ///
    /// # Errors
    ///
    /// If this [`Tx`] has been committed already.
    async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Staged { mut guard, state } = self
            .staged
            .lock()
            .await
            .take()
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))?;
        *guard = state;
        Ok(())
    }
}

/// Access to a [`State`] of a [`Memory`] database.
pub trait Storage {
    /// Reads the [`State`] with the provided function.
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible.
    fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;

    /// Modifies the [`State`] with the provided function.
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible, or the function fails.
    fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

impl Storage for NonTx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&*self.state.lock().await))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> Result<R, Traced<database::Error>> {
        f(&mut *self.state.lock().await)
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl Storage for Tx {
    async fn read<R>(
        &self,
        f: impl FnOnce(&State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        self.staged
            .lock()
            .await
            .as_ref()
            .map(|s| f(&s.state))
            .ok_or(Error::TxFinished)
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }

    async fn write<R>(
        &self,
        f: impl FnOnce(&mut State) -> Result<R, Error>,
    ) -> Result<R, Traced<database::Error>> {
        self.staged
            .lock()
            .await
            .as_mut()
            .ok_or(Error::TxFinished)
            .and_then(|s| f(&mut s.state))
            .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

/// Stored entities.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Stored [`User`]s.
    users: HashMap<user::Id, User>,

    /// Stored [`Court`]s.
    courts: HashMap<court::Id, Court>,

    /// Stored [`Reservation`]s.
    reservations: HashMap<reservation::Id, Reservation>,

    /// Stored [`Payment`]s.
    payments: HashMap<payment::Id, Payment>,
}

impl State {
    /// Stores the provided [`User`], replacing the existing one.
    fn put_user(&mut self, user: User) -> Result<(), Error> {
        if self
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(Error::UniqueViolation(constraint::USERS_EMAIL));
        }
        _ = self.users.insert(user.id, user);
        Ok(())
    }

    /// Stores the provided [`Court`], replacing the existing one.
    fn put_court(&mut self, court: Court) {
        _ = self.courts.insert(court.id, court);
    }

    /// Stores the provided [`Reservation`], replacing the existing one.
    fn put_reservation(&mut self, reservation: Reservation) -> Result<(), Error> {
        if reservation.is_active()
            && self.reservations.values().any(|r| {
                r.id != reservation.id
                    && r.court_id == reservation.court_id
                    && r.is_active()
                    && r.slot.overlaps(&reservation.slot)
            })
        {
            return Err(Error::ExclusionViolation(
                constraint::RESERVATIONS_NO_OVERLAP,
            ));
        }
        _ = self.reservations.insert(reservation.id, reservation);
        Ok(())
    }

    /// Stores the provided [`Payment`], replacing the existing one.
    fn put_payment(&mut self, payment: Payment) -> Result<(), Error> {
        if self.payments.values().any(|p| {
            p.id != payment.id && p.transaction_id == payment.transaction_id
        }) {
            return Err(Error::UniqueViolation(
                constraint::PAYMENTS_TRANSACTION_ID,
            ));
        }
        _ = self.payments.insert(payment.id, payment);
        Ok(())
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// Unique constraint is violated.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),

    /// Exclusion constraint is violated.
    #[display("Exclusion constraint `{_0}` is violated")]
    ExclusionViolation(#[error(not(source))] &'static str),

    /// Row of the named table references a missing entity.
    #[display("Foreign key of `{_0}` is violated")]
    ForeignKeyViolation(#[error(not(source))] &'static str),

    /// Transaction is used after being committed.
    #[display("Transaction is finished already")]
    TxFinished,
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        matches!(
            self,
            Self::UniqueViolation(c) if constraint.map_or(true, |x| x == *c),
        )
    }

    /// Checks if the error is an exclusion violation of the specified
    /// constraint.
    #[must_use]
    pub fn is_exclusion_violation(&self, constraint: Option<&str>) -> bool {
        matches!(
            self,
            Self::ExclusionViolation(c) if constraint.map_or(true, |x| x == *c),
        )
    }
}
