//! Postgres database clients acquiring their [`Connection`]s lazily.

use std::{future::Future, sync::Arc};

use tokio::sync::{Mutex, RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// [`Connection`] acquired on the first use.
#[derive(Debug)]
struct Lazy<C>(RwLock<Option<C>>);

impl<C> Default for Lazy<C> {
    fn default() -> Self {
        Self(RwLock::new(None))
    }
}

impl<C> Lazy<C> {
    /// Returns the held [`Connection`], acquiring it with the provided
    /// function if there is none yet.
    async fn get_or_acquire<F, Fut>(
        &self,
        acquire: F,
    ) -> Result<RwLockReadGuard<'_, C>, Traced<database::Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C, Traced<database::Error>>>,
    {
        let read = self.0.read().await;
        let guard = if read.is_some() {
            read
        } else {
            drop(read);
            let mut write = self.0.write().await;
            if write.is_none() {
                *write = Some(acquire().await.map_err(tracerr::wrap!())?);
            }
            write.downgrade()
        };
        Ok(RwLockReadGuard::map(guard, |c| {
            c.as_ref().expect("acquired above and never taken under guard")
        }))
    }

    /// Takes the held [`Connection`] out, so the next use acquires a new one.
    async fn take(&self) -> Option<C> {
        self.0.write().await.take()
    }
}

/// Acquires a new [`connection::NonTx`] from the provided
/// [`connection::Pool`].
async fn acquire(
    pool: &connection::Pool,
) -> Result<connection::NonTx, Traced<database::Error>> {
    pool.get()
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Non-transactional Postgres database client.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to acquire [`Connection`]s from.
    pub(crate) pool: connection::Pool,

    /// [`Connection`] reused by the non-transactional operations.
    connection: Arc<Lazy<connection::NonTx>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client over the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::default(),
        }
    }

    /// Returns the [`Connection`] of this [`NonTx`] client.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        self.connection.get_or_acquire(|| acquire(&self.pool)).await
    }
}

/// Transactional Postgres database client.
///
/// The transaction is started on the first operation, reusing the
/// [`Connection`] of the [`NonTx`] client it's created from, if any.
/// Dropping a [`Tx`] without committing rolls the transaction back.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`NonTx`] client this [`Tx`] is created from, until its
    /// [`Connection`] is reused.
    origin: Arc<Mutex<Option<NonTx>>>,

    /// [`connection::Tx`] of this client.
    connection: Arc<Lazy<connection::Tx>>,
}

impl Tx {
    /// Creates a new [`Tx`] client from the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            origin: Arc::new(Mutex::new(Some(client))),
            connection: Arc::default(),
        }
    }

    /// Returns the [`connection::Tx`] of this [`Tx`] client, starting the
    /// transaction if it's not started yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        self.connection
            .get_or_acquire(|| async {
                let origin = self.origin.lock().await.take();
                let conn = match origin {
                    Some(client) => match client.connection.take().await {
                        Some(conn) => conn,
                        None => acquire(&client.pool)
                            .await
                            .map_err(tracerr::wrap!())?,
                    },
                    None => {
                        return Err(tracerr::new!(database::Error::from(
                            postgres::Error::TxFinished,
                        )));
                    }
                };
                connection::Tx::from_non_tx(conn)
                    .await
                    .map_err(tracerr::wrap!())
            })
            .await
    }

    /// Commits this [`Tx`] client.
    ///
    /// Does nothing if no operations have been performed.
    ///
    /// # Errors
    ///
    /// If failed to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        drop(self.origin.lock().await.take());
        match self.connection.take().await {
            Some(tx) => tx.commit().await.map_err(tracerr::wrap!()),
            None => Ok(()),
        }
    }
}

/// Implements [`Connection`] for a client by delegating to the [`Connection`]
/// returned by its `connection()` method.
macro_rules! delegate_connection {
    ($client:ty) => {
        impl Connection for $client {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &[&(dyn ToSql + Sync)],
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn batch_exec(
                &self,
                query: &str,
            ) -> Result<(), Traced<database::Error>> {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .batch_exec(query)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}

delegate_connection!(NonTx);
delegate_connection!(Tx);
