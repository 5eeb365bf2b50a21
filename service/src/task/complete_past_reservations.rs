//! [`CompletePastReservations`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::{
    operations::{
        By, Commit, Lock, Perform, Select, Start, Transact, Transacted, Update,
    },
    DateTime,
};
use derive_more::{Display, Error as StdError, From};
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{reservation, Reservation},
    infra::{database, Database},
    read, Service,
};

use super::Task;

/// Configuration for [`CompletePastReservations`] [`Task`].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Interval between sweeps.
    pub interval: time::Duration,
}

/// [`Task`] moving confirmed [`Reservation`]s which have already ended into
/// the [`reservation::Status::Completed`] status.
#[derive(Clone, Copy, Debug)]
pub struct CompletePastReservations<S> {
    /// [`Service`] instance.
    service: S,
}

impl<S> CompletePastReservations<S> {
    /// Creates a new [`CompletePastReservations`] [`Task`] over the provided
    /// [`Service`].
    #[must_use]
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

impl<Db, Gw> Task<Start<By<CompletePastReservations<Self>, Config>>>
    for Service<Db, Gw>
where
    CompletePastReservations<Self>:
        Task<Perform<()>, Ok = usize, Err: Error> + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<CompletePastReservations<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = CompletePastReservations::new(self.clone());

        let mut interval = interval(config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("{n} reservations completed"),
                Err(e) => {
                    log::error!("`task::CompletePastReservations` failed: {e}");
                }
            }
        }
    }
}

impl<Db, Gw> Task<Perform<()>> for CompletePastReservations<Service<Db, Gw>>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Vec<Reservation>, read::reservation::list::Selector>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reservation>, reservation::Id>>,
            Ok = Option<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Reservation, reservation::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Reservation>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = usize;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .service
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let now = DateTime::now();
        let ended = tx
            .execute(Select(By::new(read::reservation::list::Selector {
                statuses: vec![reservation::Status::Confirmed],
                ends_by: Some(now),
                ..read::reservation::list::Selector::default()
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut count = 0;
        for listed in ended {
            tx.execute(Lock(By::<Reservation, _>::new(listed.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;

            // Could have been cancelled before the lock was acquired.
            let Some(mut r) = tx
                .execute(Select(By::<Option<Reservation>, _>::new(listed.id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|r| r.status == reservation::Status::Confirmed)
            else {
                continue;
            };

            r.complete().map_err(tracerr::from_and_wrap!(=> E))?;
            tx.execute(Update(r))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
            count += 1;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(count)
    }
}

/// Error of [`CompletePastReservations`] execution.
#[derive(Debug, Display, From, StdError)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Reservation`] cannot be completed.
    #[display("Cannot complete `Reservation`: {_0}")]
    Transition(reservation::TransitionError),
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{
            By, Commit, Insert, Lock, Perform, Select, Transact, Update,
        },
        DateTime,
    };
    use tracerr::Traced;

    use crate::{
        domain::{
            court,
            reservation::{self, Slot},
            user, Reservation,
        },
        infra::{database, gateway::Fixed, Database},
        notification, read,
        test_util::{self, usd},
        Service,
    };

    use super::{CompletePastReservations, Task as _};

    /// Returns a [`Reservation`] of the provided `Court` which ended the
    /// provided number of hours ago.
    fn ended(
        court_id: court::Id,
        status: reservation::Status,
        hours_ago: u32,
    ) -> Reservation {
        let hour = std::time::Duration::from_secs(60 * 60);
        Reservation {
            id: reservation::Id::new(),
            user_id: user::Id::new(),
            court_id,
            slot: Slot::new(
                (DateTime::now() - hour * (hours_ago + 1)).coerce(),
                (DateTime::now() - hour * hours_ago).coerce(),
            )
            .unwrap(),
            total: usd(50),
            status,
            notes: None,
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
        }
    }

    #[tokio::test]
    async fn completes_only_ended_confirmed_reservations() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let court = test_util::court(&svc, 50).await;
        let hour = std::time::Duration::from_secs(60 * 60);

        let stored = |status, hours_ago| ended(court.id, status, hours_ago);
        let done = stored(reservation::Status::Confirmed, 2);
        let pending = stored(reservation::Status::Pending, 4);
        let mut upcoming = stored(reservation::Status::Confirmed, 0);
        upcoming.slot = Slot::new(
            (DateTime::now() + hour).coerce(),
            (DateTime::now() + hour * 2).coerce(),
        )
        .unwrap();
        for r in [&done, &pending, &upcoming] {
            svc.database().execute(Insert(r.clone())).await.unwrap();
        }

        let task = CompletePastReservations::new(svc.clone());
        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        for (r, status) in [
            (done, reservation::Status::Completed),
            (pending, reservation::Status::Pending),
            (upcoming, reservation::Status::Confirmed),
        ] {
            let stored: Option<Reservation> =
                svc.database().execute(Select(By::new(r.id))).await.unwrap();
            assert_eq!(stored.unwrap().status, status);
        }
    }

    /// [`Database`] listing the [`Reservation`]s as they were before their
    /// concurrent modification.
    #[derive(Clone, Debug)]
    struct Outdated<D> {
        db: D,
        listed: Vec<Reservation>,
    }

    impl<D> Database<Transact> for Outdated<D>
    where
        D: Database<Transact, Err = Traced<database::Error>>,
    {
        type Ok = Outdated<D::Ok>;
        type Err = Traced<database::Error>;

        async fn execute(&self, op: Transact) -> Result<Self::Ok, Self::Err> {
            Ok(Outdated {
                db: self.db.execute(op).await?,
                listed: self.listed.clone(),
            })
        }
    }

    impl<D>
        Database<Select<By<Vec<Reservation>, read::reservation::list::Selector>>>
        for Outdated<D>
    {
        type Ok = Vec<Reservation>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Select<By<Vec<Reservation>, read::reservation::list::Selector>>,
        ) -> Result<Self::Ok, Self::Err> {
            Ok(self.listed.clone())
        }
    }

    macro_rules! delegate {
        ($($op:ty => $ok:ty),* $(,)?) => {$(
            impl<D> Database<$op> for Outdated<D>
            where
                D: Database<$op, Ok = $ok, Err = Traced<database::Error>>,
            {
                type Ok = $ok;
                type Err = Traced<database::Error>;

                async fn execute(
                    &self,
                    op: $op,
                ) -> Result<Self::Ok, Self::Err> {
                    self.db.execute(op).await
                }
            }
        )*};
    }

    delegate! {
        Select<By<Option<Reservation>, reservation::Id>> => Option<Reservation>,
        Lock<By<Reservation, reservation::Id>> => (),
        Update<Reservation> => (),
        Commit => (),
    }

    #[tokio::test]
    async fn keeps_reservations_cancelled_meanwhile() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let court = test_util::court(&svc, 50).await;
        let confirmed = ended(court.id, reservation::Status::Confirmed, 1);
        let mut cancelled = confirmed.clone();
        cancelled.status = reservation::Status::Cancelled;
        svc.database().execute(Insert(cancelled)).await.unwrap();

        let (notifier, _queue) = notification::channel();
        let outdated = Service::from_parts(
            svc.config().clone(),
            Outdated {
                db: svc.database().clone(),
                listed: vec![confirmed.clone()],
            },
            Fixed::Approve,
            notifier,
        );
        let task = CompletePastReservations::new(outdated);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        let stored: Option<Reservation> = svc
            .database()
            .execute(Select(By::new(confirmed.id)))
            .await
            .unwrap();
        assert_eq!(stored.unwrap().status, reservation::Status::Cancelled);
    }
}
