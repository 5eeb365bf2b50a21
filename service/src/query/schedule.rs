//! [`CourtSchedule`] definition.

use common::{
    operations::{By, Select},
    Date,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::reservation::Status;
use crate::{
    domain::{court, Court, Reservation},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] listing not [`Status::Cancelled`] [`Reservation`]s of a
/// [`Court`] at the provided UTC [`Date`], ordered by their start.
#[derive(Clone, Copy, Debug)]
pub struct CourtSchedule {
    /// ID of the [`Court`] to list the [`Reservation`]s of.
    pub court_id: court::Id,

    /// [`Date`] to list the [`Reservation`]s at.
    pub date: Date,
}

impl<Db, Gw> Query<CourtSchedule> for Service<Db, Gw>
where
    Db: Database<
            Select<By<Option<Court>, court::Id>>,
            Ok = Option<Court>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Reservation>, read::reservation::Schedule>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        CourtSchedule { court_id, date }: CourtSchedule,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        drop(
            self.database()
                .execute(Select(By::<Option<Court>, _>::new(court_id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .ok_or(E::CourtNotExists(court_id))
                .map_err(tracerr::wrap!())?,
        );

        self.database()
            .execute(Select(By::new(read::reservation::Schedule {
                court_id,
                date,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`CourtSchedule`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Court`] doesn't exist.
    #[display("`Court(id: {_0})` does not exist")]
    #[from(ignore)]
    CourtNotExists(#[error(not(source))] court::Id),
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{CancelReservation, CreateReservation},
        domain::court,
        infra::gateway::Fixed,
        test_util, Command as _, Query as _,
    };

    use super::{CourtSchedule, ExecutionError};

    #[tokio::test]
    async fn lists_day_bookings_in_order_without_cancelled() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 20).await;
        let mut ids = vec![];
        for (from, to) in [(15, 16), (9, 10), (12, 14)] {
            let r = svc
                .execute(CreateReservation {
                    user_id: user.id,
                    court_id: court.id,
                    starts_at: test_util::tomorrow_at(from, 0),
                    ends_at: test_util::tomorrow_at(to, 0),
                    notes: None,
                })
                .await
                .unwrap();
            ids.push(r.id);
        }
        drop(
            svc.execute(CancelReservation {
                reservation_id: ids[2],
                by: None,
            })
            .await
            .unwrap(),
        );

        let schedule = svc
            .execute(CourtSchedule {
                court_id: court.id,
                date: test_util::tomorrow_at(0, 0).date(),
            })
            .await
            .unwrap();

        assert_eq!(
            schedule.iter().map(|r| r.id).collect::<Vec<_>>(),
            [ids[1], ids[0]],
        );
    }

    #[tokio::test]
    async fn fails_for_unknown_court() {
        let (svc, _queue) = test_util::service(Fixed::Approve);

        let err = svc
            .execute(CourtSchedule {
                court_id: court::Id::new(),
                date: test_util::tomorrow_at(0, 0).date(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::CourtNotExists(_)));
    }
}
