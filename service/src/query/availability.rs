//! [`Query`]s about free time of [`Court`]s.

use std::time::Duration;

use common::{
    operations::{By, Select},
    Date, DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{
        court,
        reservation::{self, Slot},
        Court, Reservation,
    },
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] checking whether no active [`Reservation`] of a [`Court`]
/// overlaps the provided interval.
#[derive(Clone, Copy, Debug)]
pub struct CheckAvailability {
    /// ID of the [`Court`] to check.
    pub court_id: court::Id,

    /// [`DateTime`] the checked interval starts at.
    pub starts_at: DateTime,

    /// [`DateTime`] the checked interval ends at.
    pub ends_at: DateTime,

    /// ID of the [`Reservation`] to ignore, if any.
    pub exclude: Option<reservation::Id>,
}

impl<Db, Gw> Query<CheckAvailability> for Service<Db, Gw>
where
    Db: Database<
        Select<By<Vec<Reservation>, read::reservation::Overlapping>>,
        Ok = Vec<Reservation>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = bool;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        q: CheckAvailability,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let slot = Slot::new(q.starts_at.coerce(), q.ends_at.coerce())
            .ok_or(E::InvalidSlot)
            .map_err(tracerr::wrap!())?;

        let overlapping = self
            .database()
            .execute(Select(By::new(read::reservation::Overlapping {
                court_id: q.court_id,
                slot,
                exclude: q.exclude,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(overlapping.is_empty())
    }
}

/// [`Query`] listing free hourly [`Slot`]s of a [`Court`] at the provided
/// UTC [`Date`].
///
/// [`Slot`]s start at the [`Court`] opening time and follow each other
/// hourly up to its closing time. Started [`Slot`]s are omitted.
#[derive(Clone, Copy, Debug)]
pub struct AvailableSlots {
    /// ID of the [`Court`] to list [`Slot`]s of.
    pub court_id: court::Id,

    /// [`Date`] to list [`Slot`]s at.
    pub date: Date,
}

impl AvailableSlots {
    /// [`Duration`] of every listed [`Slot`].
    pub const SLOT_DURATION: Duration = Duration::from_secs(60 * 60);
}

impl<Db, Gw> Query<AvailableSlots> for Service<Db, Gw>
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
    type Ok = Vec<Slot>;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, q: AvailableSlots) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let AvailableSlots { court_id, date } = q;

        let court = self
            .database()
            .execute(Select(By::<Option<Court>, _>::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CourtNotExists(court_id))
            .map_err(tracerr::wrap!())?;

        let booked = self
            .database()
            .execute(Select(By::new(read::reservation::Schedule {
                court_id,
                date,
            })))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .into_iter()
            .filter(Reservation::is_active)
            .map(|r| r.slot)
            .collect::<Vec<_>>();

        let now = DateTime::now();
        let mut start = DateTime::from_date_and_time(
            date,
            court.opening_hours.opens_at(),
        );
        let mut free = vec![];
        loop {
            let end = start + AvailableSlots::SLOT_DURATION;
            let Some(slot) = Slot::new(start.coerce(), end.coerce())
                .filter(|s| court.opening_hours.contain(s))
                .filter(|_| start.date() == date)
            else {
                break;
            };
            if start > now && !booked.iter().any(|b| b.overlaps(&slot)) {
                free.push(slot);
            }
            start = end;
        }
        Ok(free)
    }
}

/// Error of [`CheckAvailability`] and [`AvailableSlots`] [`Query`]
/// execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`Court`] doesn't exist.
    #[display("`Court(id: {_0})` does not exist")]
    #[from(ignore)]
    CourtNotExists(#[error(not(source))] court::Id),

    /// Checked interval doesn't start before it ends.
    #[display("Interval must start before it ends")]
    InvalidSlot,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Insert, DateTime};

    use crate::{
        command::CreateReservation,
        domain::{reservation, Reservation},
        infra::{gateway::Fixed, Database as _},
        test_util, Command as _, Query as _,
    };

    use super::{AvailableSlots, CheckAvailability};

    #[tokio::test]
    async fn detects_every_overlap_kind() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 50).await;
        let existing = svc
            .execute(CreateReservation {
                user_id: user.id,
                court_id: court.id,
                starts_at: test_util::tomorrow_at(10, 0),
                ends_at: test_util::tomorrow_at(12, 0),
                notes: None,
            })
            .await
            .unwrap();

        let check = |from: (u8, u8), to: (u8, u8)| CheckAvailability {
            court_id: court.id,
            starts_at: test_util::tomorrow_at(from.0, from.1),
            ends_at: test_util::tomorrow_at(to.0, to.1),
            exclude: None,
        };

        // Starts inside, ends inside, contains.
        for (from, to) in
            [((11, 0), (13, 0)), ((9, 0), (10, 30)), ((9, 0), (13, 0))]
        {
            assert!(!svc.execute(check(from, to)).await.unwrap());
        }
        // Disjoint and adjacent.
        for (from, to) in
            [((13, 0), (14, 0)), ((12, 0), (13, 0)), ((9, 0), (10, 0))]
        {
            assert!(svc.execute(check(from, to)).await.unwrap());
        }
        // Excluded reservation doesn't conflict with itself.
        assert!(svc
            .execute(CheckAvailability {
                exclude: Some(existing.id),
                ..check((10, 0), (12, 0))
            })
            .await
            .unwrap());
        assert!(svc.execute(check((12, 0), (11, 0))).await.is_err());
    }

    #[tokio::test]
    async fn lists_free_future_hours_only() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 50).await;
        drop(
            svc.execute(CreateReservation {
                user_id: user.id,
                court_id: court.id,
                starts_at: test_util::tomorrow_at(10, 0),
                ends_at: test_util::tomorrow_at(11, 30),
                notes: None,
            })
            .await
            .unwrap(),
        );
        let tomorrow = test_util::tomorrow_at(0, 0).date();

        let slots = svc
            .execute(AvailableSlots {
                court_id: court.id,
                date: tomorrow,
            })
            .await
            .unwrap();

        let starts = slots
            .iter()
            .map(|s| s.starts_at().time_of_day().hour())
            .collect::<Vec<_>>();
        assert_eq!(
            starts,
            [8, 9, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21],
        );
    }

    #[tokio::test]
    async fn omits_past_hours_and_cancelled_bookings_dont_block() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 50).await;
        let yesterday =
            (DateTime::now() - Duration::from_secs(24 * 60 * 60)).date();
        let cancelled = Reservation {
            id: reservation::Id::new(),
            user_id: user.id,
            court_id: court.id,
            slot: reservation::Slot::new(
                test_util::tomorrow_at(8, 0).coerce(),
                test_util::tomorrow_at(9, 0).coerce(),
            )
            .unwrap(),
            total: test_util::usd(50),
            status: reservation::Status::Cancelled,
            notes: None,
            created_at: reservation::CreationDateTime::now(),
            updated_at: reservation::ModificationDateTime::now(),
        };
        svc.database().execute(Insert(cancelled)).await.unwrap();

        let past = svc
            .execute(AvailableSlots {
                court_id: court.id,
                date: yesterday,
            })
            .await
            .unwrap();
        assert!(past.is_empty());

        let tomorrow = svc
            .execute(AvailableSlots {
                court_id: court.id,
                date: test_util::tomorrow_at(0, 0).date(),
            })
            .await
            .unwrap();
        assert_eq!(tomorrow.len(), 14);
    }
}
