//! [`Query`] collection related to the multiple [`Reservation`]s.

use common::{
    operations::{By, Select},
    DateTime,
};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{reservation::Status, user, Reservation},
    infra::{database, Database},
    read::reservation::list::{Order, Selector},
    Query, Service,
};

use super::DatabaseQuery;

/// Queries a list of [`Reservation`]s by an arbitrary [`Selector`].
pub type List = DatabaseQuery<By<Vec<Reservation>, Selector>>;

/// Queries [`Reservation`]s of a [`User`], latest start first.
#[derive(Clone, Copy, Debug)]
pub struct ByUser {
    /// ID of the [`User`] owning the [`Reservation`]s.
    pub user_id: user::Id,

    /// Whether to include [`Status::Cancelled`] [`Reservation`]s.
    pub include_cancelled: bool,
}

impl From<ByUser> for Selector {
    fn from(q: ByUser) -> Self {
        Self {
            user_id: Some(q.user_id),
            statuses: if q.include_cancelled {
                vec![]
            } else {
                vec![Status::Pending, Status::Confirmed, Status::Completed]
            },
            order: Order::StartDesc,
            ..Self::default()
        }
    }
}

/// Queries [`Status::Confirmed`] [`Reservation`]s of a [`User`] starting in
/// the future, earliest first.
#[derive(Clone, Copy, Debug)]
pub struct Upcoming {
    /// ID of the [`User`] owning the [`Reservation`]s.
    pub user_id: user::Id,

    /// Maximum number of the [`Reservation`]s.
    pub limit: usize,
}

impl Upcoming {
    /// Default maximum number of [`Upcoming`] [`Reservation`]s.
    pub const DEFAULT_LIMIT: usize = 5;
}

impl From<Upcoming> for Selector {
    fn from(q: Upcoming) -> Self {
        Self {
            user_id: Some(q.user_id),
            statuses: vec![Status::Confirmed],
            starts_after: Some(DateTime::now()),
            order: Order::StartAsc,
            limit: Some(q.limit),
            ..Self::default()
        }
    }
}

/// Queries already played [`Reservation`]s of a [`User`], latest first.
#[derive(Clone, Copy, Debug)]
pub struct Recent {
    /// ID of the [`User`] owning the [`Reservation`]s.
    pub user_id: user::Id,

    /// Maximum number of the [`Reservation`]s.
    pub limit: usize,
}

impl Recent {
    /// Default maximum number of [`Recent`] [`Reservation`]s.
    pub const DEFAULT_LIMIT: usize = 5;
}

impl From<Recent> for Selector {
    fn from(q: Recent) -> Self {
        Self {
            user_id: Some(q.user_id),
            statuses: vec![Status::Confirmed, Status::Completed],
            ends_by: Some(DateTime::now()),
            order: Order::StartDesc,
            limit: Some(q.limit),
            ..Self::default()
        }
    }
}

/// Implements [`Query`] for the provided type convertible into a
/// [`Selector`].
macro_rules! impl_selector_query {
    ($($q:ty),+ $(,)?) => {$(
        impl<Db, Gw> Query<$q> for Service<Db, Gw>
        where
            Db: Database<
                Select<By<Vec<Reservation>, Selector>>,
                Ok = Vec<Reservation>,
                Err = Traced<database::Error>,
            >,
        {
            type Ok = Vec<Reservation>;
            type Err = Traced<database::Error>;

            async fn execute(&self, q: $q) -> Result<Self::Ok, Self::Err> {
                self.database()
                    .execute(Select(By::new(Selector::from(q))))
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    )+};
}

impl_selector_query!(ByUser, Upcoming, Recent);

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Insert, DateTime};

    use crate::{
        domain::{reservation, Reservation},
        infra::{gateway::Fixed, Database as _},
        test_util, Query as _,
    };

    use super::{ByUser, Recent, Upcoming};

    fn reservation_at(
        base: &Reservation,
        starts_in_hours: i64,
        status: reservation::Status,
    ) -> Reservation {
        let hour = Duration::from_secs(60 * 60);
        let now = DateTime::now();
        let start = if starts_in_hours >= 0 {
            now + hour * u32::try_from(starts_in_hours).unwrap()
        } else {
            now - hour * u32::try_from(-starts_in_hours).unwrap()
        };
        Reservation {
            id: reservation::Id::new(),
            slot: reservation::Slot::new(start.coerce(), (start + hour).coerce())
                .unwrap(),
            status,
            ..base.clone()
        }
    }

    #[tokio::test]
    async fn splits_upcoming_and_recent() {
        use reservation::Status as S;

        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 10).await;
        let base = Reservation {
            id: reservation::Id::new(),
            user_id: user.id,
            court_id: court.id,
            slot: reservation::Slot::new(
                test_util::tomorrow_at(10, 0).coerce(),
                test_util::tomorrow_at(11, 0).coerce(),
            )
            .unwrap(),
            total: test_util::usd(10),
            status: reservation::Status::Confirmed,
            notes: None,
            created_at: reservation::CreationDateTime::now(),
            updated_at: reservation::ModificationDateTime::now(),
        };

        let rows = [
            reservation_at(&base, -48, S::Completed),
            reservation_at(&base, -24, S::Confirmed),
            reservation_at(&base, -12, S::Cancelled),
            reservation_at(&base, 24, S::Confirmed),
            reservation_at(&base, 48, S::Confirmed),
            reservation_at(&base, 72, S::Pending),
        ];
        for r in &rows {
            svc.database().execute(Insert(r.clone())).await.unwrap();
        }

        let upcoming = svc
            .execute(Upcoming {
                user_id: user.id,
                limit: Upcoming::DEFAULT_LIMIT,
            })
            .await
            .unwrap();
        assert_eq!(
            upcoming.iter().map(|r| r.id).collect::<Vec<_>>(),
            [rows[3].id, rows[4].id],
        );

        let recent = svc
            .execute(Recent {
                user_id: user.id,
                limit: 1,
            })
            .await
            .unwrap();
        assert_eq!(
            recent.iter().map(|r| r.id).collect::<Vec<_>>(),
            [rows[1].id],
        );

        let all = svc
            .execute(ByUser {
                user_id: user.id,
                include_cancelled: false,
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].id, rows[5].id);

        let with_cancelled = svc
            .execute(ByUser {
                user_id: user.id,
                include_cancelled: true,
            })
            .await
            .unwrap();
        assert_eq!(with_cancelled.len(), 6);
    }
}
