//! [`UserStats`] definition.

use common::{
    operations::{By, Select},
    Date, DateTime, Money, TimeOfDay,
};
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::User;
use crate::{
    domain::{payment, reservation::Status, user, Payment, Reservation},
    infra::{database, Database},
    read, Query, Service,
};

/// [`Query`] summarizing bookings and spendings of a [`User`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UserStats {
    /// ID of the [`User`] to summarize.
    pub user_id: user::Id,
}

/// Output of the [`UserStats`] [`Query`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Output {
    /// Number of not cancelled [`Reservation`]s.
    pub total_reservations: usize,

    /// Number of [`Status::Confirmed`] [`Reservation`]s yet to start.
    pub active_reservations: usize,

    /// Number of not cancelled [`Reservation`]s made this month.
    pub reservations_this_month: usize,

    /// Total of completed [`Payment`]s, per currency.
    pub total_spent: Vec<Money>,

    /// Total of [`Payment`]s completed this month, per currency.
    pub spent_this_month: Vec<Money>,
}

impl<Db, Gw> Query<UserStats> for Service<Db, Gw>
where
    Db: Database<
            Select<By<Vec<Reservation>, read::reservation::list::Selector>>,
            Ok = Vec<Reservation>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Payment>, read::payment::list::Selector>>,
            Ok = Vec<Payment>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Output;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        UserStats { user_id }: UserStats,
    ) -> Result<Self::Ok, Self::Err> {
        let now = DateTime::now();
        let month_start = DateTime::from_date_and_time(
            Date::today().month_start(),
            TimeOfDay::MIDNIGHT,
        );

        let reservations = self
            .database()
            .execute(Select(By::new(read::reservation::list::Selector {
                user_id: Some(user_id),
                statuses: vec![
                    Status::Pending,
                    Status::Confirmed,
                    Status::Completed,
                ],
                ..read::reservation::list::Selector::default()
            })))
            .await
            .map_err(tracerr::wrap!())?;

        let payments = self
            .database()
            .execute(Select(By::new(read::payment::list::Selector {
                user_id: Some(user_id),
                status: Some(payment::Status::Completed),
                ..read::payment::list::Selector::default()
            })))
            .await
            .map_err(tracerr::wrap!())?;

        Ok(Output {
            total_reservations: reservations.len(),
            active_reservations: reservations
                .iter()
                .filter(|r| {
                    r.status == Status::Confirmed
                        && r.slot.starts_at().coerce::<()>() > now
                })
                .count(),
            reservations_this_month: reservations
                .iter()
                .filter(|r| r.created_at.coerce::<()>() >= month_start)
                .count(),
            total_spent: sum(payments.iter()),
            spent_this_month: sum(payments.iter().filter(|p| {
                p.completed_at
                    .is_some_and(|at| at.coerce::<()>() >= month_start)
            })),
        })
    }
}

/// Sums amounts of the provided [`Payment`]s per currency, in order of the
/// currencies' first appearance.
fn sum<'p>(payments: impl Iterator<Item = &'p Payment>) -> Vec<Money> {
    payments.fold(vec![], |mut totals: Vec<Money>, p| {
        match totals.iter_mut().find(|t| t.currency == p.amount.currency) {
            Some(total) => total.amount += p.amount.amount,
            None => totals.push(p.amount),
        }
        totals
    })
}

#[cfg(test)]
mod spec {
    use crate::{
        command::{CreateReservation, ProcessPayment},
        domain::payment,
        infra::gateway::Fixed,
        test_util, Command as _, Query as _,
    };

    use super::UserStats;

    #[tokio::test]
    async fn summarizes_bookings_and_spendings() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;
        let court = test_util::court(&svc, 40).await;
        let mut reservations = vec![];
        for (from, to) in [(9, 10), (11, 13)] {
            reservations.push(
                svc.execute(CreateReservation {
                    user_id: user.id,
                    court_id: court.id,
                    starts_at: test_util::tomorrow_at(from, 0),
                    ends_at: test_util::tomorrow_at(to, 0),
                    notes: None,
                })
                .await
                .unwrap(),
            );
        }
        let paid = &reservations[1];
        drop(
            svc.execute(ProcessPayment {
                user_id: user.id,
                reservation_id: paid.id,
                method: payment::Method::PayPal,
                amount: paid.total,
                card: None,
            })
            .await
            .unwrap(),
        );

        let stats = svc.execute(UserStats { user_id: user.id }).await.unwrap();

        assert_eq!(stats.total_reservations, 2);
        assert_eq!(stats.active_reservations, 1);
        assert_eq!(stats.reservations_this_month, 2);
        assert_eq!(stats.total_spent, [test_util::usd(80)]);
        assert_eq!(stats.spent_this_month, [test_util::usd(80)]);
    }

    #[tokio::test]
    async fn is_empty_for_new_user() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let user = test_util::user(&svc, "player@example.com").await;

        let stats = svc.execute(UserStats { user_id: user.id }).await.unwrap();

        assert_eq!(stats, super::Output::default());
    }
}
