//! [`Database`] implementations.

use common::operations::{By, Commit, Insert, Lock, Select, Transact, Update};
use tracerr::Traced;

use crate::{
    domain::{court, payment, reservation, user, Court, Payment, Reservation, User},
    infra::{database, Database},
    read,
};

use super::{Error, Memory, NonTx, Storage, Tx};

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(self.0.begin().await))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.0.commit().await.map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Select<By<Option<User>, user::Id>>> for Memory<S> {
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0.read(|s| s.users.get(&id).cloned()).await
    }
}

impl<'e, S: Storage> Database<Select<By<Option<User>, &'e user::Email>>>
    for Memory<S>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'e user::Email>>,
    ) -> Result<Self::Ok, Self::Err> {
        let email = by.into_inner();
        self.0
            .read(|s| s.users.values().find(|u| &u.email == email).cloned())
            .await
    }
}

impl<'t, S: Storage> Database<Select<By<Option<User>, &'t user::ResetToken>>>
    for Memory<S>
{
    type Ok = Option<User>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<User>, &'t user::ResetToken>>,
    ) -> Result<Self::Ok, Self::Err> {
        let token = by.into_inner();
        self.0
            .read(|s| {
                s.users
                    .values()
                    .find(|u| {
                        u.password_reset.as_ref().is_some_and(|r| &r.token == token)
                    })
                    .cloned()
            })
            .await
    }
}

impl<S: Storage> Database<Insert<User>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(user): Insert<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(user)).await.map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Update<User>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(user): Update<User>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.write(|s| s.put_user(user)).await
    }
}

impl<S: Storage> Database<Lock<By<User, user::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<User, user::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Every transaction owns the whole store already.
        let id = by.into_inner();
        self.0
            .write(|s| {
                s.users
                    .contains_key(&id)
                    .then_some(())
                    .ok_or(Error::ForeignKeyViolation("users_lock"))
            })
            .await
    }
}

impl<S: Storage> Database<Select<By<Option<Court>, court::Id>>> for Memory<S> {
    type Ok = Option<Court>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Court>, court::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0.read(|s| s.courts.get(&id).cloned()).await
    }
}

impl<S: Storage> Database<Select<By<Vec<Court>, read::court::list::Filter>>>
    for Memory<S>
{
    type Ok = Vec<Court>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Court>, read::court::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let filter = by.into_inner();
        self.0
            .read(|s| {
                let mut courts = s
                    .courts
                    .values()
                    .filter(|c| filter.matches(c))
                    .cloned()
                    .collect::<Vec<_>>();
                courts.sort_by(|a, b| {
                    AsRef::<str>::as_ref(&a.name)
                        .cmp(AsRef::<str>::as_ref(&b.name))
                        .then_with(|| a.created_at.cmp(&b.created_at))
                });
                courts
            })
            .await
    }
}

impl<S: Storage> Database<Insert<Court>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(court): Insert<Court>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(court)).await.map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Update<Court>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(court): Update<Court>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0
            .write(|s| {
                s.put_court(court);
                Ok(())
            })
            .await
    }
}

impl<S: Storage> Database<Lock<By<Court, court::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Court, court::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .write(|s| {
                s.courts
                    .contains_key(&id)
                    .then_some(())
                    .ok_or(Error::ForeignKeyViolation("courts_lock"))
            })
            .await
    }
}

impl<S: Storage> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Memory<S>
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0.read(|s| s.reservations.get(&id).cloned()).await
    }
}

impl<S: Storage>
    Database<Select<By<Vec<Reservation>, read::reservation::Overlapping>>>
    for Memory<S>
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, read::reservation::Overlapping>>,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();
        self.0
            .read(|s| {
                let mut found = s
                    .reservations
                    .values()
                    .filter(|r| selector.matches(r))
                    .cloned()
                    .collect::<Vec<_>>();
                found.sort_by(|a, b| {
                    read::reservation::list::Order::StartAsc.compare(a, b)
                });
                found
            })
            .await
    }
}

impl<S: Storage>
    Database<Select<By<Vec<Reservation>, read::reservation::Schedule>>>
    for Memory<S>
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, read::reservation::Schedule>>,
    ) -> Result<Self::Ok, Self::Err> {
        let schedule = by.into_inner();
        self.0
            .read(|s| {
                let mut found = s
                    .reservations
                    .values()
                    .filter(|r| schedule.matches(r))
                    .cloned()
                    .collect::<Vec<_>>();
                found.sort_by(|a, b| {
                    read::reservation::list::Order::StartAsc.compare(a, b)
                });
                found
            })
            .await
    }
}

impl<S: Storage>
    Database<Select<By<Vec<Reservation>, read::reservation::list::Selector>>>
    for Memory<S>
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Reservation>, read::reservation::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();
        self.0
            .read(|s| {
                let mut found = s
                    .reservations
                    .values()
                    .filter(|r| selector.matches(r))
                    .cloned()
                    .collect::<Vec<_>>();
                found.sort_by(|a, b| selector.order.compare(a, b));
                if let Some(limit) = selector.limit {
                    found.truncate(limit);
                }
                found
            })
            .await
    }
}

impl<S: Storage> Database<Insert<Reservation>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reservation): Insert<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(reservation))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Update<Reservation>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reservation): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.write(|s| s.put_reservation(reservation)).await
    }
}

impl<S: Storage> Database<Lock<By<Reservation, reservation::Id>>>
    for Memory<S>
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Reservation, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .write(|s| {
                s.reservations
                    .contains_key(&id)
                    .then_some(())
                    .ok_or(Error::ForeignKeyViolation("reservations_lock"))
            })
            .await
    }
}

impl<S: Storage> Database<Select<By<Option<Payment>, payment::Id>>>
    for Memory<S>
{
    type Ok = Option<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Payment>, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0.read(|s| s.payments.get(&id).cloned()).await
    }
}

impl<S: Storage>
    Database<Select<By<Vec<Payment>, read::payment::list::Selector>>>
    for Memory<S>
{
    type Ok = Vec<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Payment>, read::payment::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();
        self.0
            .read(|s| {
                let mut found = s
                    .payments
                    .values()
                    .filter(|p| selector.matches(p))
                    .cloned()
                    .collect::<Vec<_>>();
                found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                found
            })
            .await
    }
}

impl<S: Storage> Database<Insert<Payment>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payment): Insert<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(payment)).await.map_err(tracerr::wrap!())
    }
}

impl<S: Storage> Database<Update<Payment>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(payment): Update<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.0.write(|s| s.put_payment(payment)).await
    }
}

impl<S: Storage> Database<Lock<By<Payment, payment::Id>>> for Memory<S> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Payment, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.0
            .write(|s| {
                s.payments
                    .contains_key(&id)
                    .then_some(())
                    .ok_or(Error::ForeignKeyViolation("payments_lock"))
            })
            .await
    }
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Commit, Insert, Lock, Select, Transact},
        DateTime,
    };

    use crate::{
        domain::{
            court,
            reservation::{self, Slot},
            user, Reservation,
        },
        infra::{database::constraint, Database as _, Memory},
        test_util::{tomorrow_at, usd},
    };

    fn reservation(court_id: court::Id, hour: u8) -> Reservation {
        Reservation {
            id: reservation::Id::new(),
            user_id: user::Id::new(),
            court_id,
            slot: Slot::new(
                tomorrow_at(hour, 0).coerce(),
                tomorrow_at(hour + 1, 0).coerce(),
            )
            .unwrap(),
            total: usd(50),
            status: reservation::Status::Pending,
            notes: None,
            created_at: DateTime::now().coerce(),
            updated_at: DateTime::now().coerce(),
        }
    }

    #[tokio::test]
    async fn rejects_overlapping_active_reservations() {
        let db = Memory::new();
        let court = court::Id::new();

        db.execute(Insert(reservation(court, 10))).await.unwrap();
        let err =
            db.execute(Insert(reservation(court, 10))).await.unwrap_err();
        assert!(err
            .as_ref()
            .is_exclusion_violation(Some(constraint::RESERVATIONS_NO_OVERLAP)));

        let mut cancelled = reservation(court, 10);
        cancelled.status = reservation::Status::Cancelled;
        db.execute(Insert(cancelled)).await.unwrap();
        db.execute(Insert(reservation(court, 11))).await.unwrap();
        db.execute(Insert(reservation(court::Id::new(), 10)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn discards_uncommitted_transaction() {
        let db = Memory::new();
        let r = reservation(court::Id::new(), 10);
        let id = r.id;

        {
            let tx = db.execute(Transact).await.unwrap();
            tx.execute(Insert(r.clone())).await.unwrap();
            let seen: Option<Reservation> =
                tx.execute(Select(By::new(id))).await.unwrap();
            assert!(seen.is_some());
        }
        let stored: Option<Reservation> =
            db.execute(Select(By::new(id))).await.unwrap();
        assert!(stored.is_none());

        let tx = db.execute(Transact).await.unwrap();
        tx.execute(Insert(r)).await.unwrap();
        tx.execute(Commit).await.unwrap();
        assert!(tx.execute(Commit).await.is_err());
        let stored: Option<Reservation> =
            db.execute(Select(By::new(id))).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn locks_only_stored_entities() {
        let db = Memory::new();
        let r = reservation(court::Id::new(), 10);
        let tx = db.execute(Transact).await.unwrap();

        let missing = tx.execute(Lock(By::<Reservation, _>::new(r.id))).await;
        assert!(missing.is_err());

        tx.execute(Insert(r.clone())).await.unwrap();
        tx.execute(Lock(By::<Reservation, _>::new(r.id)))
            .await
            .unwrap();
    }
}
