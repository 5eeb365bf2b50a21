//! [`Reservation`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{
        reservation::{self, Slot},
        Reservation,
    },
    infra::{
        database::{
            self,
            postgres::{self, Connection},
            Postgres,
        },
        Database,
    },
    read,
};

/// Columns of a [`Reservation`] row.
const COLUMNS: &str = "\
    id, user_id, court_id, \
    starts_at, ends_at, \
    total, total_currency, \
    status, notes, \
    created_at, updated_at";

/// Reads a [`Reservation`] from the provided [`Row`].
fn from_row(row: &Row) -> Result<Reservation, Traced<database::Error>> {
    Ok(Reservation {
        id: row.get("id"),
        user_id: row.get("user_id"),
        court_id: row.get("court_id"),
        slot: Slot::new(row.get("starts_at"), row.get("ends_at")).ok_or_else(
            || {
                tracerr::new!(database::Error::from(
                    postgres::Error::Corrupted("Reservation"),
                ))
            },
        )?,
        total: Money {
            amount: row.get("total"),
            currency: row.get("total_currency"),
        },
        status: row.get("status"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl<C> Database<Select<By<Option<Reservation>, reservation::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reservation>, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql =
            format!("SELECT {COLUMNS} FROM reservations WHERE id = $1::UUID");
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<Reservation>, read::reservation::Overlapping>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, read::reservation::Overlapping>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::Overlapping {
            court_id,
            slot,
            exclude,
        } = by.into_inner();
        let (starts_at, ends_at) = (slot.starts_at(), slot.ends_at());
        let active: &[reservation::Status] = &reservation::Status::ACTIVE;

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reservations \
             WHERE court_id = $1::UUID \
               AND status = ANY($2::INT2[]) \
               AND starts_at < $4::TIMESTAMPTZ \
               AND ends_at > $3::TIMESTAMPTZ \
               AND ($5::UUID IS NULL OR id <> $5::UUID) \
             ORDER BY starts_at ASC, created_at ASC"
        );
        self.query(&sql, &[&court_id, &active, &starts_at, &ends_at, &exclude])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}

impl<C> Database<Select<By<Vec<Reservation>, read::reservation::Schedule>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reservation>, read::reservation::Schedule>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::Schedule { court_id, date } = by.into_inner();
        let cancelled = reservation::Status::Cancelled;

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reservations \
             WHERE court_id = $1::UUID \
               AND status <> $2::INT2 \
               AND (starts_at AT TIME ZONE 'UTC')::DATE = $3::DATE \
             ORDER BY starts_at ASC, created_at ASC"
        );
        self.query(&sql, &[&court_id, &cancelled, &date])
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}

impl<C>
    Database<Select<By<Vec<Reservation>, read::reservation::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Reservation>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<Reservation>, read::reservation::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reservation::list::Selector {
            user_id,
            statuses,
            starts_after,
            ends_by,
            order,
            limit,
        } = by.into_inner();
        let limit = limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX));

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let mut conditions = vec![];
        if let Some(id) = &user_id {
            ps.push(id);
            conditions.push(format!("user_id = ${}::UUID", ps.len()));
        }
        if !statuses.is_empty() {
            ps.push(&statuses);
            conditions.push(format!("status = ANY(${}::INT2[])", ps.len()));
        }
        if let Some(at) = &starts_after {
            ps.push(at);
            conditions.push(format!("starts_at > ${}::TIMESTAMPTZ", ps.len()));
        }
        if let Some(at) = &ends_by {
            ps.push(at);
            conditions.push(format!("ends_at <= ${}::TIMESTAMPTZ", ps.len()));
        }
        let limit_idx = limit.as_ref().map(|l| {
            ps.push(l);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM reservations \
             WHERE TRUE {filtering} \
             ORDER BY starts_at {order}, created_at {order} \
             {limiting}",
            filtering = conditions
                .iter()
                .format_with(" ", |c, f| f(&format_args!("AND {c}"))),
            order = order.sql(),
            limiting = limit_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("LIMIT ${idx}::INT8"))
            }),
        );
        self.query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect()
    }
}

impl<C> Database<Insert<Reservation>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Reservation>, Ok = (), Err = Traced<database::Error>>,
{
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

impl<C> Database<Update<Reservation>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reservation): Update<Reservation>,
    ) -> Result<Self::Ok, Self::Err> {
        let Reservation {
            id,
            user_id,
            court_id,
            slot,
            total,
            status,
            notes,
            created_at,
            updated_at,
        } = reservation;
        let (starts_at, ends_at) = (slot.starts_at(), slot.ends_at());

        const SQL: &str = "\
            INSERT INTO reservations (\
                id, user_id, court_id, \
                starts_at, ends_at, \
                total, total_currency, \
                status, notes, \
                created_at, updated_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::TIMESTAMPTZ, $5::TIMESTAMPTZ, \
                $6::NUMERIC, $7::INT2, \
                $8::INT2, $9::VARCHAR, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                court_id = EXCLUDED.court_id, \
                starts_at = EXCLUDED.starts_at, \
                ends_at = EXCLUDED.ends_at, \
                total = EXCLUDED.total, \
                total_currency = EXCLUDED.total_currency, \
                status = EXCLUDED.status, \
                notes = EXCLUDED.notes, \
                created_at = EXCLUDED.created_at, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &court_id,
                &starts_at,
                &ends_at,
                &total.amount,
                &total.currency,
                &status,
                &notes,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Reservation, reservation::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Reservation, reservation::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: reservation::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO reservations_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
