//! [`Court`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{court, Court},
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

/// Columns of a [`Court`] row.
const COLUMNS: &str = "\
    id, name, sport, capacity, \
    hourly_rate, hourly_rate_currency, \
    description, image_url, is_active, \
    opens_at, closes_at, created_at";

/// Reads a [`Court`] from the provided [`Row`].
fn from_row(row: &Row) -> Result<Court, Traced<database::Error>> {
    let corrupted = || {
        tracerr::new!(database::Error::from(postgres::Error::Corrupted(
            "Court",
        )))
    };
    Ok(Court {
        id: row.get("id"),
        name: row.get("name"),
        sport: row.get("sport"),
        capacity: row.get("capacity"),
        hourly_rate: court::HourlyRate::new(Money {
            amount: row.get("hourly_rate"),
            currency: row.get("hourly_rate_currency"),
        })
        .ok_or_else(corrupted)?,
        description: row.get("description"),
        image_url: row.get("image_url"),
        is_active: row.get("is_active"),
        opening_hours: court::OpeningHours::new(
            row.get("opens_at"),
            row.get("closes_at"),
        )
        .ok_or_else(corrupted)?,
        created_at: row.get("created_at"),
    })
}

impl<C> Database<Select<By<Option<Court>, court::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Court>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Court>, court::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM courts WHERE id = $1::UUID");
        self.query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row)
            .transpose()
    }
}

impl<C> Database<Select<By<Vec<Court>, read::court::list::Filter>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Court>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Court>, read::court::list::Filter>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::court::list::Filter { only_active, sport } = by.into_inner();

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&only_active];
        let sport_idx = sport.as_ref().map(|s| {
            ps.push(s);
            ps.len()
        });

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM courts \
             WHERE (is_active OR NOT $1::BOOLEAN) \
                   {sport_filtering} \
             ORDER BY name ASC, created_at ASC",
            sport_filtering = sport_idx.into_iter().format_with("", |idx, f| {
                f(&format_args!("AND sport = ${idx}::INT2"))
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

impl<C> Database<Insert<Court>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Court>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(court): Insert<Court>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(court)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Court>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(court): Update<Court>,
    ) -> Result<Self::Ok, Self::Err> {
        let Court {
            id,
            name,
            sport,
            capacity,
            hourly_rate,
            description,
            image_url,
            is_active,
            opening_hours,
            created_at,
        } = court;
        let Money { amount, currency } = hourly_rate.into();
        let (opens_at, closes_at) =
            (opening_hours.opens_at(), opening_hours.closes_at());

        const SQL: &str = "\
            INSERT INTO courts (\
                id, name, sport, capacity, \
                hourly_rate, hourly_rate_currency, \
                description, image_url, is_active, \
                opens_at, closes_at, created_at\
            ) \
            VALUES (\
                $1::UUID, $2::VARCHAR, $3::INT2, $4::INT2, \
                $5::NUMERIC, $6::INT2, \
                $7::TEXT, $8::VARCHAR, $9::BOOLEAN, \
                $10::TIME, $11::TIME, $12::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET name = EXCLUDED.name, \
                sport = EXCLUDED.sport, \
                capacity = EXCLUDED.capacity, \
                hourly_rate = EXCLUDED.hourly_rate, \
                hourly_rate_currency = EXCLUDED.hourly_rate_currency, \
                description = EXCLUDED.description, \
                image_url = EXCLUDED.image_url, \
                is_active = EXCLUDED.is_active, \
                opens_at = EXCLUDED.opens_at, \
                closes_at = EXCLUDED.closes_at, \
                created_at = EXCLUDED.created_at";
        self.exec(
            SQL,
            &[
                &id,
                &name,
                &sport,
                &capacity,
                &amount,
                &currency,
                &description,
                &image_url,
                &is_active,
                &opens_at,
                &closes_at,
                &created_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Court, court::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Court, court::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: court::Id = by.into_inner();

        // Updating the existing row holds its lock until the transaction ends,
        // so concurrent bookings of the same court are serialized.
        const SQL: &str = "\
            INSERT INTO courts_lock (id) \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET locked_at = NOW()";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
