//! [`Payment`]-related [`Database`] implementations.

use common::{
    operations::{By, Insert, Lock, Select, Update},
    Money,
};
use itertools::Itertools as _;
use postgres_types::ToSql;
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{payment, Payment},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read,
};

/// Columns of a [`Payment`] row.
const COLUMNS: &str = "\
    id, user_id, reservation_id, \
    amount, amount_currency, \
    method, status, \
    transaction_id, gateway_response, \
    created_at, completed_at";

/// Reads a [`Payment`] from the provided [`Row`].
fn from_row(row: &Row) -> Payment {
    Payment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        reservation_id: row.get("reservation_id"),
        amount: Money {
            amount: row.get("amount"),
            currency: row.get("amount_currency"),
        },
        method: row.get("method"),
        status: row.get("status"),
        transaction_id: row.get("transaction_id"),
        gateway_response: row.get("gateway_response"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    }
}

impl<C> Database<Select<By<Option<Payment>, payment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Payment>, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        let sql = format!("SELECT {COLUMNS} FROM payments WHERE id = $1::UUID");
        Ok(self
            .query_opt(&sql, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Select<By<Vec<Payment>, read::payment::list::Selector>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Payment>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Payment>, read::payment::list::Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::payment::list::Selector {
            user_id,
            reservation_id,
            status,
        } = by.into_inner();

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let mut conditions = vec![];
        if let Some(id) = &user_id {
            ps.push(id);
            conditions.push(format!("user_id = ${}::UUID", ps.len()));
        }
        if let Some(id) = &reservation_id {
            ps.push(id);
            conditions.push(format!("reservation_id = ${}::UUID", ps.len()));
        }
        if let Some(s) = &status {
            ps.push(s);
            conditions.push(format!("status = ${}::INT2", ps.len()));
        }

        let sql = format!(
            "SELECT {COLUMNS} \
             FROM payments \
             WHERE TRUE {filtering} \
             ORDER BY created_at DESC",
            filtering = conditions
                .iter()
                .format_with(" ", |c, f| f(&format_args!("AND {c}"))),
        );
        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(from_row)
            .collect())
    }
}

impl<C> Database<Insert<Payment>> for Postgres<C>
where
    C: Connection,
    Self: Database<Update<Payment>, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(payment): Insert<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        self.execute(Update(payment)).await.map_err(tracerr::wrap!())
    }
}

impl<C> Database<Update<Payment>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(payment): Update<Payment>,
    ) -> Result<Self::Ok, Self::Err> {
        let Payment {
            id,
            user_id,
            reservation_id,
            amount,
            method,
            status,
            transaction_id,
            gateway_response,
            created_at,
            completed_at,
        } = payment;

        const SQL: &str = "\
            INSERT INTO payments (\
                id, user_id, reservation_id, \
                amount, amount_currency, \
                method, status, \
                transaction_id, gateway_response, \
                created_at, completed_at\
            ) \
            VALUES (\
                $1::UUID, $2::UUID, $3::UUID, \
                $4::NUMERIC, $5::INT2, \
                $6::INT2, $7::INT2, \
                $8::VARCHAR, $9::TEXT, \
                $10::TIMESTAMPTZ, $11::TIMESTAMPTZ\
            ) \
            ON CONFLICT (id) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                reservation_id = EXCLUDED.reservation_id, \
                amount = EXCLUDED.amount, \
                amount_currency = EXCLUDED.amount_currency, \
                method = EXCLUDED.method, \
                status = EXCLUDED.status, \
                transaction_id = EXCLUDED.transaction_id, \
                gateway_response = EXCLUDED.gateway_response, \
                created_at = EXCLUDED.created_at, \
                completed_at = EXCLUDED.completed_at";
        self.exec(
            SQL,
            &[
                &id,
                &user_id,
                &reservation_id,
                &amount.amount,
                &amount.currency,
                &method,
                &status,
                &transaction_id,
                &gateway_response,
                &created_at,
                &completed_at,
            ],
        )
        .await
        .map_err(tracerr::wrap!())
        .map(drop)
    }
}

impl<C> Database<Lock<By<Payment, payment::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Lock(by): Lock<By<Payment, payment::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // Avoid subtle change for SQL.
        let id: payment::Id = by.into_inner();

        const SQL: &str = "\
            INSERT INTO payments_lock \
            VALUES ($1::UUID) \
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id";
        self.exec(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())
            .map(drop)
    }
}
