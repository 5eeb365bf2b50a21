//! [`Command`] for creating a new [`Court`].

use common::{
    operations::{Commit, Insert, Transact, Transacted},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{court, Court},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Court`].
#[derive(Clone, Debug)]
pub struct CreateCourt {
    /// [`court::Name`] of a new [`Court`].
    pub name: court::Name,

    /// [`court::Sport`] played on a new [`Court`].
    pub sport: court::Sport,

    /// [`court::Capacity`] of a new [`Court`].
    pub capacity: court::Capacity,

    /// [`court::HourlyRate`] of a new [`Court`].
    pub hourly_rate: court::HourlyRate,

    /// [`court::Description`] of a new [`Court`], if any.
    pub description: Option<court::Description>,

    /// [`court::ImageUrl`] of a new [`Court`], if any.
    pub image_url: Option<court::ImageUrl>,

    /// [`court::OpeningHours`] of a new [`Court`].
    pub opening_hours: court::OpeningHours,
}

impl<Db, Gw> Command<CreateCourt> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Court>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Court;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateCourt) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateCourt {
            name,
            sport,
            capacity,
            hourly_rate,
            description,
            image_url,
            opening_hours,
        } = cmd;

        let court = Court {
            id: court::Id::new(),
            name,
            sport,
            capacity,
            hourly_rate,
            description,
            image_url,
            is_active: true,
            opening_hours,
            created_at: DateTime::now().coerce(),
        };

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(court.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!(court_id = %court.id, "court `{}` created", court.name);
        Ok(court)
    }
}

/// Error of [`CreateCourt`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
