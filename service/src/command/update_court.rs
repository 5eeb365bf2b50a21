//! [`Command`] for updating a [`Court`].

use common::operations::{
    By, Commit, Lock, Select, Transact, Transacted, Update,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{court, Court},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for updating a [`Court`].
///
/// Fields set to [`None`] are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct UpdateCourt {
    /// ID of the [`Court`] to update.
    pub court_id: court::Id,

    /// New [`court::Name`] of the [`Court`].
    pub name: Option<court::Name>,

    /// New [`court::Sport`] of the [`Court`].
    pub sport: Option<court::Sport>,

    /// New [`court::Capacity`] of the [`Court`].
    pub capacity: Option<court::Capacity>,

    /// New [`court::HourlyRate`] of the [`Court`].
    pub hourly_rate: Option<court::HourlyRate>,

    /// New [`court::Description`] of the [`Court`], possibly removing it.
    pub description: Option<Option<court::Description>>,

    /// New [`court::ImageUrl`] of the [`Court`], possibly removing it.
    pub image_url: Option<Option<court::ImageUrl>>,

    /// New [`court::OpeningHours`] of the [`Court`].
    pub opening_hours: Option<court::OpeningHours>,

    /// New value of the [`Court::is_active`] indicator.
    pub is_active: Option<bool>,
}

impl<Db, Gw> Command<UpdateCourt> for Service<Db, Gw>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Court>, court::Id>>,
            Ok = Option<Court>,
            Err = Traced<database::Error>,
        > + Database<
            Lock<By<Court, court::Id>>,
            Ok = (),
            Err = Traced<database::Error>,
        > + Database<Update<Court>, Ok = (), Err = Traced<database::Error>>
        + Database<Commit, Ok = (), Err = Traced<database::Error>>,
{
    type Ok = Court;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: UpdateCourt) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let UpdateCourt {
            court_id,
            name,
            sport,
            capacity,
            hourly_rate,
            description,
            image_url,
            opening_hours,
            is_active,
        } = cmd;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Lock rows reference existing `Court`s only.
        _ = tx
            .execute(Select(By::<Option<Court>, _>::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CourtNotExists(court_id))
            .map_err(tracerr::wrap!())?;

        // Avoid bookings of the `Court` while it changes.
        tx.execute(Lock(By::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut court = tx
            .execute(Select(By::<Option<Court>, _>::new(court_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::CourtNotExists(court_id))
            .map_err(tracerr::wrap!())?;

        if let Some(name) = name {
            court.name = name;
        }
        if let Some(sport) = sport {
            court.sport = sport;
        }
        if let Some(capacity) = capacity {
            court.capacity = capacity;
        }
        if let Some(rate) = hourly_rate {
            court.hourly_rate = rate;
        }
        if let Some(description) = description {
            court.description = description;
        }
        if let Some(url) = image_url {
            court.image_url = url;
        }
        if let Some(hours) = opening_hours {
            court.opening_hours = hours;
        }
        if let Some(is_active) = is_active {
            court.is_active = is_active;
        }

        tx.execute(Update(court.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        Ok(court)
    }
}

/// Error of [`UpdateCourt`] [`Command`] execution.
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
        command::CreateCourt,
        domain::court,
        infra::gateway::Fixed,
        test_util, Command as _,
    };

    use super::{ExecutionError, UpdateCourt};

    #[tokio::test]
    async fn updates_only_provided_fields() {
        let (svc, _queue) = test_util::service(Fixed::Approve);
        let court = svc
            .execute(CreateCourt {
                name: court::Name::new("Court 1").unwrap(),
                sport: court::Sport::Paddle,
                capacity: court::Capacity::new(4).unwrap(),
                hourly_rate: court::HourlyRate::new(test_util::usd(20))
                    .unwrap(),
                description: court::Description::new("Indoor"),
                image_url: None,
                opening_hours: court::OpeningHours::default(),
            })
            .await
            .unwrap();
        assert!(court.is_active);

        let updated = svc
            .execute(UpdateCourt {
                court_id: court.id,
                description: Some(None),
                is_active: Some(false),
                ..UpdateCourt::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.name, court.name);
        assert_eq!(updated.sport, court::Sport::Paddle);
        assert!(updated.description.is_none());
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn fails_for_unknown_court() {
        let (svc, _queue) = test_util::service(Fixed::Approve);

        let err = svc
            .execute(UpdateCourt {
                court_id: court::Id::new(),
                ..UpdateCourt::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::CourtNotExists(_)));
    }
}
