//! Infrastructure layer.

pub mod database;
pub mod gateway;
pub mod mailer;

pub use self::{
    database::{Database, Memory},
    gateway::Gateway,
    mailer::Mailer,
};
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
