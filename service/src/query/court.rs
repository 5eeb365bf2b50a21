//! [`Query`] collection related to a single [`Court`].

use common::operations::By;

use crate::domain::{court, Court};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Court`] by its [`court::Id`].
pub type ById = DatabaseQuery<By<Option<Court>, court::Id>>;
