//! [`Query`] collection related to the multiple [`Court`]s.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{domain::Court, read};

use super::DatabaseQuery;

/// Queries a list of [`Court`]s, ordered by their names.
pub type List = DatabaseQuery<By<Vec<Court>, read::court::list::Filter>>;
