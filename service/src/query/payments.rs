//! [`Query`] collection related to the multiple [`Payment`]s.

use common::operations::By;

#[cfg(doc)]
use crate::Query;
use crate::{domain::Payment, read};

use super::DatabaseQuery;

/// Queries a list of [`Payment`]s, newest first.
pub type List =
    DatabaseQuery<By<Vec<Payment>, read::payment::list::Selector>>;
