//! GraphQL API definitions.

pub mod court;
mod mutation;
pub mod payment;
mod query;
pub mod reservation;
pub mod scalar;
pub mod user;

use juniper::EmptySubscription;

use crate::{define_error, Context};

pub use self::{
    court::Court, mutation::Mutation, payment::Payment, query::Query,
    reservation::Reservation, user::User,
};

/// GraphQL schema.
pub type Schema =
    juniper::RootNode<'static, Query, Mutation, EmptySubscription<Context>>;

define_error! {
    enum PrivilegeError {
        #[code = "NOT_ADMIN"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` must be an administrator"]
        Admin,

        #[code = "NOT_OWNER"]
        #[status = FORBIDDEN]
        #[message = "Authenticated `User` doesn't own the requested entity"]
        Owner,
    }
}
