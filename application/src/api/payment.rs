//! [`Payment`]-related definitions.

use common::{DateTime, Money};
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::domain;
use uuid::Uuid;

use crate::{api, Context};

/// A payment made for a `Reservation`.
#[derive(Clone, Debug, From, Into)]
pub struct Payment(domain::Payment);

/// A payment made for a `Reservation`.
#[graphql_object(context = Context)]
impl Payment {
    /// Unique identifier of this `Payment`.
    #[must_use]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// `User` who made this `Payment`.
    #[must_use]
    pub fn user(&self) -> api::User {
        #[expect(
            unsafe_code,
            reason = "`Payment` loaded from repository guarantees `User` \
                      existence"
        )]
        unsafe {
            api::User::new_unchecked(self.0.user_id)
        }
    }

    /// ID of the paid `Reservation`.
    #[must_use]
    pub fn reservation_id(&self) -> api::reservation::Id {
        self.0.reservation_id.into()
    }

    /// Paid amount.
    #[must_use]
    pub fn amount(&self) -> Money {
        self.0.amount
    }

    /// `PaymentMethod` used.
    #[must_use]
    pub fn method(&self) -> Method {
        self.0.method.into()
    }

    /// Current status of this `Payment`.
    #[must_use]
    pub fn status(&self) -> Status {
        self.0.status.into()
    }

    /// Identifier of this `Payment` at the payment gateway.
    #[must_use]
    pub fn transaction_id(&self) -> String {
        self.0.transaction_id.to_string()
    }

    /// Latest response of the payment gateway.
    #[must_use]
    pub fn gateway_response(&self) -> Option<String> {
        self.0.gateway_response.as_ref().map(ToString::to_string)
    }

    /// `DateTime` when this `Payment` was initiated.
    #[must_use]
    pub fn created_at(&self) -> DateTime {
        self.0.created_at.coerce()
    }

    /// `DateTime` when this `Payment` was completed, if it was.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime> {
        self.0.completed_at.map(|at| at.coerce())
    }
}

/// Unique identifier of a `Payment`.
#[derive(
    Clone, Copy, Debug, Display, Eq, From, GraphQLScalar, Into, PartialEq,
)]
#[from(domain::payment::Id)]
#[into(domain::payment::Id)]
#[graphql(name = "PaymentId", transparent)]
pub struct Id(Uuid);

/// Method of a `Payment`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "PaymentMethod")]
pub enum Method {
    /// Credit card.
    CreditCard,

    /// Debit card.
    DebitCard,

    /// PayPal account.
    PayPal,

    /// Bank transfer.
    BankTransfer,
}

impl From<domain::payment::Method> for Method {
    fn from(method: domain::payment::Method) -> Self {
        use domain::payment::Method as M;
        match method {
            M::CreditCard => Self::CreditCard,
            M::DebitCard => Self::DebitCard,
            M::PayPal => Self::PayPal,
            M::BankTransfer => Self::BankTransfer,
        }
    }
}

impl From<Method> for domain::payment::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::CreditCard => Self::CreditCard,
            Method::DebitCard => Self::DebitCard,
            Method::PayPal => Self::PayPal,
            Method::BankTransfer => Self::BankTransfer,
        }
    }
}

/// Status of a `Payment`.
#[derive(Clone, Copy, Debug, GraphQLEnum)]
#[graphql(name = "PaymentStatus")]
pub enum Status {
    /// Awaiting the payment gateway decision.
    Pending,

    /// Approved by the payment gateway.
    Completed,

    /// Declined by the payment gateway.
    Failed,

    /// Returned to the `User`.
    Refunded,
}

impl From<domain::payment::Status> for Status {
    fn from(status: domain::payment::Status) -> Self {
        use domain::payment::Status as S;
        match status {
            S::Pending => Self::Pending,
            S::Completed => Self::Completed,
            S::Failed => Self::Failed,
            S::Refunded => Self::Refunded,
        }
    }
}

impl From<Status> for domain::payment::Status {
    fn from(status: Status) -> Self {
        match status {
            Status::Pending => Self::Pending,
            Status::Completed => Self::Completed,
            Status::Failed => Self::Failed,
            Status::Refunded => Self::Refunded,
        }
    }
}
