//! Payment [`Gateway`] implementations.

use common::Money;
use derive_more::{Display, Error as StdError};
use rand::Rng as _;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::Payment;
use crate::domain::payment::{self, CardNumber, GatewayResponse};

/// Payment gateway operation.
pub use common::Handler as Gateway;

/// Request to authorize a [`Payment`].
#[derive(Clone, Debug)]
pub struct Authorize {
    /// [`payment::TransactionId`] of the authorized [`Payment`].
    pub transaction_id: payment::TransactionId,

    /// [`payment::Method`] of the authorized [`Payment`].
    pub method: payment::Method,

    /// Amount to be charged.
    pub amount: Money,

    /// [`CardNumber`] to be charged, if [`payment::Method`] requires it.
    pub card: Option<CardNumber>,
}

/// Decision of a [`Gateway`] regarding an [`Authorize`] request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    /// Payment is approved.
    Approved(GatewayResponse),

    /// Payment is declined with the provided reason.
    Declined(GatewayResponse),
}

/// [`Gateway`] error.
#[derive(Clone, Debug, Display, StdError)]
pub enum Error {
    /// [`Gateway`] cannot be reached or failed to respond.
    #[display("Payment gateway is unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
}

/// [`Gateway`] simulating authorization by approving payments with a fixed
/// probability, regardless of their amount or method.
#[derive(Clone, Copy, Debug)]
pub struct Simulated {
    /// Probability of approving a payment, in `[0.0, 1.0]` range.
    approval_rate: f64,
}

impl Simulated {
    /// Default probability of approving a payment.
    pub const DEFAULT_APPROVAL_RATE: f64 = 0.95;

    /// Creates a new [`Simulated`] [`Gateway`] approving payments with the
    /// provided probability.
    ///
    /// [`None`] is returned if the `approval_rate` is not in `[0.0, 1.0]`
    /// range.
    #[must_use]
    pub fn new(approval_rate: f64) -> Option<Self> {
        (0.0..=1.0)
            .contains(&approval_rate)
            .then_some(Self { approval_rate })
    }
}

impl Default for Simulated {
    fn default() -> Self {
        Self {
            approval_rate: Self::DEFAULT_APPROVAL_RATE,
        }
    }
}

impl Gateway<Authorize> for Simulated {
    type Ok = Decision;
    type Err = Traced<Error>;

    async fn execute(&self, req: Authorize) -> Result<Self::Ok, Self::Err> {
        let approved = rand::thread_rng().gen_bool(self.approval_rate);
        Ok(decide(approved, &req))
    }
}

/// [`Gateway`] always producing the same outcome.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Fixed {
    /// Approves every payment.
    Approve,

    /// Declines every payment.
    Decline,

    /// Fails to respond to every request.
    Fail,
}

impl Gateway<Authorize> for Fixed {
    type Ok = Decision;
    type Err = Traced<Error>;

    async fn execute(&self, req: Authorize) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Approve => Ok(decide(true, &req)),
            Self::Decline => Ok(decide(false, &req)),
            Self::Fail => Err(tracerr::new!(Error::Unavailable(
                "connection refused".into(),
            ))),
        }
    }
}

/// Forms a [`Decision`] about the provided [`Authorize`] request.
fn decide(approved: bool, req: &Authorize) -> Decision {
    if approved {
        let card = req
            .card
            .as_ref()
            .map(|c| format!(", card ending {}", c.last_digits()))
            .unwrap_or_default();
        Decision::Approved(
            format!(
                "Approved: transaction {}{card}",
                req.transaction_id,
            )
            .into(),
        )
    } else {
        Decision::Declined("Declined: payment rejected by issuer".into())
    }
}

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money};
    use rust_decimal::Decimal;

    use crate::domain::payment::{self, CardNumber};

    use super::{Authorize, Decision, Fixed, Gateway as _, Simulated};

    fn request() -> Authorize {
        Authorize {
            transaction_id: payment::TransactionId::generate(),
            method: payment::Method::CreditCard,
            amount: Money {
                amount: Decimal::from(75),
                currency: Currency::Usd,
            },
            card: CardNumber::new("4242424242424242"),
        }
    }

    #[test]
    fn rejects_invalid_approval_rates() {
        assert!(Simulated::new(0.0).is_some());
        assert!(Simulated::new(1.0).is_some());
        assert!(Simulated::new(-0.1).is_none());
        assert!(Simulated::new(1.1).is_none());
        assert!(Simulated::new(f64::NAN).is_none());
    }

    #[tokio::test]
    async fn simulated_follows_extreme_rates() {
        let always = Simulated::new(1.0).unwrap();
        let never = Simulated::new(0.0).unwrap();

        for _ in 0..20 {
            assert!(matches!(
                always.execute(request()).await,
                Ok(Decision::Approved(_)),
            ));
            assert!(matches!(
                never.execute(request()).await,
                Ok(Decision::Declined(_)),
            ));
        }
    }

    #[tokio::test]
    async fn fixed_produces_configured_outcome() {
        let req = request();
        let tx = req.transaction_id.clone();

        let Ok(Decision::Approved(resp)) = Fixed::Approve.execute(req).await
        else {
            panic!("expected approval");
        };
        assert_eq!(
            resp.to_string(),
            format!("Approved: transaction {tx}, card ending 4242"),
        );

        assert!(matches!(
            Fixed::Decline.execute(request()).await,
            Ok(Decision::Declined(_)),
        ));
        assert!(Fixed::Fail.execute(request()).await.is_err());
    }
}
