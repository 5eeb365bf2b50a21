//! [`Payment`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf, Money};
use derive_more::{AsRef, Debug, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(doc)]
use crate::domain::{Reservation, User};
use crate::domain::{reservation, user};

/// Payment for a [`Reservation`].
#[derive(Clone, Debug)]
pub struct Payment {
    /// ID of this [`Payment`].
    pub id: Id,

    /// ID of the [`User`] who pays.
    pub user_id: user::Id,

    /// ID of the [`Reservation`] being paid.
    pub reservation_id: reservation::Id,

    /// Paid amount.
    pub amount: Money,

    /// [`Method`] of this [`Payment`].
    pub method: Method,

    /// [`Status`] of this [`Payment`].
    pub status: Status,

    /// Unique [`TransactionId`] of this [`Payment`].
    pub transaction_id: TransactionId,

    /// Last [`GatewayResponse`] regarding this [`Payment`], if any.
    pub gateway_response: Option<GatewayResponse>,

    /// [`DateTime`] when this [`Payment`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Payment`] was completed, if it was.
    pub completed_at: Option<CompletionDateTime>,
}

impl Payment {
    /// Marks this [`Payment`] as approved by a payment gateway.
    ///
    /// # Errors
    ///
    /// If this [`Payment`] is not [`Status::Pending`].
    pub fn complete(
        &mut self,
        response: GatewayResponse,
    ) -> Result<(), TransitionError> {
        self.status = self.status.complete()?;
        self.gateway_response = Some(response);
        self.completed_at = Some(CompletionDateTime::now());
        Ok(())
    }

    /// Marks this [`Payment`] as declined by a payment gateway.
    ///
    /// # Errors
    ///
    /// If this [`Payment`] is not [`Status::Pending`].
    pub fn fail(
        &mut self,
        reason: GatewayResponse,
    ) -> Result<(), TransitionError> {
        self.status = self.status.fail()?;
        self.gateway_response = Some(reason);
        Ok(())
    }

    /// Refunds this [`Payment`] with the optional `reason`.
    ///
    /// # Errors
    ///
    /// If this [`Payment`] is not [`Status::Completed`].
    pub fn refund(
        &mut self,
        reason: Option<&str>,
    ) -> Result<(), TransitionError> {
        self.status = self.status.refund()?;
        self.gateway_response = Some(GatewayResponse::refunded(reason));
        Ok(())
    }
}

/// ID of a [`Payment`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Method of a [`Payment`]."]
    enum Method {
        #[doc = "Credit card."]
        CreditCard = 1,

        #[doc = "Debit card."]
        DebitCard = 2,

        #[doc = "PayPal account."]
        PayPal = 3,

        #[doc = "Bank transfer."]
        BankTransfer = 4,
    }
}

impl Method {
    /// Indicates whether this [`Method`] requires a [`CardNumber`].
    #[must_use]
    pub fn requires_card(self) -> bool {
        match self {
            Self::CreditCard | Self::DebitCard => true,
            Self::PayPal | Self::BankTransfer => false,
        }
    }
}

define_kind! {
    #[doc = "Status of a [`Payment`]."]
    enum Status {
        #[doc = "Awaiting a payment gateway decision."]
        Pending = 1,

        #[doc = "Approved by a payment gateway."]
        Completed = 2,

        #[doc = "Declined by a payment gateway."]
        Failed = 3,

        #[doc = "Returned to the payer."]
        Refunded = 4,
    }
}

impl Status {
    /// Transits this [`Status`] into the [`Status::Completed`] one.
    ///
    /// # Errors
    ///
    /// If this [`Status`] is not [`Status::Pending`].
    pub fn complete(self) -> Result<Self, TransitionError> {
        match self {
            Self::Pending => Ok(Self::Completed),
            Self::Completed | Self::Failed | Self::Refunded => {
                Err(TransitionError::new(self, Self::Completed))
            }
        }
    }

    /// Transits this [`Status`] into the [`Status::Failed`] one.
    ///
    /// # Errors
    ///
    /// If this [`Status`] is not [`Status::Pending`].
    pub fn fail(self) -> Result<Self, TransitionError> {
        match self {
            Self::Pending => Ok(Self::Failed),
            Self::Completed | Self::Failed | Self::Refunded => {
                Err(TransitionError::new(self, Self::Failed))
            }
        }
    }

    /// Transits this [`Status`] into the [`Status::Refunded`] one.
    ///
    /// # Errors
    ///
    /// If this [`Status`] is not [`Status::Completed`].
    pub fn refund(self) -> Result<Self, TransitionError> {
        match self {
            Self::Completed => Ok(Self::Refunded),
            Self::Pending | Self::Failed | Self::Refunded => {
                Err(TransitionError::new(self, Self::Refunded))
            }
        }
    }
}

/// Error of a prohibited [`Status`] transition.
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("`Payment` cannot transit from `{from}` to `{to}`")]
pub struct TransitionError {
    /// [`Status`] the transition was attempted from.
    pub from: Status,

    /// [`Status`] the transition was attempted to.
    pub to: Status,
}

impl TransitionError {
    /// Creates a new [`TransitionError`].
    const fn new(from: Status, to: Status) -> Self {
        Self { from, to }
    }
}

/// Amount allowed to be paid in a single [`Payment`].
#[derive(Clone, Copy, Debug, Display, Eq, Into, PartialEq)]
pub struct Amount(Money);

impl Amount {
    /// Creates a new [`Amount`] if the given `money` is positive and doesn't
    /// exceed `50000`.
    #[must_use]
    pub fn new(money: Money) -> Option<Self> {
        let max = Decimal::from(50_000);
        (money.amount > Decimal::ZERO && money.amount <= max)
            .then_some(Self(money))
    }
}

/// Unique identifier of a [`Payment`] transaction.
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct TransactionId(String);

impl TransactionId {
    /// Generates a new unique [`TransactionId`].
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Response of a payment gateway regarding a [`Payment`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str, String)]
#[from(&str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct GatewayResponse(String);

impl GatewayResponse {
    /// Creates a [`GatewayResponse`] describing a refund.
    #[must_use]
    pub fn refunded(reason: Option<&str>) -> Self {
        match reason.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reason) => Self(format!("Refunded: {reason}")),
            None => Self("Refunded".into()),
        }
    }
}

/// Number of a payment card.
#[derive(AsRef, Clone, Debug, Eq, PartialEq)]
#[as_ref(str)]
#[debug("CardNumber(**** {})", &_0[_0.len() - 4..])]
pub struct CardNumber(String);

impl CardNumber {
    /// Creates a new [`CardNumber`] if the given `number` consists of 13 to 19
    /// digits (spaces and dashes are ignored) passing the Luhn checksum.
    #[must_use]
    pub fn new(number: impl AsRef<str>) -> Option<Self> {
        let digits = number
            .as_ref()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect::<String>();
        Self::check(&digits).then_some(Self(digits))
    }

    /// Checks whether the given `digits` form a valid [`CardNumber`].
    fn check(digits: &str) -> bool {
        if !(13..=19).contains(&digits.len())
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return false;
        }

        let sum = digits
            .bytes()
            .rev()
            .map(|b| u32::from(b - b'0'))
            .enumerate()
            .map(|(i, d)| match (i % 2, d * 2) {
                (0, _) => d,
                (_, doubled) if doubled > 9 => doubled - 9,
                (_, doubled) => doubled,
            })
            .sum::<u32>();
        sum % 10 == 0
    }

    /// Returns the last four digits of this [`CardNumber`].
    #[must_use]
    pub fn last_digits(&self) -> &str {
        &self.0[self.0.len() - 4..]
    }
}

impl FromStr for CardNumber {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `CardNumber`")
    }
}

/// [`DateTime`] when a [`Payment`] was created.
pub type CreationDateTime = DateTimeOf<(Payment, unit::Creation)>;

/// [`DateTime`] when a [`Payment`] was completed.
pub type CompletionDateTime = DateTimeOf<(Payment, unit::Completion)>;

#[cfg(test)]
mod spec {
    use common::{money::Currency, Money};
    use rust_decimal::Decimal;

    use super::{Amount, CardNumber, GatewayResponse, Method, Status};

    #[test]
    fn validates_card_numbers_with_luhn_checksum() {
        assert!(CardNumber::new("4111111111111111").is_some());
        assert!(CardNumber::new("4111 1111 1111 1111").is_some());
        assert!(CardNumber::new("5500-0000-0000-0004").is_some());
        assert!(CardNumber::new("378282246310005").is_some());

        assert!(CardNumber::new("4111111111111112").is_none());
        assert!(CardNumber::new("411111111111").is_none());
        assert!(CardNumber::new("41111111111111111111").is_none());
        assert!(CardNumber::new("4111a11111111111").is_none());

        let card = CardNumber::new("4111 1111 1111 1111").unwrap();
        assert_eq!(card.last_digits(), "1111");
        assert_eq!(format!("{card:?}"), "CardNumber(**** 1111)");
    }

    #[test]
    fn bounds_amount() {
        let money = |a: Decimal| Money {
            amount: a,
            currency: Currency::Eur,
        };

        assert!(Amount::new(money(Decimal::new(1, 2))).is_some());
        assert!(Amount::new(money(Decimal::from(50_000))).is_some());
        assert!(Amount::new(money(Decimal::ZERO)).is_none());
        assert!(Amount::new(money(Decimal::from(-5))).is_none());
        assert!(Amount::new(money(Decimal::new(5_000_001, 2))).is_none());
    }

    #[test]
    fn allows_only_documented_transitions() {
        use Status as S;

        assert_eq!(S::Pending.complete(), Ok(S::Completed));
        assert_eq!(S::Pending.fail(), Ok(S::Failed));
        assert_eq!(S::Completed.refund(), Ok(S::Refunded));

        assert!(S::Completed.complete().is_err());
        assert!(S::Failed.complete().is_err());
        assert!(S::Completed.fail().is_err());
        assert!(S::Pending.refund().is_err());
        assert!(S::Failed.refund().is_err());
        assert!(S::Refunded.refund().is_err());
    }

    #[test]
    fn describes_refunds() {
        let text = |r: &GatewayResponse| AsRef::<str>::as_ref(r).to_owned();

        assert_eq!(
            text(&GatewayResponse::refunded(Some("court closed"))),
            "Refunded: court closed",
        );
        assert_eq!(text(&GatewayResponse::refunded(None)), "Refunded");
        assert_eq!(text(&GatewayResponse::refunded(Some("  "))), "Refunded");
    }

    #[test]
    fn requires_card_for_card_methods_only() {
        assert!(Method::CreditCard.requires_card());
        assert!(Method::DebitCard.requires_card());
        assert!(!Method::PayPal.requires_card());
        assert!(!Method::BankTransfer.requires_card());
    }
}
