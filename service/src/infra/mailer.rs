//! [`Mailer`] implementations.

use common::operations::Perform;
use derive_more::{Display, Error as StdError};
use tracerr::Traced;
use tracing as log;

use crate::domain::user;

/// Email delivery operation.
pub use common::Handler as Mailer;

/// Email message to be delivered.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Email {
    /// Recipient address.
    pub to: user::Email,

    /// Subject line.
    pub subject: String,

    /// Plain text body.
    pub body: String,
}

/// [`Mailer`] error.
#[derive(Clone, Debug, Display, StdError)]
pub enum Error {
    /// Message was rejected by the transport.
    #[display("Email to `{to}` rejected: {reason}")]
    Rejected {
        /// Address of the rejected message.
        #[error(not(source))]
        to: user::Email,

        /// Reason of the rejection.
        #[error(not(source))]
        reason: String,
    },
}

/// [`Mailer`] writing messages to the log instead of sending them.
#[derive(Clone, Copy, Debug, Default)]
pub struct Log;

impl Mailer<Perform<Email>> for Log {
    type Ok = ();
    type Err = Traced<Error>;

    async fn execute(
        &self,
        Perform(email): Perform<Email>,
    ) -> Result<Self::Ok, Self::Err> {
        log::info!(to = %email.to, subject = %email.subject, "email sent");
        log::debug!(to = %email.to, "email body:\n{}", email.body);
        Ok(())
    }
}
