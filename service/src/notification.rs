//! [`Notification`]s about domain events and their queue.

use derive_more::Display;
use tokio::sync::mpsc;
use tracing as log;

use crate::domain::{
    user::{self, PasswordReset},
    Payment, Reservation,
};
#[cfg(doc)]
use crate::task::DeliverNotifications;

/// Notification to be delivered to a [`User`].
///
/// [`User`]: crate::domain::User
#[derive(Clone, Debug, Display)]
pub enum Notification {
    /// [`Reservation`] has been confirmed.
    #[display("reservation confirmation")]
    ReservationConfirmed(Reservation),

    /// [`Reservation`] has been cancelled.
    #[display("reservation cancellation")]
    ReservationCancelled(Reservation),

    /// [`Payment`] has been completed.
    #[display("payment confirmation")]
    PaymentCompleted(Payment),

    /// [`PasswordReset`] has been requested.
    #[display("password reset")]
    PasswordReset {
        /// ID of the [`User`] requested the reset.
        ///
        /// [`User`]: crate::domain::User
        user_id: user::Id,

        /// Issued [`PasswordReset`].
        reset: PasswordReset,
    },
}

impl Notification {
    /// Returns ID of the [`User`] this [`Notification`] is addressed to.
    ///
    /// [`User`]: crate::domain::User
    #[must_use]
    pub fn recipient(&self) -> user::Id {
        match self {
            Self::ReservationConfirmed(r) | Self::ReservationCancelled(r) => {
                r.user_id
            }
            Self::PaymentCompleted(p) => p.user_id,
            Self::PasswordReset { user_id, .. } => *user_id,
        }
    }
}

/// Creates a new [`Notifier`] and the [`Queue`] it feeds.
#[must_use]
pub fn channel() -> (Notifier, Queue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Notifier(tx), Queue(rx))
}

/// Sending side of [`Notification`]s.
#[derive(Clone, Debug)]
pub struct Notifier(mpsc::UnboundedSender<Notification>);

impl Notifier {
    /// Enqueues the provided [`Notification`] for delivery.
    ///
    /// Never blocks nor fails: if the [`Queue`] is gone, the [`Notification`]
    /// is dropped with a warning.
    pub fn notify(&self, notification: Notification) {
        if let Err(mpsc::error::SendError(n)) = self.0.send(notification) {
            log::warn!(
                recipient = %n.recipient(),
                "dropped {n} notification: queue is closed",
            );
        }
    }
}

/// Receiving side of [`Notification`]s, consumed by
/// [`DeliverNotifications`].
#[derive(Debug)]
pub struct Queue(mpsc::UnboundedReceiver<Notification>);

impl Queue {
    /// Waits for the next [`Notification`].
    ///
    /// [`None`] is returned once all the [`Notifier`]s are dropped and the
    /// [`Queue`] is drained.
    pub async fn next(&mut self) -> Option<Notification> {
        self.0.recv().await
    }

    /// Returns the next already enqueued [`Notification`], if any.
    pub fn try_next(&mut self) -> Option<Notification> {
        self.0.try_recv().ok()
    }
}

#[cfg(test)]
mod spec {
    use crate::domain::user::{self, PasswordReset};

    use super::{channel, Notification};

    #[tokio::test]
    async fn delivers_in_order_and_survives_closed_queue() {
        let (notifier, mut queue) = channel();
        let (a, b) = (user::Id::new(), user::Id::new());

        notifier.notify(Notification::PasswordReset {
            user_id: a,
            reset: PasswordReset::issue(),
        });
        notifier.notify(Notification::PasswordReset {
            user_id: b,
            reset: PasswordReset::issue(),
        });

        assert_eq!(queue.next().await.map(|n| n.recipient()), Some(a));
        assert_eq!(queue.try_next().map(|n| n.recipient()), Some(b));
        assert!(queue.try_next().is_none());

        drop(queue);
        notifier.notify(Notification::PasswordReset {
            user_id: a,
            reset: PasswordReset::issue(),
        });
    }
}
