//! [`Command`] definition.

pub mod authorize_user_session;
pub mod cancel_reservation;
pub mod confirm_reservation;
pub mod create_court;
pub mod create_reservation;
pub mod create_user;
pub mod create_user_session;
pub mod process_payment;
pub mod refund_payment;
pub mod request_password_reset;
pub mod reset_password;
pub mod update_court;
pub mod update_user_password;
pub mod update_user_privileges;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user_session::AuthorizeUserSession,
    cancel_reservation::CancelReservation,
    confirm_reservation::ConfirmReservation, create_court::CreateCourt,
    create_reservation::CreateReservation, create_user::CreateUser,
    create_user_session::CreateUserSession, process_payment::ProcessPayment,
    refund_payment::RefundPayment,
    request_password_reset::RequestPasswordReset,
    reset_password::ResetPassword, update_court::UpdateCourt,
    update_user_password::UpdateUserPassword,
    update_user_privileges::UpdateUserPrivileges,
};
