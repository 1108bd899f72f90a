//! Adapter between a shop's order pipeline and a bank's hosted payment page gateway.
//!
//! [`application::checkout::PaymentLinkService`] registers the current order with the
//! gateway and returns the payment page URL.
//! [`application::reconciler::CallbackReconciler`] verifies the gateway's callback and
//! credits the order exactly once.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
