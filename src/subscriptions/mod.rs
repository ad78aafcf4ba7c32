//! Subscriptions — durable opt-in records and the consent flow.

pub mod model;
pub mod optin;

pub use model::{Subscription, TELL_LATEST_TIP_INTENT, TELL_TIP_INTENT};
pub use optin::OptInFlow;
