//! Notification dispatch — credential exchange and fan-out delivery.

pub mod credentials;
pub mod dispatcher;

pub use credentials::{AccessToken, ServiceAccountKey, ServiceAccountTokenSource, TokenSource};
pub use dispatcher::{DispatchConfig, DispatchSummary, NotificationDispatcher};
