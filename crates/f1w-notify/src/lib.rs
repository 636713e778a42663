//! Notification dispatcher (C8, §4.7): fans an event class out to every
//! target whose mask accepts it, through either an Apprise-style URL scheme
//! mapping or a raw signed webhook POST. Never blocks the scheduler:
//! outcomes are logged, failures never mutate entity state.

pub mod dispatcher;
pub mod scheme;
pub mod webhook;

pub use dispatcher::{DispatchOutcome, NotificationDispatcher};
