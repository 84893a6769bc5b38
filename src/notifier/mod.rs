//! Outbound notifications.
//!
//! ## Flow
//!
//! ```text
//! ProfileMatch ──plan──▶ SendTask ──dispatch──▶ NotificationChannel
//!                                                 ├─ EmailChannel
//!                                                 └─ SmsChannel
//! ```
//!
//! Links are shortened by a [`UrlShortener`] before messages are composed.

pub mod channel;
pub mod dispatcher;
pub mod message;
pub mod shortener;

pub use channel::{ChannelKind, EmailChannel, NotificationChannel, SmsChannel};
pub use dispatcher::{DispatchMode, DispatchReport, Dispatcher, SendOutcome, SendTask};
pub use shortener::{attach_short_urls, BitlyShortener, UrlShortener};
