// src/notifier/dispatcher.rs

//! Concurrent, failure-isolated notification fan-out.
//!
//! Dispatch happens in two steps: [`Dispatcher::plan`] turns profile matches
//! into one [`SendTask`] per (profile, channel), and [`Dispatcher::dispatch`]
//! runs every task and settles all of them before returning.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::StoredListing;
use crate::notifier::channel::{ChannelKind, NotificationChannel};
use crate::notifier::message::{email_body, email_subject, sms_body};
use crate::services::ProfileMatch;

/// Which messages a run sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Email and SMS about newly found listings
    Detailed,
    /// Daily email digest
    Summary,
}

/// One message to one subscriber over one channel.
#[derive(Debug, Clone)]
pub struct SendTask {
    pub profile_id: String,
    pub channel: ChannelKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Stored listings the message is about
    pub listing_ids: Vec<String>,
}

/// Settled result of a [`SendTask`].
#[derive(Debug)]
pub struct SendOutcome {
    pub task: SendTask,
    pub result: Result<()>,
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Every outcome of a dispatch, in task order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<SendOutcome>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Listings referenced by at least one successful send.
    pub fn delivered_listing_ids(&self) -> HashSet<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_success())
            .flat_map(|o| o.task.listing_ids.iter().map(String::as_str))
            .collect()
    }
}

/// Fans messages out over the registered channels.
pub struct Dispatcher {
    channels: Vec<Arc<dyn NotificationChannel>>,
    max_concurrent: usize,
}

impl Dispatcher {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            channels: Vec::new(),
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Register a channel; a later channel of the same kind replaces it.
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.retain(|c| c.kind() != channel.kind());
        self.channels.push(channel);
        self
    }

    fn channel(&self, kind: ChannelKind) -> Option<&Arc<dyn NotificationChannel>> {
        self.channels.iter().find(|c| c.kind() == kind)
    }

    /// Build send tasks for matched profiles.
    ///
    /// A profile gets email when it wants email and has an address, and SMS
    /// (detailed runs only) when it wants SMS and has a number.
    pub fn plan(&self, matches: &[ProfileMatch<'_, StoredListing>], mode: DispatchMode) -> Vec<SendTask> {
        let mut tasks = Vec::new();

        for m in matches {
            let records: Vec<_> = m.records.iter().map(|l| &l.record).collect();
            let listing_ids: Vec<String> = m.records.iter().map(|l| l.id.clone()).collect();

            if let Some(address) = m.profile.email_target() {
                if self.channel(ChannelKind::Email).is_some() {
                    tasks.push(SendTask {
                        profile_id: m.profile.id.clone(),
                        channel: ChannelKind::Email,
                        recipient: address.to_string(),
                        subject: email_subject(records.len(), mode == DispatchMode::Summary),
                        body: email_body(m.profile, &records),
                        listing_ids: listing_ids.clone(),
                    });
                }
            }

            if mode == DispatchMode::Detailed {
                if let Some(phone) = m.profile.sms_target() {
                    if self.channel(ChannelKind::Sms).is_some() {
                        tasks.push(SendTask {
                            profile_id: m.profile.id.clone(),
                            channel: ChannelKind::Sms,
                            recipient: phone.to_string(),
                            subject: String::new(),
                            body: sms_body(&records),
                            listing_ids,
                        });
                    }
                }
            }
        }
        tasks
    }

    /// Run one task to completion.
    pub async fn send_one(&self, task: SendTask) -> SendOutcome {
        let result = match self.channel(task.channel) {
            Some(channel) => channel.send(&task.recipient, &task.subject, &task.body).await,
            None => Err(AppError::channel(
                task.channel.to_string(),
                "no channel registered",
            )),
        };
        if let Err(e) = &result {
            log::warn!(
                "{} to profile {} failed: {}",
                task.channel,
                task.profile_id,
                e
            );
        }
        SendOutcome { task, result }
    }

    /// Run every task concurrently and settle all of them.
    ///
    /// A failed send is recorded in its outcome and never affects siblings.
    pub async fn dispatch(&self, tasks: Vec<SendTask>) -> DispatchReport {
        let outcomes: Vec<SendOutcome> = stream::iter(tasks)
            .map(|task| self.send_one(task))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let report = DispatchReport { outcomes };
        log::info!(
            "Dispatched {} messages: {} succeeded, {} failed",
            report.outcomes.len(),
            report.succeeded(),
            report.failed()
        );
        report
    }
}
