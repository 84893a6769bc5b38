//! Pipeline entry points.
//!
//! - `reconcile`: Historical diff of crawled records against the store
//! - `CrawlPipeline`: Detailed crawl runs and daily summaries
//! - `Scheduler`: Periodic driver with quiet hours and a kill switch

pub mod crawl;
pub mod diff;
pub mod scheduler;

pub use crawl::{CrawlPipeline, RunStats};
pub use diff::{ReconcileOutcome, ReconcilePlan, plan_reconcile, reconcile};
pub use scheduler::{ScheduledJob, Scheduler, TickAction, tick_action};
