// src/lib.rs

//! Rentwatch library
//!
//! Scrapes rental classifieds, reconciles them against stored history,
//! classifies them and notifies subscribers whose profiles match.

pub mod config;
pub mod error;
pub mod models;
pub mod notifier;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
