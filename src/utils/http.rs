// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page and decode it as text.
///
/// Non-success statuses are errors. Invalid UTF-8 is replaced rather than
/// rejected since the body only feeds HTML parsing.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::fetch(url, e))?;
    let response = response
        .error_for_status()
        .map_err(|e| AppError::fetch(url, e))?;
    let bytes = response.bytes().await.map_err(|e| AppError::fetch(url, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
