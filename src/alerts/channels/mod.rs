//! HTTP-backed notification channels

pub mod pushbullet;
pub mod webhook;

pub use pushbullet::PushbulletNotifier;
pub use webhook::WebhookNotifier;

use crate::error::NotifyError;
use std::sync::RwLock;
use std::time::Duration;

/// Request timeout shared by HTTP channels
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn http_client() -> Result<reqwest::blocking::Client, NotifyError> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("perfwatch/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Credential slot shared between threads
#[derive(Debug, Default)]
struct KeySlot(RwLock<Option<String>>);

impl KeySlot {
    fn get(&self) -> Option<String> {
        match self.0.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set(&self, key: &str) {
        let mut guard = match self.0.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(key.to_string());
    }
}

fn status_error(response: reqwest::blocking::Response) -> NotifyError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|e| format!("[Failed to read response body: {}]", e));
    NotifyError::Status {
        status,
        message: truncate(&message, 200),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    format!("{}...", cut)
}
