use serde::Serialize;
use thiserror::Error;

/// A fire-and-forget notification sent to the configured webhook on a
/// terminal pipeline outcome (spec §4.K).
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("webhook returned status {0}")]
    Status(u16),
}
