use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc;

use super::{Notification, NotifierError};

/// Background task that receives notifications and POSTs them to the
/// configured webhook, one at a time. Built the same way as the audit
/// writer: an internal channel feeding a background task, so notification
/// delivery never blocks the caller (spec §4.K).
pub struct NotifierWriter {
    rx: mpsc::Receiver<Notification>,
    client: Client,
    webhook_url: String,
}

impl NotifierWriter {
    pub fn new(rx: mpsc::Receiver<Notification>, webhook_url: String) -> Self {
        NotifierWriter {
            rx,
            client: Client::new(),
            webhook_url,
        }
    }

    /// Run the writer, consuming notifications until the channel is closed.
    /// Spawn this as a background task.
    pub async fn run(mut self) {
        tracing::info!("Notifier writer started");

        while let Some(notification) = self.rx.recv().await {
            if let Err(e) = self.deliver(&notification).await {
                tracing::warn!("notification delivery failed: {}", e);
            }
        }

        tracing::info!("Notifier writer shutting down");
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.webhook_url)
            .timeout(Duration::from_secs(10))
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifierError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifierError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}

/// Create a complete notifier system: a [`NotifierHandle`] to emit events
/// from pipeline code, and a [`NotifierWriter`] to spawn as a background
/// task with `tokio::spawn(writer.run())`.
pub fn create_notifier(
    webhook_url: String,
    buffer_size: usize,
) -> (super::NotifierHandle, NotifierWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let handle = super::NotifierHandle::new(tx);
    let writer = NotifierWriter::new(rx, webhook_url);
    (handle, writer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writer_shuts_down_when_all_handles_drop() {
        let (handle, writer) = create_notifier("http://127.0.0.1:1/webhook".to_string(), 10);
        let writer_handle = tokio::spawn(writer.run());

        handle.emit(Notification::new("t", "b")).await;
        drop(handle);

        let result = tokio::time::timeout(Duration::from_secs(2), writer_handle).await;
        assert!(result.is_ok(), "writer should exit once the handle is dropped");
    }
}
