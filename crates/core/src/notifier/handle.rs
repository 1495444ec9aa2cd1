use tokio::sync::mpsc;

use super::Notification;

/// Cheaply cloneable handle for emitting notifications. Events are sent
/// through an async channel so a slow or unreachable webhook endpoint never
/// blocks the pipeline (spec §4.K).
#[derive(Clone)]
pub struct NotifierHandle {
    tx: mpsc::Sender<Notification>,
}

impl NotifierHandle {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        NotifierHandle { tx }
    }

    /// Non-blocking; if the channel is full or closed the failure is logged,
    /// never propagated to the caller.
    pub async fn emit(&self, notification: Notification) {
        if let Err(e) = self.tx.send(notification).await {
            tracing::error!("failed to emit notification: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_delivers_to_channel() {
        let (tx, mut rx) = mpsc::channel(10);
        let handle = NotifierHandle::new(tx);

        handle.emit(Notification::new("title", "body")).await;

        let notification = rx.recv().await.expect("should receive notification");
        assert_eq!(notification.title, "title");
    }

    #[tokio::test]
    async fn emit_on_closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::channel(10);
        let handle = NotifierHandle::new(tx);
        drop(rx);

        handle.emit(Notification::new("title", "body")).await;
    }
}
