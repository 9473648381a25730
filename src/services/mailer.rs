//! Asynchronous mail queue. Handlers enqueue fire-and-forget; a worker task
//! delivers with bounded retries so request latency never depends on the
//! mail server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::services::email::{EmailMessage, EmailTransport};

/// Retries after the initial attempt.
const MAX_RETRIES: u32 = 5;
const RETRY_DELAY: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct MailQueue {
    sender: mpsc::UnboundedSender<EmailMessage>,
}

impl MailQueue {
    /// Spawn the delivery worker and return the queue handle.
    pub fn start(transport: Arc<dyn EmailTransport>) -> Self {
        Self::start_with(transport, MAX_RETRIES, RETRY_DELAY)
    }

    /// Worker with explicit retry policy; tests shrink the delay.
    pub fn start_with(
        transport: Arc<dyn EmailTransport>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<EmailMessage>();

        tokio::spawn(async move {
            // Each message retries on its own task, so one unreachable
            // recipient never stalls the rest of the queue.
            while let Some(message) = receiver.recv().await {
                let transport = transport.clone();
                tokio::spawn(async move {
                    deliver(&*transport, &message, max_retries, retry_delay).await;
                });
            }
        });

        Self { sender }
    }

    /// Fire-and-forget enqueue. Delivery failures are retried by the worker
    /// and never surface to the caller.
    pub fn enqueue(&self, message: EmailMessage) {
        if self.sender.send(message).is_err() {
            tracing::error!("Mail queue worker is gone; dropping message");
        }
    }
}

async fn deliver(
    transport: &dyn EmailTransport,
    message: &EmailMessage,
    max_retries: u32,
    retry_delay: Duration,
) {
    for attempt in 0..=max_retries {
        match transport.send(message).await {
            Ok(()) => return,
            Err(e) => {
                tracing::warn!(
                    to = %message.to,
                    attempt = attempt + 1,
                    error = %e,
                    "Email delivery failed"
                );
                if attempt < max_retries {
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    tracing::error!(
        to = %message.to,
        subject = %message.subject,
        "Giving up on email after retries"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` sends, then succeeds.
    struct FlakyTransport {
        failures: u32,
        attempts: AtomicU32,
        delivered: std::sync::Mutex<Vec<EmailMessage>>,
    }

    impl FlakyTransport {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                attempts: AtomicU32::new(0),
                delivered: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EmailTransport for FlakyTransport {
        async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(anyhow::anyhow!("transient failure"));
            }
            self.delivered.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn test_message() -> EmailMessage {
        EmailMessage {
            to: "a@x.com".to_string(),
            subject: "hello".to_string(),
            plain_body: "hi".to_string(),
            html_body: "<p>hi</p>".to_string(),
        }
    }

    #[tokio::test]
    async fn test_delivers_after_transient_failures() {
        let transport = Arc::new(FlakyTransport::new(3));
        let queue = MailQueue::start_with(transport.clone(), 5, Duration::from_millis(5));

        queue.enqueue(test_message());

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !transport.delivered.lock().unwrap().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("message should eventually deliver");

        assert_eq!(transport.attempts.load(Ordering::SeqCst), 4);
    }

    /// Fails every send to one recipient, delivers everything else.
    struct DeadRecipientTransport {
        dead: String,
        delivered: std::sync::Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl EmailTransport for DeadRecipientTransport {
        async fn send(&self, message: &EmailMessage) -> Result<(), anyhow::Error> {
            if message.to == self.dead {
                return Err(anyhow::anyhow!("recipient unreachable"));
            }
            self.delivered.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failing_message_does_not_block_later_ones() {
        let transport = Arc::new(DeadRecipientTransport {
            dead: "stuck@x.com".to_string(),
            delivered: std::sync::Mutex::new(Vec::new()),
        });
        // Retry spacing far longer than the test: a serialized queue could
        // not deliver the second message before the first gave up.
        let queue = MailQueue::start_with(transport.clone(), 5, Duration::from_secs(60));

        let mut stuck = test_message();
        stuck.to = "stuck@x.com".to_string();
        queue.enqueue(stuck);
        queue.enqueue(test_message());

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !transport.delivered.lock().unwrap().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("second message should deliver while the first is retrying");

        let delivered = transport.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].to, "a@x.com");
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let transport = Arc::new(FlakyTransport::new(u32::MAX));
        let queue = MailQueue::start_with(transport.clone(), 2, Duration::from_millis(5));

        queue.enqueue(test_message());

        tokio::time::sleep(Duration::from_millis(200)).await;

        // 1 initial attempt + 2 retries, then the worker moves on.
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
        assert!(transport.delivered.lock().unwrap().is_empty());
    }
}
