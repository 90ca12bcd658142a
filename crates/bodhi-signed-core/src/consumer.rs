use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tracing::{debug, error, warn};

use crate::config::{Config, FailurePolicy};
use crate::handler::{MessageHandler, Outcome};
use crate::message::Message;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumeStats {
    pub received: usize,
    pub processed: usize,
    pub skipped: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl ConsumeStats {
    #[must_use]
    pub const fn acknowledged(&self) -> usize {
        self.processed + self.skipped + self.ignored
    }
}

impl std::fmt::Display for ConsumeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "received={} processed={} skipped={} ignored={} failed={}",
            self.received, self.processed, self.skipped, self.ignored, self.failed
        )
    }
}

/// Feeds newline-delimited JSON messages to a handler.
///
/// Messages on other topics are acknowledged without reaching the handler.
pub struct Consumer<H> {
    handler: H,
    topic: String,
    policy: FailurePolicy,
    dead_letter_path: Option<PathBuf>,
}

impl<H: MessageHandler> Consumer<H> {
    pub fn new(handler: H, topic: impl Into<String>) -> Self {
        Self {
            handler,
            topic: topic.into(),
            policy: FailurePolicy::Abort,
            dead_letter_path: None,
        }
    }

    pub fn from_config(handler: H, config: &Config) -> Self {
        Self::new(handler, config.topic.clone())
            .with_policy(config.failure_policy, config.dead_letter_path.clone())
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy, dead_letter_path: Option<PathBuf>) -> Self {
        self.policy = policy;
        self.dead_letter_path = dead_letter_path;
        self
    }

    /// Consume until `reader` is exhausted.
    ///
    /// Under [`FailurePolicy::Abort`] the first failure ends consumption and
    /// is returned as the error.
    pub async fn consume<R>(&self, mut reader: R) -> Result<ConsumeStats>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut stats = ConsumeStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let raw = buf.trim_ascii();
            if raw.is_empty() {
                continue;
            }
            stats.received += 1;

            let message = match std::str::from_utf8(raw)
                .map_err(Error::from)
                .and_then(Message::from_json)
            {
                Ok(message) => message,
                Err(e) => {
                    self.fail(&mut stats, raw, e).await?;
                    continue;
                }
            };

            if message.topic != self.topic {
                debug!(topic = %message.topic, "Ignoring message on unrelated topic");
                stats.ignored += 1;
                continue;
            }

            let id = message.log_id();
            debug!(id = %id, sent_at = ?message.sent_at(), "Dispatching message");

            match self.handler.handle(&message).await {
                Outcome::Processed => stats.processed += 1,
                Outcome::Skipped(reason) => {
                    debug!(id = %id, %reason, "Message skipped");
                    stats.skipped += 1;
                }
                Outcome::Failed(e) => self.fail(&mut stats, raw, e).await?,
            }
        }

        Ok(stats)
    }

    async fn fail(&self, stats: &mut ConsumeStats, raw: &[u8], err: Error) -> Result<()> {
        stats.failed += 1;

        match self.policy {
            FailurePolicy::Abort => {
                error!(error = %err, "Message failed, aborting");
                Err(err)
            }
            FailurePolicy::DeadLetter => {
                warn!(error = %err, "Message failed, dead-lettering");
                self.dead_letter(raw).await
            }
        }
    }

    async fn dead_letter(&self, raw: &[u8]) -> Result<()> {
        let path = self.dead_letter_path.as_ref().ok_or_else(|| {
            Error::InvalidConfig("dead_letter policy needs a dead_letter_path".to_string())
        })?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(raw).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        Ok(())
    }
}
