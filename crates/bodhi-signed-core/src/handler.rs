//! Marks builds as signed when they are moved from the pending-signing tag to
//! their release's pending-testing tag.
//!
//! The signing service tags a build into `<release>-updates-testing-pending`
//! once it has been signed and written out, so seeing that tag event is the
//! signal that the build is signed.

use async_trait::async_trait;
use tracing::info;

use crate::message::{Message, TagEvent};
use crate::storage::{Session, Storage};
use crate::Error;

/// Why a message was acknowledged without changing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No build with this NVR was ever submitted.
    UnknownBuild,
    /// The build exists but is not assigned to a release.
    NoRelease,
    /// The build was tagged into something other than its release's
    /// pending-testing tag.
    TagMismatch { expected: String, actual: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBuild => f.write_str("build was not submitted"),
            Self::NoRelease => f.write_str("build is not assigned to a release"),
            Self::TagMismatch { expected, actual } => {
                write!(f, "tag {actual} is not pending_testing tag {expected}")
            }
        }
    }
}

/// Result of handling one message.
///
/// `Processed` and `Skipped` both mean the message can be acknowledged.
/// `Failed` leaves redelivery or dead-lettering to the caller.
#[derive(Debug)]
pub enum Outcome {
    Processed,
    Skipped(SkipReason),
    Failed(Error),
}

impl Outcome {
    #[must_use]
    pub const fn is_processed(&self) -> bool {
        matches!(self, Self::Processed)
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processed => f.write_str("processed"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
            Self::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &Message) -> Outcome;
}

pub struct SignedHandler {
    storage: Storage,
}

impl SignedHandler {
    #[must_use]
    pub const fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Like [`MessageHandler::handle`], but with failures as `Err`.
    ///
    /// The guard chain runs inside one transaction. It is committed on any
    /// `Ok` return, skips included, and rolled back if a query fails.
    /// Redelivery of a message that already signed its build sets the flag
    /// again and reports `Processed`.
    pub async fn process(&self, message: &Message) -> crate::Result<Outcome> {
        let event = TagEvent::from_message(message)?;
        let nvr = event.nvr();

        info!(
            nvr = %nvr,
            tag = %event.tag,
            build_id = ?event.build_id,
            "{nvr} tagged into {}",
            event.tag
        );

        let mut session = self.storage.begin().await?;
        let outcome = Self::apply(&mut session, &nvr, &event.tag).await?;
        session.commit().await?;

        Ok(outcome)
    }

    async fn apply(session: &mut Session, nvr: &str, tag: &str) -> crate::Result<Outcome> {
        let Some(mut build) = session.get_build(nvr).await? else {
            info!("Build was not submitted, skipping");
            return Ok(Outcome::Skipped(SkipReason::UnknownBuild));
        };

        let Some(release) = session.release_for(&build).await? else {
            info!("Build is not assigned to release, skipping");
            return Ok(Outcome::Skipped(SkipReason::NoRelease));
        };

        if !release.is_pending_testing_tag(tag) {
            info!("Tag is not pending_testing tag, skipping");
            return Ok(Outcome::Skipped(SkipReason::TagMismatch {
                expected: release.pending_testing_tag,
                actual: tag.to_string(),
            }));
        }

        info!("Build has been signed, marking");
        session.mark_signed(&mut build).await?;
        info!("Build {nvr} has been marked as signed");

        Ok(Outcome::Processed)
    }
}

#[async_trait]
impl MessageHandler for SignedHandler {
    async fn handle(&self, message: &Message) -> Outcome {
        self.process(message).await.unwrap_or_else(Outcome::Failed)
    }
}
