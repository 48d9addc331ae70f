//! Host-page messaging.
//!
//! Messages go to the page that hosts the selection overlay. That page may
//! not have registered its listener yet when the first message is sent, so
//! [`send_with_retry`] retries `NotReady` with capped exponential backoff.
//! Waiting goes through a [`Sleeper`] and a [`CancellationToken`] is checked
//! between attempts, so the loop is testable without wall-clock delays.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use canvas::geom::Rect;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MessagingError;
use crate::services::HostChannel;

#[cfg(test)]
#[path = "messaging_test.rs"]
mod messaging_test;

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Ask the page to show the region-selection overlay.
    StartCapture { session: Uuid },
    /// The user committed a region, in viewport pixels.
    RegionSelected { session: Uuid, rect: Rect },
    /// Pixels were captured and the editor is open.
    CaptureComplete { session: Uuid, width: u32, height: u32 },
    Cancelled { session: Uuid },
}

impl HostMessage {
    #[must_use]
    pub fn session(&self) -> Uuid {
        match self {
            Self::StartCapture { session }
            | Self::RegionSelected { session, .. }
            | Self::CaptureComplete { session, .. }
            | Self::Cancelled { session } => *session,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartCapture { .. } => "start_capture",
            Self::RegionSelected { .. } => "region_selected",
            Self::CaptureComplete { .. } => "capture_complete",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostReply {
    Ack { session: Uuid },
    Error { session: Uuid, message: String },
}

// =============================================================================
// RETRY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total sends, including the first.
    pub attempts: u32,
    /// Delay after the first failed attempt.
    pub base: Duration,
    /// Delay ceiling.
    pub max: Duration,
    /// Randomize each delay within `[delay / 2, delay]`.
    pub jitter: bool,
}

impl RetryPolicy {
    /// Un-jittered delay after failed attempt `attempt` (1-based):
    /// `base * 2^(attempt - 1)`, capped at `max`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.max)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter {
            return delay;
        }
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        if ms < 2 {
            return delay;
        }
        Duration::from_millis(rand::rng().random_range(ms / 2..=ms))
    }
}

/// Suspends the current task.
#[async_trait::async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait::async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Cooperative cancellation flag shared between a caller and a retry loop.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Send `message`, retrying while the receiver is not ready.
///
/// # Errors
///
/// - `Cancelled` if the token fires before an attempt.
/// - `RetriesExhausted` once every attempt returned `NotReady`.
/// - `Rejected` if the host replies with an error.
/// - Any other channel error, immediately and without retrying.
pub async fn send_with_retry(
    channel: &dyn HostChannel,
    message: &HostMessage,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
) -> Result<(), MessagingError> {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        if cancel.is_cancelled() {
            tracing::debug!(kind = message.kind(), attempt, "send cancelled");
            return Err(MessagingError::Cancelled);
        }
        match channel.send(message).await {
            Ok(HostReply::Ack { .. }) => {
                tracing::debug!(kind = message.kind(), attempt, "host acknowledged");
                return Ok(());
            }
            Ok(HostReply::Error { message: reason, .. }) => return Err(MessagingError::Rejected(reason)),
            Err(MessagingError::NotReady) if attempt < attempts => {
                let delay = policy.jittered(policy.delay_for(attempt));
                tracing::warn!(
                    kind = message.kind(),
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "host not ready; retrying"
                );
                sleeper.sleep(delay).await;
            }
            Err(MessagingError::NotReady) => {}
            Err(e) => return Err(e),
        }
    }
    tracing::warn!(kind = message.kind(), attempts, "host never became ready");
    Err(MessagingError::RetriesExhausted { attempts })
}
