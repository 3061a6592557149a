//! Redelivery scheduling for orders that failed for a recoverable reason.
//!
//! Retries are decoupled from the primary queue: each redelivery is a sleep-then-republish task of
//! its own, so a slow-moving retry never head-of-line-blocks fresh orders. The scheduler does no
//! deduplication; the consumer's terminal-state check is the sole safeguard against the broker's
//! at-least-once duplicates.
use std::time::Duration;

use log::*;
use tokio::task::JoinHandle;

use crate::{broker::MessageBroker, message::OrderMessage};

pub const DEFAULT_MAX_ATTEMPTS: i64 = 5;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(300);

//--------------------------------------       Backoff       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay before every redelivery.
    Fixed(Duration),
    /// `base` doubled per attempt, capped at `cap`.
    Exponential { base: Duration, cap: Duration },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(DEFAULT_RETRY_DELAY)
    }
}

impl Backoff {
    /// The delay to apply before redelivering the given (1-based) attempt.
    pub fn delay_for(&self, attempt: i64) -> Duration {
        match self {
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential { base, cap } => {
                let shift = attempt.clamp(1, 32) - 1;
                let delay = base.saturating_mul(1u32 << shift.min(31));
                delay.min(*cap)
            },
        }
    }
}

//--------------------------------------     RetryPolicy     ---------------------------------------------------------
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// An order whose attempt count exceeds this bound is dead-lettered instead of retried.
    pub max_attempts: i64,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_MAX_ATTEMPTS, backoff: Backoff::default() }
    }
}

impl RetryPolicy {
    pub fn is_exhausted(&self, attempt_count: i64) -> bool {
        attempt_count > self.max_attempts
    }
}

//--------------------------------------    RetryScheduler   ---------------------------------------------------------
/// Schedules the redelivery of an order message after its backoff delay.
#[derive(Clone)]
pub struct RetryScheduler<M: MessageBroker> {
    broker: M,
    backoff: Backoff,
}

impl<M: MessageBroker + 'static> RetryScheduler<M> {
    pub fn new(broker: M, backoff: Backoff) -> Self {
        Self { broker, backoff }
    }

    /// Spawns the delayed republish for `message`. The returned handle does not need to be
    /// awaited; it is returned so that tests can synchronise with the republish.
    pub fn schedule(&self, message: OrderMessage) -> JoinHandle<()> {
        let broker = self.broker.clone();
        let delay = self.backoff.delay_for(message.attempt_count);
        debug!("♻️ Scheduling redelivery of {message} in {delay:?}");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = broker.publish(message.clone()).await {
                // The queue is gone (shutdown). The message stays recoverable on the order record.
                warn!("♻️ Could not redeliver {message}: {e}");
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixed_backoff_is_flat() {
        let backoff = Backoff::Fixed(Duration::from_secs(2));
        assert_eq!(backoff.delay_for(1), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(5), Duration::from_secs(2));
    }

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential { base: Duration::from_secs(1), cap: Duration::from_secs(8) };
        assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(8));
        assert_eq!(backoff.delay_for(10), Duration::from_secs(8));
    }

    #[test]
    fn bound_is_exceeded_strictly() {
        let policy = RetryPolicy { max_attempts: 5, ..Default::default() };
        assert!(!policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }
}
