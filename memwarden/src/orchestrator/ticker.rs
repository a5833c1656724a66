//! Tick sources driving the sampling loop.
//!
//! The loop is built around an injected tick source instead of a hard-wired
//! timer, so tests can drive ticks deterministically without substituting
//! the runtime clock.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Source of sampling ticks.
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next tick. Returns `false` once the source is exhausted,
    /// which stops the sampling loop.
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker over `tokio::time::interval`.
///
/// Missed ticks are skipped rather than queued: a tick that runs longer than
/// the period delays only itself, and the loop resumes on the next interval
/// boundary. The first tick fires immediately, so a freshly initialized
/// orchestrator samples right away.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Create a ticker with the given period.
    pub fn new(period: Duration) -> Self {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl TickSource for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Channel-driven ticker for deterministic tests and host-driven sampling.
///
/// Each message on the channel releases exactly one tick; dropping the
/// sender exhausts the source and stops the loop.
#[derive(Debug)]
pub struct ManualTicker {
    receiver: mpsc::Receiver<()>,
}

impl ManualTicker {
    /// Create a ticker plus the sender that releases its ticks.
    pub fn new() -> (mpsc::Sender<()>, Self) {
        let (sender, receiver) = mpsc::channel(16);
        (sender, Self { receiver })
    }
}

#[async_trait]
impl TickSource for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.receiver.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_ticker_releases_one_tick_per_send() {
        let (sender, mut ticker) = ManualTicker::new();
        sender.send(()).await.unwrap();
        assert!(ticker.tick().await);
    }

    #[tokio::test]
    async fn test_manual_ticker_exhausts_when_sender_drops() {
        let (sender, mut ticker) = ManualTicker::new();
        drop(sender);
        assert!(!ticker.tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_first_tick_is_immediate() {
        let mut ticker = IntervalTicker::new(Duration::from_secs(60));
        assert!(ticker.tick().await);
    }
}
