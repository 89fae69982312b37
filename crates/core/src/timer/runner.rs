use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::debug;

use super::{
    clock::Clock,
    offer::{OfferTimer, TimerEvent, TimerSource, TimerStatus, DEFAULT_EXPIRING_THRESHOLD_SECS},
};

/// Tunables for a ticking countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    /// Seconds at or below which the status becomes `ExpiringSoon`.
    pub expiring_threshold_secs: u64,
    /// Interval between recomputations.
    pub tick: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            expiring_threshold_secs: DEFAULT_EXPIRING_THRESHOLD_SECS,
            tick: Duration::from_secs(1),
        }
    }
}

/// Message sent by the ticking task after every recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerUpdate {
    /// Deadline generation that produced this update.
    pub generation: u64,
    pub source: TimerSource,
    pub status: TimerStatus,
    /// Edge reached on this tick, if any.
    pub event: Option<TimerEvent>,
}

/// Owns at most one ticking task for a logical countdown.
///
/// [`TimerHandle::reset`] aborts the previous task before spawning the next
/// one and bumps the generation, so receivers can drop anything an aborted
/// task managed to queue. Dropping the handle aborts the task.
pub struct TimerHandle {
    clock: Arc<dyn Clock>,
    sender: mpsc::Sender<TimerUpdate>,
    settings: TimerSettings,
    source: TimerSource,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    /// Create an idle handle. Nothing ticks until [`TimerHandle::reset`].
    pub fn new(
        clock: Arc<dyn Clock>,
        sender: mpsc::Sender<TimerUpdate>,
        settings: TimerSettings,
        source: TimerSource,
    ) -> Self {
        Self {
            clock,
            sender,
            settings,
            source,
            generation: 0,
            task: None,
        }
    }

    /// Point the countdown at a new deadline, or stop it with `None`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn reset(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.cancel();
        self.generation += 1;

        let Some(deadline) = expires_at else {
            debug!(source = %self.source, generation = self.generation, "timer cleared");
            return;
        };

        let timer = OfferTimer::new(
            Some(deadline),
            self.settings.expiring_threshold_secs,
            self.source,
            self.clock.now(),
        );
        debug!(
            source = %self.source,
            generation = self.generation,
            remaining = timer.remaining(),
            "timer started"
        );
        self.task = Some(tokio::spawn(drive(
            timer,
            Arc::clone(&self.clock),
            self.sender.clone(),
            self.generation,
            self.settings.tick,
        )));
    }

    /// Abort the running task, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Generation of the most recent deadline.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether an update belongs to the current deadline.
    pub fn is_current(&self, update: &TimerUpdate) -> bool {
        update.generation == self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    pub fn source(&self) -> TimerSource {
        self.source
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn drive(
    mut timer: OfferTimer,
    clock: Arc<dyn Clock>,
    sender: mpsc::Sender<TimerUpdate>,
    generation: u64,
    period: Duration,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // First tick completes immediately, so the initial status goes out
        // without delay.
        ticker.tick().await;
        let event = timer.tick(clock.now());
        let status = timer.status();
        let update = TimerUpdate {
            generation,
            source: timer.source(),
            status,
            event,
        };
        if sender.send(update).await.is_err() {
            debug!(generation, "timer receiver closed");
            break;
        }
        if status.is_expired() {
            debug!(source = %timer.source(), generation, "timer expired");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::clock::MonotonicClock;

    fn handle(clock: Arc<dyn Clock>) -> (TimerHandle, mpsc::Receiver<TimerUpdate>) {
        let (tx, rx) = mpsc::channel(32);
        let handle = TimerHandle::new(clock, tx, TimerSettings::default(), TimerSource::Offer);
        (handle, rx)
    }

    async fn next(rx: &mut mpsc::Receiver<TimerUpdate>) -> Option<TimerUpdate> {
        time::timeout(Duration::from_secs(3600), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_and_expires_once() {
        let clock = Arc::new(MonotonicClock::new());
        let deadline = clock.now() + chrono::Duration::seconds(2);
        let (mut handle, mut rx) = handle(clock);
        handle.reset(Some(deadline));

        let first = next(&mut rx).await.expect("initial update");
        assert_eq!(first.status, TimerStatus::ExpiringSoon(2));
        assert_eq!(first.event, Some(TimerEvent::ExpiringSoon));

        let second = next(&mut rx).await.expect("second update");
        assert_eq!(second.status, TimerStatus::ExpiringSoon(1));
        assert_eq!(second.event, None);

        let third = next(&mut rx).await.expect("expiry update");
        assert_eq!(third.status, TimerStatus::Expired);
        assert_eq!(third.event, Some(TimerEvent::Expired));

        assert_eq!(next(&mut rx).await, None);
        assert!(!handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_expires_immediately() {
        let clock = Arc::new(MonotonicClock::new());
        let deadline = clock.now() - chrono::Duration::seconds(30);
        let (mut handle, mut rx) = handle(clock);
        handle.reset(Some(deadline));

        let update = next(&mut rx).await.expect("update");
        assert_eq!(update.status, TimerStatus::Expired);
        assert_eq!(update.event, Some(TimerEvent::Expired));
        assert_eq!(next(&mut rx).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_replaces_previous_countdown() {
        let clock = Arc::new(MonotonicClock::new());
        let (mut handle, mut rx) = handle(clock.clone());
        handle.reset(Some(clock.now() + chrono::Duration::seconds(200)));

        let first = next(&mut rx).await.expect("first update");
        assert_eq!(first.generation, 1);
        assert_eq!(first.status, TimerStatus::Active(200));

        handle.reset(Some(clock.now() + chrono::Duration::seconds(3)));
        assert_eq!(handle.generation(), 2);

        let mut expirations = 0;
        while let Some(update) = next(&mut rx).await {
            assert!(handle.is_current(&update));
            if update.event == Some(TimerEvent::Expired) {
                expirations += 1;
            }
        }
        assert_eq!(expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_deadline_stops_ticking() {
        let clock = Arc::new(MonotonicClock::new());
        let (mut handle, mut rx) = handle(clock.clone());
        handle.reset(Some(clock.now() + chrono::Duration::seconds(10)));
        next(&mut rx).await.expect("initial update");

        handle.reset(None);
        assert!(!handle.is_running());
        assert_eq!(next(&mut rx).await, None);
    }
}
