//! Shared session state for the single indexing worker.
//!
//! The scan task is the only writer of progress fields. The only external
//! mutation is a stop request, so plain atomics are enough.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

use crate::models::{IndexingSession, SessionPhase};

/// Cooperative stop flag that also wakes sleepers.
#[derive(Debug, Default)]
pub struct StopSignal {
    requested: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `true` if the full duration elapsed.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let notified = self.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent request cannot slip between.
        notified.as_mut().enable();
        if self.is_requested() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = notified => false,
        }
    }
}

/// Counters and flags of the current (or last) session.
#[derive(Debug, Default)]
pub struct SessionState {
    active: AtomicBool,
    phase: AtomicU8,
    channel_id: AtomicI64,
    cursor: AtomicI64,
    start: AtomicI64,
    end: AtomicI64,
    scanned: AtomicU64,
    matched: AtomicU64,
    errors: AtomicU64,
    skipped: AtomicU64,
    duplicates: AtomicU64,
    pub(crate) stop: StopSignal,
}

/// Which counter to bump.
#[derive(Debug, Clone, Copy)]
pub enum Counter {
    Scanned,
    Matched,
    Errors,
    Skipped,
    Duplicates,
}

impl SessionState {
    /// Claim the session for `channel_id`. Fails if one is already active.
    pub fn try_begin(&self, channel_id: i64) -> bool {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.stop.clear();
        self.channel_id.store(channel_id, Ordering::SeqCst);
        for counter in [
            &self.scanned,
            &self.matched,
            &self.errors,
            &self.skipped,
            &self.duplicates,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.cursor.store(0, Ordering::Relaxed);
        self.start.store(0, Ordering::Relaxed);
        self.end.store(0, Ordering::Relaxed);
        self.phase
            .store(SessionPhase::Scanning.to_u8(), Ordering::SeqCst);
        true
    }

    /// Move to a terminal phase and release the session.
    pub fn finish(&self, phase: SessionPhase) {
        self.phase.store(phase.to_u8(), Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Request a stop. Returns whether a session was running.
    pub fn request_stop(&self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.stop.request();
        true
    }

    pub fn set_range(&self, start: i64, end: i64) {
        self.start.store(start, Ordering::Relaxed);
        self.end.store(end, Ordering::Relaxed);
    }

    pub fn set_cursor(&self, position: i64) {
        self.cursor.store(position, Ordering::Relaxed);
    }

    pub fn bump(&self, counter: Counter) {
        let target = match counter {
            Counter::Scanned => &self.scanned,
            Counter::Matched => &self.matched,
            Counter::Errors => &self.errors,
            Counter::Skipped => &self.skipped,
            Counter::Duplicates => &self.duplicates,
        };
        target.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IndexingSession {
        let phase = self.phase();
        IndexingSession {
            active: self.is_active(),
            phase,
            channel_id: (phase != SessionPhase::Idle)
                .then(|| self.channel_id.load(Ordering::SeqCst)),
            cursor_position: self.cursor.load(Ordering::Relaxed),
            start_sequence: self.start.load(Ordering::Relaxed),
            end_sequence: self.end.load(Ordering::Relaxed),
            scanned_count: self.scanned.load(Ordering::Relaxed),
            matched_count: self.matched.load(Ordering::Relaxed),
            error_count: self.errors.load(Ordering::Relaxed),
            skipped_count: self.skipped.load(Ordering::Relaxed),
            duplicate_count: self.duplicates.load(Ordering::Relaxed),
            stop_requested: self.stop.is_requested(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_only_one_session_at_a_time() {
        let state = SessionState::default();
        assert!(state.try_begin(1));
        assert!(!state.try_begin(2));
        assert_eq!(state.snapshot().channel_id, Some(1));

        state.finish(SessionPhase::Completed);
        assert!(state.try_begin(2));
        assert_eq!(state.snapshot().channel_id, Some(2));
    }

    #[test]
    fn test_begin_resets_counters_and_stop() {
        let state = SessionState::default();
        assert!(state.try_begin(1));
        state.bump(Counter::Scanned);
        state.request_stop();
        state.finish(SessionPhase::Stopped);

        assert!(!state.request_stop());
        assert!(state.try_begin(1));
        let snap = state.snapshot();
        assert_eq!(snap.scanned_count, 0);
        assert!(!snap.stop_requested);
        assert_eq!(snap.phase, SessionPhase::Scanning);
    }

    #[test]
    fn test_idle_snapshot_has_no_channel() {
        let state = SessionState::default();
        let snap = state.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.phase, SessionPhase::Idle);
        assert_eq!(snap.channel_id, None);
    }

    #[tokio::test]
    async fn test_stop_wakes_sleep() {
        let signal = Arc::new(StopSignal::default());
        let sleeper = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.sleep(Duration::from_secs(3600)).await })
        };
        tokio::task::yield_now().await;
        signal.request();
        assert!(!sleeper.await.unwrap());
    }

    #[tokio::test]
    async fn test_sleep_completes_without_stop() {
        let signal = StopSignal::default();
        assert!(signal.sleep(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_sleep_returns_immediately_when_already_stopped() {
        let signal = StopSignal::default();
        signal.request();
        assert!(!signal.sleep(Duration::from_secs(3600)).await);
    }
}
