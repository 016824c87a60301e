//! Inter-item delay with backoff on rate-limit signals.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::session::StopSignal;

/// Delay policy between processed items.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Nominal delay between items.
    pub base_delay: Duration,
    /// Ceiling for backoff.
    pub max_delay: Duration,
    /// Multiplier applied on every rate-limit signal.
    pub backoff_multiplier: f64,
    /// Multiplier applied while recovering (< 1.0).
    pub recovery_multiplier: f64,
    /// Consecutive clean items before the delay is reduced.
    pub recovery_threshold: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            recovery_multiplier: 0.8,
            recovery_threshold: 5,
        }
    }
}

impl ThrottleConfig {
    pub fn with_base_delay(base_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: base_delay.max(Self::default().max_delay),
            ..Default::default()
        }
    }
}

/// Paces the scan loop.
#[derive(Debug)]
pub struct Throttle {
    config: ThrottleConfig,
    current_delay: Duration,
    consecutive_successes: u32,
    in_backoff: bool,
    rate_limit_hits: u64,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            current_delay: config.base_delay,
            config,
            consecutive_successes: 0,
            in_backoff: false,
            rate_limit_hits: 0,
        }
    }

    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    pub fn in_backoff(&self) -> bool {
        self.in_backoff
    }

    pub fn rate_limit_hits(&self) -> u64 {
        self.rate_limit_hits
    }

    /// Wait out the current delay. Returns `false` if interrupted by a stop.
    pub async fn pause(&self, stop: &StopSignal) -> bool {
        if self.current_delay.is_zero() {
            return !stop.is_requested();
        }
        stop.sleep(self.current_delay).await
    }

    /// Record a downstream rate-limit signal.
    pub fn report_rate_limit(&mut self) {
        self.rate_limit_hits += 1;
        self.consecutive_successes = 0;
        self.in_backoff = true;

        let base = self.current_delay.max(Duration::from_millis(100));
        let new_delay = Duration::from_secs_f64(base.as_secs_f64() * self.config.backoff_multiplier);
        self.current_delay = new_delay.min(self.config.max_delay);

        warn!(
            "Backup destination rate limited, item delay now {:?}",
            self.current_delay
        );
    }

    /// Record an item that went through without a rate-limit signal.
    pub fn report_success(&mut self) {
        self.consecutive_successes += 1;
        if !self.in_backoff || self.consecutive_successes < self.config.recovery_threshold {
            return;
        }

        self.consecutive_successes = 0;
        let new_delay = Duration::from_secs_f64(
            self.current_delay.as_secs_f64() * self.config.recovery_multiplier,
        );
        if new_delay <= self.config.base_delay {
            self.in_backoff = false;
            self.current_delay = self.config.base_delay;
            info!("Recovered from backoff, item delay back to {:?}", self.current_delay);
        } else {
            self.current_delay = new_delay;
            debug!("Item delay reduced to {:?}", self.current_delay);
        }
    }
}
