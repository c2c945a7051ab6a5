use std::time::Duration;
use std::thread;
use rand::Rng;
use log::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct DelaySettings {
    pub request_jitter: (Duration, Duration),
    pub retry_backoff: Duration,
    pub row_delay_base: Duration,
    pub row_delay_normal_spread: Duration,
    pub row_delay_backoff_min: Duration,
    pub row_delay_backoff_max: Duration,
    // Ratio of failures to successes above which rows slow down.
    pub failure_ratio_threshold: f64,
    pub checkpoint_pause: Duration,
}

impl Default for DelaySettings {
    fn default() -> Self {
        DelaySettings {
            request_jitter: (Duration::from_secs(2), Duration::from_secs(3)),
            retry_backoff: Duration::from_secs(3),
            row_delay_base: Duration::from_millis(2500),
            row_delay_normal_spread: Duration::from_millis(1500),
            row_delay_backoff_min: Duration::from_secs(1),
            row_delay_backoff_max: Duration::from_secs(3),
            failure_ratio_threshold: 0.3,
            checkpoint_pause: Duration::from_millis(500),
        }
    }
}

impl DelaySettings {
    pub fn none() -> Self {
        DelaySettings {
            request_jitter: (Duration::ZERO, Duration::ZERO),
            retry_backoff: Duration::ZERO,
            row_delay_base: Duration::ZERO,
            row_delay_normal_spread: Duration::ZERO,
            row_delay_backoff_min: Duration::ZERO,
            row_delay_backoff_max: Duration::ZERO,
            failure_ratio_threshold: 0.3,
            checkpoint_pause: Duration::ZERO,
        }
    }

    pub fn with_row_delay_base(mut self, base: Duration) -> Self {
        self.row_delay_base = base;
        self
    }

    pub fn is_backing_off(&self, failed: usize, success: usize) -> bool {
        failed as f64 > success as f64 * self.failure_ratio_threshold
    }

    pub fn row_delay_range(&self, failed: usize, success: usize) -> (Duration, Duration) {
        if self.is_backing_off(failed, success) {
            (
                self.row_delay_base + self.row_delay_backoff_min,
                self.row_delay_base + self.row_delay_backoff_max,
            )
        } else {
            (self.row_delay_base, self.row_delay_base + self.row_delay_normal_spread)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DelayManager {
    settings: DelaySettings,
}

impl DelayManager {
    pub fn new(settings: DelaySettings) -> Self {
        DelayManager { settings }
    }

    pub fn request_delay(&self) {
        let (low, high) = self.settings.request_jitter;
        let delay = random_between(low, high);
        debug!("Waiting {:.1}s before search request...", delay.as_secs_f64());
        pause(delay);
    }

    pub fn retry_backoff(&self) {
        let delay = self.settings.retry_backoff;
        info!("Retrying in {:.1}s...", delay.as_secs_f64());
        pause(delay);
    }

    pub fn row_delay(&self, failed: usize, success: usize) -> Duration {
        let (low, high) = self.settings.row_delay_range(failed, success);
        let delay = random_between(low, high);
        if self.settings.is_backing_off(failed, success) {
            info!(
                "Failure rate high ({} failed / {} ok), waiting {:.1}s (Row Delay)...",
                failed,
                success,
                delay.as_secs_f64()
            );
        } else {
            debug!("Waiting {:.1}s (Row Delay)...", delay.as_secs_f64());
        }
        pause(delay);
        delay
    }

    pub fn checkpoint_pause(&self) {
        pause(self.settings.checkpoint_pause);
    }
}

fn random_between(low: Duration, high: Duration) -> Duration {
    if high <= low {
        return low;
    }
    let mut rng = rand::thread_rng();
    Duration::from_secs_f64(rng.gen_range(low.as_secs_f64()..=high.as_secs_f64()))
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
