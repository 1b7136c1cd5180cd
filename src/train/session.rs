use std::time::{Duration, Instant};

use crate::utils::limit_display_precision;

/// Progress of the running training session. Display values are truncated
/// to three decimals.
#[derive(Clone, Debug)]
pub struct TrainingSessionInfo {
    pub epochs_completed: f64,
    pub batches_completed: usize,
    pub elapsed_time_seconds: f64,
    pub avg_time_per_epoch_seconds: f64,
    pub avg_time_per_batch_millis: u128,
    pub current_learn_rate: f64,
    batches_per_epoch: usize,
    start_time: Instant,
}

impl TrainingSessionInfo {

    pub fn new(batches_per_epoch: usize, initial_learn_rate: f64) -> Self {
        TrainingSessionInfo {
            epochs_completed: 0.0,
            batches_completed: 0,
            elapsed_time_seconds: 0.0,
            avg_time_per_epoch_seconds: 0.0,
            avg_time_per_batch_millis: 0,
            current_learn_rate: initial_learn_rate,
            batches_per_epoch,
            start_time: Instant::now(),
        }
    }

    pub fn batch_completed(&mut self) {
        let elapsed = self.start_time.elapsed();
        self.record_batch(elapsed);
    }

    fn record_batch(&mut self, elapsed: Duration) {
        self.batches_completed += 1;
        self.epochs_completed = limit_display_precision(
            self.batches_completed as f64 / self.batches_per_epoch as f64
        );
        // whole seconds only
        self.elapsed_time_seconds = limit_display_precision(elapsed.as_secs() as f64);
        if self.epochs_completed > 0.0 {
            self.avg_time_per_epoch_seconds = limit_display_precision(
                elapsed.as_millis() as f64 / self.epochs_completed / 1000.0
            );
        }
        self.avg_time_per_batch_millis = elapsed.as_millis() / self.batches_completed as u128;
    }

    #[inline]
    pub fn batches_per_epoch(&self) -> usize {
        self.batches_per_epoch
    }

    #[inline]
    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

}
