use std::time::{Duration, Instant};

/// Stop condition for a training run that spans many scheduling ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompletionFn {
    max_epochs: Option<usize>,
    max_duration: Option<Duration>,
}

impl CompletionFn {

    pub fn stop_after_epochs(epochs: usize) -> Self {
        CompletionFn {
            max_epochs: Some(epochs),
            max_duration: None,
        }
    }

    pub fn stop_after_duration(duration: Duration) -> Self {
        CompletionFn {
            max_epochs: None,
            max_duration: Some(duration),
        }
    }

    /// Whichever limit is reached first ends training.
    pub fn or_after_duration(self, duration: Duration) -> Self {
        CompletionFn {
            max_duration: Some(duration),
            ..self
        }
    }

    pub fn should_stop_training(&self, epochs_completed: usize, start_time: Instant) -> bool {
        if let Some(max_epochs) = self.max_epochs {
            if epochs_completed >= max_epochs {
                return true;
            }
        }
        if let Some(max_duration) = self.max_duration {
            if max_duration <= start_time.elapsed() {
                return true;
            }
        }
        false
    }

}
