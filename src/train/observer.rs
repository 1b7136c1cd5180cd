use crate::{
    data::DataPoint,
    net::Network,
    train::TrainingSessionInfo,
};

/// State handed to observers when an epoch finishes.
pub struct EpochSummary<'a> {
    /// Zero-based index of the epoch that just finished.
    pub epoch: usize,
    pub network: &'a Network,
    pub validation_data: &'a [DataPoint],
    pub session_info: &'a TrainingSessionInfo,
}

/// Receives session events from a `NetTrainer`. Both methods default to
/// no-ops.
pub trait TrainingObserver: Send {
    fn on_training_started(&mut self) {}
    fn on_epoch_complete(&mut self, _summary: &EpochSummary) {}
}
