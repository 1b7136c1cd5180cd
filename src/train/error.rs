use crate::evaluate::EvaluateError;
use crate::save::SaveError;

quick_error! {
    #[derive(Debug)]
    pub enum TrainerError {
        EmptyDataSet {
            description("Data set is empty")
        }
        InputSizeMismatch(expected: usize, found: usize) {
            description("Data point input size doesn't match network input size")
            display("Network expects {} inputs, data point has {}", expected, found)
        }
        OutputSizeMismatch(expected: usize, found: usize) {
            description("Data point label count doesn't match network output size")
            display("Network has {} outputs, data point has {} labels", expected, found)
        }
        NotEnoughTrainingData(points: usize, minibatch_size: usize) {
            description("Training partition is smaller than one minibatch")
            display("Training partition has {} points, fewer than the minibatch size {}", points, minibatch_size)
        }
        InvalidHyperParameters(reason: String) {
            description("Invalid hyperparameters")
            display("Invalid hyperparameters: {}", reason)
        }
        SessionNotStarted {
            description("No training session has been started")
        }
        Evaluate(err: EvaluateError) {
            from()
            description("Failed to evaluate network")
            display("Failed to evaluate network: {}", err)
        }
        Save(err: SaveError) {
            from()
            description("Failed to save network")
            display("Failed to save network: {}", err)
        }
    }
}
