use std::path::Path;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use tracing::{debug, info};

use crate::{
    data::{create_mini_batches, shuffle_batches, split_data, Batch, DataPoint},
    evaluate::{evaluate_with_workers, EvaluationData},
    func::{CompletionFn, LearningRateFn},
    initializer::RandomNetInitializer,
    net::Network,
    save::save_to_file,
    train::{EpochSummary, HyperParameters, TrainerError, TrainingObserver, TrainingSessionInfo},
};

/// Drives minibatch gradient descent over a data set in time-sliced ticks.
///
/// A session starts with `start_training_session`, which builds a fresh
/// network from the hyperparameters. Each call to `run` then trains for
/// roughly `tick_budget`, always finishing the minibatch in progress.
#[derive(Builder)]
#[builder(pattern = "owned")]
pub struct NetTrainer {
    data: Vec<DataPoint>,
    hyper_parameters: HyperParameters,
    #[builder(default = "0.8")]
    training_split: f64,
    #[builder(default = "true")]
    shuffle_data: bool,
    #[builder(default = "Duration::from_millis(16)")]
    tick_budget: Duration,
    /// Seeds the partition shuffling, from which the weight initialization
    /// seed is drawn.
    #[builder(default, setter(into))]
    seed: Option<u64>,
    #[builder(default = "num_cpus::get()")]
    worker_threads: usize,
    #[builder(setter(skip))]
    observers: Vec<Box<dyn TrainingObserver>>,
    #[builder(setter(skip))]
    rng: Option<XorShiftRng>,
    #[builder(setter(skip))]
    partitions: Option<Partitions>,
    #[builder(setter(skip))]
    session: Option<Session>,
}

struct Partitions {
    training: Vec<DataPoint>,
    validation: Vec<DataPoint>,
}

struct Session {
    network: Network,
    batches: Vec<Batch>,
    batch_index: usize,
    epoch_count: usize,
    learning_rate_fn: LearningRateFn,
    current_learn_rate: f64,
    info: TrainingSessionInfo,
}

impl NetTrainer {

    /// Builds a new network and resets the batch cursor, epoch count and
    /// learning rate. The data set is split on the first call only; the
    /// minibatches are rebuilt every time so a changed minibatch size
    /// takes effect.
    pub fn start_training_session(&mut self) -> Result<(), TrainerError> {
        self.hyper_parameters.validate()
            .map_err(TrainerError::InvalidHyperParameters)?;
        self.check_data()?;

        let seed = self.seed;
        let rng = self.rng.get_or_insert_with(|| match seed {
            Some(seed) => XorShiftRng::seed_from_u64(seed),
            None => XorShiftRng::from_entropy(),
        });

        if self.partitions.is_none() {
            let (training, validation) = split_data(&self.data, self.training_split, self.shuffle_data, rng);
            info!(training = training.len(), validation = validation.len(), "split data set");
            self.partitions = Some(Partitions { training, validation });
        }
        let training = match &self.partitions {
            Some(partitions) => &partitions.training,
            None => return Err(TrainerError::EmptyDataSet),
        };

        let minibatch_size = self.hyper_parameters.minibatch_size;
        let batches = create_mini_batches(training, minibatch_size, self.shuffle_data, rng);
        if batches.is_empty() {
            return Err(TrainerError::NotEnoughTrainingData(training.len(), minibatch_size));
        }

        // seeded runs draw the weight seed from the shuffle stream
        let mut initializer = match seed {
            Some(_) => RandomNetInitializer::new_with_seed(rng.gen()),
            None => RandomNetInitializer::new_from_entropy(),
        };
        let mut network = self.hyper_parameters.create_network(&mut initializer);
        network.set_worker_threads(self.worker_threads);

        let learning_rate_fn = self.hyper_parameters.learning_rate_fn();
        let current_learn_rate = learning_rate_fn.initial_learning_rate();
        info!(
            layer_sizes = ?self.hyper_parameters.layer_sizes,
            batches_per_epoch = batches.len(),
            learn_rate = current_learn_rate,
            "starting training session"
        );

        self.session = Some(Session {
            network,
            info: TrainingSessionInfo::new(batches.len(), current_learn_rate),
            batches,
            batch_index: 0,
            epoch_count: 0,
            learning_rate_fn,
            current_learn_rate,
        });

        for observer in self.observers.iter_mut() {
            observer.on_training_started();
        }
        Ok(())
    }

    fn check_data(&self) -> Result<(), TrainerError> {
        if self.data.is_empty() {
            return Err(TrainerError::EmptyDataSet);
        }
        let input_size = self.hyper_parameters.input_size();
        let output_size = self.hyper_parameters.output_size();
        for data_point in &self.data {
            if data_point.inputs().len() != input_size {
                return Err(TrainerError::InputSizeMismatch(input_size, data_point.inputs().len()));
            }
            if data_point.num_labels() != output_size {
                return Err(TrainerError::OutputSizeMismatch(output_size, data_point.num_labels()));
            }
        }
        Ok(())
    }

    /// One scheduling tick of `tick_budget`.
    pub fn run(&mut self) -> Result<usize, TrainerError> {
        self.run_for(self.tick_budget)
    }

    /// Learns minibatches until `budget` has elapsed, at least one. Returns
    /// the number of minibatches processed.
    pub fn run_for(&mut self, budget: Duration) -> Result<usize, TrainerError> {
        let (session, rng) = match (self.session.as_mut(), self.rng.as_mut()) {
            (Some(session), Some(rng)) => (session, rng),
            _ => return Err(TrainerError::SessionNotStarted),
        };
        let validation_data: &[DataPoint] = match &self.partitions {
            Some(partitions) => &partitions.validation[..],
            None => &[],
        };
        let hyper_parameters = &self.hyper_parameters;

        let tick_start = Instant::now();
        let mut batches_run = 0;
        loop {
            session.network.learn(
                session.batches[session.batch_index].data(),
                session.current_learn_rate,
                hyper_parameters.regularization,
                hyper_parameters.momentum,
            );
            session.info.batch_completed();
            session.batch_index += 1;
            batches_run += 1;

            if session.batch_index >= session.batches.len() {
                session.epoch_completed(validation_data, rng, &mut self.observers);
            }
            if tick_start.elapsed() >= budget {
                break;
            }
        }

        session.info.current_learn_rate = session.current_learn_rate;
        debug!(batches_run, batch_index = session.batch_index, "training tick finished");
        Ok(batches_run)
    }

    /// Runs ticks until `completion` says to stop, measured from the start
    /// of the session.
    pub fn run_until(&mut self, completion: &CompletionFn) -> Result<(), TrainerError> {
        loop {
            let (epoch_count, start_time) = match &self.session {
                Some(session) => (session.epoch_count, session.info.start_time()),
                None => return Err(TrainerError::SessionNotStarted),
            };
            if completion.should_stop_training(epoch_count, start_time) {
                return Ok(());
            }
            self.run()?;
        }
    }

    /// Evaluates the current network on the validation partition, or on the
    /// training partition when `use_validation_set` is false.
    pub fn evaluate(&self, use_validation_set: bool) -> Result<EvaluationData, TrainerError> {
        let network = self.network().ok_or(TrainerError::SessionNotStarted)?;
        let data = if use_validation_set { self.validation_data() } else { self.training_data() };
        Ok(evaluate_with_workers(network, data, self.worker_threads)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TrainerError> {
        let network = self.network().ok_or(TrainerError::SessionNotStarted)?;
        save_to_file(network, path)?;
        Ok(())
    }

    pub fn add_observer(&mut self, observer: impl TrainingObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Takes effect at the next `start_training_session`.
    pub fn set_hyper_parameters(&mut self, hyper_parameters: HyperParameters) {
        self.hyper_parameters = hyper_parameters;
    }

    #[inline]
    pub fn hyper_parameters(&self) -> &HyperParameters {
        &self.hyper_parameters
    }

    pub fn network(&self) -> Option<&Network> {
        self.session.as_ref().map(|session| &session.network)
    }

    pub fn session_info(&self) -> Option<&TrainingSessionInfo> {
        self.session.as_ref().map(|session| &session.info)
    }

    pub fn epoch_count(&self) -> usize {
        self.session.as_ref().map_or(0, |session| session.epoch_count)
    }

    pub fn current_learn_rate(&self) -> Option<f64> {
        self.session.as_ref().map(|session| session.current_learn_rate)
    }

    pub fn is_training_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn training_data(&self) -> &[DataPoint] {
        match &self.partitions {
            Some(partitions) => &partitions.training,
            None => &[],
        }
    }

    pub fn validation_data(&self) -> &[DataPoint] {
        match &self.partitions {
            Some(partitions) => &partitions.validation,
            None => &[],
        }
    }

}

impl Session {

    fn epoch_completed(
        &mut self,
        validation_data: &[DataPoint],
        rng: &mut XorShiftRng,
        observers: &mut [Box<dyn TrainingObserver>],
    ) {
        let summary = EpochSummary {
            epoch: self.epoch_count,
            network: &self.network,
            validation_data,
            session_info: &self.info,
        };
        for observer in observers.iter_mut() {
            observer.on_epoch_complete(&summary);
        }

        self.batch_index = 0;
        self.epoch_count += 1;
        shuffle_batches(&mut self.batches, rng);
        self.current_learn_rate = self.learning_rate_fn.get_learning_rate(self.epoch_count);
        info!(epoch = self.epoch_count, learn_rate = self.current_learn_rate, "epoch complete");
    }

}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{Arc, Mutex};
    use crate::func::{ActivationFn, CostFn};
    use crate::train::HyperParametersBuilder;

    fn points(n: usize) -> Vec<DataPoint> {
        (0..n)
            .map(|i| {
                let label = i % 2;
                let x = if label == 0 { -1.0 } else { 1.0 };
                DataPoint::new(vec![x, x * 0.5 + (i % 5) as f64 * 0.01], label, 2).unwrap()
            })
            .collect()
    }

    fn hyper_parameters(minibatch_size: usize) -> HyperParameters {
        HyperParametersBuilder::default()
            .layer_sizes(vec![2, 3, 2])
            .activation(ActivationFn::Sigmoid)
            .minibatch_size(minibatch_size)
            .build()
            .unwrap()
    }

    fn trainer(data: Vec<DataPoint>, minibatch_size: usize) -> NetTrainer {
        NetTrainerBuilder::default()
            .data(data)
            .hyper_parameters(hyper_parameters(minibatch_size))
            .training_split(1.0)
            .seed(42u64)
            .worker_threads(2)
            .build()
            .unwrap()
    }

    struct EpochRecorder(Arc<Mutex<Vec<usize>>>);

    impl TrainingObserver for EpochRecorder {
        fn on_epoch_complete(&mut self, summary: &EpochSummary) {
            self.0.lock().unwrap().push(summary.epoch);
        }
    }

    #[test]
    fn test_requires_session() {
        let mut trainer = trainer(points(10), 5);
        match trainer.run() {
            Err(TrainerError::SessionNotStarted) => {}
            other => panic!("unexpected result {:?}", other),
        }
        assert!(trainer.evaluate(true).is_err());
    }

    #[test]
    fn test_empty_data() {
        let mut trainer = trainer(Vec::new(), 5);
        match trainer.start_training_session() {
            Err(TrainerError::EmptyDataSet) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_not_enough_training_data() {
        let mut trainer = trainer(points(4), 5);
        match trainer.start_training_session() {
            Err(TrainerError::NotEnoughTrainingData(4, 5)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_input_size_mismatch() {
        let data = vec![DataPoint::new(vec![0.0, 1.0, 2.0], 0, 2).unwrap()];
        let mut trainer = trainer(data, 1);
        match trainer.start_training_session() {
            Err(TrainerError::InputSizeMismatch(2, 3)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_epoch_schedule() {
        let epochs = Arc::new(Mutex::new(Vec::new()));
        let mut trainer = trainer(points(10), 5);
        trainer.add_observer(EpochRecorder(epochs.clone()));
        trainer.start_training_session().unwrap();
        assert_eq!(trainer.current_learn_rate(), Some(0.05));

        assert_eq!(trainer.run_for(Duration::from_secs(0)).unwrap(), 1);
        assert_eq!(trainer.epoch_count(), 0);
        assert_eq!(trainer.session_info().unwrap().epochs_completed, 0.5);

        trainer.run_for(Duration::from_secs(0)).unwrap();
        assert_eq!(trainer.epoch_count(), 1);
        assert_eq!(*epochs.lock().unwrap(), vec![0]);
        let expected_rate = 0.05 / (1.0 + 0.075);
        assert!((trainer.current_learn_rate().unwrap() - expected_rate).abs() < 1e-15);

        let info = trainer.session_info().unwrap();
        assert_eq!(info.batches_completed, 2);
        assert_eq!(info.epochs_completed, 1.0);
        assert_eq!(info.current_learn_rate, trainer.current_learn_rate().unwrap());
    }

    #[test]
    fn test_seeded_weights_independent_of_shuffle_stream() {
        let mut first = trainer(points(10), 5);
        first.start_training_session().unwrap();
        let mut second = trainer(points(10), 5);
        second.start_training_session().unwrap();
        let weights = first.network().unwrap().layer(0).weights();
        assert_eq!(weights, second.network().unwrap().layer(0).weights());

        let mut shuffle_stream = RandomNetInitializer::new_with_seed(42);
        let replayed = Network::new(&[2, 3, 2], &mut shuffle_stream);
        assert_ne!(weights, replayed.layer(0).weights());
    }

    #[test]
    fn test_restart_resets_session() {
        let mut trainer = trainer(points(10), 5);
        trainer.start_training_session().unwrap();
        trainer.run_until(&CompletionFn::stop_after_epochs(2)).unwrap();
        assert!(trainer.epoch_count() >= 2);

        trainer.set_hyper_parameters(hyper_parameters(2));
        trainer.start_training_session().unwrap();
        assert_eq!(trainer.epoch_count(), 0);
        assert_eq!(trainer.session_info().unwrap().batches_per_epoch(), 5);
        assert_eq!(trainer.current_learn_rate(), Some(0.05));
    }

    #[test]
    fn test_split_partitions() {
        let mut trainer = NetTrainerBuilder::default()
            .data(points(100))
            .hyper_parameters(hyper_parameters(8))
            .training_split(0.75)
            .seed(3u64)
            .build()
            .unwrap();
        trainer.start_training_session().unwrap();
        assert_eq!(trainer.training_data().len(), 75);
        assert_eq!(trainer.validation_data().len(), 25);
        assert_eq!(trainer.session_info().unwrap().batches_per_epoch(), 9);
    }

    #[test]
    fn test_trains_to_high_accuracy() {
        let mut trainer = NetTrainerBuilder::default()
            .data(points(200))
            .hyper_parameters(
                HyperParametersBuilder::default()
                    .layer_sizes(vec![2, 4, 2])
                    .activation(ActivationFn::Sigmoid)
                    .output_activation(ActivationFn::Softmax)
                    .cost(CostFn::CrossEntropy)
                    .initial_learning_rate(0.2)
                    .minibatch_size(10)
                    .build()
                    .unwrap()
            )
            .seed(9u64)
            .build()
            .unwrap();
        trainer.start_training_session().unwrap();
        trainer.run_until(&CompletionFn::stop_after_epochs(40)).unwrap();

        let evaluation = trainer.evaluate(false).unwrap();
        assert!(evaluation.accuracy() >= 0.95, "{}", evaluation);
        let validation = trainer.evaluate(true).unwrap();
        assert_eq!(validation.total, 40);
    }

    #[test]
    fn test_save() {
        let mut trainer = trainer(points(10), 5);
        trainer.start_training_session().unwrap();
        trainer.run().unwrap();
        let path = std::env::temp_dir().join(format!("digit-net-trainer-{}.json", std::process::id()));
        trainer.save(&path).unwrap();
        let loaded = crate::save::load_network_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.layer(0).weights(), trainer.network().unwrap().layer(0).weights());
    }

}
