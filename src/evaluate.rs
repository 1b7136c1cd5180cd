use std::fmt;
use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{
    data::DataPoint,
    net::Network,
    stats::Stats,
};

quick_error! {
    #[derive(Debug, PartialEq)]
    pub enum EvaluateError {
        InputSizeMismatch(expected: usize, found: usize) {
            description("Data point input size doesn't match network input size")
            display("Network expects {} inputs, data point has {}", expected, found)
        }
        OutputSizeMismatch(expected: usize, found: usize) {
            description("Data point label count doesn't match network output size")
            display("Network has {} outputs, data point has {} labels", expected, found)
        }
    }
}

/// Classification results of a network over one data set.
#[derive(Clone, Debug)]
pub struct EvaluationData {
    pub num_correct: usize,
    pub total: usize,
    pub num_correct_per_class: Vec<usize>,
    pub total_per_class: Vec<usize>,
    /// Misclassifications, indexed by the wrongly predicted class.
    pub wrongly_predicted_as: Vec<usize>,
    pub cost: Stats,
}

impl EvaluationData {

    fn new(num_classes: usize) -> Self {
        EvaluationData {
            num_correct: 0,
            total: 0,
            num_correct_per_class: vec![0; num_classes],
            total_per_class: vec![0; num_classes],
            wrongly_predicted_as: vec![0; num_classes],
            cost: Stats::new(),
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.num_correct as f64 / self.total as f64
    }

    pub fn class_accuracy(&self, class: usize) -> f64 {
        if self.total_per_class[class] == 0 {
            return 0.0;
        }
        self.num_correct_per_class[class] as f64 / self.total_per_class[class] as f64
    }

    pub fn accuracy_string(&self) -> String {
        format!(
            "Num correct: {} / {} ({:.4}%)",
            self.num_correct,
            self.total,
            self.accuracy() * 100.0
        )
    }

}

impl fmt::Display for EvaluationData {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(
            f,
            "{}, cost mean {:.6} min {:.6} max {:.6}",
            self.accuracy_string(),
            self.cost.mean(),
            self.cost.min(),
            self.cost.max()
        )
    }
}

/// Forward-only classification of every point in `data`, spread over all
/// cores.
pub fn evaluate(network: &Network, data: &[DataPoint]) -> Result<EvaluationData, EvaluateError> {
    evaluate_with_workers(network, data, num_cpus::get())
}

/// Fails without evaluating anything if any point's input or label count
/// differs from the network's input or output size.
pub fn evaluate_with_workers(
    network: &Network,
    data: &[DataPoint],
    worker_threads: usize,
) -> Result<EvaluationData, EvaluateError> {
    check_data(network, data)?;
    let num_classes = network.output_size();
    let counters = Counters::new(num_classes);

    let cost = if worker_threads <= 1 || data.len() <= 1 {
        evaluate_chunk(network, data, &counters)
    } else {
        let chunk_size = (data.len() + worker_threads - 1) / worker_threads;
        let result = crossbeam::scope(|scope| {
            let counters = &counters;
            let handles: Vec<_> = data.chunks(chunk_size)
                .map(|chunk| scope.spawn(move |_| evaluate_chunk(network, chunk, counters)))
                .collect();
            let mut cost = Stats::new();
            for handle in handles {
                match handle.join() {
                    Ok(worker_cost) => cost.merge(&worker_cost),
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            cost
        });
        match result {
            Ok(cost) => cost,
            Err(payload) => panic::resume_unwind(payload),
        }
    };

    let mut evaluation = EvaluationData::new(num_classes);
    evaluation.num_correct = counters.num_correct.load(Ordering::Relaxed);
    evaluation.total = data.len();
    for class in 0..num_classes {
        evaluation.num_correct_per_class[class] = counters.num_correct_per_class[class].load(Ordering::Relaxed);
        evaluation.total_per_class[class] = counters.total_per_class[class].load(Ordering::Relaxed);
        evaluation.wrongly_predicted_as[class] = counters.wrongly_predicted_as[class].load(Ordering::Relaxed);
    }
    evaluation.cost = cost;
    Ok(evaluation)
}

fn check_data(network: &Network, data: &[DataPoint]) -> Result<(), EvaluateError> {
    let input_size = network.input_size();
    let output_size = network.output_size();
    for data_point in data {
        if data_point.inputs().len() != input_size {
            return Err(EvaluateError::InputSizeMismatch(input_size, data_point.inputs().len()));
        }
        if data_point.num_labels() != output_size {
            return Err(EvaluateError::OutputSizeMismatch(output_size, data_point.num_labels()));
        }
    }
    Ok(())
}

struct Counters {
    num_correct: AtomicUsize,
    num_correct_per_class: Vec<AtomicUsize>,
    total_per_class: Vec<AtomicUsize>,
    wrongly_predicted_as: Vec<AtomicUsize>,
}

impl Counters {
    fn new(num_classes: usize) -> Self {
        let zeroed = || (0..num_classes).map(|_| AtomicUsize::new(0)).collect::<Vec<_>>();
        Counters {
            num_correct: AtomicUsize::new(0),
            num_correct_per_class: zeroed(),
            total_per_class: zeroed(),
            wrongly_predicted_as: zeroed(),
        }
    }
}

fn evaluate_chunk(network: &Network, data: &[DataPoint], counters: &Counters) -> Stats {
    let cost_fn = network.cost_fn();
    let mut cost = Stats::new();
    for data_point in data {
        let (predicted, outputs) = network.classify(data_point.inputs());
        let label = data_point.label();
        cost.report(cost_fn.cost(&outputs, data_point.expected_outputs()));
        counters.total_per_class[label].fetch_add(1, Ordering::Relaxed);
        if predicted == label {
            counters.num_correct.fetch_add(1, Ordering::Relaxed);
            counters.num_correct_per_class[label].fetch_add(1, Ordering::Relaxed);
        } else {
            counters.wrongly_predicted_as[predicted].fetch_add(1, Ordering::Relaxed);
        }
    }
    cost
}
