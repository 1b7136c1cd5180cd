use crate::{
    data::DataPoint,
    func::{ActivationFn, CostFn},
    initializer::NetInitializer,
    layer::Layer,
    train::{accumulate_batch_gradients, LearnDataPool},
    utils::max_value_index,
};

/// Ordered stack of fully connected layers sharing one cost function.
#[derive(Debug)]
pub struct Network {
    layers: Vec<Layer>,
    layer_sizes: Vec<usize>,
    cost: CostFn,
    learn_data: LearnDataPool,
    worker_threads: usize,
}

impl Network {

    /// Builds a randomly initialized network. `layer_sizes` lists the input
    /// size, every hidden size and the output size.
    ///
    /// Every layer starts out with the sigmoid activation and the network
    /// with the mean squared error cost.
    pub fn new(layer_sizes: &[usize], initializer: &mut dyn NetInitializer) -> Self {
        assert!(layer_sizes.len() >= 2, "a network needs an input and an output size");
        let layers = layer_sizes.windows(2)
            .map(|sizes| Layer::new(sizes[0], sizes[1], ActivationFn::Sigmoid, initializer))
            .collect();
        Self::from_layers(layer_sizes.to_vec(), layers, CostFn::MeanSquaredError)
    }

    pub fn from_layers(layer_sizes: Vec<usize>, layers: Vec<Layer>, cost: CostFn) -> Self {
        assert_eq!(layer_sizes.len(), layers.len() + 1);
        for (i, layer) in layers.iter().enumerate() {
            assert_eq!(layer.num_nodes_in(), layer_sizes[i]);
            assert_eq!(layer.num_nodes_out(), layer_sizes[i + 1]);
        }
        Network {
            layers,
            layer_sizes,
            cost,
            learn_data: LearnDataPool::new(),
            worker_threads: num_cpus::get(),
        }
    }

    pub fn calculate_outputs(&self, inputs: &[f64]) -> Vec<f64> {
        debug_assert_eq!(inputs.len(), self.input_size());
        let mut outputs = self.layers[0].calculate_outputs(inputs);
        for layer in &self.layers[1..] {
            outputs = layer.calculate_outputs(&outputs);
        }
        outputs
    }

    /// Returns the predicted class along with the full output vector.
    pub fn classify(&self, inputs: &[f64]) -> (usize, Vec<f64>) {
        let outputs = self.calculate_outputs(inputs);
        (max_value_index(&outputs), outputs)
    }

    /// One gradient descent step over `batch`.
    ///
    /// Every example is backpropagated (spread over the worker threads), then
    /// each layer applies the averaged gradients.
    pub fn learn(&mut self, batch: &[DataPoint], learn_rate: f64, regularization: f64, momentum: f64) {
        if batch.is_empty() {
            return;
        }
        self.accumulate_gradients(batch);
        let batch_learn_rate = learn_rate / batch.len() as f64;
        for layer in &mut self.layers {
            layer.apply_gradients(batch_learn_rate, regularization, momentum);
        }
    }

    /// Adds the summed gradients of `batch` to every layer without applying
    /// them.
    pub fn accumulate_gradients(&mut self, batch: &[DataPoint]) {
        let learn_data = self.learn_data.prepare(batch.len(), &self.layers);
        accumulate_batch_gradients(&self.layers, self.cost, batch, learn_data, self.worker_threads);
    }

    /// Total cost of the network's prediction for one example.
    pub fn cost(&self, data_point: &DataPoint) -> f64 {
        let outputs = self.calculate_outputs(data_point.inputs());
        self.cost.cost(&outputs, data_point.expected_outputs())
    }

    pub fn set_activation_fn(&mut self, activation: ActivationFn) {
        self.set_activation_fns(activation, activation);
    }

    pub fn set_activation_fns(&mut self, hidden: ActivationFn, output: ActivationFn) {
        let output_index = self.layers.len() - 1;
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.set_activation(if i == output_index { output } else { hidden });
        }
    }

    pub fn set_cost_fn(&mut self, cost: CostFn) {
        self.cost = cost;
    }

    #[inline]
    pub fn cost_fn(&self) -> CostFn {
        self.cost
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, index: usize) -> &Layer {
        &self.layers[index]
    }

    #[cfg(test)]
    pub(crate) fn layer_mut(&mut self, index: usize) -> &mut Layer {
        &mut self.layers[index]
    }

    #[inline]
    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    #[inline]
    pub fn input_size(&self) -> usize {
        self.layer_sizes[0]
    }

    #[inline]
    pub fn output_size(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    #[inline]
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn set_worker_threads(&mut self, worker_threads: usize) {
        self.worker_threads = worker_threads.max(1);
    }

}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;
    use crate::data::create_mini_batches;
    use crate::initializer::RandomNetInitializer;

    fn seeded_network(layer_sizes: &[usize]) -> Network {
        let mut init = RandomNetInitializer::new_with_seed_str("network test");
        Network::new(layer_sizes, &mut init)
    }

    fn point(inputs: &[f64], label: usize, num_labels: usize) -> DataPoint {
        DataPoint::new(inputs.to_vec(), label, num_labels).unwrap()
    }

    #[test]
    fn test_classify_tie_break() {
        // a single layer whose outputs are exactly its biases
        let layer = Layer::from_parts(
            1, 3,
            vec![0.0, 0.0, 0.0],
            vec![0.5, 0.5, 0.3],
            ActivationFn::ReLU,
        );
        let net = Network::from_layers(vec![1, 3], vec![layer], CostFn::MeanSquaredError);
        let (class, outputs) = net.classify(&[1.0]);
        assert_eq!(outputs, vec![0.5, 0.5, 0.3]);
        assert_eq!(class, 0);
    }

    #[test]
    fn test_set_activation_fns() {
        let mut net = seeded_network(&[3, 4, 4, 2]);
        net.set_activation_fns(ActivationFn::ReLU, ActivationFn::Softmax);
        let activations: Vec<ActivationFn> = net.layers().iter().map(Layer::activation).collect();
        assert_eq!(activations, vec![ActivationFn::ReLU, ActivationFn::ReLU, ActivationFn::Softmax]);
        assert_eq!(net.input_size(), 3);
        assert_eq!(net.output_size(), 2);
    }

    #[test]
    fn test_gradient_check() {
        let mut net = seeded_network(&[2, 3, 2]);
        net.set_worker_threads(1);
        let data_point = point(&[0.35, -0.8], 1, 2);

        net.accumulate_gradients(std::slice::from_ref(&data_point));
        let analytic: Vec<Vec<f64>> = net.layers().iter().map(Layer::cost_gradient_w).collect();

        let eps = 1e-5;
        for layer_index in 0..net.layers().len() {
            for weight_index in 0..net.layer(layer_index).weights().len() {
                let original = net.layer(layer_index).weights()[weight_index];
                net.layer_mut(layer_index).weights_mut()[weight_index] = original + eps;
                let cost_plus = net.cost(&data_point);
                net.layer_mut(layer_index).weights_mut()[weight_index] = original - eps;
                let cost_minus = net.cost(&data_point);
                net.layer_mut(layer_index).weights_mut()[weight_index] = original;

                let numeric = (cost_plus - cost_minus) / (2.0 * eps);
                let expected = analytic[layer_index][weight_index];
                let relative = (numeric - expected).abs() / numeric.abs().max(expected.abs()).max(1e-6);
                assert!(
                    relative < 1e-4,
                    "layer {} weight {}: numeric {} analytic {}",
                    layer_index, weight_index, numeric, expected
                );
            }
        }
    }

    #[test]
    fn test_gradients_cleared_after_learn() {
        let mut net = seeded_network(&[2, 3, 2]);
        let batch = vec![point(&[0.1, 0.9], 0, 2), point(&[0.7, 0.2], 1, 2)];
        net.learn(&batch, 0.1, 0.01, 0.9);
        for layer in net.layers() {
            assert!(layer.cost_gradient_w().iter().all(|&g| g == 0.0));
            assert!(layer.cost_gradient_b().iter().all(|&g| g == 0.0));
        }
    }

    #[test]
    fn test_multi_threaded_matches_single_threaded() {
        let mut rng = XorShiftRng::seed_from_u64(3);
        let batch: Vec<DataPoint> = (0..24)
            .map(|i| {
                let inputs: Vec<f64> = (0..5).map(|_| rng.gen::<f64>()).collect();
                point(&inputs, i % 3, 3)
            })
            .collect();

        let mut single = seeded_network(&[5, 6, 3]);
        let mut multi = seeded_network(&[5, 6, 3]);
        single.set_worker_threads(1);
        multi.set_worker_threads(4);

        for _ in 0..3 {
            single.learn(&batch, 0.2, 0.05, 0.9);
            multi.learn(&batch, 0.2, 0.05, 0.9);
        }

        for (a, b) in single.layers().iter().zip(multi.layers()) {
            for (wa, wb) in a.weights().iter().zip(b.weights()) {
                assert!((wa - wb).abs() < 1e-12, "{} != {}", wa, wb);
            }
            for (ba, bb) in a.biases().iter().zip(b.biases()) {
                assert!((ba - bb).abs() < 1e-12, "{} != {}", ba, bb);
            }
        }
    }

    fn gaussian(rng: &mut XorShiftRng) -> f64 {
        let x1 = 1.0 - rng.gen::<f64>();
        let x2 = rng.gen::<f64>();
        (-2.0 * x1.ln()).sqrt() * (2.0 * PI * x2).cos()
    }

    #[test]
    fn test_learns_separable_blobs() {
        let mut rng = XorShiftRng::seed_from_u64(11);
        let centers = [(-2.0, -2.0), (2.0, 2.0)];
        let data: Vec<DataPoint> = (0..200)
            .map(|i| {
                let label = i % 2;
                let (cx, cy) = centers[label];
                let inputs = [cx + 0.5 * gaussian(&mut rng), cy + 0.5 * gaussian(&mut rng)];
                point(&inputs, label, 2)
            })
            .collect();

        let mut net = seeded_network(&[2, 4, 2]);
        net.set_activation_fns(ActivationFn::Sigmoid, ActivationFn::Softmax);
        net.set_cost_fn(CostFn::CrossEntropy);

        let mut batches = create_mini_batches(&data, 10, true, &mut rng);
        for _ in 0..50 {
            for batch in &batches {
                net.learn(batch.data(), 0.1, 0.0, 0.9);
            }
            crate::data::shuffle_batches(&mut batches, &mut rng);
        }

        let correct = data.iter()
            .filter(|p| net.classify(p.inputs()).0 == p.label())
            .count();
        assert!(correct as f64 / data.len() as f64 >= 0.95, "{} / {}", correct, data.len());
    }

}
