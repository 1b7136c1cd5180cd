use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use itertools::izip;

use crate::func::{ActivationFn, CostFn};
use crate::initializer::NetInitializer;
use crate::train::buffers::LayerLearnData;

/// Cost gradient accumulated over the examples of one minibatch.
#[derive(Debug)]
struct LayerGradients {
    weights: Vec<f64>,
    biases: Vec<f64>,
}

/// Fully connected layer mapping `num_nodes_in` activations to
/// `num_nodes_out`.
///
/// Weights are stored row-major by output node: the weight from input `i` to
/// output `o` lives at `o * num_nodes_in + i`.
pub struct Layer {
    num_nodes_in: usize,
    num_nodes_out: usize,
    weights: Vec<f64>,
    biases: Vec<f64>,
    // written by every in-flight example of a minibatch
    gradients: Mutex<LayerGradients>,
    weight_velocities: Vec<f64>,
    bias_velocities: Vec<f64>,
    activation: ActivationFn,
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("Layer")
            .field("num_nodes_in", &self.num_nodes_in)
            .field("num_nodes_out", &self.num_nodes_out)
            .field("weights", &self.weights.len())
            .field("biases", &self.biases.len())
            .field("activation", &self.activation)
            .finish()
    }
}

impl Layer {

    pub fn new(
        num_nodes_in: usize,
        num_nodes_out: usize,
        activation: ActivationFn,
        initializer: &mut dyn NetInitializer,
    ) -> Self {
        let num_weights = num_nodes_in * num_nodes_out;
        let mut weights = Vec::with_capacity(num_weights);
        for _ in 0..num_weights {
            weights.push(initializer.get_weight(num_nodes_in));
        }
        let mut biases = Vec::with_capacity(num_nodes_out);
        for _ in 0..num_nodes_out {
            biases.push(initializer.get_bias(num_nodes_in));
        }
        Self::from_parts(num_nodes_in, num_nodes_out, weights, biases, activation)
    }

    /// Builds a layer around existing parameters with fresh gradient and
    /// velocity state.
    pub fn from_parts(
        num_nodes_in: usize,
        num_nodes_out: usize,
        weights: Vec<f64>,
        biases: Vec<f64>,
        activation: ActivationFn,
    ) -> Self {
        assert!(num_nodes_in > 0 && num_nodes_out > 0);
        assert_eq!(weights.len(), num_nodes_in * num_nodes_out, "weight count");
        assert_eq!(biases.len(), num_nodes_out, "bias count");
        Layer {
            num_nodes_in,
            num_nodes_out,
            gradients: Mutex::new(LayerGradients {
                weights: vec![0.0; weights.len()],
                biases: vec![0.0; biases.len()],
            }),
            weight_velocities: vec![0.0; weights.len()],
            bias_velocities: vec![0.0; biases.len()],
            weights,
            biases,
            activation,
        }
    }

    #[inline(always)]
    pub fn flat_weight_index(&self, node_in: usize, node_out: usize) -> usize {
        node_out * self.num_nodes_in + node_in
    }

    #[inline(always)]
    pub fn get_weight(&self, node_in: usize, node_out: usize) -> f64 {
        self.weights[self.flat_weight_index(node_in, node_out)]
    }

    fn calculate_weighted_inputs(&self, inputs: &[f64], weighted_inputs: &mut [f64]) {
        debug_assert_eq!(inputs.len(), self.num_nodes_in);
        debug_assert_eq!(weighted_inputs.len(), self.num_nodes_out);
        for node_out in 0..self.num_nodes_out {
            let mut weighted_input = self.biases[node_out];
            let row = &self.weights[node_out * self.num_nodes_in..(node_out + 1) * self.num_nodes_in];
            for (input, weight) in inputs.iter().zip(row) {
                weighted_input += input * weight;
            }
            weighted_inputs[node_out] = weighted_input;
        }
    }

    pub fn calculate_outputs(&self, inputs: &[f64]) -> Vec<f64> {
        let mut weighted_inputs = vec![0.0; self.num_nodes_out];
        self.calculate_weighted_inputs(inputs, &mut weighted_inputs);
        let mut activations = vec![0.0; self.num_nodes_out];
        self.activation.activate_all(&weighted_inputs, &mut activations);
        activations
    }

    /// Same as `calculate_outputs`, additionally recording the inputs,
    /// weighted inputs and activations in `learn_data` for backpropagation.
    pub fn calculate_outputs_with<'a>(&self, inputs: &[f64], learn_data: &'a mut LayerLearnData) -> &'a [f64] {
        learn_data.inputs.copy_from_slice(inputs);
        self.calculate_weighted_inputs(inputs, &mut learn_data.weighted_inputs);
        self.activation.activate_all(&learn_data.weighted_inputs, &mut learn_data.activations);
        &learn_data.activations
    }

    /// Node values (cost derivative with respect to each weighted input) for
    /// the output layer.
    pub fn calculate_output_layer_node_values(
        &self,
        learn_data: &mut LayerLearnData,
        expected_outputs: &[f64],
        cost: CostFn,
    ) {
        debug_assert_eq!(expected_outputs.len(), self.num_nodes_out);
        for i in 0..self.num_nodes_out {
            let cost_derivative = cost.derivative(learn_data.activations[i], expected_outputs[i]);
            let activation_derivative = self.activation.derivative(&learn_data.weighted_inputs, i);
            learn_data.node_values[i] = cost_derivative * activation_derivative;
        }
    }

    /// Node values for a hidden layer, pulled back through the weights of the
    /// layer that follows it.
    pub fn calculate_hidden_layer_node_values(
        &self,
        learn_data: &mut LayerLearnData,
        next_layer: &Layer,
        next_node_values: &[f64],
    ) {
        debug_assert_eq!(next_layer.num_nodes_in, self.num_nodes_out);
        debug_assert_eq!(next_node_values.len(), next_layer.num_nodes_out);
        for node in 0..self.num_nodes_out {
            let mut node_value = 0.0;
            for (next_node, next_node_value) in next_node_values.iter().enumerate() {
                node_value += next_layer.get_weight(node, next_node) * next_node_value;
            }
            node_value *= self.activation.derivative(&learn_data.weighted_inputs, node);
            learn_data.node_values[node] = node_value;
        }
    }

    /// Adds one example's contribution to the accumulated gradients. Safe to
    /// call from several threads at once.
    pub fn update_gradients(&self, learn_data: &LayerLearnData) {
        let mut gradients = self.lock_gradients();
        let LayerGradients { weights, biases } = &mut *gradients;
        for node_out in 0..self.num_nodes_out {
            let node_value = learn_data.node_values[node_out];
            let row = &mut weights[node_out * self.num_nodes_in..(node_out + 1) * self.num_nodes_in];
            for (gradient, input) in row.iter_mut().zip(&learn_data.inputs) {
                *gradient += input * node_value;
            }
            biases[node_out] += node_value;
        }
    }

    /// Gradient descent step with momentum and weight decay, then clears the
    /// accumulated gradients.
    ///
    /// `learn_rate` must already be divided by the minibatch size. Biases are
    /// not decayed.
    pub fn apply_gradients(&mut self, learn_rate: f64, regularization: f64, momentum: f64) {
        let weight_decay = 1.0 - regularization * learn_rate;
        let gradients = self.gradients.get_mut().unwrap_or_else(PoisonError::into_inner);

        for (weight, velocity, gradient) in izip!(
            self.weights.iter_mut(),
            self.weight_velocities.iter_mut(),
            gradients.weights.iter_mut()
        ) {
            let new_velocity = *velocity * momentum - *gradient * learn_rate;
            *velocity = new_velocity;
            *weight = *weight * weight_decay + new_velocity;
            *gradient = 0.0;
        }

        for (bias, velocity, gradient) in izip!(
            self.biases.iter_mut(),
            self.bias_velocities.iter_mut(),
            gradients.biases.iter_mut()
        ) {
            let new_velocity = *velocity * momentum - *gradient * learn_rate;
            *velocity = new_velocity;
            *bias += new_velocity;
            *gradient = 0.0;
        }
    }

    fn lock_gradients(&self) -> MutexGuard<LayerGradients> {
        // poisoned only if a worker panicked while accumulating
        self.gradients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cost_gradient_w(&self) -> Vec<f64> {
        self.lock_gradients().weights.clone()
    }

    pub fn cost_gradient_b(&self) -> Vec<f64> {
        self.lock_gradients().biases.clone()
    }

    #[inline]
    pub fn num_nodes_in(&self) -> usize {
        self.num_nodes_in
    }

    #[inline]
    pub fn num_nodes_out(&self) -> usize {
        self.num_nodes_out
    }

    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[cfg(test)]
    pub(crate) fn weights_mut(&mut self) -> &mut [f64] {
        &mut self.weights
    }

    #[inline]
    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    #[cfg(test)]
    pub(crate) fn biases_mut(&mut self) -> &mut [f64] {
        &mut self.biases
    }

    #[inline]
    pub fn weight_velocities(&self) -> &[f64] {
        &self.weight_velocities
    }

    #[inline]
    pub fn bias_velocities(&self) -> &[f64] {
        &self.bias_velocities
    }

    #[inline]
    pub fn activation(&self) -> ActivationFn {
        self.activation
    }

    pub fn set_activation(&mut self, activation: ActivationFn) {
        self.activation = activation;
    }

}
