mod singlethreaded;
mod multithreaded;

use self::multithreaded::*;
use self::singlethreaded::*;
use crate::{
    data::DataPoint,
    func::CostFn,
    layer::Layer,
    train::buffers::NetworkLearnData,
};

/// Runs the forward pass for `data_point`, backpropagates node values from
/// the output layer to the first layer and adds each layer's gradient into
/// its shared accumulator as soon as its node values are known.
pub fn update_gradients(
    layers: &[Layer],
    cost: CostFn,
    data_point: &DataPoint,
    learn_data: &mut NetworkLearnData,
) {
    debug_assert_eq!(layers.len(), learn_data.layer_data.len());
    let layer_data = &mut learn_data.layer_data;

    // forward pass
    for layer_index in 0..layers.len() {
        let (previous, current) = layer_data.split_at_mut(layer_index);
        let inputs: &[f64] = match previous.last() {
            None => data_point.inputs(),
            Some(previous) => &previous.activations,
        };
        layers[layer_index].calculate_outputs_with(inputs, &mut current[0]);
    }

    // output layer
    let output_index = layers.len() - 1;
    let output_layer = &layers[output_index];
    output_layer.calculate_output_layer_node_values(
        &mut layer_data[output_index],
        data_point.expected_outputs(),
        cost,
    );
    output_layer.update_gradients(&layer_data[output_index]);

    // hidden layers, back to front
    for layer_index in (0..output_index).rev() {
        let (current, next) = layer_data.split_at_mut(layer_index + 1);
        let hidden_layer = &layers[layer_index];
        hidden_layer.calculate_hidden_layer_node_values(
            &mut current[layer_index],
            &layers[layer_index + 1],
            &next[0].node_values,
        );
        hidden_layer.update_gradients(&current[layer_index]);
    }
}

/// Accumulates the gradients of every example in `batch` into `layers`.
///
/// `learn_data` holds one scratch slot per example. Returns once every
/// example has been processed.
pub fn accumulate_batch_gradients(
    layers: &[Layer],
    cost: CostFn,
    batch: &[DataPoint],
    learn_data: &mut [NetworkLearnData],
    worker_threads: usize,
) {
    assert_eq!(batch.len(), learn_data.len());
    if worker_threads > 1 && batch.len() > 1 {
        accumulate_gradients_multi_threaded(layers, cost, batch, learn_data, worker_threads);
    } else {
        accumulate_gradients_single_threaded(layers, cost, batch, learn_data);
    }
}
