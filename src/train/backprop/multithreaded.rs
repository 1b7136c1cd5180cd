use std::panic;

use crate::{
    data::DataPoint,
    func::CostFn,
    layer::Layer,
    train::buffers::NetworkLearnData,
};

/// Splits the batch into one contiguous chunk per worker. Each worker owns
/// the scratch slots of its chunk; only the per-layer gradient accumulators
/// are shared. Leaving the scope joins every worker.
pub fn accumulate_gradients_multi_threaded(
    layers: &[Layer],
    cost: CostFn,
    batch: &[DataPoint],
    learn_data: &mut [NetworkLearnData],
    num_workers: usize,
) {
    let chunk_size = (batch.len() + num_workers - 1) / num_workers;

    let result = crossbeam::scope(|scope| {
        for (points, slots) in batch.chunks(chunk_size).zip(learn_data.chunks_mut(chunk_size)) {
            scope.spawn(move |_| {
                for (data_point, slot) in points.iter().zip(slots.iter_mut()) {
                    super::update_gradients(layers, cost, data_point, slot);
                }
            });
        }
    });

    if let Err(payload) = result {
        // surface the worker's panic on the calling thread
        panic::resume_unwind(payload);
    }
}
