use crate::{
    data::DataPoint,
    func::CostFn,
    layer::Layer,
    train::buffers::NetworkLearnData,
};

pub fn accumulate_gradients_single_threaded(
    layers: &[Layer],
    cost: CostFn,
    batch: &[DataPoint],
    learn_data: &mut [NetworkLearnData],
) {
    for (data_point, slot) in batch.iter().zip(learn_data.iter_mut()) {
        super::update_gradients(layers, cost, data_point, slot);
    }
}
