use tracing::debug;

use crate::layer::Layer;

/// Per-layer values recorded during one example's forward pass and read back
/// by backpropagation.
#[derive(Clone, Debug)]
pub struct LayerLearnData {
    pub inputs: Vec<f64>,
    pub weighted_inputs: Vec<f64>,
    pub activations: Vec<f64>,
    pub node_values: Vec<f64>,
}

impl LayerLearnData {
    pub fn for_layer(layer: &Layer) -> Self {
        LayerLearnData {
            inputs: vec![0.0; layer.num_nodes_in()],
            weighted_inputs: vec![0.0; layer.num_nodes_out()],
            activations: vec![0.0; layer.num_nodes_out()],
            node_values: vec![0.0; layer.num_nodes_out()],
        }
    }
}

/// Scratch for one in-flight example: one `LayerLearnData` per layer.
#[derive(Clone, Debug)]
pub struct NetworkLearnData {
    pub layer_data: Vec<LayerLearnData>,
}

impl NetworkLearnData {
    pub fn for_layers(layers: &[Layer]) -> Self {
        NetworkLearnData {
            layer_data: layers.iter().map(LayerLearnData::for_layer).collect(),
        }
    }
}

/// Scratch slots indexed by position in the minibatch.
///
/// Slots are rebuilt only when the batch size changes; concurrent examples
/// always write to different slots.
#[derive(Clone, Debug, Default)]
pub struct LearnDataPool {
    slots: Vec<NetworkLearnData>,
}

impl LearnDataPool {

    pub fn new() -> Self {
        LearnDataPool { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns exactly `batch_size` slots shaped for `layers`.
    pub fn prepare(&mut self, batch_size: usize, layers: &[Layer]) -> &mut [NetworkLearnData] {
        if self.slots.len() != batch_size {
            debug!(previous = self.slots.len(), batch_size, "reallocating learn data pool");
            self.slots = (0..batch_size)
                .map(|_| NetworkLearnData::for_layers(layers))
                .collect();
        }
        &mut self.slots
    }

}

#[cfg(test)]
mod test {
    use super::*;
    use crate::initializer::RandomNetInitializer;
    use crate::func::ActivationFn;

    fn layers() -> Vec<Layer> {
        let mut init = RandomNetInitializer::new_with_seed(1);
        vec![
            Layer::new(4, 3, ActivationFn::Sigmoid, &mut init),
            Layer::new(3, 2, ActivationFn::Sigmoid, &mut init),
        ]
    }

    #[test]
    fn test_shapes() {
        let layers = layers();
        let data = NetworkLearnData::for_layers(&layers);
        assert_eq!(data.layer_data.len(), 2);
        assert_eq!(data.layer_data[0].inputs.len(), 4);
        assert_eq!(data.layer_data[0].node_values.len(), 3);
        assert_eq!(data.layer_data[1].inputs.len(), 3);
        assert_eq!(data.layer_data[1].activations.len(), 2);
    }

    #[test]
    fn test_pool_reuses_slots_for_same_batch_size() {
        let layers = layers();
        let mut pool = LearnDataPool::new();
        assert!(pool.is_empty());
        pool.prepare(3, &layers)[1].layer_data[0].activations[0] = 42.0;
        assert_eq!(pool.prepare(3, &layers)[1].layer_data[0].activations[0], 42.0);
        assert_eq!(pool.prepare(5, &layers).len(), 5);
        assert_eq!(pool.prepare(5, &layers)[1].layer_data[0].activations[0], 0.0);
        assert_eq!(pool.len(), 5);
    }
}
