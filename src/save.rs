use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    func::{ActivationFn, CostFn},
    layer::Layer,
    net::Network,
};

quick_error! {
    #[derive(Debug)]
    pub enum SaveError {
        Io(err: std::io::Error) {
            from()
            description("I/O error")
            display("I/O error: {}", err)
        }
        Json(err: serde_json::Error) {
            from()
            description("Invalid network data")
            display("Invalid network data: {}", err)
        }
        TooFewLayers(count: usize) {
            description("Network needs at least an input and an output size")
            display("Network needs at least two layer sizes, found {}", count)
        }
        ConnectionCountMismatch(expected: usize, found: usize) {
            description("Number of connections doesn't match layer sizes")
            display("Expected {} connections for the layer sizes, found {}", expected, found)
        }
        WeightCountMismatch(layer: usize, expected: usize, found: usize) {
            description("Number of weights doesn't match layer size")
            display("Layer {} expects {} weights, found {}", layer, expected, found)
        }
        BiasCountMismatch(layer: usize, expected: usize, found: usize) {
            description("Number of biases doesn't match layer size")
            display("Layer {} expects {} biases, found {}", layer, expected, found)
        }
    }
}

/// Persisted parameters of one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSaveData {
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
    pub activation_type: ActivationFn,
}

/// Persisted form of a network. Activation and cost types are stored as
/// their integer tags.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSaveData {
    pub layer_sizes: Vec<usize>,
    pub connections: Vec<ConnectionSaveData>,
    pub cost_function_type: CostFn,
}

impl NetworkSaveData {

    pub fn from_network(network: &Network) -> Self {
        NetworkSaveData {
            layer_sizes: network.layer_sizes().to_vec(),
            connections: network.layers().iter()
                .map(|layer| ConnectionSaveData {
                    weights: layer.weights().to_vec(),
                    biases: layer.biases().to_vec(),
                    activation_type: layer.activation(),
                })
                .collect(),
            cost_function_type: network.cost_fn(),
        }
    }

    /// Rebuilds the network, checking every parameter count against the
    /// declared layer sizes.
    pub fn into_network(self) -> Result<Network, SaveError> {
        let NetworkSaveData { layer_sizes, connections, cost_function_type } = self;

        if layer_sizes.len() < 2 {
            return Err(SaveError::TooFewLayers(layer_sizes.len()));
        }
        if connections.len() != layer_sizes.len() - 1 {
            return Err(SaveError::ConnectionCountMismatch(layer_sizes.len() - 1, connections.len()));
        }

        let mut layers = Vec::with_capacity(connections.len());
        for (i, connection) in connections.into_iter().enumerate() {
            let num_nodes_in = layer_sizes[i];
            let num_nodes_out = layer_sizes[i + 1];
            if num_nodes_in == 0 || num_nodes_out == 0 || connection.weights.len() != num_nodes_in * num_nodes_out {
                return Err(SaveError::WeightCountMismatch(i, num_nodes_in * num_nodes_out, connection.weights.len()));
            }
            if connection.biases.len() != num_nodes_out {
                return Err(SaveError::BiasCountMismatch(i, num_nodes_out, connection.biases.len()));
            }
            layers.push(Layer::from_parts(
                num_nodes_in,
                num_nodes_out,
                connection.weights,
                connection.biases,
                connection.activation_type,
            ));
        }

        Ok(Network::from_layers(layer_sizes, layers, cost_function_type))
    }

}

pub fn serialize_network(network: &Network) -> Result<String, SaveError> {
    Ok(serde_json::to_string(&NetworkSaveData::from_network(network))?)
}

pub fn load_network_from_data(data: &str) -> Result<Network, SaveError> {
    let save_data: NetworkSaveData = serde_json::from_str(data)?;
    save_data.into_network()
}

pub fn save_to_file(network: &Network, path: impl AsRef<Path>) -> Result<(), SaveError> {
    let path = path.as_ref();
    fs::write(path, serialize_network(network)?)?;
    info!(path = %path.display(), "saved network");
    Ok(())
}

pub fn load_network_from_file(path: impl AsRef<Path>) -> Result<Network, SaveError> {
    let path = path.as_ref();
    let network = load_network_from_data(&fs::read_to_string(path)?)?;
    info!(path = %path.display(), layer_sizes = ?network.layer_sizes(), "loaded network");
    Ok(network)
}
