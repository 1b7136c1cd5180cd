use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    func::{ActivationFn, CostFn, LearningRateFn},
    initializer::NetInitializer,
    net::Network,
};

/// Architecture and optimizer settings for one training session.
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(pattern = "owned", build_fn(private, name = "build_unchecked"))]
#[serde(rename_all = "camelCase")]
pub struct HyperParameters {
    /// Input size, hidden sizes, output size.
    pub layer_sizes: Vec<usize>,
    #[builder(default = "default_activation()")]
    #[serde(default = "default_activation")]
    pub activation: ActivationFn,
    #[builder(default = "default_output_activation()")]
    #[serde(default = "default_output_activation")]
    pub output_activation: ActivationFn,
    #[builder(default = "default_cost()")]
    #[serde(default = "default_cost")]
    pub cost: CostFn,
    #[builder(default = "default_initial_learning_rate()")]
    #[serde(default = "default_initial_learning_rate")]
    pub initial_learning_rate: f64,
    #[builder(default = "default_learn_rate_decay()")]
    #[serde(default = "default_learn_rate_decay")]
    pub learn_rate_decay: f64,
    #[builder(default = "default_minibatch_size()")]
    #[serde(default = "default_minibatch_size")]
    pub minibatch_size: usize,
    #[builder(default = "default_momentum()")]
    #[serde(default = "default_momentum")]
    pub momentum: f64,
    #[builder(default = "default_regularization()")]
    #[serde(default = "default_regularization")]
    pub regularization: f64,
}

fn default_activation() -> ActivationFn {
    ActivationFn::ReLU
}

fn default_output_activation() -> ActivationFn {
    ActivationFn::Softmax
}

fn default_cost() -> CostFn {
    CostFn::CrossEntropy
}

fn default_initial_learning_rate() -> f64 {
    0.05
}

fn default_learn_rate_decay() -> f64 {
    0.075
}

fn default_minibatch_size() -> usize {
    32
}

fn default_momentum() -> f64 {
    0.9
}

fn default_regularization() -> f64 {
    0.1
}

impl HyperParametersBuilder {

    pub fn build(self) -> Result<HyperParameters, String> {
        let hyper_parameters = self.build_unchecked()?;
        hyper_parameters.validate()?;
        Ok(hyper_parameters)
    }

}

impl HyperParameters {

    pub fn validate(&self) -> Result<(), String> {
        if self.layer_sizes.len() < 2 {
            return Err(format!("need at least two layer sizes, found {}", self.layer_sizes.len()));
        }
        if let Some(index) = self.layer_sizes.iter().position(|&size| size == 0) {
            return Err(format!("layer size {} is zero", index));
        }
        if self.minibatch_size == 0 {
            return Err("minibatch size must be positive".to_string());
        }
        if !(self.initial_learning_rate >= 0.0) {
            return Err(format!("learning rate {} is negative", self.initial_learning_rate));
        }
        if !(self.learn_rate_decay >= 0.0) {
            return Err(format!("learning rate decay {} is negative", self.learn_rate_decay));
        }
        if !(self.regularization >= 0.0) {
            return Err(format!("regularization {} is negative", self.regularization));
        }
        if !(self.momentum >= 0.0 && self.momentum < 1.0) {
            return Err(format!("momentum {} is outside [0, 1)", self.momentum));
        }
        Ok(())
    }

    pub fn learning_rate_fn(&self) -> LearningRateFn {
        LearningRateFn::inverse_time_decay(self.initial_learning_rate, self.learn_rate_decay)
    }

    #[inline]
    pub fn input_size(&self) -> usize {
        self.layer_sizes[0]
    }

    #[inline]
    pub fn output_size(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    /// Fresh network with these layer sizes, activations and cost.
    pub fn create_network(&self, initializer: &mut dyn NetInitializer) -> Network {
        if self.output_activation == ActivationFn::Softmax && self.cost == CostFn::MeanSquaredError {
            warn!("softmax output with mean squared error backpropagates through the diagonal softmax derivative only");
        }
        let mut network = Network::new(&self.layer_sizes, initializer);
        network.set_activation_fns(self.activation, self.output_activation);
        network.set_cost_fn(self.cost);
        network
    }

}

#[cfg(test)]
mod test {
    use super::*;
    use crate::initializer::RandomNetInitializer;

    #[test]
    fn test_builder_defaults() {
        let params = HyperParametersBuilder::default()
            .layer_sizes(vec![784, 100, 10])
            .build()
            .unwrap();
        assert_eq!(params.activation, ActivationFn::ReLU);
        assert_eq!(params.output_activation, ActivationFn::Softmax);
        assert_eq!(params.cost, CostFn::CrossEntropy);
        assert_eq!(params.initial_learning_rate, 0.05);
        assert_eq!(params.learn_rate_decay, 0.075);
        assert_eq!(params.minibatch_size, 32);
        assert_eq!(params.momentum, 0.9);
        assert_eq!(params.regularization, 0.1);
    }

    #[test]
    fn test_builder_validation() {
        assert!(HyperParametersBuilder::default().build().is_err());
        assert!(HyperParametersBuilder::default().layer_sizes(vec![4]).build().is_err());
        assert!(HyperParametersBuilder::default().layer_sizes(vec![4, 0, 2]).build().is_err());
        assert!(HyperParametersBuilder::default().layer_sizes(vec![4, 2]).minibatch_size(0).build().is_err());
        assert!(HyperParametersBuilder::default().layer_sizes(vec![4, 2]).momentum(1.0).build().is_err());
        assert!(HyperParametersBuilder::default().layer_sizes(vec![4, 2]).initial_learning_rate(-0.1).build().is_err());
    }

    #[test]
    fn test_json_defaults() {
        let params: HyperParameters = serde_json::from_str(r#"{ "layerSizes": [4, 3, 2], "minibatchSize": 8 }"#).unwrap();
        assert_eq!(params.minibatch_size, 8);
        assert_eq!(params.momentum, 0.9);
        assert_eq!(params.output_activation, ActivationFn::Softmax);
    }

    #[test]
    fn test_create_network() {
        let params = HyperParametersBuilder::default()
            .layer_sizes(vec![4, 3, 2])
            .activation(ActivationFn::TanH)
            .cost(CostFn::MeanSquaredError)
            .build()
            .unwrap();
        let mut init = RandomNetInitializer::new_with_seed(1);
        let network = params.create_network(&mut init);
        assert_eq!(network.layer_sizes(), &[4, 3, 2]);
        assert_eq!(network.layer(0).activation(), ActivationFn::TanH);
        assert_eq!(network.layer(1).activation(), ActivationFn::Softmax);
        assert_eq!(network.cost_fn(), CostFn::MeanSquaredError);
        assert!((params.learning_rate_fn().get_learning_rate(1) - 0.05 / 1.075).abs() < 1e-15);
    }

}
