#[macro_use]
extern crate quick_error;

#[macro_use]
extern crate derive_builder;

pub mod data;
pub mod evaluate;
pub mod func;
pub mod initializer;
pub mod layer;
pub mod net;
pub mod save;
pub mod stats;
pub mod train;
mod utils;

pub use crate::{
    data::{Batch, DataError, DataPoint},
    evaluate::{evaluate, EvaluationData},
    func::{ActivationFn, CompletionFn, CostFn, FuncError, LearningRateFn},
    initializer::{NetInitializer, RandomNetInitializer},
    layer::Layer,
    net::Network,
    save::{load_network_from_data, load_network_from_file, save_to_file, serialize_network, NetworkSaveData, SaveError},
    train::{HyperParameters, HyperParametersBuilder, NetTrainer, NetTrainerBuilder, TrainerError, TrainingObserver, TrainingSessionInfo},
    utils::max_value_index,
};
