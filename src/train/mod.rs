mod backprop;
mod error;
mod hyperparams;
mod observer;
mod session;
mod trainer;
pub mod buffers;

pub use self::{
    backprop::*,
    buffers::*,
    error::*,
    hyperparams::*,
    observer::*,
    session::*,
    trainer::*,
};
