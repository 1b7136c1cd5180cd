use std::f64::consts::PI;

use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::utils::stable_hash_seed;

/// Source of starting weights and biases for a freshly built layer.
pub trait NetInitializer {
    fn get_weight(&mut self, num_nodes_in: usize) -> f64;
    fn get_bias(&mut self, num_nodes_in: usize) -> f64;
}

/// Draws weights from N(0, 1) scaled by `1 / sqrt(num_nodes_in)`; biases
/// start at zero.
#[derive(Clone)]
pub struct RandomNetInitializer {
    rng: XorShiftRng,
}

impl RandomNetInitializer {

    pub fn new_from_entropy() -> Self {
        RandomNetInitializer {
            rng: XorShiftRng::from_entropy(),
        }
    }

    pub fn new_with_seed(seed: u64) -> Self {
        RandomNetInitializer {
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }

    pub fn new_with_seed_str(val: &str) -> Self {
        RandomNetInitializer {
            rng: XorShiftRng::from_seed(stable_hash_seed(val)),
        }
    }

    fn standard_normal(&mut self) -> f64 {
        // Box-Muller; both samples in (0, 1] so ln never sees zero
        let x1 = 1.0 - self.rng.gen::<f64>();
        let x2 = 1.0 - self.rng.gen::<f64>();
        f64::sqrt(-2.0 * x1.ln()) * f64::cos(2.0 * PI * x2)
    }

}

impl NetInitializer for RandomNetInitializer {

    fn get_weight(&mut self, num_nodes_in: usize) -> f64 {
        self.standard_normal() / (num_nodes_in as f64).sqrt()
    }

    fn get_bias(&mut self, _num_nodes_in: usize) -> f64 {
        0.0
    }

}
