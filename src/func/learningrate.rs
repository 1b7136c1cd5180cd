#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LearningRateFn {
    Constant(f64),
    /// `initial / (1 + decay * epoch)`
    InverseTimeDecay {
        initial: f64,
        decay: f64,
    },
}

impl LearningRateFn {

    pub fn inverse_time_decay(initial: f64, decay: f64) -> Self {
        if decay == 0.0 {
            LearningRateFn::Constant(initial)
        } else {
            LearningRateFn::InverseTimeDecay { initial, decay }
        }
    }

    pub fn initial_learning_rate(&self) -> f64 {
        self.get_learning_rate(0)
    }

    pub fn get_learning_rate(&self, epoch: usize) -> f64 {
        match self {
            &LearningRateFn::Constant(val) => val,
            &LearningRateFn::InverseTimeDecay { initial, decay } => {
                (1.0 / (1.0 + decay * epoch as f64)) * initial
            },
        }
    }
}
