use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::func::FuncError;

/// Activation applied to a layer's weighted inputs.
///
/// Every variant is evaluated against the whole pre-activation vector of the
/// layer plus a node index, because Softmax depends on all entries. The
/// persisted form is the integer tag returned by `tag()`; those values must
/// never be reordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ActivationFn {
    Sigmoid,
    TanH,
    ReLU,
    SiLU,
    Softmax,
}

impl ActivationFn {

    pub const ALL: [ActivationFn; 5] = [
        ActivationFn::Sigmoid,
        ActivationFn::TanH,
        ActivationFn::ReLU,
        ActivationFn::SiLU,
        ActivationFn::Softmax,
    ];

    pub fn activate(&self, inputs: &[f64], index: usize) -> f64 {
        match self {
            ActivationFn::Sigmoid => sigmoid(inputs[index]),
            ActivationFn::TanH => inputs[index].tanh(),
            ActivationFn::ReLU => f64::max(0.0, inputs[index]),
            ActivationFn::SiLU => inputs[index] * sigmoid(inputs[index]),
            ActivationFn::Softmax => {
                let (max, exp_sum) = softmax_exp_sum(inputs);
                f64::exp(inputs[index] - max) / exp_sum
            },
        }
    }

    /// Derivative of `activate(inputs, index)` with respect to `inputs[index]`.
    ///
    /// For Softmax this is only the diagonal of the Jacobian; the other
    /// entries of the vector are treated as constants.
    pub fn derivative(&self, inputs: &[f64], index: usize) -> f64 {
        match self {
            ActivationFn::Sigmoid => {
                let a = sigmoid(inputs[index]);
                a * (1.0 - a)
            },
            ActivationFn::TanH => {
                let t = inputs[index].tanh();
                1.0 - t * t
            },
            ActivationFn::ReLU => if inputs[index] > 0.0 { 1.0 } else { 0.0 },
            ActivationFn::SiLU => {
                let x = inputs[index];
                let sig = sigmoid(x);
                x * sig * (1.0 - sig) + sig
            },
            ActivationFn::Softmax => {
                let (max, exp_sum) = softmax_exp_sum(inputs);
                let ex = f64::exp(inputs[index] - max);
                (ex * exp_sum - ex * ex) / (exp_sum * exp_sum)
            },
        }
    }

    /// Writes `activate(inputs, i)` for every node into `outputs`.
    ///
    /// Softmax shares one exponent sum across the vector; the result is the
    /// same value `activate` produces for each index.
    pub fn activate_all(&self, inputs: &[f64], outputs: &mut [f64]) {
        debug_assert_eq!(inputs.len(), outputs.len());
        match self {
            ActivationFn::Softmax => {
                let (max, exp_sum) = softmax_exp_sum(inputs);
                for (output, &input) in outputs.iter_mut().zip(inputs) {
                    *output = f64::exp(input - max) / exp_sum;
                }
            },
            _ => {
                for index in 0..inputs.len() {
                    outputs[index] = self.activate(inputs, index);
                }
            },
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            ActivationFn::Sigmoid => 0,
            ActivationFn::TanH => 1,
            ActivationFn::ReLU => 2,
            ActivationFn::SiLU => 3,
            ActivationFn::Softmax => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ActivationFn::Sigmoid => "sigmoid",
            ActivationFn::TanH => "tanh",
            ActivationFn::ReLU => "relu",
            ActivationFn::SiLU => "silu",
            ActivationFn::Softmax => "softmax",
        }
    }

}

#[inline(always)]
fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + f64::exp(-x))
}

// Exponents are taken relative to the largest entry so large weighted inputs
// cannot overflow; the ratios are unchanged.
fn softmax_exp_sum(inputs: &[f64]) -> (f64, f64) {
    let max = inputs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp_sum = inputs.iter().map(|&x| f64::exp(x - max)).sum();
    (max, exp_sum)
}

impl TryFrom<u8> for ActivationFn {
    type Error = FuncError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        ActivationFn::ALL.iter()
            .find(|activation| activation.tag() == tag)
            .cloned()
            .ok_or(FuncError::UnknownActivationTag(tag))
    }
}

impl From<ActivationFn> for u8 {
    fn from(activation: ActivationFn) -> u8 {
        activation.tag()
    }
}

impl FromStr for ActivationFn {
    type Err = FuncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        ActivationFn::ALL.iter()
            .find(|activation| activation.name() == lower)
            .cloned()
            .ok_or_else(|| FuncError::UnknownActivationName(s.to_string()))
    }
}

impl fmt::Display for ActivationFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_points() -> Vec<f64> {
        // steps chosen so no sample lands on the ReLU kink
        (0..28).map(|i| -10.0 + 0.73 * i as f64).collect()
    }

    fn numerical_derivative(activation: ActivationFn, inputs: &[f64], index: usize) -> f64 {
        let h = 1e-5;
        let mut plus = inputs.to_vec();
        let mut minus = inputs.to_vec();
        plus[index] += h;
        minus[index] -= h;
        (activation.activate(&plus, index) - activation.activate(&minus, index)) / (2.0 * h)
    }

    #[test]
    fn test_derivatives_match_numerical() {
        for &activation in ActivationFn::ALL.iter() {
            for x in sample_points() {
                let inputs = [x, 0.5 * x - 1.0, 2.0];
                let analytic = activation.derivative(&inputs, 0);
                let numeric = numerical_derivative(activation, &inputs, 0);
                assert!(
                    (analytic - numeric).abs() < 1e-6,
                    "{} at {}: analytic {} numeric {}", activation, x, analytic, numeric
                );
            }
        }
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let vectors: Vec<Vec<f64>> = vec![
            vec![0.0],
            vec![1.0, 2.0, 3.0],
            vec![-10.0, 10.0, 0.0, 3.5],
            vec![700.0, 710.0, -700.0],
        ];
        for inputs in vectors {
            let mut outputs = vec![0.0; inputs.len()];
            ActivationFn::Softmax.activate_all(&inputs, &mut outputs);
            let sum: f64 = outputs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "sum was {}", sum);
            for (i, &output) in outputs.iter().enumerate() {
                assert_eq!(output, ActivationFn::Softmax.activate(&inputs, i));
            }
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(ActivationFn::Sigmoid.activate(&[0.0], 0), 0.5);
        assert_eq!(ActivationFn::ReLU.activate(&[-3.0], 0), 0.0);
        assert_eq!(ActivationFn::ReLU.activate(&[3.0], 0), 3.0);
        assert_eq!(ActivationFn::ReLU.derivative(&[0.0], 0), 0.0);
        assert_eq!(ActivationFn::SiLU.activate(&[0.0], 0), 0.0);
        assert!((ActivationFn::TanH.activate(&[1.0], 0) - 0.7615941559557649).abs() < 1e-15);
    }

    #[test]
    fn test_tags_round_trip() {
        for &activation in ActivationFn::ALL.iter() {
            assert_eq!(ActivationFn::try_from(activation.tag()).ok(), Some(activation));
            assert_eq!(activation.name().parse::<ActivationFn>().ok(), Some(activation));
        }
        assert_eq!(ActivationFn::ReLU.tag(), 2);
        assert!(ActivationFn::try_from(5).is_err());
        assert!("gelu".parse::<ActivationFn>().is_err());
        assert_eq!("ReLU".parse::<ActivationFn>().ok(), Some(ActivationFn::ReLU));
    }

    #[test]
    fn test_serde_uses_integer_tag() {
        assert_eq!(serde_json::to_string(&ActivationFn::SiLU).unwrap(), "3");
        assert_eq!(serde_json::from_str::<ActivationFn>("4").unwrap(), ActivationFn::Softmax);
        assert!(serde_json::from_str::<ActivationFn>("9").is_err());
    }

}
