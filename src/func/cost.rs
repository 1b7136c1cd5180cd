use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::func::FuncError;
use crate::utils::square_f64;

/// Cost of a network's output vector against the expected one-hot vector.
///
/// Persisted as the integer returned by `tag()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CostFn {
    MeanSquaredError,
    /// Binary cross-entropy per output node; expected values must be 0 or 1.
    CrossEntropy,
}

impl CostFn {

    pub const ALL: [CostFn; 2] = [CostFn::MeanSquaredError, CostFn::CrossEntropy];

    pub fn cost(&self, predicted: &[f64], expected: &[f64]) -> f64 {
        debug_assert_eq!(predicted.len(), expected.len());
        match self {
            CostFn::MeanSquaredError => {
                let sum: f64 = predicted.iter()
                    .zip(expected)
                    .map(|(p, e)| square_f64(p - e))
                    .sum();
                0.5 * sum
            },
            CostFn::CrossEntropy => {
                predicted.iter()
                    .zip(expected)
                    .map(|(&p, &e)| {
                        let v = if e == 1.0 { -p.ln() } else { -(1.0 - p).ln() };
                        if v.is_nan() { 0.0 } else { v }
                    })
                    .sum()
            },
        }
    }

    /// Partial derivative of the cost with respect to one predicted output.
    pub fn derivative(&self, predicted: f64, expected: f64) -> f64 {
        match self {
            CostFn::MeanSquaredError => predicted - expected,
            CostFn::CrossEntropy => {
                if predicted == 0.0 || predicted == 1.0 {
                    return 0.0;
                }
                (expected - predicted) / (predicted * (predicted - 1.0))
            },
        }
    }

    pub fn tag(&self) -> u8 {
        match self {
            CostFn::MeanSquaredError => 0,
            CostFn::CrossEntropy => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CostFn::MeanSquaredError => "mse",
            CostFn::CrossEntropy => "cross-entropy",
        }
    }

}

impl TryFrom<u8> for CostFn {
    type Error = FuncError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        CostFn::ALL.iter()
            .find(|cost| cost.tag() == tag)
            .cloned()
            .ok_or(FuncError::UnknownCostTag(tag))
    }
}

impl From<CostFn> for u8 {
    fn from(cost: CostFn) -> u8 {
        cost.tag()
    }
}

impl FromStr for CostFn {
    type Err = FuncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mse" | "mean-squared-error" => Ok(CostFn::MeanSquaredError),
            "cross-entropy" | "crossentropy" | "ce" => Ok(CostFn::CrossEntropy),
            _ => Err(FuncError::UnknownCostName(s.to_string())),
        }
    }
}

impl fmt::Display for CostFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
