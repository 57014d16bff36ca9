//! Numeric scaling of the material coefficients
//!
//! ε ≈ 1e-11 and σ up to 3.5e4 differ by fifteen orders of magnitude.
//! Scaling ε up, σ and ω down brings the blocks of the coupled matrix
//! closer together. Exported materials are always physical values.

use crate::error::{Result, TowerError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleFactors {
    pub epsilon: f64,
    pub sigma: f64,
    pub omega: f64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self {
            epsilon: 1e8,
            sigma: 1e-5,
            omega: 1e-2,
        }
    }
}

impl ScaleFactors {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("epsilon", self.epsilon),
            ("sigma", self.sigma),
            ("omega", self.omega),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(TowerError::InvalidConfig(format!(
                    "scale factor {name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn scale_epsilon(&self, epsilon: f64) -> f64 {
        epsilon * self.epsilon
    }

    pub fn scale_sigma(&self, sigma: f64) -> f64 {
        sigma * self.sigma
    }

    pub fn scale_omega(&self, omega: f64) -> f64 {
        omega * self.omega
    }
}
