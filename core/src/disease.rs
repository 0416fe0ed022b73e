//! Disease parameters: how long a node stays infectious and how likely
//! each active edge is to carry the infection per tick.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DiseaseParams")]
pub struct Disease {
    infectious_duration:      u32,
    transmission_probability: f64,
}

/// Unvalidated wire form; `Disease` is only ever built through `Disease::new`.
#[derive(Deserialize)]
struct DiseaseParams {
    infectious_duration:      i64,
    transmission_probability: f64,
}

impl Disease {
    pub fn new(infectious_duration: i64, transmission_probability: f64) -> SimResult<Self> {
        if infectious_duration <= 0 {
            return Err(SimError::invalid_parameter(
                "infectious_duration",
                format!("must be positive, got {infectious_duration}"),
            ));
        }
        let infectious_duration = u32::try_from(infectious_duration).map_err(|_| {
            SimError::invalid_parameter(
                "infectious_duration",
                format!("{infectious_duration} does not fit in a tick counter"),
            )
        })?;
        // NaN fails the range check too.
        if !(0.0..=1.0).contains(&transmission_probability) {
            return Err(SimError::invalid_parameter(
                "transmission_probability",
                format!("must be in [0, 1], got {transmission_probability}"),
            ));
        }
        Ok(Self { infectious_duration, transmission_probability })
    }

    /// Ticks a node stays infectious.
    pub fn infectious_duration(&self) -> u32 {
        self.infectious_duration
    }

    /// Per-edge, per-tick transmission chance.
    pub fn transmission_probability(&self) -> f64 {
        self.transmission_probability
    }
}

/// 4 ticks infectious, 0.3 per-edge transmission.
impl Default for Disease {
    fn default() -> Self {
        Self { infectious_duration: 4, transmission_probability: 0.3 }
    }
}

impl TryFrom<DiseaseParams> for Disease {
    type Error = SimError;

    fn try_from(params: DiseaseParams) -> SimResult<Self> {
        Disease::new(params.infectious_duration, params.transmission_probability)
    }
}
