//! Gateway dispatch
//!
//! `Gateway` is the seam to whatever actually applies a command to field
//! equipment. `SimulatedGateway` stands in for it with configurable latency
//! and failure rate; randomness comes from an injected `EntropySource` so
//! tests can pin outcomes.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::model::CommandRequest;

/// Source of uniform samples in `[0, 1)`
pub trait EntropySource: Send + Sync {
    fn sample(&self) -> f64;
}

/// `StdRng`-backed entropy
pub struct StdEntropy {
    rng: Mutex<StdRng>,
}

impl StdEntropy {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence for simulations
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl EntropySource for StdEntropy {
    fn sample(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen::<f64>()
    }
}

/// Returns the same sample every time
#[derive(Debug, Clone, Copy)]
pub struct FixedEntropy(f64);

impl FixedEntropy {
    /// The value is clamped into `[0, 1)`
    pub fn new(value: f64) -> Self {
        let value = if value.is_finite() { value } else { 0.0 };
        Self(value.clamp(0.0, 1.0 - f64::EPSILON))
    }
}

impl EntropySource for FixedEntropy {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// What the gateway reported back for one dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Applied { estimated_effect_secs: u32 },
    Rejected { diagnostic: String },
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Apply a confirmed command; may suspend for network latency
    async fn dispatch(&self, command: &CommandRequest) -> GatewayOutcome;
}

pub struct SimulatedGateway {
    latency_min_ms: u64,
    latency_max_ms: u64,
    failure_probability: f64,
    effect_min_secs: u32,
    effect_max_secs: u32,
    entropy: Arc<dyn EntropySource>,
}

impl SimulatedGateway {
    pub fn new(config: &ServiceConfig, entropy: Arc<dyn EntropySource>) -> Self {
        Self {
            latency_min_ms: config.latency_min_ms,
            latency_max_ms: config.latency_max_ms.max(config.latency_min_ms),
            failure_probability: config.failure_probability,
            effect_min_secs: config.effect_min_secs,
            effect_max_secs: config.effect_max_secs.max(config.effect_min_secs),
            entropy,
        }
    }

    fn latency(&self) -> Duration {
        let span = (self.latency_max_ms - self.latency_min_ms) as f64;
        let ms = self.latency_min_ms + (self.entropy.sample() * (span + 1.0)) as u64;
        Duration::from_millis(ms.min(self.latency_max_ms))
    }

    fn effect_secs(&self) -> u32 {
        let span = f64::from(self.effect_max_secs - self.effect_min_secs);
        let secs = self.effect_min_secs + (self.entropy.sample() * (span + 1.0)) as u32;
        secs.min(self.effect_max_secs)
    }
}

#[async_trait]
impl Gateway for SimulatedGateway {
    async fn dispatch(&self, command: &CommandRequest) -> GatewayOutcome {
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.entropy.sample() < self.failure_probability {
            return GatewayOutcome::Rejected {
                diagnostic: format!(
                    "Gateway timeout: no acknowledgement from {} within {}ms",
                    command.equipment_id,
                    latency.as_millis()
                ),
            };
        }

        GatewayOutcome::Applied {
            estimated_effect_secs: self.effect_secs(),
        }
    }
}
