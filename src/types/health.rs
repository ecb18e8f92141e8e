//! Health monitoring types

use serde::Serialize;
use super::EngineState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub state: EngineState,
    pub consecutive_errors: u32,
    pub circuit_breaker_active: bool,
    pub emergency_shutdown: bool,
    pub active_lanes: usize,
    pub fee_samples: usize,
    pub uptime_seconds: u64,
}
