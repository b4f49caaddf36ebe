//! Gateway observability records: call counters and health-check results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mutable call counters owned by the LLM gateway.
///
/// Updated after every call attempt, never reset except by process restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiCallStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub consecutive_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

impl ApiCallStats {
    pub fn record_success(&mut self) {
        self.successful_calls += 1;
        self.consecutive_failures = 0;
        self.last_success = Some(Utc::now());
    }

    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.last_failure = Some(Utc::now());
    }

    pub fn failed_calls(&self) -> u64 {
        self.total_calls.saturating_sub(self.successful_calls)
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        self.successful_calls as f64 / self.total_calls as f64
    }
}

/// Snapshot of [`ApiCallStats`] with derived fields, as served by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub consecutive_failures: u64,
    pub success_rate: f64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

impl From<&ApiCallStats> for GatewayStats {
    fn from(stats: &ApiCallStats) -> Self {
        Self {
            total_calls: stats.total_calls,
            successful_calls: stats.successful_calls,
            failed_calls: stats.failed_calls(),
            consecutive_failures: stats.consecutive_failures,
            success_rate: (stats.success_rate() * 1000.0).round() / 1000.0,
            last_success: stats.last_success,
            last_failure: stats.last_failure,
        }
    }
}

/// Transient result of one gateway health check. Recomputed on every check,
/// never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub api_configured: bool,
    pub network_connected: bool,
    pub authentication_valid: bool,
    pub service_available: bool,
    pub balance_sufficient: bool,
    /// Round-trip time of the probe completion call, milliseconds.
    pub response_time_ms: Option<u64>,
    pub last_check: DateTime<Utc>,
    pub error_message: Option<String>,
}

impl HealthCheckResult {
    /// A fresh all-down result. `balance_sufficient` starts true: balance is
    /// only reported insufficient on positive evidence from the provider.
    pub fn unchecked(api_configured: bool) -> Self {
        Self {
            api_configured,
            network_connected: false,
            authentication_valid: false,
            service_available: false,
            balance_sufficient: true,
            response_time_ms: None,
            last_check: Utc::now(),
            error_message: None,
        }
    }

    pub fn is_fully_healthy(&self) -> bool {
        self.api_configured
            && self.network_connected
            && self.authentication_valid
            && self.service_available
            && self.balance_sufficient
    }
}
