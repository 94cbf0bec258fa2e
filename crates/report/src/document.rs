//! Serialisable report document (§4.8). Serialisation format itself is
//! external — callers hand this to `serde_json`/`serde_yaml`/whatever the
//! surrounding tooling prefers.

use serde::Serialize;

use loadbench_bench::BenchmarkStats;

#[derive(Debug, Clone, Serialize)]
pub struct ModelResult {
    pub model: String,
    pub success_rate: f64,
    pub mean_latency_ms: f64,
    pub median_latency_ms: u64,
    pub p95_latency_ms: u64,
    pub p99_latency_ms: u64,
    pub requests_per_second: f64,
    pub tokens_per_second: f64,
    pub total_requests: usize,
    pub successful_requests: usize,
}

impl ModelResult {
    pub fn from_stats(model: impl Into<String>, stats: &BenchmarkStats) -> Self {
        Self {
            model: model.into(),
            success_rate: stats.success_rate,
            mean_latency_ms: stats.mean_ms,
            median_latency_ms: stats.median_ms,
            p95_latency_ms: stats.p95_ms,
            p99_latency_ms: stats.p99_ms,
            requests_per_second: stats.requests_per_second,
            tokens_per_second: stats.tokens_per_second,
            total_requests: stats.count,
            successful_requests: stats.successful,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total_models: usize,
    pub successful_evaluations: usize,
    pub failed_evaluations: usize,
    pub average_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub models: Vec<ModelResult>,
    pub summary: ReportSummary,
}
