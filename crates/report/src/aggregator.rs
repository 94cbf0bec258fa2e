//! Merges per-model benchmark results into one [`ReportDocument`] (§4.8).

use loadbench_bench::BenchmarkStats;

use crate::document::{ModelResult, ReportDocument, ReportSummary};

#[derive(Debug, Default)]
pub struct ReportAggregator {
    models: Vec<ModelResult>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, model: impl Into<String>, stats: &BenchmarkStats) -> &mut Self {
        self.models.push(ModelResult::from_stats(model, stats));
        self
    }

    pub fn finish(self) -> ReportDocument {
        let total_models = self.models.len();
        let successful_evaluations: usize = self.models.iter().map(|m| m.successful_requests).sum();
        let failed_evaluations: usize = self
            .models
            .iter()
            .map(|m| m.total_requests - m.successful_requests)
            .sum();
        let average_score = if total_models > 0 {
            self.models.iter().map(|m| m.success_rate).sum::<f64>() / total_models as f64
        } else {
            0.0
        };

        ReportDocument {
            models: self.models,
            summary: ReportSummary {
                total_models,
                successful_evaluations,
                failed_evaluations,
                average_score,
            },
        }
    }
}
