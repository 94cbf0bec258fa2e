//! loadbench: a load-generation and evaluation harness for chat-completion
//! HTTP APIs.
//!
//! This crate is the thin CLI/config/wiring layer around the core pipeline:
//! `loadbench-resilience` (connection pool + rate limiter), `loadbench-transport`
//! (HTTP client + SSE decoder), `loadbench-provider` (wire adapters),
//! `loadbench-executor` (batch executor), `loadbench-bench` (benchmark
//! orchestrator) and `loadbench-report` (aggregation). [`run`] wires C1–C8
//! into one call the binary in `src/main.rs` drives.

pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod rate_gate;
pub mod runner;

use std::sync::Arc;
use std::time::Duration;

use loadbench_bench::{BenchmarkConfig, BenchmarkOrchestrator};
use loadbench_provider::{ChatParameters, OpenAiCompatible, ProviderAdapter};
use loadbench_report::{ReportAggregator, ReportDocument};
use loadbench_resilience::OverflowStrategy;
use loadbench_transport::{HttpClient, HttpClientConfig, HttpPoolConfig, RetryPolicy};

use config::RunArgs;
use dataset::DatasetConfig;
use error::{LoadbenchError, Result};
use rate_gate::RateGate;
use runner::AdapterRunner;

fn dataset_config(args: &RunArgs) -> DatasetConfig {
    DatasetConfig {
        skip_lines: args.skip_lines,
        line_prefix: args.line_prefix.clone(),
        shuffle: args.dataset_shuffle,
        limit: args.dataset_limit,
        max_examples: args.max_examples,
    }
}

/// Load the prompt dataset, falling back to an empty list (which makes the
/// orchestrator use its default fixed prompt) on any dataset error — per
/// §7, dataset loading errors are never fatal to the run.
fn load_prompts(args: &RunArgs) -> Vec<String> {
    let Some(path) = &args.dataset_path else {
        return Vec::new();
    };
    match dataset::load_line_by_line(path, &dataset_config(args)) {
        Ok(prompts) => prompts,
        Err(err) => {
            tracing::warn!(error = %err, "failed to load prompt dataset, falling back to default prompt");
            Vec::new()
        }
    }
}

fn build_client(args: &RunArgs) -> HttpClient {
    let workers = args.max_workers.max(args.concurrent);
    let pool = HttpPoolConfig {
        max_connections: workers,
        max_connections_per_host: workers,
        overflow_strategy: OverflowStrategy::QueueWait,
        ..HttpPoolConfig::default()
    };
    let retry = RetryPolicy {
        max_retries: args.max_retries,
        retry_delay: args.retry_delay_duration(),
    };
    HttpClient::new(HttpClientConfig { pool, retry })
}

fn build_adapter(args: &RunArgs, client: Arc<HttpClient>) -> Arc<dyn ProviderAdapter> {
    let base_url = args.url.clone().unwrap_or_default();
    Arc::new(
        OpenAiCompatible::new(client, base_url, args.api_key.clone())
            .with_timeouts(args.connect_timeout_duration(), args.read_timeout_duration()),
    )
}

fn chat_parameters(args: &RunArgs) -> ChatParameters {
    ChatParameters {
        temperature: args.temperature,
        top_p: args.top_p,
        max_tokens: args.max_tokens,
        frequency_penalty: args.frequency_penalty,
        presence_penalty: args.presence_penalty,
        stop: args.stop.clone(),
        stream: args.stream,
    }
}

/// Run one benchmark against `args.model` and reduce it to a one-model
/// [`ReportDocument`]. `args` must already have passed [`RunArgs::validate`].
///
/// `rounds` × `number` gives the total count of measured iterations; the
/// CLI surface (§6) has no separate warmup-count flag, so exactly one
/// warmup iteration runs before the measured ones (an Open Question
/// decision recorded in DESIGN.md).
pub async fn run(args: &RunArgs) -> Result<ReportDocument> {
    let model = args
        .model
        .clone()
        .ok_or_else(|| LoadbenchError::Config("model is required".to_string()))?;

    let prompts = load_prompts(args);

    let client = Arc::new(build_client(args));
    let idle_sweeper = client
        .pool()
        .spawn_idle_sweeper(Duration::from_secs(30));

    let adapter: Arc<dyn ProviderAdapter> = if args.dry_run {
        Arc::new(loadbench_provider::EchoAdapter)
    } else {
        build_adapter(args, client.clone())
    };

    let rate_gate = RateGate::from_ceilings(args.requests_per_second, args.requests_per_minute)?;
    let runner = Arc::new(AdapterRunner::new(adapter, rate_gate, args.stream));

    let config = BenchmarkConfig {
        model,
        warmup_iterations: if args.number * args.rounds == 0 { 0 } else { 1 },
        test_iterations: args.number * args.rounds,
        concurrency: args.concurrent,
        parameters: chat_parameters(args),
        per_request_deadline: args.read_timeout_duration(),
        system_prompt: args.system.clone(),
    };

    let orchestrator = BenchmarkOrchestrator::new(runner, config);
    let stats = orchestrator.run(&prompts).await;

    idle_sweeper.abort();
    client.pool().shutdown().await;

    let mut aggregator = ReportAggregator::new();
    aggregator.add_model(args.model.clone().unwrap_or_default(), &stats);
    Ok(aggregator.finish())
}
