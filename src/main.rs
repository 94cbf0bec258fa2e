//! Binary entry point: parse the CLI, overlay an optional config file,
//! initialize logging, run the benchmark, and report a summary.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use loadbench::config::{ConfigFile, OutputFormat, RunArgs};
use loadbench::logging;

fn main() -> ExitCode {
    let mut args = RunArgs::parse();

    if let Some(config_path) = args.config.clone() {
        match ConfigFile::load(&config_path) {
            Ok(file) => args.merge_config_file(file),
            Err(err) => {
                eprintln!("failed to load config file {}: {err}", config_path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(err) = args.validate() {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    if let Err(err) = logging::init_logging(&args) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    if args.dry_run {
        tracing::info!("dry-run: requests will be served by the in-process echo adapter");
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run_and_report(&args)) {
        Ok(had_results) if had_results => ExitCode::SUCCESS,
        Ok(_) => {
            tracing::error!("no evaluation produced any result");
            ExitCode::FAILURE
        }
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs the benchmark and writes the report; returns whether at least one
/// successful evaluation happened (the process exit-code condition of §7).
async fn run_and_report(args: &RunArgs) -> anyhow::Result<bool> {
    let report = loadbench::run(args).await.context("benchmark run failed")?;

    tracing::info!(
        total_models = report.summary.total_models,
        successful_evaluations = report.summary.successful_evaluations,
        failed_evaluations = report.summary.failed_evaluations,
        average_score = report.summary.average_score,
        "benchmark complete"
    );
    for model in &report.models {
        tracing::info!(
            model = %model.model,
            success_rate = model.success_rate,
            mean_latency_ms = model.mean_latency_ms,
            p95_latency_ms = model.p95_latency_ms,
            p99_latency_ms = model.p99_latency_ms,
            requests_per_second = model.requests_per_second,
            tokens_per_second = model.tokens_per_second,
            "model result"
        );
    }

    if args.save_results {
        if let Some(output) = &args.output {
            if !matches!(args.output_format, OutputFormat::Json) {
                tracing::warn!(
                    format = ?args.output_format,
                    "only JSON result persistence is implemented; writing JSON anyway"
                );
            }
            let file = std::fs::File::create(output)
                .with_context(|| format!("failed to create {}", output.display()))?;
            serde_json::to_writer_pretty(file, &report).context("failed to serialize report")?;
        } else {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(report.summary.successful_evaluations > 0)
}
