//! Invocation surface (§6): a long-form flag set, optionally overlaid by
//! an external YAML config document.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;

use crate::error::{LoadbenchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Csv,
    Xml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Load-generation and evaluation harness for chat-completion HTTP APIs.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct RunArgs {
    /// Target endpoint base, e.g. http://localhost:8000/v1
    #[arg(long)]
    pub url: Option<String>,

    /// Model identifier sent in the JSON body
    #[arg(long)]
    pub model: Option<String>,

    /// Bearer token for Authorization
    #[arg(long, env = "LOADBENCH_API_KEY")]
    pub api_key: Option<String>,

    /// Prompt source kind (currently only `line_by_line` is implemented)
    #[arg(long, default_value = "line_by_line")]
    pub dataset: String,

    /// Path to the prompt dataset file
    #[arg(long)]
    pub dataset_path: Option<PathBuf>,

    /// Parallel workers
    #[arg(long, default_value_t = 1)]
    pub concurrent: usize,

    /// Prompts per round
    #[arg(long, default_value_t = 1)]
    pub number: usize,

    /// Rounds
    #[arg(long, default_value_t = 1)]
    pub rounds: usize,

    #[arg(long, default_value_t = 2048)]
    pub max_tokens: u32,

    #[arg(long, default_value_t = 0.7)]
    pub temperature: f32,

    #[arg(long = "top-p", default_value_t = 0.9)]
    pub top_p: f32,

    #[arg(long, default_value_t = 0.0)]
    pub frequency_penalty: f32,

    #[arg(long, default_value_t = 0.0)]
    pub presence_penalty: f32,

    #[arg(long)]
    pub stop: Vec<String>,

    #[arg(long)]
    pub system: Option<String>,

    #[arg(long, default_value_t = false)]
    pub stream: bool,

    #[arg(long, default_value_t = 10)]
    pub max_workers: usize,

    #[arg(long, default_value_t = 30)]
    pub connect_timeout: u64,

    #[arg(long, default_value_t = 60)]
    pub read_timeout: u64,

    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, default_value_t = 1000)]
    pub retry_delay: u64,

    #[arg(long)]
    pub requests_per_second: Option<u32>,

    #[arg(long)]
    pub requests_per_minute: Option<u32>,

    #[arg(long)]
    pub max_examples: Option<usize>,

    #[arg(long, default_value_t = 0)]
    pub skip_lines: usize,

    #[arg(long)]
    pub line_prefix: Option<String>,

    #[arg(long, default_value_t = false)]
    pub dataset_shuffle: bool,

    #[arg(long)]
    pub dataset_limit: Option<usize>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub output_format: OutputFormat,

    #[arg(long, default_value_t = true)]
    pub save_results: bool,

    #[arg(long, default_value_t = false)]
    pub debug: bool,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Path to an external YAML config document; values there are
    /// overridden by any flag explicitly passed on the command line.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// The subset of [`RunArgs`] that can be set from an external config
/// document (§6). Fields are all optional; `None` means "not overridden".
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub dataset_path: Option<PathBuf>,
    pub concurrent: Option<usize>,
    pub number: Option<usize>,
    pub rounds: Option<usize>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub requests_per_second: Option<u32>,
    pub requests_per_minute: Option<u32>,
}

impl ConfigFile {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: ConfigFile = serde_yaml::from_str(&raw)?;
        Ok(parsed)
    }
}

impl RunArgs {
    /// Overlay values from an external config document onto this set of
    /// args, but only where the field still holds its clap default — an
    /// explicit flag always wins.
    pub fn merge_config_file(&mut self, file: ConfigFile) {
        if self.url.is_none() {
            self.url = file.url;
        }
        if self.model.is_none() {
            self.model = file.model;
        }
        if self.api_key.is_none() {
            self.api_key = file.api_key;
        }
        if self.dataset_path.is_none() {
            self.dataset_path = file.dataset_path;
        }
        if let Some(v) = file.concurrent {
            self.concurrent = v;
        }
        if let Some(v) = file.number {
            self.number = v;
        }
        if let Some(v) = file.rounds {
            self.rounds = v;
        }
        if let Some(v) = file.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.top_p {
            self.top_p = v;
        }
        if self.requests_per_second.is_none() {
            self.requests_per_second = file.requests_per_second;
        }
        if self.requests_per_minute.is_none() {
            self.requests_per_minute = file.requests_per_minute;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_none() {
            return Err(LoadbenchError::Config(
                "url is required (flag --url or config file)".to_string(),
            ));
        }
        if self.model.is_none() {
            return Err(LoadbenchError::Config(
                "model is required (flag --model or config file)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn read_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }
}
