// imdbench CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing, with an
// IMDBENCH_* environment fallback for every flag.
// Design Decision: The report is the only thing written to stdout (json by
// default, yaml or text on request); logs go to stderr.
// Design Decision: Providers are linked in and registered at startup; the
// --benchmark tag selects one.

mod output;
mod query_file;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use imdbench_core::{
    init_telemetry, BenchConfig, BenchmarkRunner, ProviderRegistry, QuerySpec, Target,
    TelemetryConfig,
};
use tracing::info;

use crate::output::OutputFormat;
use crate::query_file::QueryFile;

#[derive(Parser, Debug)]
#[command(name = "imdbench")]
#[command(about = "imdbench - concurrent load generator for database and API benchmarks")]
#[command(version)]
pub struct Cli {
    /// Number of concurrent workers
    #[arg(long, env = "IMDBENCH_CONCURRENCY", default_value = "10")]
    pub concurrency: usize,

    /// Duration of the measured run in seconds
    #[arg(long, env = "IMDBENCH_DURATION", default_value = "30")]
    pub duration: u64,

    /// Server timeout in seconds; slower calls land in the last histogram bucket
    #[arg(long, env = "IMDBENCH_TIMEOUT", default_value = "2")]
    pub timeout: u64,

    /// Duration of the warm-up run in seconds
    #[arg(long = "warmup-time", env = "IMDBENCH_WARMUP_TIME", default_value = "5")]
    pub warmup_time: u64,

    /// Report format
    #[arg(
        long,
        env = "IMDBENCH_OUTPUT_FORMAT",
        default_value = "json",
        value_parser = ["text", "json", "yaml"]
    )]
    pub output_format: String,

    /// Server host
    #[arg(long, env = "IMDBENCH_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port
    #[arg(long, env = "IMDBENCH_PORT", default_value = "8080")]
    pub port: u16,

    /// Request path for HTTP benchmarks, e.g. /graphql
    #[arg(long, env = "IMDBENCH_PATH", default_value = "")]
    pub path: String,

    /// Number of result samples to return
    #[arg(long, env = "IMDBENCH_NSAMPLES", default_value = "10")]
    pub nsamples: usize,

    /// Whether ids are integers (True/False)
    #[arg(
        long,
        env = "IMDBENCH_IDS_ARE_INTS",
        default_value = "False",
        value_parser = parse_flag,
        action = ArgAction::Set
    )]
    pub ids_are_ints: bool,

    /// Operation provider to benchmark, e.g. http, postgres or edgedb_go_json
    #[arg(long, env = "IMDBENCH_BENCHMARK")]
    pub benchmark: String,

    /// Seed for reproducible argument and sample selection
    #[arg(long, env = "IMDBENCH_SEED")]
    pub seed: Option<u64>,

    /// File to read benchmark query information from ("-" for stdin)
    pub queryfile: PathBuf,
}

fn parse_flag(s: &str) -> Result<bool, String> {
    match s {
        "True" | "true" | "1" | "yes" => Ok(true),
        "False" | "false" | "0" | "no" => Ok(false),
        other => Err(format!("expected True or False, got {other:?}")),
    }
}

impl Cli {
    /// Build the run configuration from flags plus the loaded query file
    pub fn to_config(&self, file: QueryFile) -> anyhow::Result<BenchConfig> {
        let query = QuerySpec {
            name: file.queryname.clone(),
            text: file.query.clone(),
            ids_are_ints: self.ids_are_ints,
        };
        let args = file.into_args()?;

        let mut config = BenchConfig::new(args)
            .with_concurrency(self.concurrency)
            .with_duration(Duration::from_secs(self.duration))
            .with_timeout(Duration::from_secs(self.timeout))
            .with_warmup(Duration::from_secs(self.warmup_time))
            .with_sample_count(self.nsamples)
            .with_benchmark(self.benchmark.clone())
            .with_target(Target {
                host: self.host.clone(),
                port: self.port,
                path: self.path.clone(),
            })
            .with_query(query);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }

        config.validate().context("invalid benchmark configuration")?;
        Ok(config)
    }
}

/// Registry with every provider linked into this binary
fn build_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    imdbench_http::register_provider(&mut registry);
    imdbench_postgres::register_provider(&mut registry);
    imdbench_edgedb::register_provider(&mut registry);
    registry
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(TelemetryConfig::from_env());

    let format = OutputFormat::from_str(&cli.output_format);
    let file = QueryFile::load(&cli.queryfile)?;
    let config = cli.to_config(file)?;

    let registry = build_registry();
    let provider = registry.create(&config.benchmark).with_context(|| {
        format!("available benchmarks: {}", registry.tags().join(", "))
    })?;

    info!(
        benchmark = %config.benchmark,
        query = %config.query.name,
        host = %config.target.host,
        port = config.target.port,
        "running benchmark"
    );
    let report = BenchmarkRunner::new(config, provider)
        .run()
        .await
        .context("benchmark run failed")?;

    println!("{}", format.render_report(&report)?);
    Ok(())
}
