use std::time::Duration;

use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use sporlbronze::{
    bronze::LandRequest,
    cli, config, error,
    pipeline::{self, IngestJob},
    spotify::RetryPolicy,
    utils,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch search results and land them in the bronze layer
    Ingest(IngestOptions),

    /// Land a JSON file from disk
    Land(LandOptions),

    /// Validate a saved search response
    Validate(ValidateOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct IngestOptions {
    /// Search query
    #[clap(long, default_value = pipeline::DEFAULT_QUERY)]
    pub query: String,

    /// Result type filter
    #[clap(long = "type", default_value = pipeline::DEFAULT_SEARCH_TYPE)]
    pub search_type: String,

    /// Page size
    #[clap(long, default_value_t = pipeline::DEFAULT_LIMIT)]
    pub limit: u32,

    /// Offset of the first page
    #[clap(long, default_value_t = 0)]
    pub offset: u32,

    /// Maximum number of pages to fetch
    #[clap(long, default_value_t = 1)]
    pub pages: u32,

    #[clap(flatten)]
    pub target: TargetOptions,

    /// Total attempts per request
    #[clap(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Backoff unit in seconds (sleep = attempt * unit)
    #[clap(long, default_value = "1", value_parser = utils::parse_backoff)]
    pub backoff: Duration,
}

#[derive(Parser, Debug, Clone)]
pub struct TargetOptions {
    /// Bronze root: local path or dbfs:/ URI (defaults to BRONZE_BASE_DIR)
    #[clap(long)]
    pub base_dir: Option<String>,

    /// Dataset name
    #[clap(long, default_value = pipeline::DEFAULT_DATASET)]
    pub dataset: String,

    /// Run identifier (defaults to a microsecond timestamp)
    #[clap(long)]
    pub run_id: Option<String>,

    /// Replace an existing data file
    #[clap(long)]
    pub overwrite: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct LandOptions {
    /// JSON file to land
    #[clap(long)]
    pub file: String,

    /// Partition as key=value; can be repeated, order is kept
    #[clap(
        long,
        value_parser = utils::parse_partition,
        action = ArgAction::Append,
        num_args = 1
    )]
    pub partition: Vec<(String, String)>,

    /// Page number
    #[clap(long, default_value_t = 0)]
    pub page: u32,

    #[clap(flatten)]
    pub target: TargetOptions,
}

#[derive(Parser, Debug, Clone)]
pub struct ValidateOptions {
    /// JSON file to validate
    #[clap(long)]
    pub file: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` scoped to this crate. `LOG_FORMAT=json`
/// switches to JSON lines.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        EnvFilter::new(format!("sporlbronze={}", level.to_lowercase()))
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    if let Err(e) = config::load_env() {
        error!("Cannot load environment. Err: {}", e);
    }

    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Ingest(opt) => {
            let job = IngestJob {
                query: opt.query,
                search_type: opt.search_type,
                limit: opt.limit,
                offset: opt.offset,
                pages: opt.pages,
                dataset: opt.target.dataset,
                run_id: opt.target.run_id,
                overwrite: opt.target.overwrite,
                retry: RetryPolicy::new(opt.max_attempts, opt.backoff),
            };
            cli::ingest(job, opt.target.base_dir)
        }
        Command::Land(opt) => {
            let mut request = LandRequest::new(opt.target.dataset)
                .page(opt.page)
                .overwrite(opt.target.overwrite);
            request.partitions = opt.partition;
            request.run_id = opt.target.run_id;
            cli::land(&opt.file, opt.target.base_dir, request)
        }
        Command::Validate(opt) => cli::validate(&opt.file),
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
