use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use memory_probe::config::{load_config, validate_config, Config, ConfigLoader};
use memory_probe::memory::{NumericOptions, RegionListFilter, StringOptions};
use memory_probe::{Address, ProcessId, ProcessMemory, SafeOperations, ScanBounds};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "memory-probe")]
#[command(version, about = "Scan the memory of a running process")]
struct Cli {
    /// Process to attach to
    #[arg(long)]
    pid: ProcessId,

    /// Configuration file (defaults to $MEMORY_PROBE_CONFIG or memory-probe.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List committed regions
    Regions {
        #[arg(long)]
        executable: bool,
        #[arg(long)]
        writable: bool,
        /// Only regions inside this module
        #[arg(long, conflicts_with_all = ["executable", "writable"])]
        module: Option<String>,
    },
    /// Search a hex byte pattern such as "48 8B ?? ?? 89"
    Pattern {
        pattern: String,
        /// x/? mask, one character per pattern byte
        #[arg(long)]
        mask: Option<String>,
        #[command(flatten)]
        bounds: BoundsArgs,
    },
    /// Search a text string
    String {
        text: String,
        #[arg(long)]
        ignore_case: bool,
        /// UTF-16LE encoding
        #[arg(long)]
        wide: bool,
        #[command(flatten)]
        bounds: BoundsArgs,
    },
    /// Search a number (JSON syntax) or, failing that, a string
    Value {
        value: String,
        /// Only naturally aligned integer candidates
        #[arg(long)]
        aligned: bool,
        #[arg(long)]
        tolerance: Option<f64>,
        #[command(flatten)]
        bounds: BoundsArgs,
    },
    /// Describe the region containing an address
    RegionInfo { address: Address },
}

#[derive(Args, Debug, Clone)]
struct BoundsArgs {
    /// Restrict the scan to a loaded module
    #[arg(long, conflicts_with_all = ["start", "end"])]
    module: Option<String>,
    #[arg(long)]
    start: Option<Address>,
    #[arg(long)]
    end: Option<Address>,
}

impl BoundsArgs {
    #[cfg_attr(not(windows), allow(dead_code))]
    fn bounds(&self) -> ScanBounds {
        match (&self.module, self.start, self.end) {
            (Some(module), _, _) => ScanBounds::module(module.clone()),
            (None, None, None) => ScanBounds::All,
            (None, start, end) => ScanBounds::range(
                start.unwrap_or_else(Address::null),
                end.unwrap_or(Address::new(usize::MAX)),
            ),
        }
    }
}

fn load(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::new(path)
            .load()
            .with_context(|| format!("loading {}", path.display()))?,
        None => load_config().context("loading configuration")?,
    };
    validate_config(&config).context("invalid configuration")?;
    Ok(config)
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("invalid log filter")?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

/// Runs one command and renders its result envelope as JSON
#[cfg_attr(not(windows), allow(dead_code))]
fn execute<P: ProcessMemory>(ops: &mut SafeOperations<P>, command: &Command) -> Result<String> {
    let json = match command {
        Command::Regions {
            executable,
            writable,
            module,
        } => match module {
            Some(name) => serde_json::to_string_pretty(&ops.module_regions(Some(name)))?,
            None => serde_json::to_string_pretty(&ops.memory_regions_ex(RegionListFilter {
                executable_only: *executable,
                writable_only: *writable,
            }))?,
        },
        Command::Pattern {
            pattern,
            mask,
            bounds,
        } => match mask {
            Some(mask) => serde_json::to_string_pretty(&ops.scan_for_pattern(pattern, mask, &bounds.bounds()))?,
            None => serde_json::to_string_pretty(&ops.search_byte_pattern_str(pattern, &bounds.bounds()))?,
        },
        Command::String {
            text,
            ignore_case,
            wide,
            bounds,
        } => {
            let options = StringOptions {
                case_sensitive: !ignore_case,
                wide: *wide,
                null_terminated: false,
            };
            serde_json::to_string_pretty(&ops.search_string(text, &options, &bounds.bounds()))?
        }
        Command::Value {
            value,
            aligned,
            tolerance,
            bounds,
        } => match serde_json::from_str::<serde_json::Value>(value) {
            Ok(number @ serde_json::Value::Number(_)) => {
                let options = NumericOptions {
                    bounds: bounds.bounds(),
                    aligned: *aligned,
                    tolerance: *tolerance,
                };
                serde_json::to_string_pretty(&ops.search_for_value(&number, &options))?
            }
            _ => {
                let text = serde_json::Value::String(value.clone());
                serde_json::to_string_pretty(&ops.scan_for_value(&text, &bounds.bounds()))?
            }
        },
        Command::RegionInfo { address } => serde_json::to_string_pretty(&ops.region_info(*address))?,
    };
    Ok(json)
}

#[cfg(windows)]
fn run(cli: Cli, config: Config) -> Result<String> {
    use memory_probe::windows::WindowsProcess;

    let mut process = WindowsProcess::new();
    process
        .attach(cli.pid)
        .with_context(|| format!("attaching to process {}", cli.pid))?;

    let mut ops = SafeOperations::with_config(process, &config);
    execute(&mut ops, &cli.command)
}

#[cfg(not(windows))]
fn run(cli: Cli, _config: Config) -> Result<String> {
    anyhow::bail!(
        "attaching to process {} requires Windows; {:?} is not supported",
        cli.pid,
        cli.command
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load(&cli)?;
    init_logging(&config)?;

    info!(
        "memory-probe v{} on {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::ARCH
    );

    let output = tokio::task::spawn_blocking(move || run(cli, config)).await??;
    println!("{}", output);
    Ok(())
}
