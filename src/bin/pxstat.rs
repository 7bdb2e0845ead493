use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pxstat_rs::{Client, DEFAULT_ENDPOINT, stats, storage};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "pxstat",
    version,
    about = "Query a PxStat JSON-RPC API and flatten the JSON-stat result into a table"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a query (and optionally save the table and print stats).
    Fetch(FetchArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// File holding the JSON-RPC request body, or `-` for stdin.
    #[arg(short, long)]
    query: PathBuf,
    /// JSON-RPC endpoint.
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Total request timeout in seconds (0 disables it).
    #[arg(long, default_value_t = 30)]
    timeout: u64,
    /// Dataset to return when the response is a JSON-stat collection.
    #[arg(long, default_value_t = 0)]
    dataset: usize,
    /// Save the table to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Print summary statistics of the value column to stderr.
    #[arg(long, default_value_t = false)]
    stats: bool,
    /// Print the JSON-stat document instead of a table.
    #[arg(long, default_value_t = false, conflicts_with_all = ["out", "format", "stats"])]
    raw: bool,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn read_query(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .context("read query from stdin")?;
        Ok(s)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("read query {}", path.display()))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Fetch(args) => cmd_fetch(args),
    }
}

fn cmd_fetch(args: FetchArgs) -> Result<()> {
    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let client = Client::builder()
        .endpoint(&args.endpoint)
        .timeout(timeout)
        .dataset_index(args.dataset)
        .build()
        .context("build HTTP client")?;
    let query = read_query(&args.query)?;

    if args.raw {
        let data = client
            .fetch_raw(&query)
            .with_context(|| format!("POST {}", args.endpoint))?;
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    let table = client
        .fetch(&query)
        .with_context(|| format!("POST {}", args.endpoint))?;

    match args.out.as_ref() {
        Some(path) => {
            let fmt = match args.format {
                Some(OutFormat::Csv) => "csv",
                Some(OutFormat::Json) => "json",
                None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
            }
            .to_ascii_lowercase();
            match fmt.as_str() {
                "csv" => storage::save_csv(&table, path)?,
                "json" => storage::save_json(&table, path)?,
                other => anyhow::bail!("unsupported format: {}", other),
            }
            eprintln!("Saved {} rows to {}", table.len(), path.display());
        }
        None => match args.format {
            Some(OutFormat::Json) => {
                println!("{}", serde_json::to_string_pretty(&storage::to_json_rows(&table))?)
            }
            _ => storage::write_csv(&table, std::io::stdout().lock())?,
        },
    }

    if args.stats {
        let s = stats::summary(&table);
        eprintln!(
            "{}  count={} missing={}  min={} max={} mean={} median={}",
            table.label.as_deref().unwrap_or("dataset"),
            s.count,
            s.missing,
            fmt_opt(s.min),
            fmt_opt(s.max),
            fmt_opt(s.mean),
            fmt_opt(s.median)
        );
    }

    Ok(())
}
