//! Fundcount CLI - count fund manager participation in a CSV of deals
//!
//! ```bash
//! fundcount count deals.csv                 # Table as CSV on stdout
//! fundcount count deals.csv -o out.csv      # Write to a file
//! fundcount columns deals.csv               # List columns and default picks
//! fundcount serve                           # Start HTTP server (port 3000)
//! ```

use clap::{Parser, Subcommand};
use fundcount::api::logs::LOG_BROADCASTER;
use fundcount::{
    aggregate_file, inspect_file, to_csv, AggregateOptions, AmountPolicy, AmountSelection,
    ColumnSelection, PipelineOutput, ServerConfig, DOWNLOAD_FILE_NAME,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "fundcount")]
#[command(about = "Count fund manager participation across a CSV of investment deals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count participations (and sum amounts) per fund manager
    Count {
        /// Input CSV file
        input: PathBuf,

        /// Column holding the fund manager lists
        #[arg(short, long)]
        manager_column: Option<String>,

        /// Column holding the amounts to sum
        #[arg(short, long, conflicts_with = "no_amount")]
        amount_column: Option<String>,

        /// Only count participations, even if the default amount column exists
        #[arg(long)]
        no_amount: bool,

        /// Fail on non-numeric amounts instead of counting them as 0
        #[arg(long)]
        strict_amounts: bool,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the table as JSON instead of CSV
        #[arg(long)]
        json: bool,

        /// Don't print progress logs
        #[arg(short, long)]
        quiet: bool,
    },

    /// List the columns of a CSV file and the default picks
    Columns {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: FUNDCOUNT_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Count {
            input,
            manager_column,
            amount_column,
            no_amount,
            strict_amounts,
            delimiter,
            output,
            json,
            quiet,
        } => {
            let amount = if no_amount {
                AmountSelection::Disabled
            } else {
                amount_column.map_or(AmountSelection::Default, AmountSelection::Column)
            };
            let options = AggregateOptions {
                selection: ColumnSelection::new(manager_column, amount),
                amount_policy: if strict_amounts {
                    AmountPolicy::Strict
                } else {
                    AmountPolicy::Lenient
                },
                delimiter,
            };
            LOG_BROADCASTER.set_echo(!quiet);
            cmd_count(&input, &options, output.as_deref(), json)
        }

        Commands::Columns { input, delimiter } => cmd_columns(&input, delimiter),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_count(
    input: &Path,
    options: &AggregateOptions,
    output: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = aggregate_file(input, options)?;

    let content = if json {
        serde_json::to_string_pretty(&result.result.summaries)?
    } else {
        to_csv(&result.result)?
    };
    write_output(&content, output)?;

    print_summary(&result);
    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    let result = &output.result;
    eprintln!("\n📊 SUMMARY");
    eprintln!("   Rows:           {}", output.csv_info.row_count);
    eprintln!("   Fund managers:  {}", result.manager_count());
    eprintln!("   Participations: {}", result.total_participations());
    if let Some(ref column) = result.amount_column {
        eprintln!("   Amount column:  {}", column);
    }
}

fn cmd_columns(input: &Path, delimiter: Option<char>) -> Result<(), Box<dyn std::error::Error>> {
    let info = inspect_file(input, delimiter)?;

    eprintln!("📋 {} columns, {} rows", info.csv_info.headers.len(), info.csv_info.row_count);
    for (i, column) in info.csv_info.headers.iter().enumerate() {
        let mut marks = Vec::new();
        if info.default_manager_column.as_deref() == Some(column.as_str()) {
            marks.push("manager");
        }
        if info.default_amount_column.as_deref() == Some(column.as_str()) {
            marks.push("amount");
        }

        if marks.is_empty() {
            println!("[{:2}] {}", i + 1, column);
        } else {
            println!("[{:2}] {}  (default {})", i + 1, column, marks.join(", "));
        }
    }

    Ok(())
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env()?;
    if let Some(port) = port {
        config = config.with_port(port);
    }
    fundcount::server::start_server(config).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            print!("{}", content);
            if content.is_empty() || !content.ends_with('\n') {
                println!();
            }
            eprintln!("   (use -o {} to save to a file)", DOWNLOAD_FILE_NAME);
        }
    }
    Ok(())
}
