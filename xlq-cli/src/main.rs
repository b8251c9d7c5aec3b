use clap::{Parser, Subcommand};

mod basepath;
mod cmd;
mod format;

use basepath::{effective_basepath, resolve_file_path};
use format::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "xlq", version, about = "xlq - jq for Excel")]
#[command(long_about = "xlq is a streaming xlsx tool: bounded reads, targeted searches, and \
atomically persisted edits, from the command line or as a stdio tool server.")]
struct Cli {
    /// Output format (json, csv, tsv)
    #[arg(short = 'f', long, global = true, default_value = "json")]
    format: String,

    /// Base directory for relative file paths (env: XLQ_BASEPATH)
    #[arg(short = 'b', long, global = true)]
    basepath: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all sheets in workbook
    Sheets {
        /// Path to xlsx file
        file: String,
    },
    /// Get sheet metadata (rows, columns, headers)
    Info {
        file: String,
        /// Sheet name (default: first sheet)
        sheet: Option<String>,
    },
    /// Read cells from a range (e.g. A1:C10) or the entire sheet
    Read {
        file: String,
        /// Sheet name or range
        sheet_or_range: Option<String>,
        /// Range, when the previous argument is a sheet name
        range: Option<String>,
        /// Maximum rows when no range specified (0 = default limit)
        #[arg(short = 'l', long, default_value_t = 1000)]
        limit: i64,
    },
    /// Get first N rows of a sheet
    Head {
        file: String,
        sheet: Option<String>,
        /// Number of rows
        #[arg(short = 'n', long = "rows", default_value_t = 10)]
        n: i64,
    },
    /// Get last N rows of a sheet
    Tail {
        file: String,
        sheet: Option<String>,
        /// Number of rows
        #[arg(short = 'n', long = "rows", default_value_t = 10)]
        n: i64,
    },
    /// Search for cells matching a pattern
    Search {
        file: String,
        /// Search pattern (literal, or regex with -r)
        pattern: String,
        /// Case-insensitive search
        #[arg(short = 'i', long)]
        ignore_case: bool,
        /// Treat pattern as regex
        #[arg(short = 'r', long)]
        regex: bool,
        /// Search only in a specific sheet
        #[arg(short = 's', long)]
        sheet: Option<String>,
        /// Maximum results (0 = unlimited within the cap)
        #[arg(short = 'm', long, default_value_t = 0)]
        max: i64,
    },
    /// Get a single cell value
    Cell {
        file: String,
        /// Address, or sheet name when an address follows
        first: String,
        /// Address, when a sheet name precedes it
        second: Option<String>,
    },
    /// Write a value to a cell
    Write {
        file: String,
        /// Cell address (e.g. A1)
        cell: String,
        /// Value to write
        value: String,
        /// Sheet name (default: first sheet)
        #[arg(short = 's', long)]
        sheet: Option<String>,
        /// Value type: auto, string, number, bool, formula
        #[arg(short = 't', long = "type", default_value = "auto")]
        value_type: String,
    },
    /// Append rows from a JSON file to the end of a sheet
    Append {
        file: String,
        /// JSON file holding an array of arrays
        data: String,
        /// Sheet name (default: first sheet)
        #[arg(short = 's', long)]
        sheet: Option<String>,
    },
    /// Create a new xlsx file with optional headers and data
    Create {
        file: String,
        /// Name for the first sheet
        #[arg(short = 's', long, default_value = "Sheet1")]
        sheet: String,
        /// Comma-separated header row
        #[arg(short = 'H', long)]
        headers: Option<String>,
        /// Overwrite an existing file
        #[arg(short = 'o', long)]
        overwrite: bool,
        /// JSON file with initial data (array of arrays)
        #[arg(short = 'd', long)]
        data: Option<String>,
    },
    /// Run as a stdio tool server
    Mcp {
        /// Additional directories to allow file access (comma-separated)
        #[arg(long, value_delimiter = ',')]
        allowed_paths: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let format: OutputFormat = cli.format.parse()?;
    let basepath = effective_basepath(cli.basepath.as_deref());
    let base = basepath.as_deref();

    match cli.command {
        Commands::Sheets { file } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::read::sheets(&engine, &file, format)
        }
        Commands::Info { file, sheet } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::read::info(&engine, &file, sheet.as_deref(), format)
        }
        Commands::Read {
            file,
            sheet_or_range,
            range,
            limit,
        } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::read::read(
                &engine,
                &file,
                sheet_or_range.as_deref(),
                range.as_deref(),
                limit,
                format,
            )
        }
        Commands::Head { file, sheet, n } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::read::head(&engine, &file, sheet.as_deref(), n, format)
        }
        Commands::Tail { file, sheet, n } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::read::tail(&engine, &file, sheet.as_deref(), n, format)
        }
        Commands::Search {
            file,
            pattern,
            ignore_case,
            regex,
            sheet,
            max,
        } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::read::search(
                &engine,
                &file,
                &pattern,
                sheet.as_deref(),
                ignore_case,
                regex,
                max,
                format,
            )
        }
        Commands::Cell {
            file,
            first,
            second,
        } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::read::cell(&engine, &file, &first, second.as_deref(), format)
        }
        Commands::Write {
            file,
            cell,
            value,
            sheet,
            value_type,
        } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::write::write(
                &engine,
                &file,
                &cell,
                &value,
                sheet.as_deref(),
                &value_type,
                format,
            )
        }
        Commands::Append { file, data, sheet } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::write::append(&engine, &file, &data, sheet.as_deref(), format)
        }
        Commands::Create {
            file,
            sheet,
            headers,
            overwrite,
            data,
        } => {
            let engine = cmd::engine_for(base)?;
            let file = resolve_file_path(base, &file)?;
            cmd::write::create(
                &engine,
                &file,
                &sheet,
                headers.as_deref(),
                data.as_deref(),
                overwrite,
                format,
            )
        }
        Commands::Mcp { allowed_paths } => cmd::mcp(base, &allowed_paths),
    }
}
