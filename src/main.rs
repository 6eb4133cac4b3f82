//! Ironsplit CLI
//!
//! Split large delimited or JSON files into numbered parts.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ironsplit::{
    InputFormat, InputSource, OutputFormat, PartitionMode, Quoting, SettingsStore, SplitEvent,
    SplitHandle, SplitRequest, categorize,
};

#[derive(Parser)]
#[command(name = "ironsplit")]
#[command(about = "Split large CSV and JSON files into smaller parts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into parts
    Split(SplitArgs),

    /// Show the detected format, delimiter and header of a file
    Inspect {
        input: PathBuf,
    },

    /// Show or change stored preferences
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(clap::Args)]
struct SplitArgs {
    input: PathBuf,

    /// Output directory [default: <input dir>/split_files]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rows per part
    #[arg(long, group = "mode")]
    rows: Option<u64>,

    /// Maximum part size in MiB
    #[arg(long = "size-mb", group = "mode")]
    size_mb: Option<u64>,

    /// Number of parts
    #[arg(long, group = "mode")]
    parts: Option<u64>,

    #[arg(long, value_enum, default_value_t = FormatArg::Delimited)]
    format: FormatArg,

    /// Output delimiter (a single character, or `tab`)
    #[arg(long, value_parser = parse_delimiter, default_value = ",")]
    delimiter: u8,

    /// Input delimiter, overriding detection
    #[arg(long = "input-delimiter", value_parser = parse_delimiter)]
    input_delimiter: Option<u8>,

    #[arg(long, value_enum, default_value_t = QuotingArg::Minimal)]
    quoting: QuotingArg,

    /// Columns to keep, comma separated
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Rename a column: OLD=NEW (repeatable)
    #[arg(long, value_parser = parse_rename)]
    rename: Vec<(String, String)>,

    /// Do not write a header line to delimited parts
    #[arg(long)]
    no_header: bool,

    /// Part file extension, e.g. .csv, .txt, .dat, .json
    #[arg(long)]
    ext: Option<String>,

    /// Do not append to log.txt
    #[arg(long)]
    no_log: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Delimited,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum QuotingArg {
    Minimal,
    All,
    None,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every setting (default)
    Show,
    /// Change one setting
    Set { key: String, value: String },
    /// Restore defaults
    Reset,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Split(args) => split_command(args),
        Commands::Inspect { input } => inspect_command(input),
        Commands::Settings { action } => settings_command(action.unwrap_or(SettingsAction::Show)),
    }
}

fn split_command(args: SplitArgs) -> Result<()> {
    let settings = SettingsStore::load().settings;

    let (mode, limit) = match (args.rows, args.size_mb, args.parts) {
        (Some(n), _, _) => (PartitionMode::ByRowCount, n),
        (_, Some(n), _) => (PartitionMode::BySizeBytes, n),
        (_, _, Some(n)) => (PartitionMode::ByPartCount, n),
        _ => bail!("one of --rows, --size-mb or --parts is required"),
    };
    let format = match args.format {
        FormatArg::Json => OutputFormat::Json,
        FormatArg::Delimited => OutputFormat::Delimited {
            delimiter: args.delimiter,
            quoting: match args.quoting {
                QuotingArg::Minimal => Quoting::Minimal,
                QuotingArg::All => Quoting::All,
                QuotingArg::None => Quoting::None,
            },
        },
    };
    let extension = args.ext.unwrap_or_else(|| match format {
        OutputFormat::Json => format.default_extension().to_string(),
        OutputFormat::Delimited { .. } => settings.default_output_file_type.clone(),
    });
    let output = args
        .output
        .unwrap_or_else(|| SplitRequest::default_output_dir(&args.input));

    let mut request = SplitRequest::new(&args.input, output)
        .with_format(format)
        .with_partition(mode, limit)
        .with_header(settings.retain_header && !args.no_header)
        .with_extension(extension)
        .with_logging(settings.enable_logging && !args.no_log);
    if let Some(columns) = args.columns {
        request = request.with_columns(columns);
    }
    for (from, to) in args.rename {
        request = request.with_rename(from, to);
    }
    if let Some(d) = args.input_delimiter {
        request = request.with_input_delimiter(d);
    }

    let handle = SplitHandle::start(request)?;
    let mut last_percent = None;
    let outcome = loop {
        let Ok(event) = handle.events().recv() else {
            bail!("split worker stopped without a result");
        };
        match event {
            SplitEvent::Progress(p) if p.rows_total > 0 => {
                let percent = p.rows_processed * 100 / p.rows_total;
                if last_percent != Some(percent / 10) {
                    last_percent = Some(percent / 10);
                    eprintln!("{percent:>3}% ({} of {} rows)", p.rows_processed, p.rows_total);
                }
            }
            SplitEvent::PartCountReduced {
                requested,
                effective,
            } => {
                eprintln!("only {effective} rows available; writing {effective} parts instead of {requested}");
            }
            SplitEvent::Finished(outcome) => break outcome,
            _ => {}
        }
    };
    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{:?} error: {e:#}", categorize(&e));
            return Err(e);
        }
    };
    println!(
        "{} parts written to {}",
        result.parts.len(),
        result.output_dir.display()
    );
    println!(
        "rows in: {}  rows out: {}  validation: {}",
        result.total_input_rows,
        result.total_output_rows,
        result.validation()
    );
    Ok(())
}

fn inspect_command(input: PathBuf) -> Result<()> {
    let source = InputSource::detect(&input, None)?;
    let (header, _) = source.open()?;
    match source.format {
        InputFormat::Json => println!("format:    json"),
        InputFormat::Delimited { delimiter } => {
            println!("format:    delimited");
            println!("delimiter: '{}'", (delimiter as char).escape_default());
        }
    }
    println!("columns:   {}", header.len());
    for name in &header {
        println!("  {name}");
    }
    Ok(())
}

fn settings_command(action: SettingsAction) -> Result<()> {
    let mut store = SettingsStore::load();
    match action {
        SettingsAction::Show => {
            println!("# {}", store.path().display());
            println!(
                "{}",
                serde_json::to_string_pretty(&store.settings).context("serialize settings")?
            );
        }
        SettingsAction::Set { key, value } => {
            store.set(&key, &value)?;
            store.save()?;
            if let Some(v) = store.get(&key) {
                println!("{key} = {v}");
            }
        }
        SettingsAction::Reset => {
            store.reset();
            store.save()?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        _ if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        _ => Err(format!("'{s}' is not a single ASCII character")),
    }
}

fn parse_rename(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .ok_or_else(|| format!("expected OLD=NEW, got '{s}'"))
}
