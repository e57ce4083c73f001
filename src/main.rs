use clap::{Parser as ClapParser, Subcommand};
use mbql_tree::cli::{self, CliError, DocumentSource, EditOp, EditOptions};
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "mbql")]
#[command(about = "mbql - Inspect and edit MBQL query documents")]
#[command(version)]
struct Cli {
    /// JSON document (reads from stdin if not provided)
    #[arg(short, long, global = true)]
    input: Option<String>,

    /// Metadata catalog file used for display names
    #[arg(short, long, global = true)]
    metadata: Option<PathBuf>,

    /// Parse the whole document up front instead of on first access
    #[arg(long, global = true)]
    eager: bool,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe each query stage and its clauses
    Inspect,

    /// Apply an edit to the outermost query stage
    Edit {
        #[command(subcommand)]
        op: EditCommand,
    },

    /// Parse and re-emit the document, checking it survives unchanged
    Roundtrip,
}

#[derive(Subcommand)]
enum EditCommand {
    /// Add a filter clause
    AddFilter { clause: String },
    /// Add an aggregation clause
    AddAggregation { clause: String },
    /// Add a breakout clause
    AddBreakout { clause: String },
    /// Add a sort clause
    AddSort { clause: String },
    /// Remove the filter at an index of the canonical filter list
    RemoveFilter { index: usize },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("MBQL_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let source = DocumentSource {
        input: read_input(cli.input)?,
        eager: cli.eager,
        catalog: cli.metadata.as_deref().map(cli::load_catalog).transpose()?,
    };

    match cli.command {
        Commands::Inspect => print!("{}", cli::execute_inspect(&source)?),
        Commands::Edit { op } => {
            let options = EditOptions {
                source,
                op: parse_op(op)?,
            };
            let output = cli::execute_edit(&options)?;
            println!("{}", cli::render(&output, cli.pretty)?);
        }
        Commands::Roundtrip => {
            let result = cli::execute_roundtrip(&source)?;
            println!("{}", cli::render(&result.output, cli.pretty)?);
            eprintln!(
                "{} ({} nodes parsed)",
                if result.faithful { "roundtrip ok" } else { "roundtrip MISMATCH" },
                result.parsed
            );
            if !result.faithful {
                std::process::exit(2);
            }
        }
    }
    Ok(())
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    Ok(match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    })
}

fn parse_op(op: EditCommand) -> Result<EditOp, CliError> {
    let clause = |text: &str| mbql_tree::convert::from_str(text).map_err(CliError::from);
    Ok(match op {
        EditCommand::AddFilter { clause: text } => EditOp::AddFilter(clause(&text)?),
        EditCommand::AddAggregation { clause: text } => EditOp::AddAggregation(clause(&text)?),
        EditCommand::AddBreakout { clause: text } => EditOp::AddBreakout(clause(&text)?),
        EditCommand::AddSort { clause: text } => EditOp::AddSort(clause(&text)?),
        EditCommand::RemoveFilter { index } => EditOp::RemoveFilter(index),
    })
}
