use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use medmatch::config::UNSURE_THRESHOLD_DEFAULT;
use medmatch::logging;
use medmatch::pipeline::Pipeline;
use medmatch::types::ProcessRequest;
use tracing::error;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a staff list and reconcile it against the golden reference
    Process {
        /// Input worksheet (.xlsx or .csv) with a 'BI Name' column
        #[arg(short, long)]
        input: PathBuf,

        /// Output workbook with Doctors and Facilities sheets
        #[arg(short, long)]
        output: PathBuf,

        /// Golden reference file (auto-detected when omitted)
        #[arg(short, long)]
        golden: Option<PathBuf>,

        /// Where to write never-seen names for review
        #[arg(long)]
        new_aliases_out: Option<PathBuf>,

        /// Similarity floor for the "Not Sure" review band
        #[arg(short, long, default_value_t = UNSURE_THRESHOLD_DEFAULT)]
        threshold: f64,

        /// Disable fuzzy matching and clustering, exact lookups only
        #[arg(long)]
        exact_only: bool,
    },

    /// Merge a reviewed workbook back into the golden reference
    Learn {
        /// Golden reference file to update
        #[arg(short, long)]
        golden: PathBuf,

        /// Reviewed file (csv, or workbook with a 'Doctors' sheet)
        #[arg(short, long)]
        reviewed: PathBuf,

        /// Write the merged reference here instead of overwriting --golden
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process {
            input,
            output,
            golden,
            new_aliases_out,
            threshold,
            exact_only,
        } => {
            let mut request = ProcessRequest::new(input, output).with_threshold(threshold);
            if let Some(golden) = golden {
                request = request.with_golden(golden);
            }
            if let Some(path) = new_aliases_out {
                request = request.with_new_aliases_out(path);
            }
            let pipeline = Pipeline::new().with_fuzzy_matching(!exact_only);
            pipeline.process(&request)?;
        }
        Commands::Learn {
            golden,
            reviewed,
            out,
        } => {
            let pipeline = Pipeline::new();
            pipeline.learn(&golden, &reviewed, out.as_deref())?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    logging::configure_logging();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
