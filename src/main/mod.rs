use std::path::PathBuf;

use clap::{Parser, Subcommand};
use htstream::{commands::htstream_count, prelude::HtsError};

const INFO: &str = "\
htstream: streaming readers for FASTA, FASTQ, SAM/BAM, and GFF3 files
usage: htstream [--help] <subcommand>

Subcommands:

  count: count the records (and bases) in a file.

";

#[derive(Parser)]
#[clap(name = "htstream")]
#[clap(about = INFO)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Count {
        /// an input file, plain or gzip-compressed
        #[arg(required = true)]
        input: PathBuf,

        /// the file format (fasta, fastq, sam, bam, gff3); inferred from the
        /// extension if not given
        #[arg(long)]
        format: Option<String>,

        /// read alignment files that declare no reference sequences
        #[arg(long)]
        no_check_references: bool,
    },
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn run() -> Result<(), HtsError> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    match &cli.command {
        Some(Commands::Count {
            input,
            format,
            no_check_references,
        }) => {
            let output = htstream_count(input, format.as_deref(), !no_check_references)?;
            for issue in output.report().issues() {
                eprintln!("Note: {}", issue);
            }
            let count = output.value();
            println!("records\t{}", count.records);
            println!("bases\t{}", count.bases);
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
