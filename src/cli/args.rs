//! CLI argument definitions using clap
//!
//! Commands:
//! - keyquery pack --schema <path> --input <path>
//! - keyquery compile --schema <path> --predicate <path>
//!
//! `--type <name>` may replace `--schema`; the description is then looked up
//! in the configured `schema_dir`. An input path of `-` reads stdin.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// keyquery - pack documents and compile predicates against type schemas
#[derive(Parser, Debug)]
#[command(name = "keyquery")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Add the process counters to the response
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// How the type description is found
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SchemaSource {
    /// Path to a JSON type description
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Full type name, resolved in the configured schema directory
    #[arg(long = "type")]
    pub type_name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pack a JSON document and print the packed record
    Pack {
        #[command(flatten)]
        source: SchemaSource,

        /// Path to the JSON document, `-` for stdin
        #[arg(long, default_value = "-")]
        input: PathBuf,

        /// Also print the binary wire form, base64 encoded
        #[arg(long)]
        wire: bool,
    },

    /// Compile a JSON predicate and print the query tree
    Compile {
        #[command(flatten)]
        source: SchemaSource,

        /// Path to the JSON predicate, `-` for stdin
        #[arg(long, default_value = "-")]
        predicate: PathBuf,

        /// Skip the range-merge pass
        #[arg(long)]
        raw: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
