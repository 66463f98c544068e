//! CLI module for keyquery
//!
//! Provides command-line access to:
//! - pack: Pack a JSON document against a type description
//! - compile: Compile a JSON predicate into an optimized query tree

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, SchemaSource};
pub use commands::{compile, execute, pack, run, run_command};
pub use errors::{CliError, CliResult};
pub use io::{read_input, write_error, write_response};
