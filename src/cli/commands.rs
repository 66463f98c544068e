//! CLI command implementations
//!
//! Commands are one-shot: load configuration, resolve the type description,
//! do the work, print a single JSON response.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use crate::config::CoreConfig;
use crate::observability::{metrics, Logger};
use crate::packer::{codec, Packer};
use crate::query::{Predicate, PredicateCompiler};
use crate::schema::{SchemaLoader, SchemaRegistry, TypeDescription};

use super::args::{Command, SchemaSource};
use super::errors::{CliError, CliResult};
use super::io::{read_input, write_error, write_response};

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    Logger::set_stderr_only(true);
    let config = load_config(cli.config.as_deref())?;
    run_command(cli.command, &config, cli.metrics)
}

/// Run the appropriate command and print its response on stdout
pub fn run_command(cmd: Command, config: &CoreConfig, with_metrics: bool) -> CliResult<()> {
    execute(cmd, config, with_metrics, &mut io::stdout())
}

/// Run a command and write its single response line to `out`.
///
/// Log lines are moved to stderr first, so `out` only ever holds the response.
pub fn execute<W: Write>(
    cmd: Command,
    config: &CoreConfig,
    with_metrics: bool,
    out: &mut W,
) -> CliResult<()> {
    Logger::set_stderr_only(true);

    let result = match cmd {
        Command::Pack {
            source,
            input,
            wire,
        } => read_input(&input).and_then(|doc| pack(config, &source, &doc, wire)),
        Command::Compile {
            source,
            predicate,
            raw,
        } => read_input(&predicate).and_then(|text| compile(config, &source, &text, raw)),
    };

    match result {
        Ok(mut data) => {
            if with_metrics {
                data["metrics"] = serde_json::to_value(metrics().snapshot())?;
            }
            write_response(out, data)
        }
        Err(err) => {
            write_error(out, err.code(), &err.to_string())?;
            Err(err)
        }
    }
}

/// Packs one JSON document and returns the packed record as JSON
pub fn pack(
    config: &CoreConfig,
    source: &SchemaSource,
    document: &str,
    wire: bool,
) -> CliResult<Value> {
    let description = resolve_description(config, source)?;
    let record = Packer::from_config(config).pack_json(document, &description)?;

    let mut data = json!({
        "global_key": record.global_key(),
        "record": serde_json::to_value(&record)?,
    });
    if wire {
        data["wire"] = Value::String(STANDARD.encode(codec::encode(&record)));
    }
    Ok(data)
}

/// Compiles one JSON predicate and returns the query tree
pub fn compile(
    config: &CoreConfig,
    source: &SchemaSource,
    predicate: &str,
    raw: bool,
) -> CliResult<Value> {
    let description = resolve_description(config, source)?;
    let predicate: Predicate = serde_json::from_str(predicate)?;

    let compiler = PredicateCompiler::new(&description);
    let query = if raw {
        compiler.compile_raw(&predicate)?
    } else {
        compiler.compile(&predicate)?
    };

    Ok(json!({
        "text": query.to_string(),
        "query": serde_json::to_value(&query)?,
    }))
}

fn load_config(path: Option<&Path>) -> CliResult<CoreConfig> {
    let config = match path {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    Logger::set_min_severity(config.log_level);
    Ok(config)
}

fn resolve_description(
    config: &CoreConfig,
    source: &SchemaSource,
) -> CliResult<Arc<TypeDescription>> {
    if let Some(path) = &source.schema {
        return Ok(Arc::new(SchemaLoader::load_file(path)?));
    }

    let type_name = source.type_name.as_deref().unwrap_or_default();
    let schema_dir = config.schema_dir.as_ref().ok_or(CliError::NoSchemaDir)?;

    let mut loader = SchemaLoader::new(schema_dir);
    loader.load_all()?;
    let registry = SchemaRegistry::new();
    loader.register_into(&registry)?;
    Ok(registry.description(type_name)?)
}
