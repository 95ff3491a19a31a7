//! Phloem CLI - load and run pipeline definitions.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use phloem_core::{ExecutionEngine, ExecutorRegistry, Pipeline, SignatureRegistry};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phloem")]
#[command(about = "Declarative data pipeline runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline definition
    Run {
        /// Pipeline definition file (YAML, TOML, or JSON)
        definition: PathBuf,
        /// Runtime parameter entry, repeatable
        #[arg(short = 'e', long = "env", value_name = "NAME=value")]
        env: Vec<String>,
    },

    /// List available block types
    List,
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let mut signatures = SignatureRegistry::new();
    phloem_std::register_signatures(&mut signatures);
    phloem_tabular::register_signatures(&mut signatures);

    let mut executors = ExecutorRegistry::new();
    phloem_std::register_all(&mut executors);
    phloem_tabular::register_all(&mut executors);

    match cli.command {
        Commands::Run { definition, env } => cmd_run(&signatures, &executors, &definition, &env),
        Commands::List => {
            cmd_list(&signatures);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_run(
    signatures: &SignatureRegistry,
    executors: &ExecutorRegistry,
    definition: &Path,
    env_entries: &[String],
) -> Result<ExitCode> {
    let env = parse_env_entries(env_entries)?;

    let data = std::fs::read(definition)
        .with_context(|| format!("failed to read {}", definition.display()))?;
    let pipeline = Pipeline::from_bytes(&data, definition.to_str())?;

    let engine = ExecutionEngine::new(signatures, executors);
    let result = engine.run(&pipeline, &env);

    for diagnostic in &result.diagnostics {
        eprintln!("{}: {}", diagnostic.severity, diagnostic.message);
    }

    if result.successful {
        println!("Pipeline {} finished successfully", pipeline.name);
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Pipeline {} failed", pipeline.name);
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_list(signatures: &SignatureRegistry) {
    println!("Available block types:\n");

    for signature in signatures.iter() {
        println!("  {}", signature.name);
        println!("    input:  {}", signature.input);
        println!("    output: {}", signature.output);
        for (name, spec) in &signature.properties {
            let required = if spec.required { "required" } else { "optional" };
            println!("    property {}: {} ({})", name, spec.valuetype, required);
        }
        println!();
    }

    println!("Total: {} block types", signatures.len());
}

/// Parse `-e NAME=value` entries into the runtime environment map. Keys
/// must be distinct.
fn parse_env_entries(entries: &[String]) -> Result<IndexMap<String, String>> {
    let mut env = IndexMap::new();
    for entry in entries {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("invalid runtime parameter entry {entry:?}, expected NAME=value");
        };
        if env.insert(key.to_string(), value.to_string()).is_some() {
            bail!("duplicate runtime parameter {key:?}");
        }
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_entries() {
        let env = parse_env_entries(&["TABLE=cars".into(), "PORT=42".into()]).unwrap();
        assert_eq!(env.get("TABLE").map(String::as_str), Some("cars"));
        assert_eq!(env.get("PORT").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let env = parse_env_entries(&["QUERY=a=b".into()]).unwrap();
        assert_eq!(env.get("QUERY").map(String::as_str), Some("a=b"));
    }

    #[test]
    fn test_entry_without_separator_is_rejected() {
        assert!(parse_env_entries(&["TABLE".into()]).is_err());
    }

    #[test]
    fn test_duplicate_keys_are_rejected() {
        assert!(parse_env_entries(&["A=1".into(), "A=2".into()]).is_err());
    }
}
