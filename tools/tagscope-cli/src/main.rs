use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tagscope_core::{RecordValue, Value};
use tagscope_engine::{
    calculate_diff_values, field_names_of, inject_variables, merge_value, parse_typed_value,
    set_query_fields_value, value_at, MergeMode,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "tagscope")]
#[command(about = "Tagscope CLI - Inspect, diff and merge tagged JSON records")]
#[command(version = tagscope_core::VERSION)]
struct Cli {
    /// Tag namespace JSON fields are named under
    #[arg(long, global = true)]
    tag: Option<String>,
    /// Indent JSON output
    #[arg(long, global = true)]
    pretty: bool,
    /// Log filter, e.g. `tagscope_engine=debug`
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Coerce raw strings into typed values
    Parse {
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Show field-level changes between two JSON documents
    Diff { before: PathBuf, after: PathBuf },
    /// Fill a document from its ancestors, first ancestor wins
    Merge {
        output: PathBuf,
        #[arg(required = true)]
        ancestors: Vec<PathBuf>,
        /// Replace populated fields instead of only filling empty ones
        #[arg(long)]
        overwrite: bool,
    },
    /// Flatten a document into query parameters
    Flatten { file: PathBuf },
    /// List the dotted field names of a document
    Names { file: PathBuf },
    /// Print the value at a dotted path
    Get { file: PathBuf, path: String },
    /// Substitute `${name}` variables into a template
    Inject {
        template: String,
        /// Variable as `name=value`; values are coerced like `parse`
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CliConfig::from_env()
        .context("Failed to read TAGSCOPE_* environment")?
        .with_overrides(cli.tag.clone(), cli.pretty, cli.log.clone());

    init_tracing(&config, cli.log.is_some());
    debug!(?config, "configuration loaded");

    let output = run(cli.command, &config).await?;
    println!("{}", output);
    Ok(())
}

/// `--log` beats `RUST_LOG`, which beats `TAGSCOPE_LOG`.
fn init_tracing(config: &CliConfig, explicit: bool) {
    let filter = if explicit {
        EnvFilter::new(&config.log)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, config: &CliConfig) -> anyhow::Result<String> {
    match command {
        Commands::Parse { values } => Ok(handle_parse(&values)),
        Commands::Diff { before, after } => {
            let before = load_document(&before, &config.tag).await?;
            let after = load_document(&after, &config.tag).await?;
            let diff = calculate_diff_values(&before, &after, &config.tag)?;
            info!(changes = diff.len(), "diff calculated");
            render_json(&serde_json::to_value(diff)?, config.pretty)
        }
        Commands::Merge {
            output,
            ancestors,
            overwrite,
        } => {
            let mut merged = load_document(&output, &config.tag).await?;
            let mut loaded = Vec::with_capacity(ancestors.len());
            for path in &ancestors {
                loaded.push(load_document(path, &config.tag).await?);
            }
            let refs: Vec<&Value> = loaded.iter().collect();
            let mode = if overwrite {
                MergeMode::Overwrite
            } else {
                MergeMode::Inherit
            };
            merge_value(&mut merged, &refs, &config.tag, mode)?;
            render_json(&merged.to_json(), config.pretty)
        }
        Commands::Flatten { file } => {
            let document = load_document(&file, &config.tag).await?;
            let mut fields = HashMap::new();
            let mut all = String::new();
            set_query_fields_value(&document, &mut fields, &mut all, &config.tag)?;

            let fields: BTreeMap<String, String> = fields.into_iter().collect();
            let mut json = serde_json::Map::new();
            json.insert("all".to_string(), serde_json::Value::String(all));
            json.insert("fields".to_string(), serde_json::to_value(fields)?);
            render_json(&serde_json::Value::Object(json), config.pretty)
        }
        Commands::Names { file } => {
            let document = load_document(&file, &config.tag).await?;
            let record = document
                .as_record()
                .ok_or_else(|| anyhow!("{} is not a JSON object", file.display()))?;
            Ok(field_names_of(record, &config.tag).join("\n"))
        }
        Commands::Get { file, path } => {
            let document = load_document(&file, &config.tag).await?;
            let value = value_at(&document, &path)
                .ok_or_else(|| anyhow!("No value at '{}' in {}", path, file.display()))?;
            render_json(&value.to_json(), config.pretty)
        }
        Commands::Inject { template, vars } => {
            let variables: HashMap<String, Value> = vars
                .into_iter()
                .map(|(name, raw)| {
                    let value = parse_typed_value(&raw).unwrap_or(Value::String(raw));
                    (name, value)
                })
                .collect();
            Ok(inject_variables(&template, &variables)?.to_string())
        }
    }
}

fn handle_parse(values: &[String]) -> String {
    values
        .iter()
        .map(|raw| match parse_typed_value(raw) {
            Some(value) => format!("{:<10} {}", value.kind().as_str(), value),
            None => format!("{:<10} {:?}", "empty", raw),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads a JSON object into a record named after the file stem.
async fn load_document(path: &Path, tag: &str) -> anyhow::Result<Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    document_from_str(&raw, path, tag)
}

fn document_from_str(raw: &str, path: &Path, tag: &str) -> anyhow::Result<Value> {
    let json: serde_json::Value = serde_json::from_str(raw)
        .with_context(|| format!("Failed to parse {} as JSON", path.display()))?;
    let serde_json::Value::Object(object) = json else {
        bail!("{} must contain a JSON object", path.display());
    };

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    Ok(Value::Record(RecordValue::from_json(name, object, tag)))
}

fn render_json(json: &serde_json::Value, pretty: bool) -> anyhow::Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(json)?
    } else {
        serde_json::to_string(json)?
    };
    Ok(rendered)
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    if name.is_empty() {
        return Err(format!("variable name missing in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    fn document(raw: &str) -> Value {
        document_from_str(raw, Path::new("doc.json"), "api").unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("port=8080"),
            Ok(("port".to_string(), "8080".to_string()))
        );
        assert_eq!(
            parse_var("url=a=b"),
            Ok(("url".to_string(), "a=b".to_string()))
        );
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=1").is_err());
    }

    #[test]
    fn test_handle_parse_reports_kinds() {
        let output = handle_parse(&["42".to_string(), "true".to_string(), "".to_string()]);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "int        42");
        assert_eq!(lines[1], "bool       true");
        assert_eq!(lines[2], "empty      \"\"");
    }

    #[test]
    fn test_document_must_be_an_object() {
        assert!(document_from_str("[1, 2]", Path::new("list.json"), "api").is_err());
        assert!(document_from_str("{not json", Path::new("bad.json"), "api").is_err());
    }

    #[test]
    fn test_document_fields_are_tagged() {
        let doc = document(r#"{"name": "alpha", "owner": {"id": 7}}"#);
        let record = doc.as_record().unwrap();
        assert_eq!(record.name(), "doc");
        assert_eq!(field_names_of(record, "api"), vec!["name", "owner", "owner.id"]);
    }

    #[tokio::test]
    async fn test_inject_coerces_variables() {
        let config = CliConfig::default();
        let output = run(
            Commands::Inject {
                template: "${host}:${port}".to_string(),
                vars: vec![
                    ("host".to_string(), "localhost".to_string()),
                    ("port".to_string(), "8080".to_string()),
                ],
            },
            &config,
        )
        .await
        .unwrap();
        assert_eq!(output, "localhost:8080");
    }

    #[tokio::test]
    async fn test_parse_command() {
        let output = run(
            Commands::Parse {
                values: vec!["1.234.567,5".to_string()],
            },
            &CliConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(output, "float      1234567.5");
    }
}
