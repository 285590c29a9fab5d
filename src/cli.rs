//! `stone`: compile `.stone` files and emit graphs, descriptors or JSON Schema.
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::config::{StoneConfig, load_config};
use crate::ir::SchemaGraph;
use crate::module::Module;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile Stone schema definitions into resolved graphs, message descriptors or JSON Schema
#[derive(Parser, Debug)]
#[command(name = "stone", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,

    /// log resolver and registry activity
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile inputs and print a summary
    Check(CheckOut),
    /// print the resolved graph as JSON
    Graph(GraphOut),
    /// emit message descriptors
    Proto(ProtoOut),
    /// emit JSON Schema for one schema
    JsonSchema(JsonSchemaOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more inputs. May be literal paths or quoted glob patterns; falls
    /// back to `input` in the config file
    #[arg(long, short, num_args = 1..)]
    input: Vec<String>,

    /// config file (defaults to ./stone.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// also bind this schema as a module (requires a primary key)
    #[arg(long)]
    bind: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct GraphOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ProtoOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// only this schema (every schema if omitted)
    #[arg(long)]
    schema: Option<String>,

    /// proto package; overrides `[proto] package`
    #[arg(long)]
    package: Option<String>,

    /// output .proto file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct JsonSchemaOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema to render
    #[arg(long)]
    schema: String,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

struct Compiled {
    path: PathBuf,
    graph: SchemaGraph,
}

impl InputSettings {
    /// Every input file is its own compilation unit.
    fn load_process(&self) -> anyhow::Result<(StoneConfig, Vec<Compiled>)> {
        let config = load_config(self.config.as_deref())?;
        let patterns = if self.input.is_empty() { &config.input } else { &self.input };
        if patterns.is_empty() {
            bail!("no inputs: pass --input or set `input` in the config file");
        }
        let source_paths = resolve_file_path_patterns(patterns)?;

        let mut units = Vec::with_capacity(source_paths.len());
        for source_path in source_paths {
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {}", source_path.display()))?;
            let graph = crate::compile(&source)
                .with_context(|| format!("failed to compile {}", source_path.display()))?;
            tracing::info!(
                path = %source_path.display(),
                types = graph.types.len(),
                schemas = graph.schemas.len(),
                "compiled"
            );
            units.push(Compiled { path: source_path, graph });
        }
        Ok((config, units))
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Check(target) => {
                let (_, units) = target.input_settings.load_process()?;
                for unit in &units {
                    println!(
                        "{} {} ({} types, {} schemas)",
                        "ok".green().bold(),
                        unit.path.display(),
                        unit.graph.types.len(),
                        unit.graph.schemas.len()
                    );
                }
                if let Some(name) = target.bind.as_ref() {
                    let graph = find_schema(&units, name)?;
                    let module = Module::bind(graph, name)?;
                    println!(
                        "{} module {} (primary key `{}`)",
                        "ok".green().bold(),
                        module.name(),
                        module.primary_key()
                    );
                }
            }
            Command::Graph(target) => {
                let (config, units) = target.input_settings.load_process()?;
                let graphs: Vec<&SchemaGraph> = units.iter().map(|u| &u.graph).collect();
                let src = match graphs.as_slice() {
                    [only] => serde_json::to_string_pretty(only)?,
                    _ => serde_json::to_string_pretty(&graphs)?,
                };
                write_output(target.out.as_deref(), &config, &src)?;
            }
            Command::Proto(target) => {
                let (config, units) = target.input_settings.load_process()?;
                let package = target.package.as_deref().or(config.proto.package.as_deref());
                let mut src = String::new();
                match target.schema.as_ref() {
                    Some(name) => {
                        src.push_str(&crate::codegen::emit_descriptor(find_schema(&units, name)?, name)?);
                    }
                    None => {
                        for unit in &units {
                            if config.proto.syntax_header {
                                src.push_str(&crate::codegen::emit_descriptor_file(&unit.graph, package)?);
                            } else {
                                for name in unit.graph.schemas.keys() {
                                    src.push_str(&crate::codegen::emit_descriptor(&unit.graph, name)?);
                                }
                            }
                        }
                    }
                }
                write_output(target.out.as_deref(), &config, &src)?;
            }
            Command::JsonSchema(target) => {
                let (config, units) = target.input_settings.load_process()?;
                let graph = find_schema(&units, &target.schema)?;
                let schema = crate::codegen::json_schema(graph, &target.schema)?;
                let src = serde_json::to_string_pretty(&schema)?;
                write_output(target.out.as_deref(), &config, &src)?;
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn find_schema<'a>(units: &'a [Compiled], name: &str) -> anyhow::Result<&'a SchemaGraph> {
    units
        .iter()
        .map(|u| &u.graph)
        .find(|g| g.schemas.contains_key(name))
        .ok_or_else(|| crate::error::CompileError::UnknownSchema { name: name.to_string() }.into())
}

/// Relative `--out` paths land under `out_dir` when the config sets one.
fn write_output(out: Option<&Path>, config: &StoneConfig, src: &str) -> anyhow::Result<()> {
    let Some(out) = out else {
        println!("{src}");
        return Ok(());
    };
    let out = match config.out_dir.as_ref() {
        Some(dir) if out.is_relative() => dir.join(out),
        _ => out.to_path_buf(),
    };
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&out, src).with_context(|| format!("writing {}", out.display()))?;
    tracing::info!(path = %out.display(), bytes = src.len(), "wrote output");
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_paths_pass_through_and_globs_expand() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.stone", "b.stone", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let pattern = format!("{}/*.stone", dir.path().display());
        let paths = resolve_file_path_patterns([pattern.as_str(), "literal.stone"]).unwrap();
        assert_eq!(paths.len(), 3);
        assert!(paths[0].ends_with("a.stone"));
        assert!(paths[1].ends_with("b.stone"));
        assert_eq!(paths[2], PathBuf::from("literal.stone"));
    }

    #[test]
    fn empty_glob_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/*.stone", dir.path().display());
        assert!(resolve_file_path_patterns([pattern]).is_err());
    }

    #[test]
    fn parses_subcommands() {
        let cli = CommandLineInterface::try_parse_from(["stone", "proto", "-i", "a.stone", "--package", "x.v1", "-v"])
            .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.cmd, Command::Proto(ProtoOut { package: Some(_), .. })));
    }
}
