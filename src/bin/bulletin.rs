use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bulletin::catalog::Template;
use bulletin::document::{parse_yaml, to_yaml};
use bulletin::{
    convert, expand, Catalog, DecoratorTemplate, LocalStore, Overrides, Pipeline, Reporter,
    Settings, StderrReporter, StepTemplate,
};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(name = "bulletin")]
#[command(about = "Compose Concourse pipelines from reusable steps, decorators and job skeletons")]
struct CliOptions {
    /// Pipeline or bulletin YAML file to read (stdin when omitted)
    #[arg(long = "pipeline", short = 'p', global = true)]
    pipeline: Option<PathBuf>,

    /// Folder holding the local step, decorator and resource catalogs
    #[arg(long = "target", short = 't', global = true)]
    target: Option<PathBuf>,

    /// Minimum level of the log lines written to stderr
    #[arg(long = "log-level", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Expand a bulletin document into Concourse jobs
    Expand,
    /// Record the resources and resource types of a Concourse pipeline in the local catalogs
    Convert,
    /// Update the pipeline with the given files; later files win
    Update {
        files: Vec<PathBuf>,

        /// Write the updated pipeline here instead of stdout
        #[arg(long = "destination", short = 'd')]
        destination: Option<PathBuf>,
    },
    /// Print entities of a pipeline, or of the local catalogs for steps and decorators
    List {
        #[arg(value_enum)]
        entity: Entity,

        /// Only print the entity with this name
        #[arg(long = "name")]
        name: Option<String>,

        /// Only print the resource (type) of this type
        #[arg(long = "type")]
        kind: Option<String>,

        /// Print names only
        #[arg(long = "names", short = 'n', action = ArgAction::SetTrue)]
        names: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Entity {
    Jobs,
    Resources,
    ResourceTypes,
    Groups,
    Steps,
    Decorators,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = CliOptions::parse();
    let settings = Settings::from_env(&Overrides {
        target: opts.target.clone(),
        log_level: opts.log_level.clone(),
    })?;
    let reporter = StderrReporter::new(settings.log_level)
        .with_tag("target", settings.target.display().to_string());
    let store = LocalStore::open(&settings.target);

    match &opts.command {
        Command::Expand => {
            let doc = parse_yaml(&read_input(opts.pipeline.as_deref())?)?;
            let steps = store.load_steps()?;
            let decorators = store.load_decorators()?;
            let jobs = expand(&doc, &steps, &decorators, &reporter)?;
            print!("{}", to_yaml(&jobs)?);
        }
        Command::Convert => {
            let Some(path) = opts.pipeline.as_deref() else {
                reporter.warn("convert needs --pipeline, nothing to do", None);
                return Ok(());
            };
            let added = convert(&read_input(Some(path))?, &store, &reporter)?;
            reporter.info("pipeline converted", Some(json!({ "added": added })));
        }
        Command::Update { files, destination } => {
            let mut pipeline = Pipeline::from_yaml(&read_input(opts.pipeline.as_deref())?)?;
            for file in files {
                let update = Pipeline::from_yaml(&read_input(Some(file))?)
                    .with_context(|| format!("invalid pipeline: {}", file.display()))?;
                pipeline.update_with(&update, &reporter)?;
            }
            let rendered = pipeline.to_yaml()?;
            match destination {
                Some(path) => fs::write(path, rendered)
                    .with_context(|| format!("unable to write file: {}", path.display()))?,
                None => print!("{rendered}"),
            }
        }
        Command::List {
            entity,
            name,
            kind,
            names,
        } => {
            let filter = Filter {
                name: name.as_deref(),
                kind: kind.as_deref(),
                names_only: *names,
            };
            list(*entity, &filter, opts.pipeline.as_deref(), &store, &reporter)?;
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("unable to read file: {}", path.display())),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("unable to read stdin")?;
            Ok(buffer)
        }
    }
}

struct Filter<'a> {
    name: Option<&'a str>,
    kind: Option<&'a str>,
    names_only: bool,
}

impl Filter<'_> {
    fn print<T: Serialize>(&self, items: &[T]) -> Result<()> {
        for item in items {
            let doc = serde_json::to_value(item)?;
            let name = doc.get("name").and_then(Value::as_str).unwrap_or_default();
            let kind = doc.get("type").and_then(Value::as_str);
            if self.name.is_some_and(|wanted| wanted != name) {
                continue;
            }
            if self.kind.is_some() && self.kind != kind {
                continue;
            }
            if self.names_only {
                println!("{name}");
            } else {
                print!("{}", to_yaml(&doc)?);
            }
        }
        Ok(())
    }
}

fn list(
    entity: Entity,
    filter: &Filter<'_>,
    pipeline: Option<&Path>,
    store: &LocalStore,
    reporter: &dyn Reporter,
) -> Result<()> {
    match entity {
        Entity::Steps => match pipeline {
            Some(path) => list_catalog(filter, &catalog_from::<StepTemplate>(path)?),
            None => list_catalog(filter, &store.load_steps()?),
        },
        Entity::Decorators => match pipeline {
            Some(path) => list_catalog(filter, &catalog_from::<DecoratorTemplate>(path)?),
            None => list_catalog(filter, &store.load_decorators()?),
        },
        _ => {
            let parsed = Pipeline::from_yaml(&read_input(pipeline)?)?;
            reporter.debug(
                "pipeline loaded",
                Some(json!({
                    "jobs": parsed.jobs.len(),
                    "resources": parsed.resources.len(),
                })),
            );
            match entity {
                Entity::Jobs => filter.print(&parsed.jobs),
                Entity::Resources => filter.print(&parsed.resources),
                Entity::ResourceTypes => filter.print(&parsed.resource_types),
                _ => filter.print(&parsed.groups),
            }
        }
    }
}

fn catalog_from<T: Template>(path: &Path) -> Result<Catalog<T>> {
    Catalog::from_document(&parse_yaml(&read_input(Some(path))?)?)
        .with_context(|| format!("invalid catalog: {}", path.display()))
}

fn list_catalog<T: Template>(filter: &Filter<'_>, catalog: &Catalog<T>) -> Result<()> {
    filter.print(catalog.entries())
}
