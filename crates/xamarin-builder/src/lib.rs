//! # xamarin-builder
//!
//! Command-line front end of [`xamarin_builder_sdk`]: builds every mobile
//! project of a Xamarin solution for one configuration/platform pair and
//! reports the artifacts the build produced.
//!
//! ## Commands
//!
//! - **`build`** - Build the solution and list the located artifacts
//! - **`clean`** - Remove the `bin`/`obj` directories of the selected projects
//! - **`version`** - Print the tool version (`raw`, `json` or `yml`)
//!
//! ## Quick Start
//!
//! ```bash
//! xamarin-builder build --path App.sln --configuration Release --platform iPhone
//!
//! # Only Android projects, with a JSON summary
//! xamarin-builder build --path App.sln --configuration Release --platform "Any CPU" \
//!     --project-type android --output target/xamarin-builder/summary.json
//! ```
//!
//! ## CLI Flags
//!
//! Global flags available on all commands:
//!
//! - **`--verbose` / `-v`** - Enable debug logging, including every planned command
//!
//! ## Modules
//!
//! - [`config`] - Configuration file support for `xamarin-builder.toml`
//! - [`logging`] - `tracing` subscriber setup

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::SystemTime;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};
use xamarin_builder_sdk::{BuildEvent, Builder, ProjectOutputMap, ProjectType};

pub mod config;
pub mod logging;

/// Builds Xamarin solutions with mdtool or xbuild and collects their artifacts.
#[derive(Parser, Debug)]
#[command(name = "xamarin-builder", author, version, about = "Xamarin build orchestrator", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build every buildable project of a solution and list its artifacts.
    Build {
        #[arg(long, help = "Path to the .sln file")]
        path: PathBuf,
        #[arg(long, help = "Solution configuration, e.g. Release")]
        configuration: String,
        #[arg(long, help = "Solution platform, e.g. iPhone or \"Any CPU\"")]
        platform: String,
        #[arg(long, help = "Build Apple projects with mdtool instead of xbuild")]
        force_mdtool: bool,
        #[arg(
            long = "project-type",
            help = "Only build projects of this type (ios, tvos, macos, android); repeatable"
        )]
        project_types: Vec<ProjectType>,
        #[arg(long, help = "Optional path to config file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Optional output path for a JSON build summary")]
        output: Option<PathBuf>,
    },
    /// Remove bin/obj of every selected project.
    Clean {
        #[arg(long, help = "Path to the .sln file")]
        path: PathBuf,
        #[arg(long = "project-type", help = "Only clean projects of this type; repeatable")]
        project_types: Vec<ProjectType>,
        #[arg(long, help = "Optional path to config file")]
        config: Option<PathBuf>,
    },
    /// Print the version.
    Version {
        #[arg(long, value_enum, default_value = "raw")]
        format: VersionFormat,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
#[clap(rename_all = "lowercase")]
enum VersionFormat {
    Raw,
    Json,
    Yml,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: &'static str,
    sdk_version: &'static str,
}

/// JSON summary written by `build --output`.
#[derive(Debug, Serialize)]
struct BuildSummary<'a> {
    solution: &'a Path,
    configuration: &'a str,
    platform: &'a str,
    started_at: String,
    finished_at: String,
    warnings: &'a [String],
    outputs: &'a ProjectOutputMap,
}

pub fn run() -> Result<()> {
    load_dotenv();
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Build {
            path,
            configuration,
            platform,
            force_mdtool,
            project_types,
            config,
            output,
        } => cmd_build(
            &path,
            &configuration,
            &platform,
            force_mdtool,
            project_types,
            config.as_deref(),
            output.as_deref(),
        ),
        Command::Clean {
            path,
            project_types,
            config,
        } => cmd_clean(&path, project_types, config.as_deref()),
        Command::Version { format } => {
            println!("{}", render_version(format)?);
            Ok(())
        }
    }
}

fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env file: {}", e);
        }
    }
}

fn load_builder(
    path: &Path,
    cli_project_types: Vec<ProjectType>,
    force_mdtool: bool,
    config: Option<&Path>,
) -> Result<Builder> {
    let resolver = config::ConfigResolver::new(config)?;
    if let Some(config_path) = &resolver.config_path {
        info!("Using config file: {:?}", config_path);
    }

    let project_types = resolver.project_types(cli_project_types);
    let builder = Builder::new(path, project_types, resolver.force_mdtool(force_mdtool))
        .with_context(|| format!("Failed to load solution {:?}", path))?
        .with_toolchain(resolver.toolchain())
        .with_custom_options(resolver.custom_options());
    debug!(
        "solution {} with {} projects",
        builder.solution().id,
        builder.solution().len()
    );
    Ok(builder)
}

fn cmd_build(
    path: &Path,
    configuration: &str,
    platform: &str,
    force_mdtool: bool,
    project_types: Vec<ProjectType>,
    config: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    let builder = load_builder(path, project_types, force_mdtool, config)?;
    if builder.project_types().is_empty() {
        println!("Building {} ({}|{})", path.display(), configuration, platform);
    } else {
        let types: Vec<_> = builder.project_types().iter().map(|t| t.as_str()).collect();
        println!(
            "Building {} ({}|{}), project types: {}",
            path.display(),
            configuration,
            platform,
            types.join(", ")
        );
    }

    let (tx, rx) = mpsc::channel();
    let printer = thread::spawn(move || {
        for event in rx {
            print_event(&event);
        }
    });
    let outcome = builder.build_all_projects(configuration, platform, Some(&tx));
    drop(tx);
    if printer.join().is_err() {
        warn!("event printer panicked");
    }

    for warning in &outcome.warnings {
        println!("Warning: {}", warning);
    }
    let window = outcome.result.context("Build failed")?;
    println!(
        "Build window: {} - {}",
        format_time(window.start)?,
        format_time(window.end)?
    );

    let (outputs, output_warnings) = builder
        .collect_outputs(configuration, platform, window)
        .context("Failed to collect build outputs")?;
    for warning in &output_warnings {
        println!("Warning: {}", warning);
    }
    print_outputs(&outputs);

    if let Some(output) = output {
        let mut warnings = outcome.warnings.clone();
        warnings.extend(output_warnings);
        let summary = BuildSummary {
            solution: path,
            configuration,
            platform,
            started_at: format_time(window.start)?,
            finished_at: format_time(window.end)?,
            warnings: &warnings,
            outputs: &outputs,
        };
        write_summary(output, &summary)?;
        println!("JSON summary written to {:?}", output);
    }

    Ok(())
}

fn cmd_clean(path: &Path, project_types: Vec<ProjectType>, config: Option<&Path>) -> Result<()> {
    let builder = load_builder(path, project_types, false, config)?;

    let (tx, rx) = mpsc::channel();
    let removed = builder.clean_all(Some(&tx))?;
    drop(tx);
    for event in rx {
        print_event(&event);
    }

    if removed.is_empty() {
        println!("Nothing to clean");
    }
    Ok(())
}

fn print_event(event: &BuildEvent) {
    match event {
        BuildEvent::Command {
            command,
            already_performed: false,
            ..
        } => {
            println!();
            println!("$ {}", command);
        }
        BuildEvent::Command {
            command,
            already_performed: true,
            ..
        } => {
            println!();
            println!("$ {} (already performed)", command);
        }
        BuildEvent::Clean { project, dir } => {
            println!("Removed {} ({})", dir.display(), project);
        }
    }
}

fn print_outputs(outputs: &ProjectOutputMap) {
    if outputs.is_empty() {
        println!("No outputs found");
        return;
    }
    println!("Outputs:");
    for (project, output) in outputs {
        println!("  {} ({})", project, output.project_type);
        for artifact in &output.outputs {
            println!("    {}: {}", artifact.kind, artifact.path.display());
        }
    }
}

fn format_time(time: SystemTime) -> Result<String> {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .context("Failed to format timestamp")
}

fn write_summary(path: &Path, summary: &BuildSummary<'_>) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
    }
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    fs::write(path, json).with_context(|| format!("Failed to write summary {:?}", path))?;
    Ok(())
}

fn render_version(format: VersionFormat) -> Result<String> {
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        sdk_version: xamarin_builder_sdk::VERSION,
    };
    let rendered = match format {
        VersionFormat::Raw => info.version.to_string(),
        VersionFormat::Json => serde_json::to_string(&info)?,
        VersionFormat::Yml => serde_yaml::to_string(&info)?.trim_end().to_string(),
    };
    if rendered.is_empty() {
        bail!("empty version string");
    }
    Ok(rendered)
}
