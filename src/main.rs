//! blastmap CLI
//!
//! Usage: blastmap <command> [arguments]

mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use blastmap::config::Config;
use blastmap::framework::FrameworkKind;
use blastmap::graph::{export_graphs, CancelToken};
use blastmap::output::{generate_execution_id, output_json, ErrorResponse, OutputFormat};
use blastmap::registry::RepoRegistry;
use blastmap::{ChangeSpec, CodeIntelligence};

use cli::{Cli, Command, Target};

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = std::env::var("BLASTMAP_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("blastmap=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Cancel token tripped by SIGINT/SIGTERM.
fn shutdown_token() -> Result<CancelToken> {
    let shutdown = Arc::new(AtomicBool::new(false));

    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        use signal_hook::iterator::Signals;

        let flag = shutdown.clone();
        let mut signals = Signals::new([signal::SIGTERM, signal::SIGINT])?;
        std::thread::spawn(move || {
            if signals.forever().next().is_some() {
                tracing::warn!("shutdown requested, cancelling build");
                flag.store(true, Ordering::SeqCst);
            }
        });
    }

    Ok(CancelToken::from_flag(shutdown))
}

/// Registry holding a single directory analyzed directly.
fn single_root(config: &Config, root: &Path, framework: Option<&str>) -> Result<(CodeIntelligence, String)> {
    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "local".to_string());
    let framework: FrameworkKind = framework.unwrap_or("none").parse()?;
    let mut registry = RepoRegistry::new(config.analysis.clone());
    registry.register(name.clone(), root, framework);
    Ok((CodeIntelligence::new(registry), name))
}

/// Resolve the target repository and make sure it is built.
fn open_target(config: &Config, target: &Target, cancel: &CancelToken) -> Result<(CodeIntelligence, String)> {
    let (service, repo) = match (&target.root, &target.repo) {
        (Some(root), _) => single_root(config, root, target.framework.as_deref())?,
        (None, Some(repo)) => (CodeIntelligence::from_config(config)?, repo.clone()),
        (None, None) => {
            let mut names = config.repos.keys();
            match (names.next(), names.next()) {
                (Some(only), None) => (CodeIntelligence::from_config(config)?, only.clone()),
                _ => bail!("pass --root <DIR> or --repo <NAME> (configuration has {} repositories)", config.repos.len()),
            }
        }
    };
    service
        .ensure_built(&repo, cancel)
        .with_context(|| format!("failed to build repository '{}'", repo))?;
    Ok((service, repo))
}

fn emit<T: serde::Serialize>(
    format: OutputFormat,
    exec_id: &str,
    data: T,
    human: impl FnOnce(&T),
) -> Result<()> {
    match format {
        OutputFormat::Human => {
            human(&data);
            Ok(())
        }
        _ => output_json(data, format, exec_id),
    }
}

fn print_list(items: &[String]) {
    for item in items {
        println!("{}", item);
    }
}

fn run(cli: Cli, cancel: CancelToken) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let format = cli.output;
    let exec_id = generate_execution_id();

    match cli.command {
        Command::Build { target } => {
            let (service, repo) = open_target(&config, &target, &cancel)?;
            let snapshot = service
                .registry()
                .snapshot(&repo)
                .context("snapshot missing after build")?;
            let stats = snapshot.stats();
            let diagnostics = snapshot.diagnostics.clone();
            emit(
                format,
                &exec_id,
                serde_json::json!({ "repo": repo, "stats": stats, "diagnostics": diagnostics }),
                |_| {
                    println!("Built {} ({})", repo, snapshot.root.display());
                    println!(
                        "  files: {}  symbols: {}  routes: {}  di edges: {}  jobs: {}  skipped: {}",
                        stats.files, stats.symbols, stats.routes, stats.di_edges, stats.jobs, stats.skipped_files
                    );
                    for diagnostic in &diagnostics {
                        eprintln!("{}", diagnostic.format_stderr());
                    }
                },
            )
        }

        Command::Search { target, query, top_k } => {
            let (service, repo) = open_target(&config, &target, &cancel)?;
            let hits = service.search_code(&repo, &query, top_k)?;
            emit(format, &exec_id, hits, |hits| {
                for hit in hits {
                    println!("{:.1}  {}  {}:{}", hit.relevance, hit.symbol_id, hit.file, hit.line);
                }
            })
        }

        Command::Callers { target, symbol } => {
            let (service, repo) = open_target(&config, &target, &cancel)?;
            emit(format, &exec_id, service.callers(&repo, &symbol)?, |ids| print_list(ids))
        }

        Command::Callees { target, symbol } => {
            let (service, repo) = open_target(&config, &target, &cancel)?;
            emit(format, &exec_id, service.callees(&repo, &symbol)?, |ids| print_list(ids))
        }

        Command::Deps { target, symbol, depth } => {
            let (service, repo) = open_target(&config, &target, &cancel)?;
            let deps = service.list_dependencies(&repo, &symbol, depth)?;
            emit(format, &exec_id, deps, |deps| {
                for dep in deps {
                    match (&dep.file, dep.line) {
                        (Some(file), Some(line)) => println!("{}  {}:{}", dep.id, file, line),
                        _ => println!("{}", dep.id),
                    }
                }
            })
        }

        Command::Impact { target, seeds, depth } => {
            let (service, repo) = open_target(&config, &target, &cancel)?;
            let impact = service.impact_set(&repo, &seeds, depth)?;
            emit(format, &exec_id, impact, |impact| {
                let sections = [
                    ("symbols", &impact.symbols),
                    ("files", &impact.files),
                    ("routes", &impact.routes),
                    ("di consumers", &impact.di_consumers),
                ];
                for (title, items) in sections {
                    println!("{} ({})", title, items.len());
                    for item in items {
                        println!("  {}", item);
                    }
                }
            })
        }

        Command::Blast {
            text,
            seeds,
            repos,
            root,
            framework,
            depth,
            markdown,
        } => {
            let (service, mut repos) = match &root {
                Some(root) => {
                    let (service, name) = single_root(&config, root, framework.as_deref())?;
                    (service, vec![name])
                }
                None => (CodeIntelligence::from_config(&config)?, repos),
            };
            if repos.is_empty() {
                repos = service.registry().names().map(str::to_string).collect();
            }
            for repo in &repos {
                if !service.registry().contains(repo) {
                    continue;
                }
                if let Err(err) = service.ensure_built(repo, &cancel) {
                    tracing::warn!(repo = %repo, error = %err, "build failed, repository left out of analysis");
                }
            }

            let change = match text {
                Some(text) => ChangeSpec::Text(text),
                None => ChangeSpec::Symbols(seeds),
            };
            let report = service.impact_of(&change, &repos, depth);
            if markdown {
                println!("{}", report.blast_radius.to_markdown());
                return Ok(());
            }
            emit(format, &exec_id, report, |report| {
                println!("{}", report.blast_radius.to_markdown());
                if !report.recommendations.is_empty() {
                    println!("### Recommendations");
                    for recommendation in &report.recommendations {
                        println!("- {}", recommendation);
                    }
                }
            })
        }

        Command::Export { target, out } => {
            let (service, repo) = open_target(&config, &target, &cancel)?;
            let snapshot = service
                .registry()
                .snapshot(&repo)
                .context("snapshot missing after build")?;
            export_graphs(&snapshot, &out).with_context(|| format!("failed to export to {}", out.display()))?;
            emit(
                format,
                &exec_id,
                serde_json::json!({ "repo": repo, "out": out }),
                |_| println!("Exported {} to {}", repo, out.display()),
            )
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let format = cli.output;

    let cancel = match shutdown_token() {
        Ok(cancel) => cancel,
        Err(err) => {
            eprintln!("Error: cannot install signal handlers: {:#}", err);
            return ExitCode::FAILURE;
        }
    };

    match run(cli, cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match format {
                OutputFormat::Human => eprintln!("Error: {:#}", err),
                _ => {
                    let response = ErrorResponse {
                        error: "command_failed".to_string(),
                        message: format!("{:#}", err),
                    };
                    if let Err(print_err) = output_json(response, format, &generate_execution_id()) {
                        eprintln!("Error: {:#} ({})", err, print_err);
                    }
                }
            }
            ExitCode::FAILURE
        }
    }
}
