//! CLI argument parsing for blastmap

use blastmap::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Code-graph construction and blast-radius analysis.
#[derive(Debug, Parser)]
#[command(name = "blastmap", version, about)]
pub struct Cli {
    /// Configuration file (default: ./blastmap.toml if present)
    #[arg(long, global = true, env = "BLASTMAP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format: human, json or pretty
    #[arg(long, global = true, default_value = "human")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Which repository a command works on.
///
/// `--root` analyzes a directory directly; `--repo` names a repository
/// from the configuration. With neither, a configuration holding exactly
/// one repository selects it.
#[derive(Debug, Clone, Default, Args)]
pub struct Target {
    /// Repository root to analyze directly
    #[arg(long, conflicts_with = "repo")]
    pub root: Option<PathBuf>,

    /// Framework tag for --root (none, nextjs, nestjs, ...)
    #[arg(long, requires = "root")]
    pub framework: Option<String>,

    /// Repository name from the configuration
    #[arg(long)]
    pub repo: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the graphs and report counts and diagnostics
    Build {
        #[command(flatten)]
        target: Target,
    },

    /// Search symbols by name
    Search {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },

    /// Direct callers of a symbol
    Callers {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        symbol: String,
    },

    /// Direct callees of a symbol
    Callees {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        symbol: String,
    },

    /// Transitive dependencies of a symbol
    Deps {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Raw impact set of seed symbols
    Impact {
        #[command(flatten)]
        target: Target,
        /// Seed symbol id (repeatable)
        #[arg(long = "seed", required = true)]
        seeds: Vec<String>,
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Blast radius and recommendations across repositories
    Blast {
        /// Feature description; seeds come from keyword matches
        #[arg(long, conflicts_with = "seeds", required_unless_present = "seeds")]
        text: Option<String>,
        /// Seed symbol id (repeatable)
        #[arg(long = "seed")]
        seeds: Vec<String>,
        /// Repository to analyze (repeatable; default: all configured)
        #[arg(long = "repo")]
        repos: Vec<String>,
        /// Analyze a single directory instead of configured repositories
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long, requires = "root")]
        framework: Option<String>,
        #[arg(long)]
        depth: Option<usize>,
        /// Print the markdown summary instead of the report
        #[arg(long)]
        markdown: bool,
    },

    /// Write node-link JSON for every graph
    Export {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        out: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_impact() {
        let cli = Cli::try_parse_from([
            "blastmap", "impact", "--root", "repo", "--seed", "a.py::f", "--seed", "a.py::g", "--output", "json",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Command::Impact { target, seeds, depth } => {
                assert_eq!(target.root, Some(PathBuf::from("repo")));
                assert_eq!(seeds, vec!["a.py::f", "a.py::g"]);
                assert_eq!(depth, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_root_conflicts_with_repo() {
        assert!(Cli::try_parse_from(["blastmap", "build", "--root", "x", "--repo", "y"]).is_err());
    }

    #[test]
    fn test_blast_needs_text_or_seeds() {
        assert!(Cli::try_parse_from(["blastmap", "blast"]).is_err());
        assert!(Cli::try_parse_from(["blastmap", "blast", "--text", "update user profile"]).is_ok());
    }
}
