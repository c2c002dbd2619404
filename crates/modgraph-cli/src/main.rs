#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "modgraph: module dependency graphs from compiler dumps",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (defaults to pretty on a terminal, text otherwise).
    #[arg(long, value_enum, global = true)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        OutputMode::resolve(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Graph",
        about = "Build the filtered, labeled and colored graph",
        after_help = "EXAMPLES:\n    # Summarize a dump\n    modgraph graph dump/js/dependencies.dump\n\n    # Full node and edge data\n    modgraph graph dump/js/dependencies.dump --json"
    )]
    Graph(cmd::graph::GraphArgs),

    #[command(
        next_help_heading = "Graph",
        about = "List circular dependency groups",
        after_help = "EXAMPLES:\n    # Cycles among the visible modules\n    modgraph cycles dump/js/dependencies.dump\n\n    # Ignore filters\n    modgraph cycles dump/js/dependencies.dump --all"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        next_help_heading = "Query",
        about = "Show what a module reaches and what reaches it",
        after_help = "EXAMPLES:\n    # Inspect by path or label\n    modgraph inspect dump/js/dependencies.dump game/Main\n\n    # Shortest path between two modules\n    modgraph inspect dump/js/dependencies.dump game/Main --to game/Player"
    )]
    Inspect(cmd::inspect::InspectArgs),

    #[command(
        next_help_heading = "Query",
        about = "Find modules by label",
        after_help = "EXAMPLES:\n    modgraph search dump/js/dependencies.dump player"
    )]
    Search(cmd::search::SearchArgs),

    #[command(
        next_help_heading = "Graph",
        about = "Run the force layout and print positions",
        after_help = "EXAMPLES:\n    modgraph layout dump/js/dependencies.dump --max-polls 1000 --json"
    )]
    Layout(cmd::layout::LayoutArgs),

    #[command(
        next_help_heading = "Settings",
        about = "Show or change the stored configuration",
        after_help = "EXAMPLES:\n    modgraph config show\n    modgraph config set hideMinDeps 2\n    modgraph config set layoutInit circle\n    modgraph config reset"
    )]
    Config(cmd::config::ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MODGRAPH_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "modgraph_cli=debug,modgraph_core=debug,modgraph_engine=debug,info"
        } else {
            "warn"
        })
    });

    let format = env::var("MODGRAPH_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry.with(fmt::layer().compact().with_writer(std::io::stderr)).init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let output = cli.output_mode();
    debug!(?output, "output mode resolved");

    match &cli.command {
        Commands::Graph(args) => cmd::graph::run_graph(args, output),
        Commands::Cycles(args) => cmd::cycles::run_cycles(args, output),
        Commands::Inspect(args) => cmd::inspect::run_inspect(args, output),
        Commands::Search(args) => cmd::search::run_search(args, output),
        Commands::Layout(args) => cmd::layout::run_layout(args, output),
        Commands::Config(args) => cmd::config::run_config(args, output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["modgraph", "--json", "config", "show"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["modgraph", "graph", "deps.dump", "--json"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["modgraph", "--format", "text", "cycles", "deps.dump"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn all_subcommands_parse() {
        let subcommands = [
            vec!["modgraph", "graph", "d.dump"],
            vec!["modgraph", "graph", "d.dump", "--top", "5", "--dependants"],
            vec!["modgraph", "cycles", "d.dump", "--all"],
            vec!["modgraph", "inspect", "d.dump", "a.hx", "--to", "b.hx"],
            vec!["modgraph", "search", "d.dump", "player"],
            vec!["modgraph", "layout", "d.dump", "--max-polls", "3"],
            vec!["modgraph", "config", "show"],
            vec!["modgraph", "config", "set", "hideStd", "false"],
            vec!["modgraph", "config", "reset"],
            vec!["modgraph", "config", "path"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn inspect_requires_a_node() {
        assert!(Cli::try_parse_from(["modgraph", "inspect", "d.dump"]).is_err());
    }
}
