mod dot;

use anyhow::{Context, bail};
use clap::Parser;
use pkg_types::query::{KindFilter, QueryConfig, ResourceKind, WhoCan};
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "rbacviz",
    about = "Render Kubernetes RBAC state as a Graphviz graph",
    after_help = "QUERY is either 'KIND [NAME...]' (e.g. 'role reader', with the \
usual shorthands like sa, rb, crb, r, cr) or 'who-can VERB RESOURCE [NAME]' \
(e.g. 'who-can get pods'). Pipe the output into `dot -Tsvg`."
)]
struct Cli {
    /// Input file with a kubectl get ... -o json List (stdin when omitted)
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Namespace(s) to render, comma-delimited (all when omitted)
    #[arg(short = 'n', long = "namespace", default_value = "")]
    namespaces: String,

    /// Comma-delimited name prefixes to ignore ("none" to keep everything)
    #[arg(long, default_value = "system:")]
    ignore_prefixes: String,

    /// Don't render the legend
    #[arg(long)]
    no_legend: bool,

    /// Don't render RBAC access rules (e.g. "get pods")
    #[arg(long)]
    no_rules: bool,

    /// For who-can: show only the matched rules instead of all rules in the role
    #[arg(long)]
    show_matched_rules_only: bool,

    /// KIND [NAME...] filter, or: who-can VERB RESOURCE [NAME]
    #[arg(value_name = "QUERY")]
    query: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let permissions = match &cli.file {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("can't open file {}", path.display()))?;
            pkg_loader::load(file, &config)
        }
        None => {
            if io::stdin().is_terminal() {
                warn!("reading RBAC resources from stdin");
            }
            pkg_loader::load(io::stdin().lock(), &config)
        }
    }
    .context("can't parse RBAC resources from input")?;

    let graph = pkg_graph::builder::build(&config, &permissions);
    print!("{}", dot::render(&graph));
    Ok(())
}

fn build_config(cli: &Cli) -> anyhow::Result<QueryConfig> {
    let mut config = QueryConfig {
        show_rules: !cli.no_rules,
        show_legend: !cli.no_legend,
        ..QueryConfig::default()
    };
    config.who_can.show_matched_only = cli.show_matched_rules_only;

    // Splitting the empty default yields {""}, the all-namespaces sentinel.
    config.namespaces = cli.namespaces.split(',').map(str::to_string).collect();

    config.ignored_prefixes = if cli.ignore_prefixes == "none" {
        Vec::new()
    } else {
        cli.ignore_prefixes.split(',').map(str::to_string).collect()
    };

    match cli.query.split_first() {
        None => {}
        Some((command, rest)) if command == "who-can" => {
            let [verb, resource, rest @ ..] = rest else {
                bail!("usage: rbacviz who-can VERB RESOURCE [NAME]");
            };
            config.kind_filter = KindFilter::Kind(ResourceKind::Rule);
            config.who_can = WhoCan {
                verb: verb.clone(),
                resource: resource.clone(),
                resource_name: rest.first().cloned().unwrap_or_default(),
                show_matched_only: cli.show_matched_rules_only,
            };
        }
        Some((kind, names)) => {
            config.kind_filter = KindFilter::parse(kind);
            if let KindFilter::Unrecognized(spelling) = &config.kind_filter {
                warn!("unrecognized resource kind {spelling}; nothing will be selected");
            }
            config.resource_names = names.iter().cloned().collect();
        }
    }
    Ok(config)
}
