use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dynetml2other::{Document, GraphHandle, GraphLibrary, LoadOptions, MetaNetwork};

/// Convert DyNetML meta-networks to petgraph graphs or plain dictionaries and back
#[derive(Debug, Parser)]
#[command(name = "dynetml2other", version)]
struct Cli {
    /// JSON file with load options (include/ignore lists, time window)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the node-sets and networks of a document
    Summary { input: PathBuf },

    /// Convert a document to another representation
    Convert {
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Format::Dict)]
        format: Format,

        /// Write dict output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load, save and reload a document, checking nothing was lost
    Roundtrip { input: PathBuf, output: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Dict,
    Petgraph,
    Merged,
}

impl From<Format> for GraphLibrary {
    fn from(format: Format) -> Self {
        match format {
            Format::Dict => GraphLibrary::Dict,
            Format::Petgraph => GraphLibrary::Petgraph,
            Format::Merged => GraphLibrary::PetgraphMerged,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let options = match &cli.config {
        Some(path) => LoadOptions::from_json_file(path)
            .with_context(|| format!("loading options from {}", path.display()))?,
        None => LoadOptions::default(),
    };

    match cli.command {
        Command::Summary { input } => {
            let document = dynetml2other::load_document(&input, &options)
                .with_context(|| format!("loading {}", input.display()))?;
            println!("{document}");
        }
        Command::Convert {
            input,
            format,
            output,
        } => {
            let document = dynetml2other::load_document(&input, &options)
                .with_context(|| format!("loading {}", input.display()))?;
            convert(&document, format, output)?;
        }
        Command::Roundtrip { input, output } => {
            let document = dynetml2other::load_document(&input, &options)
                .with_context(|| format!("loading {}", input.display()))?;
            dynetml2other::save_document(&document, &output)
                .with_context(|| format!("saving {}", output.display()))?;
            let reloaded = dynetml2other::load_document(&output, &LoadOptions::default())
                .with_context(|| format!("reloading {}", output.display()))?;
            if reloaded != document {
                bail!("{} does not load back into the same model", output.display());
            }
            info!("round trip through {} preserved the model", output.display());
        }
    }
    Ok(())
}

fn convert(document: &Document, format: Format, output: Option<PathBuf>) -> anyhow::Result<()> {
    let handles = document
        .meta_networks()
        .iter()
        .map(|mn| mn.to_graph_library(format.into()))
        .collect::<Result<Vec<_>, _>>()?;

    if format == Format::Dict {
        let dicts: Vec<_> = handles
            .iter()
            .filter_map(|h| match h {
                GraphHandle::Dict(d) => Some(d),
                _ => None,
            })
            .collect();
        let json = match dicts.as_slice() {
            [single] => serde_json::to_string_pretty(single)?,
            many => serde_json::to_string_pretty(many)?,
        };
        match output {
            Some(path) => std::fs::write(&path, json)
                .with_context(|| format!("writing {}", path.display()))?,
            None => println!("{json}"),
        }
        return Ok(());
    }

    for (mn, handle) in document.meta_networks().iter().zip(&handles) {
        print_graph_summary(mn, handle);
    }
    Ok(())
}

fn print_graph_summary(mn: &MetaNetwork, handle: &GraphHandle) {
    println!("meta-network {}", mn.id().unwrap_or("<unnamed>"));
    match handle {
        GraphHandle::Networks(graphs) => {
            for (id, network) in &graphs.networks {
                println!(
                    "  {id}: {} vertices, {} edges ({})",
                    network.graph.node_count(),
                    network.graph.edge_count(),
                    if network.graph.is_directed() { "directed" } else { "undirected" }
                );
            }
        }
        GraphHandle::Merged(merged) => {
            println!(
                "  merged: {} vertices, {} edges across {} networks",
                merged.graph.node_count(),
                merged.graph.edge_count(),
                merged.headers.len()
            );
        }
        GraphHandle::Dict(dict) => {
            println!("  {} nodes, {} links", dict.node_count(), dict.link_count());
        }
    }
}
