//! Citegraph - bibliometric network analysis
//!
//! Derives co-citation and collaboration networks from a Neo4j bibliographic
//! graph, evaluates them and exports the results.

use anyhow::{Context, Result};
use citegraph::graph::{
    AnalysisOutcome, AnalysisPipeline, AnalysisRequest, CommunityAlgorithm, NetworkAnalyzer,
    NetworkType, TableFormat,
};
use citegraph::neo4j::Neo4jClient;
use citegraph::Config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "citegraph")]
#[command(about = "Bibliometric citation-graph network analysis")]
struct Cli {
    /// Path to a YAML config file (defaults to ./config.yaml)
    #[arg(long, global = true, env = "CITEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, evaluate and export one network
    Analyze(AnalyzeArgs),

    /// Derive and persist co-occurrence edges without analysis
    CreateRelations {
        /// Network type (all types when omitted)
        #[arg(short = 't', long)]
        network_type: Option<NetworkType>,
    },

    /// Persist edges for every network type, then analyze each of them
    Full(FullArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// cocitation, author, institution or keyword
    #[arg(short = 't', long)]
    network_type: NetworkType,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct FullArgs {
    /// Restrict to one network type
    #[arg(short = 't', long)]
    network_type: Option<NetworkType>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Args)]
struct RunArgs {
    /// Minimum edge weight kept in the network
    #[arg(short = 'w', long, default_value_t = 1, allow_negative_numbers = true)]
    min_weight: i64,

    /// Output directory (overrides config and CITEGRAPH_OUTPUT_DIR)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// louvain, label_propagation or greedy_modularity
    #[arg(short = 'a', long, default_value = "louvain")]
    community_algorithm: CommunityAlgorithm,

    /// Random seed for community detection
    #[arg(long)]
    seed: Option<u64>,

    /// Centrality table format: csv or json
    #[arg(long, default_value = "csv")]
    centrality_format: TableFormat,

    /// Derive and evaluate without writing edges or files
    #[arg(long)]
    dry_run: bool,
}

impl RunArgs {
    fn request(&self, network_type: NetworkType, config: &Config) -> AnalysisRequest {
        let output_dir = self
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output_dir.clone());
        AnalysisRequest {
            min_weight: self.min_weight,
            algorithm: self.community_algorithm,
            formats: config.formats.clone(),
            centrality_format: self.centrality_format,
            dry_run: self.dry_run,
            ..AnalysisRequest::new(network_type, output_dir)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,citegraph=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_yaml_and_env(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze(args) => {
            apply_seed(&mut config, &args.run);
            let pipeline = connect(&config).await?;
            let request = args.run.request(args.network_type, &config);
            let outcome = pipeline.analyze(&request).await?;
            print_summary(&outcome);
        }
        Commands::CreateRelations { network_type } => {
            let pipeline = connect(&config).await?;
            let written = pipeline
                .create_relations(&selected_types(network_type))
                .await?;
            for (network_type, count) in written {
                println!("{network_type}: {count} edges written");
            }
        }
        Commands::Full(args) => {
            apply_seed(&mut config, &args.run);
            let pipeline = connect(&config).await?;
            let types = selected_types(args.network_type);
            if !args.run.dry_run {
                pipeline.create_relations(&types).await?;
            }
            for network_type in types {
                let outcome = pipeline
                    .analyze(&args.run.request(network_type, &config))
                    .await?;
                print_summary(&outcome);
            }
        }
    }

    Ok(())
}

fn apply_seed(config: &mut Config, run: &RunArgs) {
    if run.seed.is_some() {
        config.analysis.seed = run.seed;
    }
}

fn selected_types(network_type: Option<NetworkType>) -> Vec<NetworkType> {
    match network_type {
        Some(t) => vec![t],
        None => NetworkType::ALL.to_vec(),
    }
}

async fn connect(config: &Config) -> Result<AnalysisPipeline> {
    let client = Neo4jClient::new(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
    )
    .await
    .with_context(|| format!("failed to connect to Neo4j at {}", config.neo4j_uri))?;
    tracing::info!("Connected to Neo4j");

    Ok(AnalysisPipeline::new(
        Arc::new(client),
        config.analysis.clone(),
        config.quality.clone(),
    ))
}

fn print_summary(outcome: &AnalysisOutcome) {
    let metrics = &outcome.metrics;
    println!(
        "{} network (min weight {}): {} nodes, {} edges, density {:.4}",
        outcome.network_type,
        outcome.min_weight,
        metrics.node_count,
        metrics.edge_count,
        metrics.density
    );
    println!(
        "  quality: {} ({:.0}% of criteria met)",
        if outcome.quality.is_representative() {
            "representative"
        } else {
            "not representative"
        },
        outcome.quality.score * 100.0
    );
    println!(
        "  communities: {} ({}, modularity {:.4})",
        outcome.communities.community_count(),
        outcome.communities.algorithm,
        outcome.communities.modularity
    );
    for path in &outcome.exported {
        println!("  wrote {}", path.display());
    }
}
