mod chat;
mod config;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, Cli, Command};
use extract::{Extractor, OllamaClient};
use metrics::Metrics;
use query::{GraphQa, LlmSynthesizer, StructuredRetriever};
use routes::AppState;
use store::{GraphStore, MemoryGraph, Neo4jLoader, Neo4jStore};

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "api=debug,query=debug,extract=debug,store=debug,info"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_store(config: &AppConfig) -> Result<Arc<dyn GraphStore>> {
    if let Some(path) = &config.graph_file {
        let documents = store::read_documents(path)
            .await
            .with_context(|| format!("Failed to read graph file {}", path.display()))?;
        let graph = MemoryGraph::from_documents(&documents);
        info!(
            path = %path.display(),
            nodes = graph.node_count(),
            relationships = graph.edge_count(),
            "serving in-memory graph"
        );
        return Ok(Arc::new(graph));
    }

    let store = Neo4jStore::connect(&config.neo4j.uri, &config.neo4j.user, &config.neo4j.password)
        .await
        .context("Failed to connect to Neo4j")?;
    info!(uri = %config.neo4j.uri, "connected to Neo4j");
    Ok(Arc::new(store))
}

fn build_qa(config: &AppConfig, store: Arc<dyn GraphStore>) -> GraphQa {
    let llm = OllamaClient::new(config.llm.base_url.clone(), config.llm.model.clone());
    let extractor = Extractor::new(llm.clone().json_mode());
    let retriever = StructuredRetriever::new(store)
        .with_query_timeout(config.query_timeout())
        .with_max_concurrent(config.retrieval.max_concurrent_queries);
    let synthesizer = LlmSynthesizer::new(llm);

    GraphQa::new(Arc::new(extractor), retriever, Arc::new(synthesizer))
        .with_default_entity(config.retrieval.default_entity.clone())
        .with_graph_scope(config.retrieval.graph_scope)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = AppConfig::from_settings(&cli.settings);

    match cli.command {
        Command::Serve { host, port } => {
            let config = config.with_server_overrides(host, port);
            let store = build_store(&config).await?;
            let state = Arc::new(AppState {
                qa: Arc::new(build_qa(&config, store)),
                metrics: Metrics::new(),
            });

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;

            info!(model = %config.llm.model, "Server listening on http://{}", addr);
            axum::serve(listener, routes::router(state)).await?;
        }
        Command::Chat => {
            let store = build_store(&config).await?;
            let qa = build_qa(&config, store);
            chat::run(&qa, cli.verbose).await?;
        }
        Command::Ask { question } => {
            let store = build_store(&config).await?;
            let qa = build_qa(&config, store);
            let answer = qa.ask(&question).await?;
            if cli.verbose {
                println!("{}\n", answer.context);
            }
            println!("{}", answer.answer);
        }
        Command::Load { documents } => {
            let docs = store::read_documents(&documents)
                .await
                .with_context(|| format!("Failed to read {}", documents.display()))?;

            let neo4j = Neo4jStore::connect(&config.neo4j.uri, &config.neo4j.user, &config.neo4j.password)
                .await
                .context("Failed to connect to Neo4j")?;
            let loader = Neo4jLoader::new(neo4j.graph().clone());
            let stats = loader.load_if_empty(&docs).await?;
            if stats.skipped {
                info!("graph already contains documents, skipping load");
            } else {
                info!(
                    nodes = stats.nodes,
                    relationships = stats.relationships,
                    documents = stats.documents,
                    "graph loaded"
                );
            }
        }
    }

    Ok(())
}
