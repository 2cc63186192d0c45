use clap::{Args, Parser, Subcommand};
use query::GraphScope;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "graphqa", version, about = "Question answering over a knowledge graph")]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,

    /// Show debug information (per-entity queries, retrieved context)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "HOST")]
        host: Option<String>,
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },
    /// Interactive question loop on the terminal
    Chat,
    /// Answer one question and exit
    Ask { question: String },
    /// Seed Neo4j from a graph documents file
    Load {
        #[arg(long)]
        documents: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    #[arg(long, global = true, env = "NEO4J_URI")]
    pub neo4j_uri: Option<String>,

    #[arg(long, global = true, env = "NEO4J_USERNAME")]
    pub neo4j_user: Option<String>,

    #[arg(long, global = true, env = "NEO4J_PASSWORD", hide_env_values = true)]
    pub neo4j_password: Option<String>,

    #[arg(long, global = true, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    #[arg(long, global = true, env = "OLLAMA_MODEL")]
    pub ollama_model: Option<String>,

    /// Serve from an in-memory graph built from this documents file instead of Neo4j
    #[arg(long, global = true, env = "GRAPH_FILE")]
    pub graph_file: Option<PathBuf>,

    /// Timeout for one entity's graph lookup
    #[arg(long, global = true, env = "GRAPHQA_QUERY_TIMEOUT_SECS")]
    pub query_timeout_secs: Option<u64>,

    #[arg(long, global = true, env = "GRAPHQA_MAX_CONCURRENT_QUERIES")]
    pub max_concurrent_queries: Option<usize>,

    /// Entity used when none can be extracted from the question; empty disables
    #[arg(long, global = true, env = "GRAPHQA_DEFAULT_ENTITY")]
    pub default_entity: Option<String>,

    /// Entities feeding the graph view: `primary` or `all`
    #[arg(long, global = true, env = "GRAPHQA_GRAPH_SCOPE", value_parser = parse_graph_scope)]
    pub graph_scope: Option<GraphScope>,
}

pub fn parse_graph_scope(raw: &str) -> Result<GraphScope, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "primary" => Ok(GraphScope::Primary),
        "all" => Ok(GraphScope::All),
        other => Err(format!("unknown graph scope '{}', expected primary or all", other)),
    }
}

/// Fallback entity for questions that name nothing in the graph.
pub const DEFAULT_ENTITY: &str = "Youtube";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub neo4j: Neo4jConfig,
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,
    pub graph_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub query_timeout_secs: u64,
    pub max_concurrent_queries: usize,
    pub default_entity: Option<String>,
    pub graph_scope: GraphScope,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            neo4j: Neo4jConfig {
                uri: "bolt://localhost:7687".to_string(),
                user: "neo4j".to_string(),
                password: String::new(),
            },
            llm: LlmConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3".to_string(),
            },
            retrieval: RetrievalConfig {
                query_timeout_secs: 30,
                max_concurrent_queries: 4,
                default_entity: Some(DEFAULT_ENTITY.to_string()),
                graph_scope: GraphScope::Primary,
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            graph_file: None,
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with whatever the flags and environment provided.
    pub fn from_settings(settings: &SettingsArgs) -> Self {
        let mut config = Self::default();
        let s = settings.clone();

        if let Some(uri) = s.neo4j_uri {
            config.neo4j.uri = uri;
        }
        if let Some(user) = s.neo4j_user {
            config.neo4j.user = user;
        }
        if let Some(password) = s.neo4j_password {
            config.neo4j.password = password;
        }
        if let Some(url) = s.ollama_url {
            config.llm.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = s.ollama_model {
            config.llm.model = model;
        }
        if let Some(secs) = s.query_timeout_secs {
            config.retrieval.query_timeout_secs = secs;
        }
        if let Some(max) = s.max_concurrent_queries {
            config.retrieval.max_concurrent_queries = max.max(1);
        }
        if let Some(scope) = s.graph_scope {
            config.retrieval.graph_scope = scope;
        }
        if let Some(entity) = s.default_entity {
            let entity = entity.trim();
            config.retrieval.default_entity = (!entity.is_empty()).then(|| entity.to_string());
        }
        config.graph_file = s.graph_file;

        config
    }

    pub fn with_server_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.retrieval.query_timeout_secs)
    }
}
