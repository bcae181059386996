use std::path::PathBuf;

/// Runtime configuration, read from environment variables with defaults
/// suitable for local development against a local Ollama instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub ollama_base_url: String,
    pub ollama_model: String,
    pub retriever_base_url: Option<String>,
    pub manual_path: PathBuf,
    pub system_prompt_path: Option<PathBuf>,
    /// Number of retrieved snippets prepended to the user turn.
    pub rag_top_k: usize,
    /// Number of prior session messages injected into the provider call.
    pub history_window: usize,
    /// Upper bound on tool round-trips within a single chat turn.
    pub max_tool_rounds: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let home_dir = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let database_path = std::env::var("CREWCHAT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::path::Path::new(&home_dir)
                    .join(".crewchat")
                    .join("crewchat.db")
            });

        Self {
            port: env_parsed("CREWCHAT_PORT", 8080),
            database_path,
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".into()),
            ollama_model: std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen2.5:7b".into()),
            retriever_base_url: std::env::var("RETRIEVER_BASE_URL").ok(),
            manual_path: std::env::var("EMPLOYEE_MANUAL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("employee-manual.txt")),
            system_prompt_path: std::env::var("SYSTEM_PROMPT_PATH").ok().map(PathBuf::from),
            rag_top_k: env_parsed("CHAT_RAG_TOP_K", 3),
            history_window: env_parsed("CHAT_HISTORY_WINDOW", 10),
            max_tool_rounds: env_parsed("CHAT_MAX_TOOL_ROUNDS", 8),
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
