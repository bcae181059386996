use std::sync::Arc;

use tracing::info;

use crewchat::{
    api::{self, AppState},
    config::Config,
    llm::OllamaProvider,
    orchestrator::{ChatOptions, ChatService},
    registration::HourRegistrationService,
    retriever::{self, HttpRetriever, NoopRetriever, Retriever},
    store::Store,
    tools::{register_hour_tools, ToolRegistry},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        // It's not fatal if .env doesn't exist, but good to know
        info!("No .env file found or failed to load: {}", e);
    }

    // Initialize logging with default filter if RUST_LOG is not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    info!("Crewchat starting...");

    info!("Initializing store at {}", config.database_path.display());
    let store = Store::new(&config.database_path).await?;
    store.init().await?;

    let retriever: Arc<dyn Retriever> = match &config.retriever_base_url {
        Some(url) => {
            info!("Using retriever at {}", url);
            Arc::new(HttpRetriever::new(url.clone()))
        }
        None => {
            info!("No retriever configured, chat runs without manual context");
            Arc::new(NoopRetriever)
        }
    };
    retriever::seed_employee_manual(retriever.as_ref(), &config.manual_path).await;

    let provider = Arc::new(OllamaProvider::new(
        config.ollama_base_url.clone(),
        config.ollama_model.clone(),
    ));
    info!(
        "Using Ollama model '{}' at {}",
        config.ollama_model, config.ollama_base_url
    );

    let hours = HourRegistrationService::new(store.clone());

    let mut registry = ToolRegistry::new();
    register_hour_tools(&mut registry, hours.clone());

    let system_prompt = config
        .system_prompt_path
        .as_ref()
        .and_then(|path| match std::fs::read_to_string(path) {
            Ok(prompt) => Some(prompt),
            Err(e) => {
                info!(
                    "Failed to load system prompt from file, using default: {}",
                    e
                );
                None
            }
        });

    let chat = Arc::new(ChatService::new(
        store,
        retriever,
        provider,
        Arc::new(registry),
        ChatOptions {
            rag_top_k: config.rag_top_k,
            history_window: config.history_window,
            max_tool_rounds: config.max_tool_rounds,
            system_prompt,
        },
    ));

    let app = api::router(AppState { chat, hours });

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        res = axum::serve(listener, app) => {
            if let Err(e) = res {
                info!("Server stopped with error: {}", e);
            }
        }
    }

    Ok(())
}
