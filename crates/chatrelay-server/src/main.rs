//! chatrelay — streams chat turns and file uploads through to a hosted model.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;
#[cfg(test)]
mod test_helpers;

use chatrelay_core::RelayConfig;
use state::AppState;

fn print_help() {
    println!("chatrelay — streaming chat relay for a hosted language model");
    println!();
    println!("Usage: chatrelay [command]");
    println!();
    println!("Commands:");
    println!("  (none)    Start the server");
    println!("  help      Show this help message");
    println!();
    println!("Environment:");
    println!("  OPENAI_API_KEY           Provider API key (required)");
    println!("  OPENAI_BASE_URL          Provider API root (default: https://api.openai.com/v1)");
    println!("  CHATRELAY_MODEL          Model name (default: gpt-4o)");
    println!("  CHATRELAY_VECTOR_STORE   Vector store for attachments");
    println!("  CHATRELAY_MAX_UPLOAD_MB  Upload body limit in MB (default: 25)");
    println!("  HOST / PORT              Listen address (default: 0.0.0.0:3000)");
    println!("  RUST_LOG                 Log filter (default: info)");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'chatrelay help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let config = RelayConfig::from_env()?;
    let addr = config.bind_addr();
    info!(
        "Model {} via {}, attachments in vector store {}",
        config.model, config.base_url, config.vector_store_name
    );

    let state = Arc::new(AppState::from_config(config)?);
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("chatrelay listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
