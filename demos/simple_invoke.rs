//! Minimal example showing the simplest usage of the library.

use platformed_ollama::{CallOptions, OllamaClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // OLLAMA_BASE_URL and OLLAMA_MODEL override the local defaults
    let client = OllamaClient::from_env()?;

    let text = client
        .invoke(
            "What is a good name for a company that makes colorful socks?",
            CallOptions::new(),
        )
        .await?;
    println!("AI: {text}");

    Ok(())
}
