//! Streams a translation token by token and stops early on Ctrl-C.

use futures_util::StreamExt;
use platformed_ollama::{CallOptions, CancellationToken, OllamaClient};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = OllamaClient::from_env()?;
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let mut stream = client
        .stream(
            "Translate \"I love programming\" into German.",
            CallOptions::new().with_cancellation(cancel),
        )
        .await?;

    let mut fragments = 0;
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        fragments += 1;
        print!("{}", fragment.text);
        std::io::stdout().flush()?;

        if let Some(info) = fragment.info {
            println!(
                "\n\n{fragments} fragments, {} output tokens ({:?})",
                info.usage.output_tokens, info.done_reason
            );
        }
    }

    Ok(())
}
