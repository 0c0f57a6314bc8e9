//! Shared helpers for tests that run against a mocked Ollama server.
#![allow(dead_code)]

use platformed_ollama::{ClientConfig, OllamaClient, ResponseFragment};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CREATED_AT: &str = "2024-01-01T00:00:00.000000Z";

/// Build a streamed `/api/generate` body: one line per token plus the final line.
pub fn ndjson_body(model: &str, tokens: &[&str]) -> String {
    let mut lines: Vec<String> = tokens
        .iter()
        .map(|token| {
            json!({
                "model": model,
                "created_at": CREATED_AT,
                "response": token,
                "done": false
            })
            .to_string()
        })
        .collect();
    lines.push(final_line(model));
    lines.join("\n") + "\n"
}

/// Build a body that stops before the end-of-generation line.
pub fn truncated_body(model: &str, tokens: &[&str]) -> String {
    tokens
        .iter()
        .map(|token| {
            json!({"model": model, "created_at": CREATED_AT, "response": token, "done": false})
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
        + "\n"
}

pub fn final_line(model: &str) -> String {
    json!({
        "model": model,
        "created_at": CREATED_AT,
        "response": "",
        "done": true,
        "done_reason": "stop",
        "context": [1, 2, 3],
        "total_duration": 1_250_000_000u64,
        "load_duration": 5_000_000u64,
        "prompt_eval_count": 26,
        "prompt_eval_duration": 130_000_000u64,
        "eval_count": 3,
        "eval_duration": 1_000_000_000u64
    })
    .to_string()
}

pub fn ndjson_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson")
}

/// Mount a generate endpoint that answers every request with `body`.
pub async fn mount_generate(server: &MockServer, body: String) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ndjson_response(body))
        .mount(server)
        .await;
}

pub fn client_for(server: &MockServer, model: &str) -> OllamaClient {
    OllamaClient::with_config(
        ClientConfig::new()
            .with_base_url(server.uri())
            .with_model(model),
    )
    .expect("Failed to create Ollama client")
}

/// Collects fragment texts seen by a callback.
#[derive(Clone, Default)]
pub struct TokenCollector {
    tokens: Arc<Mutex<Vec<String>>>,
}

impl TokenCollector {
    pub fn sink(&self) -> impl Fn(&ResponseFragment) + Send + Sync + 'static {
        let tokens = self.tokens.clone();
        move |fragment: &ResponseFragment| tokens.lock().unwrap().push(fragment.text.clone())
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}
