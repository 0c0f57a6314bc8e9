use thiserror::Error;

/// Errors that can occur when using the platformed-ollama library.
#[derive(Error, Debug)]
pub enum Error {
    /// The cancellation token fired before the request completed.
    #[error("This operation was aborted")]
    Aborted,

    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error{}: {message}", status_suffix(.status))]
    Server {
        status: Option<u16>,
        message: String,
    },

    /// Structured output was requested but the completion is not valid JSON.
    #[error("Failed to parse structured output: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl Error {
    pub fn server(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Server {
            status,
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Whether this error was caused by cancellation.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_message() {
        assert_eq!(Error::Aborted.to_string(), "This operation was aborted");
        assert!(Error::Aborted.is_aborted());
    }

    #[test]
    fn test_server_error_display() {
        let with_status = Error::server(Some(404), "model 'llava' not found");
        assert_eq!(
            with_status.to_string(),
            "Server error (HTTP 404): model 'llava' not found"
        );

        let without_status = Error::server(None, "stream ended early");
        assert_eq!(without_status.to_string(), "Server error: stream ended early");
        assert!(!without_status.is_aborted());
    }
}
