use thiserror::Error;

/// Failures a metadata provider can report.
///
/// `Display` is the user-facing message: transport problems collapse into one
/// generic retryable line, upstream logical failures show the upstream's own
/// message. `Canceled` is never shown - callers treat it as inert.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network failure or non-success HTTP status. The payload is the
    /// underlying cause, carried for logs only.
    #[error("Something went wrong with fetching movies")]
    Transport(String),

    /// The API answered but flagged the request as failed.
    #[error("{0}")]
    Upstream(String),

    /// The request's cancellation token fired mid-flight.
    #[error("request canceled")]
    Canceled,
}

impl ProviderError {
    /// Upstream failure with the provider's message when it sent one.
    pub fn upstream(message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Movie not found".to_string());
        Self::Upstream(message)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_message_is_generic() {
        let err = ProviderError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "Something went wrong with fetching movies");
    }

    #[test]
    fn test_upstream_falls_back_when_message_missing() {
        assert_eq!(ProviderError::upstream(None).to_string(), "Movie not found");
        assert_eq!(
            ProviderError::upstream(Some("  ".to_string())).to_string(),
            "Movie not found"
        );
        assert_eq!(
            ProviderError::upstream(Some("Too many results.".to_string())).to_string(),
            "Too many results."
        );
    }
}
