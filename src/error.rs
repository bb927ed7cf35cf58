use serde_json::Value;
use thiserror::Error;
use tracing::error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Shown when the remote API failed without telling us anything usable.
pub const FALLBACK_MESSAGE: &str = "Error: Something unexpected went wrong! Try again.";

/// Failure of a gateway operation.
///
/// `Remote` normalizes every GraphQL-level failure mode (field validation,
/// business declines, structurally missing data) into one ordered message
/// list. `Transport` covers failures below the GraphQL envelope: connection
/// errors, timeouts, non-JSON bodies.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("GraphQL operation {operation} failed: {}", .messages.join("; "))]
    Remote {
        operation: String,
        request_id: Option<String>,
        messages: Vec<String>,
    },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

impl GatewayError {
    /// Normalizes a GraphQL envelope into a presentation-ready error.
    ///
    /// Messages keep the order the remote API returned them in; a single
    /// generic message stands in when the envelope carried none.
    pub fn from_response(operation: &str, response: &Value) -> Self {
        let mut messages: Vec<String> = response
            .get("errors")
            .and_then(Value::as_array)
            .map(|errors| {
                errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .map(|message| format!("Error: {message}"))
                    .collect()
            })
            .unwrap_or_default();
        if messages.is_empty() {
            messages.push(FALLBACK_MESSAGE.to_string());
        }

        let request_id = parse_request_id(response).map(str::to_string);
        error!(
            operation,
            request_id = ?request_id,
            messages = ?messages,
            response = %response,
            "GraphQL operation failed"
        );

        GatewayError::Remote {
            operation: operation.to_string(),
            request_id,
            messages,
        }
    }

    /// The ordered, user-displayable message list. The presentation layer
    /// renders these verbatim, one per line. Empty for transport failures,
    /// which are never shown to end users.
    pub fn messages(&self) -> &[String] {
        match self {
            GatewayError::Remote { messages, .. } => messages,
            GatewayError::Transport(_) => &[],
        }
    }
}

/// Best-effort extraction of the request-correlation id the remote API
/// returns in `extensions.requestId`. Diagnostic logging only.
pub fn parse_request_id(response: &Value) -> Option<&str> {
    response
        .pointer("/extensions/requestId")
        .and_then(Value::as_str)
}
