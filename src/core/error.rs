use rmcp::ErrorData as McpError;
use thiserror::Error;

/// Gateway-wide error model for uniform JSON-RPC mapping.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing credential: set the {0} environment variable or pass it in the tool parameters")]
    MissingCredential(&'static str),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("`{0}` is not installed or not on PATH")]
    BinaryNotFound(String),

    #[error("{tool} failed ({status}):\n{detail}")]
    ProcessFailed {
        tool: String,
        status: String,
        detail: String,
    },

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("{0} is not configured; set {1} to enable this tool")]
    NotConfigured(&'static str, &'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

impl GatewayError {
    /// Map onto the JSON-RPC error space: caller mistakes become invalid
    /// params (-32602), everything else an internal error.
    pub fn into_mcp(self) -> McpError {
        match self {
            GatewayError::MissingCredential(_) | GatewayError::InvalidParams(_) => {
                McpError::invalid_params(self.to_string(), None)
            }
            other => McpError::internal_error(other.to_string(), None),
        }
    }
}

impl From<anyhow::Error> for GatewayError {
    fn from(e: anyhow::Error) -> Self {
        GatewayError::Message(e.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Upstream(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_displays_message() {
        let e = GatewayError::Message("boom".into());
        assert_eq!(e.to_string(), "boom");
    }

    #[test]
    fn missing_credential_maps_to_invalid_params() {
        let err = GatewayError::MissingCredential("MIRACLE_ACCESS_KEY").into_mcp();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("MIRACLE_ACCESS_KEY"));
    }

    #[test]
    fn upstream_maps_to_internal_error() {
        let err = GatewayError::Upstream("503".into()).into_mcp();
        assert_eq!(err.code.0, -32603);
    }

    #[test]
    fn it_converts_from_anyhow() {
        let any: anyhow::Error = anyhow::anyhow!("nope");
        let gw: GatewayError = any.into();
        assert_eq!(gw.to_string(), "nope");
    }
}
