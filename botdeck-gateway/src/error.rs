use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    // Network errors
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request middleware failed: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    // Channel errors
    #[error("Control channel is disconnected")]
    Disconnected,
}

pub type Result<T> = std::result::Result<T, GatewayError>;
