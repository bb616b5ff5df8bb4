#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("request to {url} returned http {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
    #[error("failed to encode request body for {url}: {source}")]
    Encode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("orderer `{orderer_id}` has no reachable address")]
    NoOrdererAddress { orderer_id: String },
}
