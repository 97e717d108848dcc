use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid unit store url {url}: {reason}")]
    InvalidStoreUrl { url: String, reason: String },
    #[error("push url must start with http://, https://, ws:// or wss://: {0}")]
    InvalidPushUrl(String),
}
