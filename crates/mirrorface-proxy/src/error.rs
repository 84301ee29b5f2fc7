//! Proxy error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("upstream returned an unexpected response: {0}")]
    InvalidResponse(String),

    #[error("redirect chain exceeded {0} hops")]
    TooManyRedirects(usize),

    #[error("revision '{0}' is neither a known branch nor a 40-character commit hash")]
    UnresolvableRevision(String),
}
