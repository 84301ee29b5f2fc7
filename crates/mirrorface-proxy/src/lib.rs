//! HTTP clients for talking to the upstream Hub: a REST client used by the
//! mirroring tool, and a redirect-aware streaming proxy used by the gateway.

pub mod error;
pub mod fallback;
pub mod hub_client;

pub use error::ProxyError;
pub use fallback::{ProxiedResponse, UpstreamProxy};
pub use hub_client::HubClient;
