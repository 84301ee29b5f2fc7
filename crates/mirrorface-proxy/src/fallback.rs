//! Streaming fallback to the upstream Hub, with manual redirect following.
//!
//! `reqwest`'s built-in redirect handling discards every hop's headers but
//! the final one. The gateway needs headers from the whole chain (e.g. an
//! `X-Repo-Commit` set on an intermediate hop), so redirects are followed by
//! hand here, bounded by `max_redirects`.

use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use http::{HeaderMap, HeaderName, StatusCode};
use tracing::warn;
use url::Url;

use crate::error::ProxyError;

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Default handover granularity between the upstream socket and the client
/// socket.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Request headers forwarded from the client to the upstream.
pub const REQUEST_HEADERS_TO_FORWARD: &[&str] = &["user-agent"];

/// Upstream response headers forwarded back to the client.
pub const RESPONSE_HEADERS_TO_FORWARD: &[&str] = &[
    "content-disposition",
    "content-length",
    "content-type",
    "etag",
    "x-repo-commit",
];

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProxyError>> + Send>>;

pub struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

pub struct UpstreamProxy {
    client: reqwest::Client,
    max_redirects: usize,
    chunk_size: usize,
}

impl UpstreamProxy {
    pub fn new() -> Self {
        Self::with_max_redirects(DEFAULT_MAX_REDIRECTS)
    }

    pub fn with_max_redirects(max_redirects: usize) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client with no-redirect policy always builds");

        Self {
            client,
            max_redirects,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Set the handover granularity between the upstream socket and the
    /// client socket.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Fetch `url`, following any redirect chain by hand, and return a
    /// response whose headers are reconciled across every hop and filtered
    /// to [`RESPONSE_HEADERS_TO_FORWARD`].
    ///
    /// `method` is issued at every hop in the chain, so a client `HEAD`
    /// never pulls a body across the network just to be discarded locally.
    pub async fn fetch(
        &self,
        method: http::Method,
        url: &str,
        request_headers: &HeaderMap,
    ) -> Result<ProxiedResponse, ProxyError> {
        let mut current_url = Url::parse(url)
            .map_err(|e| ProxyError::InvalidResponse(format!("invalid upstream url: {e}")))?;
        let mut hops: Vec<HeaderMap> = Vec::new();

        loop {
            let mut req = self.client.request(method.clone(), current_url.clone());
            for name in REQUEST_HEADERS_TO_FORWARD {
                if let Some(value) = request_headers.get(*name) {
                    req = req.header(*name, value.clone());
                }
            }

            let resp = req.send().await?;
            let status = resp.status();

            if status.is_redirection() {
                if hops.len() >= self.max_redirects {
                    return Err(ProxyError::TooManyRedirects(self.max_redirects));
                }

                let location = resp
                    .headers()
                    .get(http::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        ProxyError::InvalidResponse(
                            "redirect response missing Location header".to_string(),
                        )
                    })?;

                let next_url = current_url.join(location).map_err(|e| {
                    ProxyError::InvalidResponse(format!("invalid redirect location: {e}"))
                })?;

                hops.push(resp.headers().clone());
                current_url = next_url;
                continue;
            }

            hops.push(resp.headers().clone());
            let headers = filter_headers(&merge_headers(&hops));

            if !status.is_success() && status != StatusCode::NOT_FOUND {
                warn!(url = %url, status = %status, "upstream returned a non-success status");
            }

            let body = rechunk(resp.bytes_stream(), self.chunk_size);

            return Ok(ProxiedResponse {
                status,
                headers,
                body,
            });
        }
    }
}

impl Default for UpstreamProxy {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge headers across a redirect chain, oldest hop first, with each later
/// hop's values for a given header name overriding that hop's predecessors.
fn merge_headers(hops: &[HeaderMap]) -> HeaderMap {
    let mut merged = HeaderMap::new();

    for hop in hops {
        let names: Vec<HeaderName> = hop.keys().cloned().collect();
        for name in names {
            merged.remove(&name);
        }
        for (name, value) in hop.iter() {
            merged.append(name.clone(), value.clone());
        }
    }

    merged
}

/// Re-chunk an upstream byte stream into pieces of at most `chunk_size`
/// bytes, rather than forwarding whatever chunk boundaries the network
/// connection happened to produce.
fn rechunk<S>(stream: S, chunk_size: usize) -> ByteStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
{
    let io_stream = stream.map(|r| r.map_err(|e| std::io::Error::other(e)));
    let reader = tokio_util::io::StreamReader::new(io_stream);
    let rechunked = tokio_util::io::ReaderStream::with_capacity(reader, chunk_size);
    Box::pin(rechunked.map(|r| r.map_err(ProxyError::from)))
}

fn filter_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for name in RESPONSE_HEADERS_TO_FORWARD {
        if let Some(value) = headers.get(*name) {
            filtered.insert(HeaderName::from_static(name), value.clone());
        }
    }
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn merge_prefers_later_hop_for_shared_header() {
        let mut first = HeaderMap::new();
        first.insert("etag", HeaderValue::from_static("first"));
        first.insert("content-type", HeaderValue::from_static("text/plain"));

        let mut second = HeaderMap::new();
        second.insert("etag", HeaderValue::from_static("second"));

        let merged = merge_headers(&[first, second]);
        assert_eq!(merged.get("etag").unwrap(), "second");
        assert_eq!(merged.get("content-type").unwrap(), "text/plain");
    }

    #[test]
    fn filter_drops_non_allowlisted_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("etag", HeaderValue::from_static("abc"));
        headers.insert("set-cookie", HeaderValue::from_static("session=1"));

        let filtered = filter_headers(&headers);
        assert!(filtered.get("etag").is_some());
        assert!(filtered.get("set-cookie").is_none());
    }
}
