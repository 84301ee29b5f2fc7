//! The gateway: resolve a request against the local store first, fall back
//! to streaming it from the upstream hub on any kind of miss.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::StreamExt;
use tracing::{debug, info, warn};

use mirrorface_core::hub::RepositoryRevisionPath;
use mirrorface_core::store::load_full_manifest;
use mirrorface_storage::open_stream;

use crate::error::ApiError;
use crate::metrics_counters as metrics;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/mirror/{*path}", get(mirror).head(mirror))
}

async fn mirror(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if method != Method::GET && method != Method::HEAD {
        return Err(ApiError::UnsupportedMethod);
    }

    let Some(parsed) = RepositoryRevisionPath::from_url_path(&path) else {
        return Err(ApiError::InvalidPath);
    };

    let repository = parsed.repository_revision.repository.clone();
    metrics::total_requests_inc(&repository);
    let is_head = method == Method::HEAD;

    match try_serve_locally(&state, &parsed).await {
        Ok(Some(response)) => {
            metrics::cache_hit_inc(&repository);
            return Ok(strip_body_if_head(response, is_head));
        }
        Ok(None) => {
            metrics::cache_miss_inc(&repository);
        }
        Err(FileMissingFromManifest) => {
            metrics::cache_hit_inc(&repository);
            let response = (StatusCode::NOT_FOUND, "File not found").into_response();
            return Ok(strip_body_if_head(response, is_head));
        }
    }

    metrics::fallback_requests_inc(&repository);
    let response = fallback_to_upstream(&state, &method, &path, &repository, &headers).await?;
    Ok(strip_body_if_head(response, is_head))
}

/// `HEAD` must return the same headers the equivalent `GET` would, with no
/// body. The upstream fallback already issues `HEAD` against the Hub so no
/// body crosses the network; the local store still streams the blob before
/// this strips it, since reading a local file back is cheap either way.
fn strip_body_if_head(response: Response, is_head: bool) -> Response {
    if !is_head {
        return response;
    }

    let (parts, _) = response.into_parts();
    Response::from_parts(parts, Body::empty())
}

/// Marker for "a local manifest exists but doesn't list this file" — distinct
/// from a plain cache miss, since it's a definitive 404 rather than a
/// fallback trigger.
struct FileMissingFromManifest;

/// Try to answer from the local store. `Ok(None)` is a cache miss (fall back
/// to upstream); `Err` means the file is known to not exist in this revision
/// at all.
async fn try_serve_locally(
    state: &AppState,
    parsed: &RepositoryRevisionPath,
) -> Result<Option<Response>, FileMissingFromManifest> {
    let full = match load_full_manifest(&state.store_root, &parsed.repository_revision).await {
        Ok(Some(full)) => full,
        Ok(None) => return Ok(None),
        Err(e) => {
            warn!(
                repository = %parsed.repository_revision.repository,
                revision = %parsed.repository_revision.revision,
                error = %e,
                "local manifest is unusable, falling back to upstream"
            );
            return Ok(None);
        }
    };

    let Some(hash) = full.files.get(&parsed.path) else {
        return Err(FileMissingFromManifest);
    };

    let size = match mirrorface_storage::size(&state.store_root, hash).await {
        Ok(size) => size,
        Err(e) => {
            warn!(hash = %hash, error = %e, "manifest references a blob missing from the store");
            return Ok(None);
        }
    };
    let stream = match open_stream(&state.store_root, hash).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(hash = %hash, error = %e, "manifest references a blob missing from the store");
            return Ok(None);
        }
    };

    debug!(path = %parsed.path, hash = %hash, "serving from local store");
    metrics::cache_total_bytes_inc(&parsed.repository_revision.repository, size);

    let mut response = Response::new(Body::from_stream(stream));
    let response_headers = response.headers_mut();
    response_headers.insert("content-type", HeaderValue::from_static("application/octet-stream"));
    response_headers.insert("content-length", HeaderValue::from(size));
    response_headers.insert(
        "x-repo-commit",
        HeaderValue::from_str(&full.revision_hash).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("inline; filename=\"{}\";", parsed.path))
    {
        response_headers.insert("content-disposition", value);
    }

    Ok(Some(response))
}

async fn fallback_to_upstream(
    state: &AppState,
    method: &Method,
    path: &str,
    repository: &str,
    request_headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let url = format!("{}/{path}", state.upstream_url.trim_end_matches('/'));

    let proxied = match state.upstream.fetch(method.clone(), &url, request_headers).await {
        Ok(proxied) => proxied,
        Err(e) => {
            warn!(url = %url, error = %e, "upstream fetch failed");
            return Ok((StatusCode::BAD_GATEWAY, "Upstream request failed").into_response());
        }
    };

    if proxied.status.as_u16() != 200 {
        metrics::fallback_upstream_error_inc(repository, proxied.status.as_u16());
        if proxied.status != StatusCode::NOT_FOUND {
            warn!(url = %url, status = %proxied.status, "upstream returned a non-200 status");
        }

        let mut response = Response::new(Body::empty());
        *response.status_mut() = proxied.status;
        *response.headers_mut() = proxied.headers;
        return Ok(response);
    }

    info!(url = %url, "streaming response from upstream");
    let repository = repository.to_string();
    let counted = proxied.body.inspect(move |chunk| {
        if let Ok(bytes) = chunk {
            metrics::fallback_total_bytes_inc(&repository, bytes.len() as u64);
        }
    });

    let mut response = Response::new(Body::from_stream(counted));
    *response.headers_mut() = proxied.headers;
    Ok(response)
}
