//! Request-path counters. Every counter is labeled by `repository` only —
//! revision is deliberately not a label, since it would blow up cardinality.

pub fn describe() {
    metrics::describe_counter!(
        "mirrorface_total_requests",
        "Total number of requests received by the gateway"
    );
    metrics::describe_counter!(
        "mirrorface_cache_hit",
        "Requests served from the local content-addressed store"
    );
    metrics::describe_counter!(
        "mirrorface_cache_miss",
        "Requests with no usable local manifest, forwarded upstream"
    );
    metrics::describe_counter!(
        "mirrorface_cache_total_bytes",
        "Bytes served from the local content-addressed store"
    );
    metrics::describe_counter!(
        "mirrorface_fallback_requests",
        "Requests forwarded to the upstream hub"
    );
    metrics::describe_counter!(
        "mirrorface_fallback_upstream_error",
        "Non-200 responses received from the upstream hub"
    );
    metrics::describe_counter!(
        "mirrorface_fallback_total_bytes",
        "Bytes streamed back from the upstream hub"
    );
}

pub fn total_requests_inc(repository: &str) {
    metrics::counter!("mirrorface_total_requests", "repository" => repository.to_string())
        .increment(1);
}

pub fn cache_hit_inc(repository: &str) {
    metrics::counter!("mirrorface_cache_hit", "repository" => repository.to_string()).increment(1);
}

pub fn cache_miss_inc(repository: &str) {
    metrics::counter!("mirrorface_cache_miss", "repository" => repository.to_string())
        .increment(1);
}

pub fn cache_total_bytes_inc(repository: &str, bytes: u64) {
    metrics::counter!("mirrorface_cache_total_bytes", "repository" => repository.to_string())
        .increment(bytes);
}

pub fn fallback_requests_inc(repository: &str) {
    metrics::counter!("mirrorface_fallback_requests", "repository" => repository.to_string())
        .increment(1);
}

pub fn fallback_upstream_error_inc(repository: &str, status_code: u16) {
    metrics::counter!(
        "mirrorface_fallback_upstream_error",
        "repository" => repository.to_string(),
        "status_code" => status_code.to_string(),
    )
    .increment(1);
}

pub fn fallback_total_bytes_inc(repository: &str, bytes: u64) {
    metrics::counter!("mirrorface_fallback_total_bytes", "repository" => repository.to_string())
        .increment(bytes);
}
