//! A thin client over the Hub's public REST API, used by the mirroring tool
//! to resolve branch names and enumerate a repository's files.
//!
//! There is no official Rust port of `huggingface_hub`, so this talks to the
//! same endpoints that library wraps directly.

use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;
use tracing::debug;

use crate::error::ProxyError;

const COMMIT_HASH_LEN: usize = 40;

#[derive(Debug, Deserialize)]
struct RefsResponse {
    branches: Vec<BranchRef>,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    name: String,
    #[serde(rename = "targetCommit")]
    target_commit: String,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    entry_type: String,
}

pub struct HubClient {
    client: reqwest::Client,
    upstream_url: String,
}

impl HubClient {
    pub fn new(upstream_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            upstream_url: upstream_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// List a model repository's branches and their target commit hashes.
    async fn list_branches(&self, repository: &str) -> Result<Vec<(String, String)>, ProxyError> {
        let url = format!("{}/api/models/{repository}/refs", self.upstream_url);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        let refs: RefsResponse = resp.json().await?;
        Ok(refs
            .branches
            .into_iter()
            .map(|b| (b.name, b.target_commit))
            .collect())
    }

    /// Resolve a symbolic revision (branch name) or an already-normalized
    /// 40-character commit hash to a commit hash.
    ///
    /// Branches are always checked first, even when `revision` already looks
    /// like a commit hash: a branch can itself be named with a 40-character
    /// lowercase-hex string, and that branch's target must win.
    pub async fn normalize_revision(
        &self,
        repository: &str,
        revision: &str,
    ) -> Result<String, ProxyError> {
        let branches = self.list_branches(repository).await?;
        if let Some((_, commit)) = branches.into_iter().find(|(name, _)| name == revision) {
            return Ok(commit);
        }

        if is_commit_hash(revision) {
            return Ok(revision.to_string());
        }

        Err(ProxyError::UnresolvableRevision(revision.to_string()))
    }

    /// Recursively enumerate every file path under a repository at a revision.
    pub async fn list_files_recursive(
        &self,
        repository: &str,
        revision: &str,
    ) -> Result<Vec<String>, ProxyError> {
        let url = format!(
            "{}/api/models/{repository}/tree/{revision}?recursive=true",
            self.upstream_url
        );
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        let entries: Vec<TreeEntry> = resp.json().await?;

        Ok(entries
            .into_iter()
            .filter(|e| e.entry_type == "file")
            .map(|e| e.path)
            .collect())
    }

    /// Stream a single file's bytes via the same `resolve` URL shape the
    /// gateway serves.
    pub async fn download_file(
        &self,
        repository: &str,
        revision: &str,
        path: &str,
    ) -> Result<impl Stream<Item = Result<Bytes, ProxyError>>, ProxyError> {
        let url = format!("{}/{repository}/resolve/{revision}/{path}", self.upstream_url);
        debug!(url = %url, "downloading file from hub");

        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(futures::StreamExt::map(resp.bytes_stream(), |r| {
            r.map_err(ProxyError::from)
        }))
    }
}

fn is_commit_hash(revision: &str) -> bool {
    revision.len() == COMMIT_HASH_LEN
        && revision.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_commit_hashes() {
        assert!(is_commit_hash(&"a".repeat(40)));
        assert!(!is_commit_hash(&"A".repeat(40)));
        assert!(!is_commit_hash("main"));
        assert!(!is_commit_hash(&"a".repeat(39)));
    }
}
