//! Identifiers for a repository at a revision, and the on-disk key derived
//! from them.

use tracing::warn;

/// A repository and the revision (branch name, tag, or commit hash) within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryRevision {
    pub repository: String,
    pub revision: String,
}

impl RepositoryRevision {
    pub fn new(repository: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            revision: revision.into(),
        }
    }

    /// Derive the path-safe key used for manifest filenames:
    /// `{repo with '/'->'--'}__{revision with '/'->'--'}`.
    ///
    /// Returns `None` if either component already contains `--`, since that
    /// would make the encoding ambiguous to decode.
    pub fn path_safe_string(&self) -> Option<String> {
        if self.repository.contains("--") || self.revision.contains("--") {
            warn!(
                repository = %self.repository,
                revision = %self.revision,
                "repository or revision contains '--', cannot derive a path-safe key"
            );
            return None;
        }

        Some(format!(
            "{}__{}",
            self.repository.replace('/', "--"),
            self.revision.replace('/', "--")
        ))
    }
}

/// A file path within a [`RepositoryRevision`], as parsed from a Hub-style
/// `resolve` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRevisionPath {
    pub repository_revision: RepositoryRevision,
    pub path: String,
}

impl RepositoryRevisionPath {
    /// Parse a URL path of the shape
    /// `{user}/{repo}/resolve/{revision}/{path...}`.
    ///
    /// Returns `None` if the path doesn't have at least 5 `/`-separated
    /// components, the third component isn't `resolve`, or the trailing
    /// path is empty.
    pub fn from_url_path(url_path: &str) -> Option<Self> {
        let parts: Vec<&str> = url_path.splitn(5, '/').collect();
        if parts.len() != 5 || parts[2] != "resolve" {
            return None;
        }

        let (user, repo, _resolve, revision, path) =
            (parts[0], parts[1], parts[2], parts[3], parts[4]);

        if path.is_empty() {
            return None;
        }

        Some(Self {
            repository_revision: RepositoryRevision::new(format!("{user}/{repo}"), revision),
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_parsing() {
        let p = RepositoryRevisionPath::from_url_path("user/repo/resolve/branch/path").unwrap();
        assert_eq!(p.repository_revision.repository, "user/repo");
        assert_eq!(p.repository_revision.revision, "branch");
        assert_eq!(p.path, "path");

        let p = RepositoryRevisionPath::from_url_path(
            "user/repo/resolve/v1.2.3/path/can/be/nested.txt",
        )
        .unwrap();
        assert_eq!(p.repository_revision.revision, "v1.2.3");
        assert_eq!(p.path, "path/can/be/nested.txt");

        let p =
            RepositoryRevisionPath::from_url_path("user/repo/resolve/0123456abcdef/path").unwrap();
        assert_eq!(p.repository_revision.revision, "0123456abcdef");

        assert!(RepositoryRevisionPath::from_url_path("user/repo/resolve/branch").is_none());
        assert!(RepositoryRevisionPath::from_url_path("user/repo/resolve/branch/").is_none());
        assert!(
            RepositoryRevisionPath::from_url_path("user/repo/not-resolve/branch/path").is_none()
        );
    }

    #[test]
    fn path_safe_string() {
        let rr = RepositoryRevision::new("user/repo", "main");
        assert_eq!(rr.path_safe_string().unwrap(), "user--repo__main");

        let rr = RepositoryRevision::new("user/repo", "some/branch");
        assert_eq!(rr.path_safe_string().unwrap(), "user--repo__some--branch");

        let rr = RepositoryRevision::new("user--repo", "main");
        assert!(rr.path_safe_string().is_none());
    }
}
