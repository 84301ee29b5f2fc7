//! Manifest persistence and resolution.
//!
//! Blob I/O is delegated to `mirrorface-storage`; this module owns the
//! manifest directory layout and the full/redirect resolution logic.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::warn;

use crate::error::CoreError;
use crate::hub::RepositoryRevision;
use crate::manifest::{FullManifest, Manifest, ManifestEnvelope, RedirectManifest};

const MANIFEST_DIRECTORY: &str = "manifest";

/// Path of the manifest directory under `root`.
pub fn manifest_dir(root: &Path) -> PathBuf {
    root.join(MANIFEST_DIRECTORY)
}

/// Path of a single manifest file under `root`, or `None` if
/// `repository_revision`'s key can't be safely encoded as a filename.
pub fn manifest_path(root: &Path, repository_revision: &RepositoryRevision) -> Option<PathBuf> {
    let key = repository_revision.path_safe_string()?;
    Some(manifest_dir(root).join(format!("{key}.json")))
}

async fn write_envelope(path: &Path, envelope: &ManifestEnvelope) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(envelope)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// Persist a full manifest for `repository_revision`.
pub async fn write_full_manifest(
    root: &Path,
    repository_revision: &RepositoryRevision,
    manifest: FullManifest,
) -> Result<(), CoreError> {
    let path = manifest_path(root, repository_revision).ok_or(CoreError::InvalidKey)?;
    let envelope: ManifestEnvelope = Manifest::Full(manifest).into();
    write_envelope(&path, &envelope).await
}

/// Persist a redirect manifest pointing `repository_revision` at `target_commit_hash`.
pub async fn write_redirect_manifest(
    root: &Path,
    repository_revision: &RepositoryRevision,
    target_commit_hash: &str,
) -> Result<(), CoreError> {
    let path = manifest_path(root, repository_revision).ok_or(CoreError::InvalidKey)?;
    let envelope: ManifestEnvelope = Manifest::Redirect(RedirectManifest {
        revision_hash: target_commit_hash.to_string(),
    })
    .into();
    write_envelope(&path, &envelope).await
}

async fn read_manifest(path: &Path) -> Result<Option<Manifest>, CoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice::<ManifestEnvelope>(&bytes)?.manifest)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Resolve `repository_revision` to its [`FullManifest`], following at most
/// one redirect hop.
///
/// Returns `Ok(None)` if no manifest exists for this repository/revision at
/// all (a plain cache miss). Returns `Err` for anything that indicates the
/// store itself is inconsistent: a full manifest whose embedded
/// `revision_hash` doesn't match what was asked for, a redirect whose
/// target is missing, or a redirect pointing at another redirect.
pub async fn load_full_manifest(
    root: &Path,
    repository_revision: &RepositoryRevision,
) -> Result<Option<FullManifest>, CoreError> {
    let Some(path) = manifest_path(root, repository_revision) else {
        return Ok(None);
    };

    let Some(manifest) = read_manifest(&path).await? else {
        return Ok(None);
    };

    match manifest {
        Manifest::Full(full) => {
            if full.revision_hash != repository_revision.revision {
                return Err(CoreError::InconsistentManifest {
                    repository: repository_revision.repository.clone(),
                    revision: repository_revision.revision.clone(),
                    claimed: full.revision_hash,
                    expected: repository_revision.revision.clone(),
                });
            }
            Ok(Some(full))
        }
        Manifest::Redirect(redirect) => {
            let target = RepositoryRevision::new(
                repository_revision.repository.clone(),
                redirect.revision_hash.clone(),
            );

            let target_path =
                manifest_path(root, &target).ok_or_else(|| CoreError::InconsistentRedirect {
                    repository: repository_revision.repository.clone(),
                    revision: repository_revision.revision.clone(),
                    target: redirect.revision_hash.clone(),
                })?;

            // Any failure resolving the target — missing file, corrupt JSON,
            // or an I/O error — collapses to InconsistentRedirect: the
            // redirect itself is what's untrustworthy, regardless of why its
            // target didn't load cleanly.
            let target_manifest = match read_manifest(&target_path).await {
                Ok(Some(m)) => m,
                Ok(None) => {
                    warn!(
                        repository = %repository_revision.repository,
                        revision = %repository_revision.revision,
                        target = %redirect.revision_hash,
                        "redirect manifest points at a missing target manifest"
                    );
                    return Err(CoreError::InconsistentRedirect {
                        repository: repository_revision.repository.clone(),
                        revision: repository_revision.revision.clone(),
                        target: redirect.revision_hash,
                    });
                }
                Err(e) => {
                    warn!(
                        repository = %repository_revision.repository,
                        revision = %repository_revision.revision,
                        target = %redirect.revision_hash,
                        error = %e,
                        "redirect manifest points at an unreadable target manifest"
                    );
                    return Err(CoreError::InconsistentRedirect {
                        repository: repository_revision.repository.clone(),
                        revision: repository_revision.revision.clone(),
                        target: redirect.revision_hash,
                    });
                }
            };

            match target_manifest {
                Manifest::Full(full) => Ok(Some(full)),
                Manifest::Redirect(_) => Err(CoreError::InconsistentRedirect {
                    repository: repository_revision.repository.clone(),
                    revision: repository_revision.revision.clone(),
                    target: redirect.revision_hash,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn full(revision_hash: &str, files: &[(&str, &str)]) -> FullManifest {
        FullManifest {
            revision_hash: revision_hash.to_string(),
            files: files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn manifest_path_rejects_double_dash() {
        let root = PathBuf::from("/store");

        assert!(manifest_path(&root, &RepositoryRevision::new("user--repo", "main")).is_none());
        assert!(manifest_path(&root, &RepositoryRevision::new("user/repo", "br--anch")).is_none());

        let p = manifest_path(&root, &RepositoryRevision::new("user/repo", "some/branch")).unwrap();
        assert_eq!(p, root.join("manifest/user--repo__some--branch.json"));
    }

    #[tokio::test]
    async fn load_full_manifest_full() {
        let root = tempdir().unwrap();
        let rr = RepositoryRevision::new("user/repo", &"a".repeat(40));
        write_full_manifest(root.path(), &rr, full(&"a".repeat(40), &[("f.txt", "h1")]))
            .await
            .unwrap();

        let loaded = load_full_manifest(root.path(), &rr).await.unwrap().unwrap();
        assert_eq!(loaded.files.get("f.txt"), Some(&"h1".to_string()));
    }

    #[tokio::test]
    async fn load_full_manifest_redirect() {
        let root = tempdir().unwrap();
        let commit = "a".repeat(40);
        let commit_rr = RepositoryRevision::new("user/repo", &commit);
        write_full_manifest(root.path(), &commit_rr, full(&commit, &[("f.txt", "h1")]))
            .await
            .unwrap();

        let branch_rr = RepositoryRevision::new("user/repo", "main");
        write_redirect_manifest(root.path(), &branch_rr, &commit)
            .await
            .unwrap();

        let loaded = load_full_manifest(root.path(), &branch_rr)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.revision_hash, commit);
    }

    #[tokio::test]
    async fn load_full_manifest_missing_is_none() {
        let root = tempdir().unwrap();
        let rr = RepositoryRevision::new("user/repo", "main");
        assert!(load_full_manifest(root.path(), &rr).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_full_manifest_unexpected_hash() {
        let root = tempdir().unwrap();
        let rr = RepositoryRevision::new("user/repo", &"a".repeat(40));
        write_full_manifest(
            root.path(),
            &rr,
            full(&"b".repeat(40), &[]), // doesn't match rr.revision
        )
        .await
        .unwrap();

        assert!(load_full_manifest(root.path(), &rr).await.is_err());
    }

    #[tokio::test]
    async fn load_full_manifest_redirect_missing() {
        let root = tempdir().unwrap();
        let branch_rr = RepositoryRevision::new("user/repo", "main");
        write_redirect_manifest(root.path(), &branch_rr, &"a".repeat(40))
            .await
            .unwrap();

        assert!(load_full_manifest(root.path(), &branch_rr).await.is_err());
    }

    #[tokio::test]
    async fn load_full_manifest_redirect_to_redirect() {
        let root = tempdir().unwrap();
        let commit_a = "a".repeat(40);
        let commit_b = "b".repeat(40);

        write_redirect_manifest(
            root.path(),
            &RepositoryRevision::new("user/repo", &commit_a),
            &commit_b,
        )
        .await
        .unwrap();

        let branch_rr = RepositoryRevision::new("user/repo", "main");
        write_redirect_manifest(root.path(), &branch_rr, &commit_a)
            .await
            .unwrap();

        assert!(load_full_manifest(root.path(), &branch_rr).await.is_err());
    }
}
