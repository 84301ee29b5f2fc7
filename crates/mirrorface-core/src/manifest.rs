//! The two manifest kinds persisted per `(repository, revision)`, and the
//! envelope they're wrapped in on disk.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A fully resolved snapshot of a repository at a revision: every file's
/// path mapped to the hash of its blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FullManifest {
    pub revision_hash: String,
    pub files: HashMap<String, String>,
}

/// A pointer from a symbolic revision (e.g. a branch name) to the commit
/// hash holding the actual [`FullManifest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedirectManifest {
    pub revision_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "manifest_type", rename_all = "lowercase")]
pub enum Manifest {
    Full(FullManifest),
    Redirect(RedirectManifest),
}

/// The on-disk wire format wraps a [`Manifest`] in an outer `manifest` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEnvelope {
    pub manifest: Manifest,
}

impl From<Manifest> for ManifestEnvelope {
    fn from(manifest: Manifest) -> Self {
        Self { manifest }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_manifest_round_trips_through_envelope() {
        let mut files = HashMap::new();
        files.insert("config.json".to_string(), "a".repeat(128));

        let envelope: ManifestEnvelope = Manifest::Full(FullManifest {
            revision_hash: "b".repeat(40),
            files,
        })
        .into();

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"manifest_type\":\"full\""));

        let decoded: ManifestEnvelope = serde_json::from_str(&json).unwrap();
        match decoded.manifest {
            Manifest::Full(full) => assert_eq!(full.revision_hash, "b".repeat(40)),
            Manifest::Redirect(_) => panic!("expected full manifest"),
        }
    }

    #[test]
    fn redirect_manifest_round_trips_through_envelope() {
        let envelope: ManifestEnvelope = Manifest::Redirect(RedirectManifest {
            revision_hash: "c".repeat(40),
        })
        .into();

        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains("\"manifest_type\":\"redirect\""));

        let decoded: ManifestEnvelope = serde_json::from_str(&json).unwrap();
        match decoded.manifest {
            Manifest::Redirect(redirect) => assert_eq!(redirect.revision_hash, "c".repeat(40)),
            Manifest::Full(_) => panic!("expected redirect manifest"),
        }
    }
}
