//! Manifest reading
//! Builds a project descriptor from the `package.json` in a working directory

use crate::constants::launch::MANIFEST_FILE;
use crate::domain::{DomainError, Project};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Fields of `package.json` the manager cares about. Everything else is ignored.
#[derive(Debug, Deserialize)]
struct PackageManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    main: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Read and validate the manifest at `working_dir`
///
/// The working directory is canonicalized before it is stored.
pub async fn read_manifest(working_dir: &Path) -> Result<Project, DomainError> {
    let missing = || DomainError::ManifestMissing(working_dir.display().to_string());

    let working_dir = tokio::fs::canonicalize(working_dir)
        .await
        .map_err(|_| missing())?;
    let manifest_path = working_dir.join(MANIFEST_FILE);

    let raw = tokio::fs::read_to_string(&manifest_path)
        .await
        .map_err(|_| DomainError::ManifestMissing(manifest_path.display().to_string()))?;

    let manifest: PackageManifest = serde_json::from_str(&raw)
        .map_err(|e| DomainError::InvalidManifest(format!("{}: {}", manifest_path.display(), e)))?;

    debug!(
        path = %manifest_path.display(),
        name = ?manifest.name,
        main = ?manifest.main,
        "Parsed manifest"
    );

    Project::builder(manifest.name.unwrap_or_default(), working_dir)
        .entry_point(manifest.main.unwrap_or_default())
        .description(manifest.description)
        .version(manifest.version)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path, body: &str) {
        std::fs::write(dir.join(MANIFEST_FILE), body).unwrap();
    }

    #[tokio::test]
    async fn test_reads_valid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(
            dir.path(),
            r#"{"name":"sample","main":"index.js","version":"1.2.3","scripts":{"start":"node index.js"}}"#,
        );

        let project = read_manifest(dir.path()).await.unwrap();
        assert_eq!(project.name(), "sample");
        assert_eq!(project.entry_point(), "index.js");
        assert_eq!(project.version(), Some("1.2.3"));
        assert!(project.working_dir().is_absolute());
        assert_eq!(
            project.working_dir(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_manifest(dir.path()).await.unwrap_err();
        assert!(matches!(err, DomainError::ManifestMissing(_)));

        let err = read_manifest(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, DomainError::ManifestMissing(_)));
    }

    #[tokio::test]
    async fn test_invalid_json_and_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "{ not json");
        assert!(matches!(
            read_manifest(dir.path()).await.unwrap_err(),
            DomainError::InvalidManifest(_)
        ));

        write_manifest(dir.path(), r#"{"name":"","main":"index.js"}"#);
        assert!(matches!(
            read_manifest(dir.path()).await.unwrap_err(),
            DomainError::InvalidManifest(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_main() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), r#"{"name":"sample"}"#);

        let err = read_manifest(dir.path()).await.unwrap_err();
        assert_eq!(err, DomainError::NoEntryPoint("sample".to_string()));
    }
}
