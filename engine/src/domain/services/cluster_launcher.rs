//! Multi-instance launcher
//! Writes a Node `cluster` script that forks N workers of a project's entry point

use crate::constants::launch::CLUSTER_LAUNCHER_FILE;
use crate::domain::DomainError;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClusterLauncher;

impl ClusterLauncher {
    pub fn new() -> Self {
        Self
    }

    /// Script body for `entry_point` forked `instances` times
    pub fn render(entry_point: &str, instances: u32) -> Result<String, DomainError> {
        if instances == 0 {
            return Err(DomainError::InvalidInstanceCount);
        }

        let module = if Path::new(entry_point).is_absolute()
            || entry_point.starts_with("./")
            || entry_point.starts_with("../")
        {
            entry_point.to_string()
        } else {
            format!("./{}", entry_point)
        };
        let module = serde_json::to_string(&module)
            .map_err(|e| DomainError::Io(format!("cannot encode entry point: {}", e)))?;

        Ok(format!(
            "const cluster = require('cluster');\n\
             \n\
             if (cluster.isPrimary || cluster.isMaster) {{\n\
             \x20   for (let i = 0; i < {instances}; i++) {{\n\
             \x20       cluster.fork();\n\
             \x20   }}\n\
             }} else {{\n\
             \x20   require({module});\n\
             }}\n"
        ))
    }

    /// Write the launcher into `working_dir`, overwriting any previous one
    pub async fn generate(
        &self,
        working_dir: &Path,
        entry_point: &str,
        instances: u32,
    ) -> Result<PathBuf, DomainError> {
        let script = Self::render(entry_point, instances)?;
        let path = working_dir.join(CLUSTER_LAUNCHER_FILE);
        tokio::fs::write(&path, script).await?;

        info!(
            path = %path.display(),
            entry_point = %entry_point,
            instances = instances,
            "Generated cluster launcher"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_relative_entry() {
        let script = ClusterLauncher::render("index.js", 4).unwrap();
        assert!(script.contains("i < 4;"));
        assert!(script.contains("require(\"./index.js\");"));
        assert!(script.contains("cluster.fork();"));
    }

    #[test]
    fn test_render_keeps_explicit_paths() {
        let script = ClusterLauncher::render("/opt/app/server.js", 2).unwrap();
        assert!(script.contains("require(\"/opt/app/server.js\");"));

        let script = ClusterLauncher::render("./lib/main.js", 2).unwrap();
        assert!(script.contains("require(\"./lib/main.js\");"));
    }

    #[test]
    fn test_render_escapes_quotes() {
        let script = ClusterLauncher::render("it's \"odd\".js", 1).unwrap();
        assert!(script.contains(r#"require("./it's \"odd\".js");"#));
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(
            ClusterLauncher::render("index.js", 3).unwrap(),
            ClusterLauncher::render("index.js", 3).unwrap()
        );
    }

    #[test]
    fn test_zero_instances_rejected() {
        assert_eq!(
            ClusterLauncher::render("index.js", 0).unwrap_err(),
            DomainError::InvalidInstanceCount
        );
    }

    #[tokio::test]
    async fn test_generate_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = ClusterLauncher::new();

        launcher.generate(dir.path(), "index.js", 8).await.unwrap();
        let path = launcher.generate(dir.path(), "index.js", 2).await.unwrap();

        assert_eq!(path, dir.path().join(CLUSTER_LAUNCHER_FILE));
        let body = std::fs::read_to_string(path).unwrap();
        assert!(body.contains("i < 2;"));
        assert!(!body.contains("i < 8;"));
    }
}
