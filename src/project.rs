//! 工作区项目配置
//!
//! 固定两候选路径，先到先得，不合并：
//! 1. `<workspace>/.hive/config.yaml`
//! 2. `<workspace>/.hive/config.json`
//! 两者都不存在时返回默认配置；命中的文件解析失败必须报错，不得静默回退默认。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::EngineError;
use crate::host::Host;

/// 工作区配置目录名
pub const PROJECT_CONFIG_DIR: &str = ".hive";

/// 项目配置：启动步骤、禁用步骤、服务器地址、匿名遥测开关
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// 会话启动时运行的步骤：步骤名 -> 参数
    pub steps_on_startup: HashMap<String, Value>,
    /// 本工作区禁用的步骤名
    pub disallowed_steps: Vec<String>,
    pub server_url: Option<String>,
    pub allow_anonymous_telemetry: bool,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            steps_on_startup: HashMap::new(),
            disallowed_steps: Vec::new(),
            server_url: None,
            allow_anonymous_telemetry: true,
        }
    }
}

/// 按两候选路径加载项目配置（YAML 优先，无合并）
pub async fn load_project_config(host: &dyn Host) -> Result<ProjectConfig, EngineError> {
    let workspace = host.workspace_directory().await?;
    let dir = workspace.join(PROJECT_CONFIG_DIR);
    let yaml_path = dir.join("config.yaml");
    let json_path = dir.join("config.json");

    if yaml_path.exists() {
        let text = std::fs::read_to_string(&yaml_path)
            .map_err(|e| EngineError::Config(format!("read {}: {}", yaml_path.display(), e)))?;
        serde_yaml::from_str(&text)
            .map_err(|e| EngineError::Config(format!("parse {}: {}", yaml_path.display(), e)))
    } else if json_path.exists() {
        let text = std::fs::read_to_string(&json_path)
            .map_err(|e| EngineError::Config(format!("read {}: {}", json_path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| EngineError::Config(format!("parse {}: {}", json_path.display(), e)))
    } else {
        Ok(ProjectConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryHost;

    fn workspace_with(files: &[(&str, &str)]) -> (tempfile::TempDir, InMemoryHost) {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(PROJECT_CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        for (name, content) in files {
            std::fs::write(config_dir.join(name), content).unwrap();
        }
        let host = InMemoryHost::new(dir.path());
        (dir, host)
    }

    #[tokio::test]
    async fn test_neither_candidate_yields_default() {
        let (_dir, host) = workspace_with(&[]);
        let cfg = load_project_config(&host).await.unwrap();
        assert_eq!(cfg, ProjectConfig::default());
        assert!(cfg.allow_anonymous_telemetry);
    }

    #[tokio::test]
    async fn test_yaml_only() {
        let (_dir, host) = workspace_with(&[(
            "config.yaml",
            "server_url: http://localhost:65432\nallow_anonymous_telemetry: false\n",
        )]);
        let cfg = load_project_config(&host).await.unwrap();
        assert_eq!(cfg.server_url.as_deref(), Some("http://localhost:65432"));
        assert!(!cfg.allow_anonymous_telemetry);
    }

    #[tokio::test]
    async fn test_json_only() {
        let (_dir, host) = workspace_with(&[(
            "config.json",
            r#"{"disallowed_steps": ["shell"], "steps_on_startup": {"greet": {"loud": true}}}"#,
        )]);
        let cfg = load_project_config(&host).await.unwrap();
        assert_eq!(cfg.disallowed_steps, vec!["shell"]);
        assert!(cfg.steps_on_startup.contains_key("greet"));
    }

    #[tokio::test]
    async fn test_yaml_wins_over_json() {
        let (_dir, host) = workspace_with(&[
            ("config.yaml", "server_url: http://from-yaml\n"),
            ("config.json", r#"{"server_url": "http://from-json"}"#),
        ]);
        let cfg = load_project_config(&host).await.unwrap();
        assert_eq!(cfg.server_url.as_deref(), Some("http://from-yaml"));
    }

    #[tokio::test]
    async fn test_malformed_matched_file_fails_loudly() {
        let (_dir, host) = workspace_with(&[("config.yaml", "server_url: [unterminated\n")]);
        let err = load_project_config(&host).await.unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
