//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HERON__*` 覆盖（双下划线表示嵌套，
//! 如 `HERON__LLM__MODEL=gpt-4o`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::AgentError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：OpenAI 兼容端点与模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub model: String,
    /// 自定义 base_url（代理 / 兼容端点）；未设置时用官方端点
    pub base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: None,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 电影数据 CSV 路径；未设置或加载失败时用内置样例
    pub dataset_path: Option<PathBuf>,
    /// 是否允许在运行中提供图表工具（按问题逐次开启）
    pub charts_enabled: bool,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            dataset_path: None,
            charts_enabled: true,
        }
    }
}

/// 加载配置：TOML 文件（若存在）+ HERON__* 环境变量覆盖
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, AgentError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HERON")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder
        .build()
        .map_err(|e| AgentError::Config(e.to_string()))?;
    c.try_deserialize()
        .map_err(|e| AgentError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        assert!(cfg.tools.charts_enabled);
        assert!(cfg.tools.dataset_path.is_none());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heron.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[llm]\nmodel = \"gpt-4o\"\n\n[tools]\ncharts_enabled = false"
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.llm.model, "gpt-4o");
        assert!(!cfg.tools.charts_enabled);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[llm\nmodel = ").unwrap();

        let err = load_config(Some(path)).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
