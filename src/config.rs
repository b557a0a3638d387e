use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "pactproof.toml";

/// 程序配置
///
/// 加载顺序：默认值 → TOML 配置文件（可选）→ 环境变量
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 地址
    pub api_base_url: String,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 抽取完成后是否自动对账并生成说明
    pub auto_processing: bool,
    /// 发票文件路径
    pub invoice_file: Option<String>,
    /// 合同文件路径
    pub contract_file: Option<String>,
    /// PDF 导出目录
    pub export_dir: String,
    /// 是否在流程结束后导出 PDF
    pub export_pdf: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 120,
            auto_processing: false,
            invoice_file: None,
            contract_file: None,
            export_dir: "out/notes".to_string(),
            export_pdf: false,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 完整加载：配置文件（`PACTPROOF_CONFIG` 或 `pactproof.toml`，不存在则跳过）+ 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("PACTPROOF_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };

        base.with_overrides(|name| std::env::var(name).ok())
    }

    /// 仅使用默认值 + 环境变量
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// 读取 TOML 配置文件，缺失的键使用默认值
    pub fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    pub fn from_toml_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_string(),
            source,
        })
    }

    /// 用 `lookup` 提供的变量覆盖当前配置
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(v) = lookup("API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = parse_var(&lookup, "REQUEST_TIMEOUT_SECS", "u64")? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "AUTO_PROCESSING", "bool")? {
            self.auto_processing = v;
        }
        if let Some(v) = lookup("INVOICE_FILE") {
            self.invoice_file = Some(v);
        }
        if let Some(v) = lookup("CONTRACT_FILE") {
            self.contract_file = Some(v);
        }
        if let Some(v) = lookup("EXPORT_DIR") {
            self.export_dir = v;
        }
        if let Some(v) = parse_var(&lookup, "EXPORT_PDF", "bool")? {
            self.export_pdf = v;
        }
        if let Some(v) = parse_var(&lookup, "VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = v;
        }
        Ok(self)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_toml_file_keeps_defaults_for_missing_keys() {
        let config = Config::from_toml_str(
            "api_base_url = \"http://backend:9000\"\nauto_processing = true\n",
            "inline.toml",
        )
        .unwrap();

        assert_eq!(config.api_base_url, "http://backend:9000");
        assert!(config.auto_processing);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.export_dir, "out/notes");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let base = Config::from_toml_str("request_timeout_secs = 10\n", "inline.toml").unwrap();
        let config = base
            .with_overrides(lookup_from(&[
                ("REQUEST_TIMEOUT_SECS", "30"),
                ("INVOICE_FILE", "inv.pdf"),
                ("EXPORT_PDF", "true"),
            ]))
            .unwrap();

        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.invoice_file.as_deref(), Some("inv.pdf"));
        assert!(config.export_pdf);
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let err = Config::default()
            .with_overrides(lookup_from(&[("AUTO_PROCESSING", "yes please")]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::EnvVarParseFailed { ref var_name, .. } if var_name == "AUTO_PROCESSING"));
    }

    #[test]
    fn test_bad_toml_is_reported() {
        let err = Config::from_toml_str("request_timeout_secs = \"soon\"", "bad.toml").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseFailed { .. }));
    }
}
