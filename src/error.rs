use thiserror::Error;

use crate::models::DocumentKind;

/// 应用程序错误类型
///
/// 每个流水线阶段对应一个变体，只携带给审核人看的文字说明，
/// 不向展示层传递结构化错误码。
#[derive(Debug, Error)]
pub enum AppError {
    /// 健康检查失败
    #[error("无法连接到 API ({base_url})，请确认后端服务是否已启动: {message}")]
    Connectivity { base_url: String, message: String },

    /// 文档抽取 / 上传失败
    #[error("{kind}抽取失败: {message}")]
    Extraction { kind: DocumentKind, message: String },

    /// 预览文件上传失败
    #[error("文件上传失败: {0}")]
    Upload(String),

    /// 对账失败（包括前置条件不满足）
    #[error("对账失败: {0}")]
    Reconcile(String),

    /// 异常说明生成失败
    #[error("异常说明生成失败: {0}")]
    Note(String),

    /// PDF 导出失败
    #[error("PDF 导出失败: {0}")]
    Export(String),

    /// 未选择待抽取的文档
    #[error("请同时选择发票和合同文件（缺少{missing}）")]
    DocumentsNotSelected { missing: String },

    /// 自动处理因文档缺失而未执行
    #[error("自动处理已跳过: {missing}未抽取成功，无法进行对账")]
    AutoChainSkipped { missing: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 文件读写错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建抽取错误
    pub fn extraction(kind: DocumentKind, message: impl Into<String>) -> Self {
        AppError::Extraction {
            kind,
            message: message.into(),
        }
    }

    /// 创建连接错误
    pub fn connectivity(base_url: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Connectivity {
            base_url: base_url.into(),
            message: message.into(),
        }
    }

    /// 创建文件错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
