//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的 HTTP 连接池（reqwest::Client），只暴露"发一次请求"的能力

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::models::DocumentFile;

/// 传输层错误
///
/// 流水线客户端会把它转换成对应阶段的 [`crate::AppError`]
#[derive(Debug, Error)]
pub enum TransportError {
    /// 网络请求失败（连接、超时等）
    #[error("网络请求失败 ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 后端返回非成功状态码
    #[error("HTTP {status} ({endpoint}): {detail}")]
    Status {
        endpoint: String,
        status: u16,
        detail: String,
    },
    /// 响应体无法解析
    #[error("JSON解析失败 ({endpoint}): {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

/// HTTP 执行器
///
/// 职责：
/// - 持有唯一的 Client 资源
/// - 暴露 get / post_json / post_multipart / post_json_for_bytes 能力
/// - 不认识发票 / 合同
/// - 不处理业务流程
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    base_url: String,
}

impl HttpExecutor {
    /// 创建新的 HTTP 执行器
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// GET 请求，只关心状态码
    pub async fn get(&self, endpoint: &str) -> Result<(), TransportError> {
        let response = self
            .client
            .get(self.url(endpoint))
            .send()
            .await
            .map_err(|source| request_failed(endpoint, source))?;
        check_status(endpoint, response).await?;
        Ok(())
    }

    /// POST JSON 并把响应反序列化为指定类型
    pub async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|source| request_failed(endpoint, source))?;
        decode(endpoint, response).await
    }

    /// 以 multipart 的 `file` 字段上传文档
    pub async fn post_multipart<T>(
        &self,
        endpoint: &str,
        file: &DocumentFile,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
    {
        debug!(
            "上传文件 {} ({} 字节, {}) 到 {}",
            file.file_name,
            file.bytes.len(),
            file.mime_type(),
            endpoint
        );

        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.mime_type())
            .map_err(|source| request_failed(endpoint, source))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|source| request_failed(endpoint, source))?;
        decode(endpoint, response).await
    }

    /// POST JSON，响应为二进制内容
    pub async fn post_json_for_bytes<B>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Vec<u8>, TransportError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(self.url(endpoint))
            .json(body)
            .send()
            .await
            .map_err(|source| request_failed(endpoint, source))?;
        let response = check_status(endpoint, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| request_failed(endpoint, source))?;
        Ok(bytes.to_vec())
    }
}

// ========== 辅助函数 ==========

fn request_failed(endpoint: &str, source: reqwest::Error) -> TransportError {
    TransportError::Request {
        endpoint: endpoint.to_string(),
        source,
    }
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        detail: error_detail(&body, status.canonical_reason().unwrap_or("unknown status")),
    })
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> Result<T, TransportError> {
    let response = check_status(endpoint, response).await?;
    let bytes = response
        .bytes()
        .await
        .map_err(|source| request_failed(endpoint, source))?;
    debug!("{} 响应 {} 字节", endpoint, bytes.len());

    serde_json::from_slice(&bytes).map_err(|source| TransportError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// 从错误响应体中提取说明：优先 `detail` 字段，其次原文，最后状态描述
fn error_detail(body: &str, fallback: &str) -> String {
    if let Ok(json) = serde_json::from_str::<JsonValue>(body) {
        match json.get("detail") {
            Some(JsonValue::String(detail)) => return detail.clone(),
            Some(other) if !other.is_null() => return other.to_string(),
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
