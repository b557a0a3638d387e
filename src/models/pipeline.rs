//! 流水线接口的请求 / 响应载荷

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::document::{Contract, Invoice};
use super::evidence::ExtractionMeta;
use super::reconcile::ReconcileResult;
use crate::error::{AppError, AppResult};

static MIME_TYPES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "pdf" => "application/pdf",
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "tif" => "image/tiff",
    "tiff" => "image/tiff",
    "json" => "application/json",
};

/// 待上传的文档（文件名 + 原始字节）
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// 从磁盘读取文档
    pub async fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file(path.display().to_string(), e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());

        Ok(Self { file_name, bytes })
    }

    /// 根据扩展名推断 MIME 类型
    pub fn mime_type(&self) -> &'static str {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| MIME_TYPES.get(ext.to_ascii_lowercase().as_str()).copied())
            .unwrap_or("application/octet-stream")
    }
}

/// 文档解析信息
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParseInfo {
    pub pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

/// `POST /parse_extract/{kind}` 的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResponse {
    #[serde(default)]
    pub invoice: Option<Invoice>,
    #[serde(default)]
    pub contract: Option<Contract>,
    #[serde(default)]
    pub meta: Vec<ExtractionMeta>,
    #[serde(default)]
    pub parse: ParseInfo,
    pub file_url: String,
    #[serde(default)]
    pub file_path: String,
}

/// `POST /upload` 的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub file_url: String,
}

/// `POST /draft_note` 的响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteResponse {
    pub markdown: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReconcileRequest<'a> {
    pub invoice: &'a Invoice,
    pub contract: &'a Contract,
}

#[derive(Debug, Serialize)]
pub(crate) struct NoteRequest<'a> {
    pub invoice: &'a Invoice,
    pub contract: &'a Contract,
    pub reconcile: &'a ReconcileResult,
}

#[derive(Debug, Serialize)]
pub(crate) struct ExportRequest<'a> {
    pub note_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<&'a str>,
}
