//! 流水线能力接口
//!
//! 后端的每一项能力对应一个方法；每次调用就是一次请求 / 响应往返，
//! 不自动重试，也不支持中途取消。

use crate::error::AppResult;
use crate::models::{
    Contract, DocumentFile, DocumentKind, ExtractionResponse, Invoice, NoteResponse,
    ReconcileResult, UploadResponse,
};

/// 流水线后端
///
/// 生产环境由 [`super::PipelineClient`] 通过 HTTP 实现，测试中可替换为内存实现。
#[allow(async_fn_in_trait)]
pub trait PipelineApi {
    /// 连通性检查，失败返回 `AppError::Connectivity`
    async fn health(&self) -> AppResult<()>;

    /// 上传文件用于预览，失败返回 `AppError::Upload`
    async fn upload_file(&self, file: &DocumentFile) -> AppResult<UploadResponse>;

    /// 解析并抽取文档，失败返回 `AppError::Extraction`
    async fn extract(&self, file: &DocumentFile, kind: DocumentKind)
        -> AppResult<ExtractionResponse>;

    /// 对账，失败返回 `AppError::Reconcile`
    async fn reconcile(&self, invoice: &Invoice, contract: &Contract) -> AppResult<ReconcileResult>;

    /// 生成异常说明，失败返回 `AppError::Note`
    async fn draft_note(
        &self,
        invoice: &Invoice,
        contract: &Contract,
        reconcile: &ReconcileResult,
    ) -> AppResult<NoteResponse>;

    /// 导出 PDF，失败返回 `AppError::Export`
    async fn export_note_pdf(
        &self,
        note_text: &str,
        invoice_number: Option<&str>,
    ) -> AppResult<Vec<u8>>;
}
