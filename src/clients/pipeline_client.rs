/// 流水线 API 客户端
///
/// 封装所有与 PactProof 后端相关的调用逻辑，自身不持有任何状态
use crate::clients::PipelineApi;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::HttpExecutor;
use crate::models::pipeline::{ExportRequest, NoteRequest, ReconcileRequest};
use crate::models::{
    Contract, DocumentFile, DocumentKind, ExtractionResponse, Invoice, NoteResponse,
    ReconcileResult, UploadResponse,
};
use tracing::{debug, info, warn};

/// 流水线客户端
#[derive(Debug, Clone)]
pub struct PipelineClient {
    executor: HttpExecutor,
}

impl PipelineClient {
    /// 创建新的流水线客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let executor = HttpExecutor::from_config(config)
            .map_err(|e| AppError::connectivity(&config.api_base_url, e.to_string()))?;
        Ok(Self { executor })
    }

    /// 使用已有的执行器创建
    pub fn with_executor(executor: HttpExecutor) -> Self {
        Self { executor }
    }

    pub fn base_url(&self) -> &str {
        self.executor.base_url()
    }
}

impl PipelineApi for PipelineClient {
    async fn health(&self) -> AppResult<()> {
        self.executor
            .get("/health")
            .await
            .map_err(|e| AppError::connectivity(self.base_url(), e.to_string()))
    }

    async fn upload_file(&self, file: &DocumentFile) -> AppResult<UploadResponse> {
        let response: UploadResponse = self
            .executor
            .post_multipart("/upload", file)
            .await
            .map_err(|e| AppError::Upload(e.to_string()))?;

        debug!("已上传 {} -> {}", response.filename, response.file_url);
        Ok(response)
    }

    async fn extract(
        &self,
        file: &DocumentFile,
        kind: DocumentKind,
    ) -> AppResult<ExtractionResponse> {
        info!("📄 正在抽取{}: {}", kind, file.file_name);

        let response: ExtractionResponse = self
            .executor
            .post_multipart(kind.extract_endpoint(), file)
            .await
            .map_err(|e| AppError::extraction(kind, e.to_string()))?;

        debug!(
            "{}抽取完成: {} 页, {} 条证据",
            kind,
            response.parse.pages,
            response.meta.len()
        );
        Ok(response)
    }

    async fn reconcile(&self, invoice: &Invoice, contract: &Contract) -> AppResult<ReconcileResult> {
        info!(
            "🔍 正在对账: 发票 {} ↔ 合同 {}",
            invoice.invoice_number, contract.contract_id
        );

        let result: ReconcileResult = self
            .executor
            .post_json("/reconcile", &ReconcileRequest { invoice, contract })
            .await
            .map_err(|e| AppError::Reconcile(e.to_string()))?;

        if !result.is_consistent() {
            warn!(
                "⚠️ 对账汇总与差异列表不一致: {:?} / {} 条差异",
                result.summary,
                result.findings.len()
            );
        }
        Ok(result)
    }

    async fn draft_note(
        &self,
        invoice: &Invoice,
        contract: &Contract,
        reconcile: &ReconcileResult,
    ) -> AppResult<NoteResponse> {
        info!("📝 正在生成发票 {} 的异常说明", invoice.invoice_number);

        self.executor
            .post_json(
                "/draft_note",
                &NoteRequest {
                    invoice,
                    contract,
                    reconcile,
                },
            )
            .await
            .map_err(|e| AppError::Note(e.to_string()))
    }

    async fn export_note_pdf(
        &self,
        note_text: &str,
        invoice_number: Option<&str>,
    ) -> AppResult<Vec<u8>> {
        info!("📤 正在导出 PDF (发票: {})", invoice_number.unwrap_or("-"));

        let bytes = self
            .executor
            .post_json_for_bytes(
                "/export_note_pdf",
                &ExportRequest {
                    note_text,
                    invoice_number,
                },
            )
            .await
            .map_err(|e| AppError::Export(e.to_string()))?;

        if bytes.is_empty() {
            return Err(AppError::Export("后端返回了空文件".to_string()));
        }
        Ok(bytes)
    }
}
