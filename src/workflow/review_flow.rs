//! 审核流程 - 流程层
//!
//! 核心职责：定义"一次审核"的完整处理流程
//!
//! 流程顺序：
//! 1. 发票 / 合同并发抽取
//! 2. 对账（自动处理时紧跟抽取）
//! 3. 生成异常说明
//! 4. 导出 PDF（可选）
//!
//! 每一步失败都写入全局错误信息，之前已保存的结果保持不变。

use tracing::{error, info, warn};

use crate::clients::PipelineApi;
use crate::error::{AppError, AppResult};
use crate::models::{DocumentFile, DocumentKind, ExtractionResponse};
use crate::services::NoteExporter;
use crate::workflow::state::{SourceDocument, Stage, StageStatus};
use crate::workflow::store::{Completion, ExtractionOutcome, WorkflowStore};

/// 审核流程
///
/// - 决定何时调用哪个后端能力
/// - 所有结果都经由 [`WorkflowStore`] 写入
/// - 不持有任何文档数据
pub struct ReviewFlow<A: PipelineApi> {
    api: A,
    store: WorkflowStore,
    exporter: NoteExporter,
}

impl<A: PipelineApi> ReviewFlow<A> {
    pub fn new(api: A, store: WorkflowStore, exporter: NoteExporter) -> Self {
        Self {
            api,
            store,
            exporter,
        }
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// 启动时的健康检查
    pub async fn check_connectivity(&self) -> AppResult<()> {
        match self.api.health().await {
            Ok(()) => {
                info!("✓ 后端服务连接正常");
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// 上传文件以获得预览地址
    pub async fn preview_document(
        &self,
        kind: DocumentKind,
        file: &DocumentFile,
    ) -> AppResult<Completion> {
        let mut ticket = self.store.begin(Stage::Preview);

        match self.api.upload_file(file).await {
            Ok(upload) => {
                info!("✓ {}预览已就绪: {}", kind, upload.file_url);
                Ok(self.store.complete_preview(&mut ticket, kind, upload))
            }
            Err(e) => {
                let _ = self.store.fail(&mut ticket, &e);
                Err(self.report_logged(e))
            }
        }
    }

    /// 并发抽取发票与合同
    ///
    /// 任一文档失败只影响它自己；抽取结果生效且开启了自动处理时，
    /// 接着执行对账和异常说明。
    pub async fn extract_documents(
        &self,
        invoice_file: Option<&DocumentFile>,
        contract_file: Option<&DocumentFile>,
    ) -> AppResult<Completion> {
        let (invoice_file, contract_file) = match (invoice_file, contract_file) {
            (Some(invoice), Some(contract)) => (invoice, contract),
            (invoice, contract) => {
                let missing = [
                    (DocumentKind::Invoice, invoice.is_none()),
                    (DocumentKind::Contract, contract.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(kind, _)| kind.name())
                .collect::<Vec<_>>()
                .join("和");
                return Err(self.report(AppError::DocumentsNotSelected { missing }));
            }
        };

        // 整条链路（抽取 + 自动处理）期间保持 loading
        let _chain = self.store.hold_loading();
        let mut ticket = self.store.begin(Stage::Extraction);

        let (invoice_res, contract_res) = futures::join!(
            self.api.extract(invoice_file, DocumentKind::Invoice),
            self.api.extract(contract_file, DocumentKind::Contract),
        );

        let outcome = collect_extraction(invoice_res, contract_res);
        for failure in &outcome.failures {
            error!("❌ {}", failure);
        }

        let completion = self.store.complete_extraction(&mut ticket, outcome);
        drop(ticket);

        if completion == Completion::Applied && self.store.read(|s| s.auto_processing) {
            self.run_auto_chain().await?;
        }

        Ok(completion)
    }

    /// 对账
    pub async fn run_reconcile(&self) -> AppResult<Completion> {
        let inputs = self
            .store
            .read(|s| s.invoice.clone().zip(s.contract.clone()));
        let Some((invoice, contract)) = inputs else {
            return Err(self.report(AppError::Reconcile(
                "请先完成发票和合同的抽取".to_string(),
            )));
        };

        let mut ticket = self.store.begin(Stage::Reconcile);

        match self.api.reconcile(&invoice, &contract).await {
            Ok(result) => {
                info!(
                    "✓ 对账完成: {} 条差异 (重大 {}, 轻微 {})",
                    result.summary.total_count, result.summary.major_count, result.summary.minor_count
                );
                Ok(self.store.complete_reconcile(&mut ticket, result))
            }
            Err(e) => {
                let _ = self.store.fail(&mut ticket, &e);
                Err(self.report_logged(e))
            }
        }
    }

    /// 生成异常说明
    pub async fn draft_note(&self) -> AppResult<Completion> {
        let inputs = self.store.read(|s| {
            match (&s.invoice, &s.contract, &s.reconcile_result) {
                (Some(i), Some(c), Some(r)) => Some((i.clone(), c.clone(), r.clone())),
                _ => None,
            }
        });
        let Some((invoice, contract, reconcile)) = inputs else {
            return Err(self.report(AppError::Note("请先完成对账".to_string())));
        };

        let mut ticket = self.store.begin(Stage::Note);

        match self.api.draft_note(&invoice, &contract, &reconcile).await {
            Ok(note) => {
                info!("✓ 异常说明已生成 ({} 字符)", note.markdown.chars().count());
                Ok(self.store.complete_note(&mut ticket, note))
            }
            Err(e) => {
                let _ = self.store.fail(&mut ticket, &e);
                Err(self.report_logged(e))
            }
        }
    }

    /// 自动处理：对账 → 异常说明，严格串行
    ///
    /// 任一步失败即停止，已保存的结果保留。
    /// 文档缺失时：若抽取失败已经说明了原因，只记日志；
    /// 否则写入 [`AppError::AutoChainSkipped`]。
    pub async fn run_auto_chain(&self) -> AppResult<Completion> {
        let _loading = self.store.hold_loading();

        let (auto, missing, extraction_status) = self.store.read(|s| {
            (
                s.auto_processing,
                s.missing_documents(),
                s.stages.get(Stage::Extraction),
            )
        });

        if !auto {
            return Ok(Completion::Skipped);
        }

        if !missing.is_empty() {
            let missing = missing
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join("和");

            if extraction_status == StageStatus::Failed {
                warn!("⚠️ {}抽取失败，跳过自动对账", missing);
                return Ok(Completion::Skipped);
            }
            return Err(self.report(AppError::AutoChainSkipped { missing }));
        }

        info!("🚀 自动处理: 对账 → 异常说明");

        let reconciled = self.run_reconcile().await?;
        if reconciled != Completion::Applied {
            return Ok(reconciled);
        }

        self.draft_note().await
    }

    /// 导出异常说明 PDF；尚无说明时什么也不做
    pub async fn export_note(&self) -> AppResult<Completion> {
        let inputs = self.store.read(|s| {
            s.note.clone().map(|note| {
                let invoice_number = s.invoice.as_ref().map(|i| i.invoice_number.clone());
                (note, invoice_number)
            })
        });
        let Some((note, invoice_number)) = inputs else {
            info!("尚未生成异常说明，跳过导出");
            return Ok(Completion::Skipped);
        };

        let mut ticket = self.store.begin(Stage::Export);

        let written = match self
            .api
            .export_note_pdf(&note, invoice_number.as_deref())
            .await
        {
            // 等待期间被 reset 或新的导出取代时，不再写文件
            Ok(_) if !self.store.is_current(&ticket) => {
                warn!(
                    "⚠️ 导出请求已过期 (令牌 #{})，不写入文件",
                    ticket.token().seq
                );
                return Ok(Completion::Discarded);
            }
            Ok(bytes) => self.exporter.write(&bytes, invoice_number.as_deref()).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(path) => Ok(self.store.complete_export(&mut ticket, path)),
            Err(e) => {
                let _ = self.store.fail(&mut ticket, &e);
                Err(self.report_logged(e))
            }
        }
    }

    // ========== 错误辅助函数 ==========

    /// 记录并写入全局错误
    fn report(&self, err: AppError) -> AppError {
        self.store.report_error(&err);
        self.report_logged(err)
    }

    /// 只记录日志（状态已由 `fail` 写入）
    fn report_logged(&self, err: AppError) -> AppError {
        error!("❌ {}", err);
        err
    }
}

/// 汇总两份文档的抽取结果，证据先发票后合同
fn collect_extraction(
    invoice_res: AppResult<ExtractionResponse>,
    contract_res: AppResult<ExtractionResponse>,
) -> ExtractionOutcome {
    let mut outcome = ExtractionOutcome::default();

    match invoice_res {
        Ok(resp) => {
            if resp.invoice.is_none() {
                warn!("⚠️ 后端未从文件中识别出发票");
            }
            outcome.invoice = resp.invoice;
            outcome.meta.extend(resp.meta);
            outcome.invoice_source = Some(SourceDocument {
                file_url: resp.file_url,
                pages: Some(resp.parse.pages),
            });
        }
        Err(e) => outcome.failures.push(e),
    }

    match contract_res {
        Ok(resp) => {
            if resp.contract.is_none() {
                warn!("⚠️ 后端未从文件中识别出合同");
            }
            outcome.contract = resp.contract;
            outcome.meta.extend(resp.meta);
            outcome.contract_source = Some(SourceDocument {
                file_url: resp.file_url,
                pages: Some(resp.parse.pages),
            });
        }
        Err(e) => outcome.failures.push(e),
    }

    outcome
}
