//! 工作流状态容器
//!
//! 进程内唯一的状态持有者。所有展示层读取它，所有流水线完成回调修改它。
//!
//! ## 过期响应
//!
//! 每个阶段开始时领取一个单调递增的请求令牌；完成时只有令牌仍是该阶段
//! 最新签发的那一个，结果才会被写入，否则直接丢弃。开始新的抽取会作废
//! 尚未返回的对账 / 说明请求，`reset` 会作废所有请求。
//!
//! ## loading
//!
//! `loading` 由 [`LoadingGuard`] 维护：创建时计数加一，Drop 时减一，
//! 因此无论成功、失败还是提前返回，都恰好释放一次。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{
    Contract, DocumentKind, ExtractionMeta, Invoice, NoteResponse, ReconcileResult, UploadResponse,
};
use crate::workflow::state::{SourceDocument, Stage, StageStatus, WorkflowState};

/// 完成回调的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Completion {
    /// 结果已写入状态
    Applied,
    /// 令牌已过期，结果被丢弃
    Discarded,
    /// 前置条件不满足，什么也没做
    Skipped,
}

/// 请求令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    pub stage: Stage,
    pub seq: u64,
}

/// 一次抽取的汇总结果
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub invoice: Option<Invoice>,
    pub contract: Option<Contract>,
    pub meta: Vec<ExtractionMeta>,
    pub invoice_source: Option<SourceDocument>,
    pub contract_source: Option<SourceDocument>,
    /// 单份文档的失败，不影响另一份
    pub failures: Vec<AppError>,
}

#[derive(Debug, Default)]
struct Inner {
    state: WorkflowState,
    next_seq: u64,
    latest: HashMap<Stage, u64>,
    in_flight: usize,
    epoch: u64,
}

impl Inner {
    fn is_latest(&self, token: RequestToken) -> bool {
        self.latest.get(&token.stage) == Some(&token.seq)
    }
}

/// 工作流状态容器（可廉价 clone 的句柄）
#[derive(Debug, Clone, Default)]
pub struct WorkflowStore {
    inner: Arc<Mutex<Inner>>,
}

/// 保持 `loading = true` 的守卫
#[derive(Debug)]
pub struct LoadingGuard {
    store: WorkflowStore,
    epoch: u64,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut inner = self.store.lock();
        // reset 之后签发的计数已清零，旧守卫不再参与
        if inner.epoch == self.epoch {
            inner.in_flight = inner.in_flight.saturating_sub(1);
            inner.state.loading = inner.in_flight > 0;
        }
    }
}

/// 单个阶段的在途请求
#[derive(Debug)]
pub struct StageTicket {
    token: RequestToken,
    settled: bool,
    // 字段按声明顺序 drop，守卫最后释放
    loading: LoadingGuard,
}

impl StageTicket {
    pub fn token(&self) -> RequestToken {
        self.token
    }
}

impl Drop for StageTicket {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        // 未完成就被丢弃（提前返回或 panic）：阶段状态回到 Idle
        let mut inner = self.loading.store.lock();
        if inner.is_latest(self.token) && inner.state.stages.in_flight(self.token.stage) {
            inner.state.stages.set(self.token.stage, StageStatus::Idle);
        }
    }
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> WorkflowState {
        self.lock().state.clone()
    }

    /// 只读访问，避免整份 clone
    pub fn read<R>(&self, f: impl FnOnce(&WorkflowState) -> R) -> R {
        f(&self.lock().state)
    }

    // ========== 直接字段更新 ==========

    pub fn set_auto_processing(&self, enabled: bool) {
        self.lock().state.auto_processing = enabled;
    }

    pub fn highlight_field(&self, field_path: Option<String>) {
        self.lock().state.highlighted_field_path = field_path;
    }

    pub fn highlight_finding(&self, finding_idx: Option<usize>) {
        self.lock().state.highlighted_finding_idx = finding_idx;
    }

    /// 关闭错误提示
    pub fn dismiss_error(&self) {
        self.lock().state.error = None;
    }

    /// 写入全局错误信息（覆盖上一条）
    pub fn report_error(&self, err: &AppError) {
        self.lock().state.error = Some(err.to_string());
    }

    /// 所有字段回到初始值，并作废所有在途请求
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = WorkflowState::default();
        inner.latest.clear();
        inner.in_flight = 0;
        inner.epoch += 1;
        debug!("工作流已重置 (epoch {})", inner.epoch);
    }

    // ========== 请求生命周期 ==========

    /// 在一段操作期间保持 loading
    pub fn hold_loading(&self) -> LoadingGuard {
        let mut inner = self.lock();
        inner.in_flight += 1;
        inner.state.loading = true;
        LoadingGuard {
            store: self.clone(),
            epoch: inner.epoch,
        }
    }

    /// 开始一个阶段，领取令牌
    ///
    /// 开始抽取时会清空错误信息，并作废在途的对账 / 说明请求。
    pub fn begin(&self, stage: Stage) -> StageTicket {
        let loading = self.hold_loading();
        let mut inner = self.lock();

        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.latest.insert(stage, seq);
        inner.state.stages.set(stage, StageStatus::InFlight);

        if stage == Stage::Extraction {
            inner.state.error = None;
            for downstream in Stage::ALL.into_iter().filter(|s| s.is_downstream_of_extraction()) {
                if inner.latest.remove(&downstream).is_some()
                    && inner.state.stages.in_flight(downstream)
                {
                    inner.state.stages.set(downstream, StageStatus::Idle);
                }
            }
        }

        debug!("{}开始 (令牌 #{})", stage, seq);
        StageTicket {
            token: RequestToken { stage, seq },
            settled: false,
            loading,
        }
    }

    /// 令牌是否仍是该阶段最新的
    pub fn is_current(&self, ticket: &StageTicket) -> bool {
        self.lock().is_latest(ticket.token)
    }

    fn settle(
        &self,
        ticket: &mut StageTicket,
        status: StageStatus,
        apply: impl FnOnce(&mut WorkflowState),
    ) -> Completion {
        ticket.settled = true;
        let mut inner = self.lock();

        if !inner.is_latest(ticket.token) {
            warn!(
                "⚠️ 丢弃过期的{}响应 (令牌 #{})",
                ticket.token.stage, ticket.token.seq
            );
            return Completion::Discarded;
        }

        apply(&mut inner.state);
        inner.state.stages.set(ticket.token.stage, status);
        Completion::Applied
    }

    /// 阶段失败：写入错误信息，保留之前的结果
    pub fn fail(&self, ticket: &mut StageTicket, err: &AppError) -> Completion {
        let message = err.to_string();
        self.settle(ticket, StageStatus::Failed, |state| {
            state.error = Some(message);
        })
    }

    /// 抽取完成：缺失的文档就是缺失，不算错误
    pub fn complete_extraction(
        &self,
        ticket: &mut StageTicket,
        outcome: ExtractionOutcome,
    ) -> Completion {
        let status = if outcome.failures.is_empty() {
            StageStatus::Succeeded
        } else {
            StageStatus::Failed
        };
        let error = if outcome.failures.is_empty() {
            None
        } else {
            Some(
                outcome
                    .failures
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };

        self.settle(ticket, status, move |state| {
            state.invoice = outcome.invoice;
            state.contract = outcome.contract;
            state.extraction_meta = outcome.meta;
            state.invoice_source = outcome.invoice_source;
            state.contract_source = outcome.contract_source;
            state.error = error;
        })
    }

    /// 对账完成：写入结果并清除错误
    pub fn complete_reconcile(
        &self,
        ticket: &mut StageTicket,
        result: ReconcileResult,
    ) -> Completion {
        self.settle(ticket, StageStatus::Succeeded, move |state| {
            state.reconcile_result = Some(result);
            state.error = None;
        })
    }

    /// 说明生成完成
    pub fn complete_note(&self, ticket: &mut StageTicket, note: NoteResponse) -> Completion {
        self.settle(ticket, StageStatus::Succeeded, move |state| {
            state.note = Some(note.markdown);
            state.error = None;
        })
    }

    /// PDF 导出完成
    pub fn complete_export(&self, ticket: &mut StageTicket, path: PathBuf) -> Completion {
        self.settle(ticket, StageStatus::Succeeded, move |state| {
            state.last_export = Some(path);
            state.error = None;
        })
    }

    /// 预览上传完成
    pub fn complete_preview(
        &self,
        ticket: &mut StageTicket,
        kind: DocumentKind,
        upload: UploadResponse,
    ) -> Completion {
        self.settle(ticket, StageStatus::Succeeded, move |state| {
            let slot = match kind {
                DocumentKind::Invoice => &mut state.invoice_source,
                DocumentKind::Contract => &mut state.contract_source,
            };
            let pages = slot.as_ref().and_then(|s| s.pages);
            *slot = Some(SourceDocument {
                file_url: upload.file_url,
                pages,
            });
        })
    }
}
