//! 工作流状态
//!
//! 由 [`super::WorkflowStore`] 独占持有和修改，外部只能拿到快照

use std::fmt;
use std::path::PathBuf;

use crate::models::{Contract, DocumentKind, ExtractionMeta, Invoice, ReconcileResult};

/// 流水线阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// 文件上传预览
    Preview,
    /// 解析与抽取
    Extraction,
    /// 对账
    Reconcile,
    /// 生成异常说明
    Note,
    /// 导出 PDF
    Export,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Preview,
        Stage::Extraction,
        Stage::Reconcile,
        Stage::Note,
        Stage::Export,
    ];

    /// 依赖于抽取结果的下游阶段，开始新的抽取时会被作废
    pub fn is_downstream_of_extraction(self) -> bool {
        matches!(self, Stage::Reconcile | Stage::Note)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Preview => "预览上传",
            Stage::Extraction => "抽取",
            Stage::Reconcile => "对账",
            Stage::Note => "异常说明",
            Stage::Export => "PDF导出",
        };
        write!(f, "{}", name)
    }
}

/// 单个阶段的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageStatus {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

/// 各阶段状态表
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageBoard {
    pub preview: StageStatus,
    pub extraction: StageStatus,
    pub reconcile: StageStatus,
    pub note: StageStatus,
    pub export: StageStatus,
}

impl StageBoard {
    pub fn get(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Preview => self.preview,
            Stage::Extraction => self.extraction,
            Stage::Reconcile => self.reconcile,
            Stage::Note => self.note,
            Stage::Export => self.export,
        }
    }

    pub fn set(&mut self, stage: Stage, status: StageStatus) {
        let slot = match stage {
            Stage::Preview => &mut self.preview,
            Stage::Extraction => &mut self.extraction,
            Stage::Reconcile => &mut self.reconcile,
            Stage::Note => &mut self.note,
            Stage::Export => &mut self.export,
        };
        *slot = status;
    }

    pub fn in_flight(&self, stage: Stage) -> bool {
        self.get(stage) == StageStatus::InFlight
    }
}

/// 工作流所处阶段（由状态推导，不单独存储）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowPhase {
    Idle,
    Extracting,
    Reconciling,
    Drafting,
    Exporting,
    Ready,
    Error,
}

/// 源文档信息（预览地址 + 页数）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceDocument {
    pub file_url: String,
    pub pages: Option<u32>,
}

/// 工作流状态
///
/// 进程启动时以 `Default` 创建，`reset` 后回到同样的初始值，不做持久化。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkflowState {
    pub invoice: Option<Invoice>,
    pub contract: Option<Contract>,
    /// 两份文档证据的并集（先发票后合同）
    pub extraction_meta: Vec<ExtractionMeta>,
    pub reconcile_result: Option<ReconcileResult>,
    pub note: Option<String>,

    pub loading: bool,
    pub error: Option<String>,
    pub highlighted_field_path: Option<String>,
    pub highlighted_finding_idx: Option<usize>,
    pub auto_processing: bool,

    pub invoice_source: Option<SourceDocument>,
    pub contract_source: Option<SourceDocument>,
    pub last_export: Option<PathBuf>,
    pub stages: StageBoard,
}

impl WorkflowState {
    /// 推导当前阶段
    pub fn phase(&self) -> WorkflowPhase {
        if self.stages.in_flight(Stage::Extraction) {
            WorkflowPhase::Extracting
        } else if self.stages.in_flight(Stage::Reconcile) {
            WorkflowPhase::Reconciling
        } else if self.stages.in_flight(Stage::Note) {
            WorkflowPhase::Drafting
        } else if self.stages.in_flight(Stage::Export) {
            WorkflowPhase::Exporting
        } else if self.error.is_some() {
            WorkflowPhase::Error
        } else if self.invoice.is_some()
            || self.contract.is_some()
            || self.reconcile_result.is_some()
            || self.note.is_some()
        {
            WorkflowPhase::Ready
        } else {
            WorkflowPhase::Idle
        }
    }

    /// 发票与合同是否都已抽取
    pub fn has_both_documents(&self) -> bool {
        self.invoice.is_some() && self.contract.is_some()
    }

    /// 缺失的文档
    pub fn missing_documents(&self) -> Vec<DocumentKind> {
        let mut missing = Vec::new();
        if self.invoice.is_none() {
            missing.push(DocumentKind::Invoice);
        }
        if self.contract.is_none() {
            missing.push(DocumentKind::Contract);
        }
        missing
    }

    pub fn source(&self, kind: DocumentKind) -> Option<&SourceDocument> {
        match kind {
            DocumentKind::Invoice => self.invoice_source.as_ref(),
            DocumentKind::Contract => self.contract_source.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_idle() {
        let state = WorkflowState::default();
        assert_eq!(state.phase(), WorkflowPhase::Idle);
        assert!(!state.loading);
        assert!(!state.auto_processing);
        assert_eq!(
            state.missing_documents(),
            vec![DocumentKind::Invoice, DocumentKind::Contract]
        );
    }

    #[test]
    fn test_in_flight_stage_wins_over_error() {
        let mut state = WorkflowState {
            error: Some("上一次失败".to_string()),
            ..Default::default()
        };
        assert_eq!(state.phase(), WorkflowPhase::Error);

        state.stages.set(Stage::Reconcile, StageStatus::InFlight);
        assert_eq!(state.phase(), WorkflowPhase::Reconciling);
    }
}
