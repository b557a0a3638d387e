//! 审核应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一次命令行审核的资源管理和调度。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建 HTTP 客户端与状态容器，检查后端是否可用
//! 2. **加载文档**：按配置读取发票和合同文件
//! 3. **流程调度**：抽取 → 对账 → 异常说明 → 导出
//! 4. **结果输出**：打印审核报告
//!
//! 阶段失败不会中断程序：错误已写入状态，报告里会显示出来。

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::clients::PipelineClient;
use crate::config::Config;
use crate::models::{DocumentFile, FindingSeverity, FindingType};
use crate::services::{EvidenceCorrelator, NoteExporter};
use crate::utils::logging::{describe_boxes, log_startup, truncate_text};
use crate::workflow::{Completion, ReviewFlow, WorkflowState, WorkflowStore};

/// 应用主结构
pub struct App {
    config: Config,
    flow: ReviewFlow<PipelineClient>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config.api_base_url, config.auto_processing);

        let client = PipelineClient::new(&config).context("创建 HTTP 客户端失败")?;

        let store = WorkflowStore::new();
        store.set_auto_processing(config.auto_processing);

        let flow = ReviewFlow::new(client, store, NoteExporter::from_config(&config));
        flow.check_connectivity()
            .await
            .context("后端健康检查失败")?;

        Ok(Self { config, flow })
    }

    pub fn flow(&self) -> &ReviewFlow<PipelineClient> {
        &self.flow
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let (invoice_file, contract_file) = self.load_documents().await?;

        if invoice_file.is_none() && contract_file.is_none() {
            warn!("⚠️ 未配置发票和合同文件 (INVOICE_FILE / CONTRACT_FILE)，程序结束");
            return Ok(());
        }

        let extracted = self
            .flow
            .extract_documents(invoice_file.as_ref(), contract_file.as_ref())
            .await;

        // 自动处理时对账和说明已在抽取后完成
        if matches!(extracted, Ok(Completion::Applied)) && !self.config.auto_processing {
            self.run_manual_steps().await;
        }

        if self.config.export_pdf {
            let _ = self.flow.export_note().await;
        }

        print_review_report(&self.flow.store().snapshot());
        Ok(())
    }

    /// 读取配置中的文档文件
    async fn load_documents(&self) -> Result<(Option<DocumentFile>, Option<DocumentFile>)> {
        info!("\n📁 正在读取文档...");

        let invoice = match &self.config.invoice_file {
            Some(path) => Some(
                DocumentFile::load(path)
                    .await
                    .with_context(|| format!("读取发票文件失败: {}", path))?,
            ),
            None => None,
        };
        let contract = match &self.config.contract_file {
            Some(path) => Some(
                DocumentFile::load(path)
                    .await
                    .with_context(|| format!("读取合同文件失败: {}", path))?,
            ),
            None => None,
        };

        Ok((invoice, contract))
    }

    /// 未开启自动处理时，逐步执行对账和异常说明
    async fn run_manual_steps(&self) {
        let has_both = self.flow.store().read(|s| s.has_both_documents());
        if !has_both {
            warn!("⚠️ 发票或合同未抽取成功，跳过对账");
            return;
        }

        if matches!(self.flow.run_reconcile().await, Ok(Completion::Applied)) {
            let _ = self.flow.draft_note().await;
        }
    }
}

// ========== 日志辅助函数 ==========

/// 打印审核报告
fn print_review_report(state: &WorkflowState) {
    info!("\n{}", "=".repeat(60));
    info!("📊 审核结果");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));

    match &state.invoice {
        Some(invoice) => info!(
            "📄 发票 {} | {} → {} | {} 行 | 合计 {:.2} {}",
            invoice.invoice_number,
            invoice.seller_name,
            invoice.client_name,
            invoice.items.len(),
            invoice.subtotal.total,
            invoice.currency
        ),
        None => info!("📄 发票: 未抽取"),
    }
    match &state.contract {
        Some(contract) => info!(
            "📄 合同 {} | {} | {} 行 | 允许偏差 {}%",
            contract.contract_id,
            contract.net_terms,
            contract.line_items.len(),
            contract.allowed_variance_pct
        ),
        None => info!("📄 合同: 未抽取"),
    }

    if let Some(result) = &state.reconcile_result {
        info!("{}", "─".repeat(60));
        let verdict = if result.summary.pass {
            "✅ 通过"
        } else {
            "❌ 未通过"
        };
        info!(
            "{} | 重大 {} | 轻微 {} | 共 {}",
            verdict,
            result.summary.major_count,
            result.summary.minor_count,
            result.summary.total_count
        );
        let breakdown = FindingType::ALL
            .iter()
            .map(|t| (t, result.count_of(*t)))
            .filter(|(_, n)| *n > 0)
            .map(|(t, n)| format!("{} ×{}", t.name(), n))
            .collect::<Vec<_>>();
        if !breakdown.is_empty() {
            info!("分类: {}", breakdown.join(", "));
        }

        let correlator = EvidenceCorrelator::from_state(state);
        for (idx, finding) in result.findings.iter().enumerate() {
            let marker = match finding.severity {
                FindingSeverity::Major => "🔴",
                FindingSeverity::Minor => "🟡",
            };
            info!(
                "{} [{}] {}: {}",
                marker,
                idx + 1,
                finding.finding_type.name(),
                truncate_text(&finding.details, 80)
            );

            let boxes = correlator.boxes_for_finding(idx);
            if !boxes.is_empty() {
                info!("   📍 证据: {}", describe_boxes(&boxes));
            }
            if let Some(line) = finding.invoice_line_idx {
                let fields = correlator.fields_for_invoice_line(line);
                if !fields.is_empty() {
                    info!("   🔗 相关字段: {}", fields.join(", "));
                }
            }
        }
    }

    if let Some(note) = &state.note {
        info!("{}", "─".repeat(60));
        info!("📝 异常说明预览:\n{}", truncate_text(note, 400));
    }
    if let Some(path) = &state.last_export {
        info!("📤 PDF 已导出至: {}", path.display());
    }
    if let Some(error) = &state.error {
        info!("⚠️ 最近的错误: {}", error);
    }
    info!("{}", "=".repeat(60));
}
