//! # PactProof Review
//!
//! 发票与合同合规审核客户端：把两份文档交给后端抽取和对账，
//! 维护审核状态，并把每条差异关联回原文的坐标框。
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 连接池），只暴露能力
//! - `HttpExecutor` - 唯一的 `reqwest::Client` owner，提供 get / post 能力
//!
//! ### ② 客户端层（Clients）
//! - `clients/` - 后端流水线的每个接口各对应一个方法
//! - `PipelineApi` - 能力接口（生产用 HTTP，测试用内存实现）
//! - `PipelineClient` - 基于 `HttpExecutor` 的实现
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程
//! - `EvidenceCorrelator` - 字段 / 差异 ↔ 坐标框
//! - `NoteExporter` - PDF 落盘
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一次审核"的完整处理流程
//! - `WorkflowStore` - 唯一的状态持有者，丢弃过期响应
//! - `ReviewFlow` - 流程编排（extract → reconcile → note → export）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/app` - 命令行入口，加载配置中的文档并打印报告
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{PipelineApi, PipelineClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::HttpExecutor;
pub use models::{BoundingBox, Contract, DocumentFile, DocumentKind, Invoice, ReconcileResult};
pub use orchestrator::App;
pub use services::{active_overlay, EvidenceCorrelator, NoteExporter, Overlay};
pub use workflow::{Completion, ReviewFlow, WorkflowPhase, WorkflowState, WorkflowStore};
