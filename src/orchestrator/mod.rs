//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次审核的资源创建和流程调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (加载配置中的文档，打印报告)
//!     ↓
//! workflow::ReviewFlow (抽取 → 对账 → 说明 → 导出)
//!     ↓
//! services (能力层：证据关联 / PDF 落盘)      clients (PipelineApi)
//!                                                 ↓
//!                                  infrastructure (基础设施：HttpExecutor)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层创建 HTTP 客户端和状态容器
//! 2. **向下依赖**：编排层 → workflow → services / clients → infrastructure
//! 3. **无业务逻辑**：只做调度和输出，不做具体业务判断

pub mod app;

// 重新导出主要类型
pub use app::App;
