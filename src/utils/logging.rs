/// 日志工具模块
///
/// 提供订阅器初始化和日志格式化的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::BoundingBox;

/// 初始化日志订阅器
///
/// `RUST_LOG` 优先；未设置时默认 `info`，开启详细日志时为 `debug`。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `base_url`: 后端地址
/// - `auto_processing`: 是否自动对账
pub fn log_startup(base_url: &str, auto_processing: bool) {
    info!("{}", "=".repeat(60));
    info!("🚀 PactProof 审核客户端启动");
    info!("🔗 后端地址: {}", base_url);
    info!(
        "⚙️ 自动处理: {}",
        if auto_processing { "开启" } else { "关闭" }
    );
    info!("{}", "=".repeat(60));
}

/// 证据框的简短描述，如 `第1页 (0.10,0.20)-(0.40,0.25)`
pub fn describe_boxes(boxes: &[BoundingBox]) -> String {
    boxes
        .iter()
        .map(|b| {
            format!(
                "第{}页 ({:.2},{:.2})-({:.2},{:.2})",
                b.page + 1,
                b.left,
                b.top,
                b.right,
                b.bottom
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
