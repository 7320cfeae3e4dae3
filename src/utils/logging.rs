/// 日志工具模块
///
/// 提供日志初始化以及批量生成、阅卷统计的输出函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 `debug` 或 `info`。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录批量生成启动信息
///
/// # 参数
/// - `count`: 试卷数量
/// - `max_concurrent`: 最大并发数
/// - `seed`: 批次种子（用于复现）
pub fn log_startup(count: u32, max_concurrent: usize, seed: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 开始生成试卷 - 共 {} 张", count);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("🎲 批次种子: {} (设置 SAMPLING_SEED 可复现)", seed);
    info!("{}", "=".repeat(60));
}

/// 记录阶段开始信息
///
/// # 参数
/// - `phase`: 阶段名称
/// - `start`: 起始试卷编号
/// - `end`: 结束试卷编号
pub fn log_phase_start(phase: &str, start: u32, end: u32) {
    info!("\n{}", "─".repeat(60));
    info!("📦 {}: 试卷 {}-{}", phase, start, end);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `success`: 成功数量
/// - `failed`: 失败数量
/// - `total`: 总数
/// - `reference_pages`: 统一页数（如有）
pub fn print_final_stats(success: usize, failed: usize, total: usize, reference_pages: Option<u32>) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部生成完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", success, total);
    info!("❌ 失败: {}", failed);
    if let Some(pages) = reference_pages {
        info!("📄 统一页数: {}", pages);
    }
    info!("{}", "=".repeat(60));
}

/// 打印阅卷统计
pub fn print_evaluation_stats(complete: usize, total: usize, errors: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📝 阅卷完成 - {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("✅ 完整评分: {}/{}", complete, total);
    if errors > 0 {
        info!("⚠️ 单题错误: {}", errors);
    }
    info!("{}", "=".repeat(60));
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
