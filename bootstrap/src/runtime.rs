//! 运行时初始化

use aside_config::AppConfig;
use aside_telemetry::{init_from_config, init_tracing_json};
use tracing::info;

/// 初始化日志
///
/// 生产环境或显式开启 `telemetry.json` 时输出 JSON
pub fn init_runtime(config: &AppConfig) {
    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_from_config(&config.telemetry);
    }

    info!(
        app_name = %config.app_name,
        app_env = %config.app_env,
        "Runtime initialized"
    );
}
