//! Configuration management
//!
//! Static configuration loaded once at startup: TOML file first,
//! environment variables override.

mod structs;

pub use structs::{
    AnalyticsConfig, AppConfig, FeaturesConfig, LoggingConfig, ServerConfig, StorageConfig,
};

use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// 初始化全局配置（进程内只执行一次）
pub fn init_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::load)
}

/// 获取全局配置
///
/// # Panics
/// 在 `init_config` 之前调用会 panic
pub fn get_config() -> &'static AppConfig {
    CONFIG.get().expect("Config not initialized, call init_config() first")
}

/// 获取全局配置，未初始化时回退到默认值（测试用）
pub fn get_config_or_default() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}
