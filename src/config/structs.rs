use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error, warn};

/// 静态配置（从 TOML 加载，启动时使用）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub features: FeaturesConfig,
    pub analytics: AnalyticsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HTTP worker 数量，0 表示按 CPU 核数
    pub cpu_count: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cpu_count: 0,
        }
    }
}

impl ServerConfig {
    pub fn workers(&self) -> usize {
        if self.cpu_count == 0 {
            num_cpus::get()
        } else {
            self.cpu_count
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// 自动生成别名的长度
    pub random_code_length: usize,
    /// 未指定时的默认有效期（分钟）
    pub default_ttl_minutes: i64,
    /// 生成别名插入冲突时的最大重试次数
    pub max_generate_attempts: usize,
    /// 批量提交单次最大条数
    pub max_batch_size: usize,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            random_code_length: 6,
            default_ttl_minutes: 30,
            max_generate_attempts: 5,
            max_batch_size: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// 点击事件刷盘间隔（秒）
    pub flush_interval_secs: u64,
    /// 缓冲区达到该事件数时主动刷盘
    pub flush_threshold: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: 10,
            flush_threshold: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// 日志文件路径，空表示输出到控制台
    pub file: Option<String>,
    /// "text" 或 "json"
    pub format: String,
    pub enable_rotation: bool,
    pub max_backups: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            enable_rotation: true,
            max_backups: 7,
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file with environment variable fallback
    pub fn load() -> Self {
        let mut config = Self::load_from_file();
        config.override_with_env();
        config
    }

    /// Load configuration from TOML file
    fn load_from_file() -> Self {
        let config_paths = [
            "config.toml",
            "linksnip.toml",
            "config/config.toml",
            "/etc/linksnip/config.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                debug!("Loading config from: {}", path);
                match fs::read_to_string(path) {
                    Ok(content) => match toml::from_str::<AppConfig>(&content) {
                        Ok(config) => {
                            debug!("Successfully loaded config from: {}", path);
                            return config;
                        }
                        Err(e) => {
                            warn!("Failed to parse config file {}: {}", path, e);
                        }
                    },
                    Err(e) => {
                        warn!("Failed to read config file {}: {}", path, e);
                    }
                }
            }
        }

        debug!("No config file found, using defaults");
        Self::default()
    }

    /// Override configuration with environment variables
    fn override_with_env(&mut self) {
        // Server config
        if let Ok(host) = env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            } else {
                error!("Invalid SERVER_PORT: {}", port);
            }
        }
        if let Ok(cpu_count) = env::var("CPU_COUNT") {
            if let Ok(count) = cpu_count.parse() {
                self.server.cpu_count = count;
            } else {
                error!("Invalid CPU_COUNT: {}", cpu_count);
            }
        }

        // Storage config
        if let Ok(backend) = env::var("STORAGE_BACKEND") {
            self.storage.backend = backend;
        }

        // Feature config
        if let Ok(random_code_length) = env::var("RANDOM_CODE_LENGTH") {
            if let Ok(length) = random_code_length.parse() {
                self.features.random_code_length = length;
            } else {
                error!("Invalid RANDOM_CODE_LENGTH: {}", random_code_length);
            }
        }
        if let Ok(default_ttl) = env::var("DEFAULT_TTL_MINUTES") {
            match default_ttl.parse::<i64>() {
                Ok(ttl) if ttl > 0 => self.features.default_ttl_minutes = ttl,
                _ => error!("Invalid DEFAULT_TTL_MINUTES: {}", default_ttl),
            }
        }
        if let Ok(max_batch) = env::var("MAX_BATCH_SIZE") {
            if let Ok(size) = max_batch.parse() {
                self.features.max_batch_size = size;
            } else {
                error!("Invalid MAX_BATCH_SIZE: {}", max_batch);
            }
        }

        // Analytics config
        if let Ok(interval) = env::var("CLICK_FLUSH_INTERVAL") {
            if let Ok(secs) = interval.parse() {
                self.analytics.flush_interval_secs = secs;
            } else {
                error!("Invalid CLICK_FLUSH_INTERVAL: {}", interval);
            }
        }
        if let Ok(threshold) = env::var("CLICK_FLUSH_THRESHOLD") {
            if let Ok(n) = threshold.parse() {
                self.analytics.flush_threshold = n;
            } else {
                error!("Invalid CLICK_FLUSH_THRESHOLD: {}", threshold);
            }
        }

        // Logging config
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(file) = env::var("LOG_FILE") {
            self.logging.file = Some(file);
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.features.random_code_length, 6);
        assert_eq!(config.features.default_ttl_minutes, 30);
        assert_eq!(config.features.max_generate_attempts, 5);
        assert_eq!(config.features.max_batch_size, 5);
    }

    #[test]
    fn test_parse_partial_toml() {
        let content = r#"
            [server]
            port = 9090

            [features]
            default_ttl_minutes = 60
        "#;
        let config: AppConfig = toml::from_str(content).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.features.default_ttl_minutes, 60);
        assert_eq!(config.features.random_code_length, 6);
    }

    #[test]
    fn test_workers_fallback_to_cpu_count() {
        let config = ServerConfig {
            cpu_count: 0,
            ..Default::default()
        };
        assert!(config.workers() >= 1);

        let config = ServerConfig {
            cpu_count: 4,
            ..Default::default()
        };
        assert_eq!(config.workers(), 4);
    }
}
