//! 配置
//!
//! 定义日志与停止流程的配置结构和加载逻辑。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::{CoreError, Result};

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
        }
    }
}

/// 停止流程配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 单个模块的停止超时（毫秒）
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// 某个模块停止失败后是否放弃停止剩余模块
    #[serde(default)]
    pub abort_on_failure: bool,

    /// 模块停止后是否从注册表撤销其服务发布
    #[serde(default = "default_true")]
    pub withdraw_on_stop: bool,
}

fn default_stop_timeout_ms() -> u64 {
    30000
}

fn default_true() -> bool {
    true
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            stop_timeout_ms: default_stop_timeout_ms(),
            abort_on_failure: false,
            withdraw_on_stop: true,
        }
    }
}

impl ShutdownConfig {
    /// 单个模块的停止超时
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

/// 总配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// 停止流程配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl CoreConfig {
    /// 创建配置构建器
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::new()
    }

    /// 从文件加载配置
    ///
    /// 扩展名为 `.json` 时按 JSON 解析，否则按 YAML 解析。加载后会校验配置。
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            CoreError::ConfigLoadFailed(format!("无法读取 {:?}: {}", path, e))
        })?;

        let mut config: CoreConfig = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.validate()?;
        config.config_path = Some(path);
        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.shutdown.stop_timeout_ms == 0 {
            return Err(CoreError::InvalidConfigValue {
                key: "shutdown.stop_timeout_ms".to_string(),
                reason: "超时时间必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: CoreConfig::default(),
        }
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 设置单个模块的停止超时（毫秒）
    pub fn stop_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.shutdown.stop_timeout_ms = timeout_ms;
        self
    }

    /// 某个模块停止失败后放弃剩余模块
    pub fn abort_on_failure(mut self) -> Self {
        self.config.shutdown.abort_on_failure = true;
        self
    }

    /// 设置停止后是否撤销服务发布
    pub fn withdraw_on_stop(mut self, enable: bool) -> Self {
        self.config.shutdown.withdraw_on_stop = enable;
        self
    }

    /// 构建配置
    pub fn build(self) -> CoreConfig {
        self.config
    }
}
