//! 日志系统模块
//!
//! 基于 tracing 生态初始化全局日志：
//!
//! - 多级别日志与 `EnvFilter` 过滤（`RUST_LOG` 优先）
//! - 可选 JSON 结构化输出
//! - 可选文件输出（非阻塞写入，按时间轮转）
//!
//! # 示例
//!
//! ```rust,no_run
//! use chips_shutdown::utils::logger::{Logger, LoggerConfig, RotationStrategy};
//!
//! let _guard = Logger::init(
//!     LoggerConfig::builder()
//!         .level("debug")
//!         .file_output("./logs")
//!         .rotation(RotationStrategy::Daily)
//!         .build(),
//! )
//! .unwrap();
//!
//! tracing::info!(module_id = 3, "模块已停止");
//! ```

use std::io;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::core::config::LogConfig;
use crate::utils::{CoreError, Result};

/// 日志轮转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    /// 不轮转（单个日志文件）
    Never,
    /// 每小时轮转
    Hourly,
    /// 每天轮转（默认）
    #[default]
    Daily,
}

impl RotationStrategy {
    fn to_rotation(self) -> Rotation {
        match self {
            RotationStrategy::Never => Rotation::NEVER,
            RotationStrategy::Hourly => Rotation::HOURLY,
            RotationStrategy::Daily => Rotation::DAILY,
        }
    }

    /// 从字符串解析轮转策略，无法识别时使用默认值
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "never" | "none" => RotationStrategy::Never,
            "hourly" | "hour" => RotationStrategy::Hourly,
            _ => RotationStrategy::Daily,
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RotationStrategy::Never => write!(f, "never"),
            RotationStrategy::Hourly => write!(f, "hourly"),
            RotationStrategy::Daily => write!(f, "daily"),
        }
    }
}

/// 日志系统配置
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// 默认日志级别（"trace", "debug", "info", "warn", "error"）
    pub level: String,

    /// 是否使用 JSON 格式输出
    pub json_format: bool,

    /// 是否输出到控制台
    pub console_output: bool,

    /// 文件输出目录（None 表示不输出到文件）
    pub file_output: Option<PathBuf>,

    /// 日志文件名前缀
    pub file_prefix: String,

    /// 日志轮转策略
    pub rotation: RotationStrategy,

    /// 是否显示目标模块
    pub show_target: bool,

    /// 是否显示线程 ID
    pub show_thread_ids: bool,

    /// 是否显示文件名和行号
    pub show_file_line: bool,

    /// 额外的过滤指令（EnvFilter 格式，逗号分隔）
    /// 例如："chips_shutdown::module::sorter=trace"
    pub filter_directives: Option<String>,

    /// 控制台是否启用 ANSI 颜色
    pub ansi_colors: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: None,
            file_prefix: "chips-shutdown".to_string(),
            rotation: RotationStrategy::Daily,
            show_target: true,
            show_thread_ids: false,
            show_file_line: false,
            filter_directives: None,
            ansi_colors: true,
        }
    }
}

impl LoggerConfig {
    /// 创建配置构建器
    pub fn builder() -> LoggerConfigBuilder {
        LoggerConfigBuilder::new()
    }

    /// 从 [`LogConfig`] 创建
    pub fn from_log_config(log_config: &LogConfig) -> Self {
        Self {
            level: log_config.level.clone(),
            json_format: log_config.json_format,
            file_output: if log_config.file_output {
                log_config.log_dir.clone()
            } else {
                None
            },
            rotation: RotationStrategy::parse(&log_config.rotation),
            ..Default::default()
        }
    }
}

/// 日志配置构建器
#[derive(Debug, Default)]
pub struct LoggerConfigBuilder {
    config: LoggerConfig,
}

impl LoggerConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
        }
    }

    /// 设置日志级别
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// 启用 JSON 格式输出
    pub fn json_format(mut self, enable: bool) -> Self {
        self.config.json_format = enable;
        self
    }

    /// 设置控制台输出
    pub fn console_output(mut self, enable: bool) -> Self {
        self.config.console_output = enable;
        self
    }

    /// 设置文件输出目录
    pub fn file_output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.file_output = Some(dir.into());
        self
    }

    /// 设置日志文件前缀
    pub fn file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    /// 设置轮转策略
    pub fn rotation(mut self, strategy: RotationStrategy) -> Self {
        self.config.rotation = strategy;
        self
    }

    /// 显示文件名和行号
    pub fn show_file_line(mut self, enable: bool) -> Self {
        self.config.show_file_line = enable;
        self
    }

    /// 设置过滤指令
    pub fn filter_directives(mut self, directives: impl Into<String>) -> Self {
        self.config.filter_directives = Some(directives.into());
        self
    }

    /// 启用 ANSI 颜色
    pub fn ansi_colors(mut self, enable: bool) -> Self {
        self.config.ansi_colors = enable;
        self
    }

    /// 构建配置
    pub fn build(self) -> LoggerConfig {
        self.config
    }
}

/// 日志系统守卫
///
/// 持有非阻塞写入器的 WorkerGuard，丢弃时会刷新所有挂起的日志。
#[derive(Default)]
pub struct LogGuard {
    _guards: Vec<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 日志系统
pub struct Logger;

impl Logger {
    /// 初始化全局日志系统
    ///
    /// 返回的 [`LogGuard`] 必须保持存活直到程序退出。
    ///
    /// # Errors
    ///
    /// - 过滤指令格式无效
    /// - 全局订阅者已被设置
    pub fn init(config: LoggerConfig) -> Result<LogGuard> {
        let filter = Self::create_env_filter(&config)?;
        let mut guards = Vec::new();
        let mut layers: Vec<BoxedLayer> = Vec::new();

        if config.console_output {
            let (writer, guard) = tracing_appender::non_blocking(io::stdout());
            guards.push(guard);
            layers.push(Self::fmt_layer(&config, writer, config.ansi_colors));
        }

        if let Some(ref log_dir) = config.file_output {
            let appender = RollingFileAppender::new(
                config.rotation.to_rotation(),
                log_dir,
                format!("{}.log", config.file_prefix),
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            guards.push(guard);
            layers.push(Self::fmt_layer(&config, writer, false));
        }

        tracing_subscriber::registry()
            .with(layers)
            .with(filter)
            .try_init()
            .map_err(|e| CoreError::InitFailed(format!("日志系统初始化失败: {}", e)))?;

        Ok(LogGuard { _guards: guards })
    }

    /// 尝试初始化日志系统，失败时返回空守卫
    ///
    /// 适用于测试等可能重复初始化的场景。
    pub fn try_init(config: LoggerConfig) -> LogGuard {
        Self::init(config).unwrap_or_default()
    }

    fn create_env_filter(config: &LoggerConfig) -> Result<EnvFilter> {
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

        if let Some(ref directives) = config.filter_directives {
            for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                let parsed: Directive =
                    directive
                        .parse()
                        .map_err(|e| CoreError::InvalidConfigValue {
                            key: "filter_directives".to_string(),
                            reason: format!("'{}': {}", directive, e),
                        })?;
                filter = filter.add_directive(parsed);
            }
        }

        Ok(filter)
    }

    fn fmt_layer<W>(config: &LoggerConfig, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line);

        if config.json_format {
            layer.json().with_ansi(false).boxed()
        } else {
            layer.with_ansi(ansi).boxed()
        }
    }
}

/// 标准日志字段名称
pub mod fields {
    /// 模块 ID
    pub const MODULE_ID: &str = "module_id";
    /// 发布 ID
    pub const PUBLICATION_ID: &str = "publication_id";
    /// 在停止顺序中的位置
    pub const POSITION: &str = "position";
    /// 循环成员
    pub const MEMBERS: &str = "members";
    /// 耗时（毫秒）
    pub const DURATION_MS: &str = "duration_ms";
    /// 错误码
    pub const ERROR_CODE: &str = "error_code";
}
