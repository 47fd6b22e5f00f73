//! 错误类型定义
//!
//! 停止顺序计算本身不会失败；注册表、停止协调器、配置和日志系统使用本模块的错误类型。

use thiserror::Error;

/// 核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    // ==================== 注册表错误 ====================

    /// 模块未找到
    #[error("模块未找到: '{0}'")]
    ModuleNotFound(String),

    /// 模块已注册
    #[error("模块已注册: '{0}'")]
    ModuleAlreadyRegistered(String),

    /// 服务发布未找到
    #[error("服务发布未找到: id {0}")]
    PublicationNotFound(u64),

    /// 模块卸载失败
    #[error("模块卸载失败: '{module_id}' - {reason}")]
    ModuleUnloadFailed {
        module_id: String,
        reason: String,
    },

    // ==================== 停止流程错误 ====================

    /// 模块停止失败
    #[error("模块停止失败: '{module_id}' - {reason}")]
    ModuleStopFailed {
        module_id: String,
        reason: String,
    },

    /// 模块停止超时
    #[error("模块停止超时: '{module_id}' 超过 {timeout_ms} 毫秒")]
    StopTimeout {
        module_id: String,
        timeout_ms: u64,
    },

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        key: String,
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 操作结果类型别名
pub type Result<T> = std::result::Result<T, CoreError>;

/// 错误码常量
pub mod error_code {
    // 模块错误 (MODULE-xxx)
    pub const MODULE_NOT_FOUND: &str = "MODULE-001";
    pub const MODULE_ALREADY_REGISTERED: &str = "MODULE-002";
    pub const MODULE_UNLOAD_FAILED: &str = "MODULE-004";

    // 服务错误 (SERVICE-xxx)
    pub const PUBLICATION_NOT_FOUND: &str = "SERVICE-001";

    // 停止错误 (SHUTDOWN-xxx)
    pub const MODULE_STOP_FAILED: &str = "SHUTDOWN-001";
    pub const MODULE_STOP_TIMEOUT: &str = "SHUTDOWN-002";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";

    // 核心错误 (CORE-xxx)
    pub const CORE_INIT_FAILED: &str = "CORE-003";
}

impl CoreError {
    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::ModuleNotFound(_) => error_code::MODULE_NOT_FOUND,
            CoreError::ModuleAlreadyRegistered(_) => error_code::MODULE_ALREADY_REGISTERED,
            CoreError::ModuleUnloadFailed { .. } => error_code::MODULE_UNLOAD_FAILED,
            CoreError::PublicationNotFound(_) => error_code::PUBLICATION_NOT_FOUND,
            CoreError::ModuleStopFailed { .. } => error_code::MODULE_STOP_FAILED,
            CoreError::StopTimeout { .. } => error_code::MODULE_STOP_TIMEOUT,
            CoreError::ConfigLoadFailed(_) | CoreError::Yaml(_) | CoreError::Json(_) => {
                error_code::CONFIG_LOAD_FAILED
            }
            CoreError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            CoreError::InitFailed(_) => error_code::CORE_INIT_FAILED,
            _ => "UNKNOWN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::ModuleNotFound("42".to_string());
        assert!(err.to_string().contains("42"));

        let err = CoreError::StopTimeout {
            module_id: "7".to_string(),
            timeout_ms: 500,
        };
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_error_code() {
        let err = CoreError::PublicationNotFound(3);
        assert_eq!(err.error_code(), error_code::PUBLICATION_NOT_FOUND);

        let err = CoreError::ModuleStopFailed {
            module_id: "1".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(err.error_code(), error_code::MODULE_STOP_FAILED);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
        assert_eq!(core_err.error_code(), "UNKNOWN");
    }

    #[test]
    fn test_anyhow_conversion() {
        let core_err: CoreError = anyhow::anyhow!("hook failed").into();
        assert_eq!(core_err.to_string(), "hook failed");
    }
}
