// ============================================================================
// 运行配置：仅从环境变量加载，启动时读取一次后显式传入各服务
// ⛔ 禁止：在 services 内部直接读取环境变量
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::utils::error::{AppError, AppResult};

/// 默认 API 基础路径（与前端开发代理的 /api 前缀一致）
pub const DEFAULT_API_BASE: &str = "/api";

/// 基础路径只有路径部分时拼接的默认源站
pub const DEFAULT_API_ORIGIN: &str = "http://localhost:8000";

/// 应用配置
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// 营养计算服务的基础地址（已去除末尾斜杠）
    pub api_base_url: String,
    /// 单次请求超时；`None` 表示不设超时
    pub request_timeout: Option<Duration>,
    /// 标签文件的最终保存目录
    pub download_dir: PathBuf,
    /// 临时文件暂存目录
    pub staging_dir: PathBuf,
}

impl AppConfig {
    /// 从进程环境变量加载配置
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值查找函数加载配置，方便测试注入
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = lookup("NUTRITION_API_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let origin = lookup("NUTRITION_API_ORIGIN")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_ORIGIN.to_string());

        let request_timeout = match lookup("NUTRITION_REQUEST_TIMEOUT_SECS") {
            Some(raw) if !raw.trim().is_empty() => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    AppError::Config(format!(
                        "NUTRITION_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got {:?}",
                        raw
                    ))
                })?;
                if secs == 0 {
                    return Err(AppError::Config(
                        "NUTRITION_REQUEST_TIMEOUT_SECS must be greater than 0".to_string(),
                    ));
                }
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        let download_dir = lookup("NUTRITION_DOWNLOAD_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let staging_dir = lookup("NUTRITION_STAGING_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            api_base_url: resolve_base_url(base.trim(), origin.trim())?,
            request_timeout,
            download_dir,
            staging_dir,
        })
    }
}

/// 解析基础地址：只含路径时拼接源站，末尾斜杠只去除一次
pub fn resolve_base_url(base: &str, origin: &str) -> AppResult<String> {
    let base = base.strip_suffix('/').unwrap_or(base);

    if base.starts_with("http://") || base.starts_with("https://") {
        return Ok(base.to_string());
    }

    if base.is_empty() || base.starts_with('/') {
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "NUTRITION_API_ORIGIN must be an http(s) URL, got {:?}",
                origin
            )));
        }
        let origin = origin.strip_suffix('/').unwrap_or(origin);
        return Ok(format!("{}{}", origin, base));
    }

    Err(AppError::Config(format!(
        "NUTRITION_API_BASE_URL must be an http(s) URL or an absolute path, got {:?}",
        base
    )))
}
