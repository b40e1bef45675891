// ============================================================================
// 营养计算服务客户端：/calculate、/generate-label、/health
// ✅ 只能做：HTTP 请求、响应分类、错误文案提取
// ⛔ 禁止：持有工作流状态；任何网络异常都不得越过本模块边界
// ============================================================================

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

use crate::models::draft::CalculationRequest;
use crate::models::payload::{BinaryPayload, CalculationResult};
use crate::utils::config::AppConfig;
use crate::utils::error::TransportError;

/// 计算失败且服务端没有给出 detail 时的提示
pub const CALCULATE_FALLBACK: &str = "Calculation failed.";

/// 标签生成失败且服务端没有给出 detail 时的提示
pub const LABEL_FALLBACK: &str = "PDF generation failed.";

/// 健康检查失败的默认提示
pub const HEALTH_FALLBACK: &str = "Health check failed.";

/// 非 JSON 错误响应体最多截取的字符数
pub const ERROR_EXCERPT_CHARS: usize = 220;

/// 未声明 Content-Type 时的默认文档类型
pub const DEFAULT_DOCUMENT_TYPE: &str = "application/pdf";

/// 营养计算服务的抽象，控制器只依赖此 trait
#[async_trait]
pub trait NutritionBackend: Send + Sync {
    /// 计算营养数据与合规评分
    async fn compute_nutrition(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculationResult, TransportError>;

    /// 生成标签文档（二进制，不做 JSON 解析）
    async fn generate_label(&self, request: &CalculationRequest)
        -> Result<BinaryPayload, TransportError>;

    /// 探测服务是否可达
    async fn check_health(&self) -> Result<(), TransportError>;
}

/// 基于 reqwest 的默认实现
#[derive(Clone, Debug)]
pub struct NutritionClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl NutritionClient {
    /// 使用启动时加载的配置构造客户端
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            timeout: config.request_timeout,
        }
    }

    /// 直接指定基础地址（末尾斜杠去除一次），不设超时
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.strip_suffix('/').unwrap_or(base_url).to_string(),
            timeout: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// 发送请求；连接、超时等失败统一归为 Network
    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let builder = match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };
        builder.send().await.map_err(|e| {
            log::warn!("请求营养计算服务失败: {}", e);
            TransportError::Network
        })
    }
}

#[async_trait]
impl NutritionBackend for NutritionClient {
    async fn compute_nutrition(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculationResult, TransportError> {
        let url = self.endpoint("calculate");
        let resp = self.send(self.http.post(&url).json(request)).await?;
        let resp = ensure_success(resp, CALCULATE_FALLBACK).await?;

        let body = resp.text().await.map_err(|e| {
            log::warn!("读取计算响应失败: {}", e);
            TransportError::Network
        })?;
        parse_calculation_body(&body)
    }

    async fn generate_label(
        &self,
        request: &CalculationRequest,
    ) -> Result<BinaryPayload, TransportError> {
        let url = self.endpoint("generate-label");
        let resp = self.send(self.http.post(&url).json(request)).await?;
        let resp = ensure_success(resp, LABEL_FALLBACK).await?;

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string());
        let suggested_name = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_filename);

        let bytes = resp.bytes().await.map_err(|e| {
            log::warn!("读取标签文档失败: {}", e);
            TransportError::Network
        })?;
        if bytes.is_empty() {
            return Err(TransportError::MalformedResponse);
        }

        Ok(BinaryPayload {
            bytes: bytes.to_vec(),
            content_type,
            suggested_name,
        })
    }

    async fn check_health(&self) -> Result<(), TransportError> {
        let url = self.endpoint("health");
        let resp = self.send(self.http.get(&url)).await?;
        let resp = ensure_success(resp, HEALTH_FALLBACK).await?;

        let body = resp.text().await.map_err(|_| TransportError::Network)?;
        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|_| TransportError::MalformedResponse)?;
        match value.get("status").and_then(|s| s.as_str()) {
            Some("ok") => Ok(()),
            _ => Err(TransportError::MalformedResponse),
        }
    }
}

/// 非 2xx 响应转换为 `TransportError::Http`
async fn ensure_success(
    resp: reqwest::Response,
    fallback: &str,
) -> Result<reqwest::Response, TransportError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = extract_error_message(&body, fallback);
    log::info!("营养计算服务返回错误：HTTP {} - {}", status, message);
    Err(TransportError::Http {
        status: status.as_u16(),
        message,
    })
}

/// 2xx 响应体必须是 JSON 对象
pub fn parse_calculation_body(body: &str) -> Result<CalculationResult, TransportError> {
    if body.trim().is_empty() {
        return Err(TransportError::MalformedResponse);
    }
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| TransportError::MalformedResponse)?;
    if !value.is_object() {
        return Err(TransportError::MalformedResponse);
    }
    serde_json::from_value(value).map_err(|e| {
        log::warn!("计算响应结构不符: {}", e);
        TransportError::MalformedResponse
    })
}

/// 从错误响应体中提取可读文案
///
/// - JSON 对象且 `detail` 为字符串：原样返回
/// - `detail` 为校验错误列表：拼接各条 `msg`
/// - JSON 字符串或无法解析的文本：截取前 220 个字符
/// - 其它情况：返回 `fallback`
pub fn extract_error_message(body: &str, fallback: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return fallback.to_string();
    }

    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => detail.clone(),
            Some(serde_json::Value::Array(items)) => {
                let messages: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if messages.is_empty() {
                    fallback.to_string()
                } else {
                    messages.join("; ")
                }
            }
            _ => fallback.to_string(),
        },
        Ok(serde_json::Value::String(text)) if !text.trim().is_empty() => excerpt(text.trim()),
        Ok(_) => fallback.to_string(),
        Err(_) => excerpt(trimmed),
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(ERROR_EXCERPT_CHARS).collect()
}

/// `Content-Disposition` 文件名，兼容 `filename*=UTF-8''...` 写法
static DISPOSITION_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).ok());

/// 解析 `Content-Disposition` 中的文件名
fn disposition_filename(header: &str) -> Option<String> {
    DISPOSITION_PATTERN
        .as_ref()?
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

// ============================================================================
// 单元测试
// ============================================================================
