// ============================================================================
// 统一错误类型定义
// 使用 thiserror 派生宏：校验错误、传输错误、应用错误三层
// ============================================================================

use thiserror::Error;

/// 配方草稿校验失败
///
/// 全部发生在本地、发起网络请求之前，用户修改草稿即可解决。
/// `Display` 输出即面向用户的提示文案。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 配方名称去除首尾空白后为空
    #[error("Recipe name cannot be empty.")]
    EmptyName,

    /// 份数无法解析为有限正数
    #[error("Servings must be greater than 0.")]
    InvalidServings,

    /// 某一行食材名称为空或用量不合法（该行会被丢弃，不会单独拒绝请求）
    #[error("Ingredient row {} needs a name and a quantity greater than 0.", .0 + 1)]
    InvalidIngredient(usize),

    /// 丢弃无效行后没有任何食材
    #[error("Add at least one ingredient with a quantity greater than 0.")]
    NoIngredients,
}

/// 营养计算服务的传输层错误
///
/// 网络层的一切失败（DNS、超时、连接中断）都收敛到 `Network`，
/// 不会越过 `NutritionClient` 的边界继续向上抛出。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 连接失败或超时
    #[error("Unable to reach the nutrition service. Check your connection and try again.")]
    Network,

    /// 服务端返回非 2xx 状态码
    #[error("{message}")]
    Http { status: u16, message: String },

    /// 2xx 但响应体为空或无法解析
    #[error(
        "The nutrition service returned an unreadable response. \
         Verify the service is running and the API base URL is configured correctly."
    )]
    MalformedResponse,
}

impl TransportError {
    /// 归约为单条面向用户的提示文案
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// 应用统一错误枚举
///
/// 通过 `impl From<AppError> for String` 让 commands 层继续返回
/// `Result<T, String>`。
#[derive(Debug, Error)]
pub enum AppError {
    /// 调用营养计算服务失败
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// 标签文件交付失败（暂存、另存为、清理）
    #[error("Saving the label failed: {0}")]
    Delivery(String),

    /// 环境变量配置不合法
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// 草稿文件格式错误
    #[error("Invalid recipe draft: {0}")]
    DraftFormat(String),
}

/// 便捷类型别名，统一项目内的 Result 签名
pub type AppResult<T> = Result<T, AppError>;

/// 将 AppError 转换为 String，保持与 command 层返回类型的兼容性
impl From<AppError> for String {
    fn from(err: AppError) -> Self {
        err.to_string()
    }
}
