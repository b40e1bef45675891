// ============================================================================
// 工具层：错误类型与运行配置
// ============================================================================

pub mod config;
pub mod error;
