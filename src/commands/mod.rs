// ============================================================================
// Commands 层：命令行前端与工作流之间的薄接口
// ✅ 只能做：接收参数、调用 services、把错误转换为 String
// ⛔ 禁止：包含业务逻辑
// ============================================================================

pub mod dashboard;
pub mod recipe;
