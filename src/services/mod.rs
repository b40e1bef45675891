// ============================================================================
// 业务层：纯 Rust 核心逻辑
// ✅ 特点：不依赖命令行与输出格式，保持纯净，方便写 #[test]
// ⛔ 禁止：直接返回面向终端的错误格式
// ============================================================================

pub mod draft;
pub mod file_delivery;
pub mod normalizer;
pub mod nutrition_client;
pub mod validator;
pub mod workflow;
