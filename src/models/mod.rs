// ============================================================================
// 数据模型层：草稿、原始响应、归一化 DTO
// ============================================================================

pub mod draft;
pub mod dtos;
pub mod payload;
