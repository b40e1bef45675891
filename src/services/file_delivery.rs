// ============================================================================
// 标签文件交付：文件名清洗、暂存、“另存为”、清理
// 纯 Rust 函数，不依赖网络，方便单元测试
// ============================================================================

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

use crate::models::dtos::DeliveryReceipt;
use crate::models::payload::BinaryPayload;
use crate::utils::error::{AppError, AppResult};

/// 清洗后文件名为空时使用的默认名称
pub const DEFAULT_BASE_NAME: &str = "nutrition_label";

/// 暂存文件序号，保证同一进程内的暂存文件名不冲突
static STAGE_COUNTER: AtomicU64 = AtomicU64::new(0);

// ============================================================================
// 交付目标 Trait 定义
// ============================================================================

/// “另存为”动作的抽象
///
/// 每次交付只调用一次。实现方只负责把暂存文件交付到最终位置，
/// 暂存文件的清理由 `FileDeliveryHandler` 负责。
pub trait DeliveryTarget: Send + Sync {
    fn save_as(&self, staged: &Path, file_name: &str) -> AppResult<PathBuf>;
}

/// 默认交付目标：复制到下载目录，同名文件直接覆盖
pub struct DownloadDirTarget {
    dir: PathBuf,
}

impl DownloadDirTarget {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DeliveryTarget for DownloadDirTarget {
    fn save_as(&self, staged: &Path, file_name: &str) -> AppResult<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Delivery(format!("cannot create {}: {}", self.dir.display(), e))
        })?;
        let dest = self.dir.join(file_name);
        std::fs::copy(staged, &dest).map_err(|e| {
            AppError::Delivery(format!("cannot write {}: {}", dest.display(), e))
        })?;
        Ok(dest)
    }
}

// ============================================================================
// 交付处理器
// ============================================================================

pub struct FileDeliveryHandler {
    staging_dir: PathBuf,
    target: Box<dyn DeliveryTarget>,
}

impl FileDeliveryHandler {
    pub fn new(staging_dir: impl Into<PathBuf>, target: Box<dyn DeliveryTarget>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            target,
        }
    }

    /// 交付二进制文档
    ///
    /// 先写入暂存文件，再触发一次“另存为”。暂存文件在任何退出路径上
    /// （包括“另存为”失败）都会被删除。
    pub fn deliver(&self, payload: &BinaryPayload, suggested_name: &str) -> AppResult<DeliveryReceipt> {
        let file_name = format!(
            "{}.{}",
            sanitize_file_name(suggested_name),
            extension_for(&payload.content_type)
        );

        std::fs::create_dir_all(&self.staging_dir).map_err(|e| {
            AppError::Delivery(format!(
                "cannot create staging directory {}: {}",
                self.staging_dir.display(),
                e
            ))
        })?;

        let staged = self.staging_dir.join(format!(
            ".{}-{}-{}.part",
            file_name,
            std::process::id(),
            STAGE_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        // 使用 scopeguard 确保暂存文件在任何情况下都会被清理
        let staged_path = staged.clone();
        let _guard = scopeguard::guard((), |_| {
            if staged_path.exists() {
                let _ = std::fs::remove_file(&staged_path);
            }
        });

        std::fs::write(&staged, &payload.bytes).map_err(|e| {
            AppError::Delivery(format!("cannot stage {}: {}", staged.display(), e))
        })?;

        let delivered_at = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| AppError::Delivery(format!("cannot format timestamp: {}", e)))?;

        let path = self.target.save_as(&staged, &file_name)?;

        let mut hasher = Sha256::new();
        hasher.update(&payload.bytes);
        let receipt = DeliveryReceipt {
            path,
            file_name,
            bytes: payload.bytes.len(),
            sha256: format!("{:x}", hasher.finalize()),
            delivered_at,
        };
        log::info!(
            "标签已保存: {} ({} bytes, sha256 {})",
            receipt.path.display(),
            receipt.bytes,
            receipt.sha256
        );
        Ok(receipt)
    }
}

/// 文件名清洗：每一段连续的 `[A-Za-z0-9_-]` 以外字符替换为一个 `_`，为空时使用默认名称
pub fn sanitize_file_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return DEFAULT_BASE_NAME.to_string();
    }
    let mut sanitized = String::with_capacity(trimmed.len());
    let mut in_run = false;
    for c in trimmed.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            sanitized.push(c);
            in_run = false;
        } else if !in_run {
            sanitized.push('_');
            in_run = true;
        }
    }
    sanitized
}

/// 根据 Content-Type 选择扩展名，未知类型按 PDF 处理
pub fn extension_for(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/svg+xml" => "svg",
        "text/html" => "html",
        _ => "pdf",
    }
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct FailingTarget;

    impl DeliveryTarget for FailingTarget {
        fn save_as(&self, staged: &Path, _file_name: &str) -> AppResult<PathBuf> {
            assert!(staged.exists(), "另存为时暂存文件应已写入");
            Err(AppError::Delivery("save dialog dismissed".to_string()))
        }
    }

    fn pdf_payload() -> BinaryPayload {
        BinaryPayload {
            bytes: b"%PDF-1.4 label".to_vec(),
            content_type: "application/pdf".to_string(),
            suggested_name: None,
        }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        match fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_sanitize_collapses_disallowed_runs() {
        assert_eq!(sanitize_file_name("Oats Bowl"), "Oats_Bowl");
        assert_eq!(sanitize_file_name("Mom's Masala"), "Mom_s_Masala");
        assert_eq!(sanitize_file_name("Dal-Tadka_v2"), "Dal-Tadka_v2");
        assert_eq!(sanitize_file_name("Chai ☕"), "Chai_");
        assert_eq!(
            sanitize_file_name("Mom's Masala Oats!! 2024"),
            "Mom_s_Masala_Oats_2024"
        );
        // 原有的下划线保留，不与替换段合并
        assert_eq!(sanitize_file_name("Poha_!! Mix"), "Poha__Mix");
        assert_eq!(sanitize_file_name("!!!"), "_");
    }

    #[test]
    fn test_sanitize_empty_uses_default() {
        assert_eq!(sanitize_file_name(""), DEFAULT_BASE_NAME);
        assert_eq!(sanitize_file_name("   "), DEFAULT_BASE_NAME);
    }

    #[test]
    fn test_extension_for_content_type() {
        assert_eq!(extension_for("application/pdf"), "pdf");
        assert_eq!(extension_for("Image/PNG; charset=binary"), "png");
        assert_eq!(extension_for("application/octet-stream"), "pdf");
    }

    #[test]
    fn test_deliver_saves_file_and_cleans_staging() {
        let staging = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let handler = FileDeliveryHandler::new(
            staging.path(),
            Box::new(DownloadDirTarget::new(downloads.path().join("labels"))),
        );

        let receipt = handler.deliver(&pdf_payload(), "Oats Bowl").unwrap();

        assert_eq!(receipt.file_name, "Oats_Bowl.pdf");
        assert_eq!(receipt.path, downloads.path().join("labels").join("Oats_Bowl.pdf"));
        assert_eq!(receipt.bytes, 14);
        assert_eq!(receipt.sha256.len(), 64);
        assert_eq!(fs::read(&receipt.path).unwrap(), b"%PDF-1.4 label".to_vec());
        assert!(dir_entries(staging.path()).is_empty(), "暂存目录应已清空");
    }

    #[test]
    fn test_failed_save_still_releases_staged_file() {
        let staging = TempDir::new().unwrap();
        let handler = FileDeliveryHandler::new(staging.path(), Box::new(FailingTarget));

        let err = handler.deliver(&pdf_payload(), "Oats Bowl").unwrap_err();

        assert!(err.to_string().contains("save dialog dismissed"));
        assert!(dir_entries(staging.path()).is_empty(), "失败路径也必须清理暂存文件");
    }
}
