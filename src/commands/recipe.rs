// ============================================================================
// 配方草稿 Commands
// 负责：从 JSON 文件导入草稿
// ⛔ 禁止：包含业务逻辑
// ============================================================================

use std::path::Path;

use crate::models::draft::RecipeDraft;
use crate::services::nutrition_client::NutritionBackend;
use crate::services::workflow::WorkflowController;
use crate::utils::error::AppError;

/// 从 JSON 文件读取草稿
///
/// 用量和份数既可以写成数字也可以写成字符串。
pub fn load_draft_file(path: &Path) -> Result<RecipeDraft, String> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::DraftFormat(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse_draft(&text)
}

/// 解析草稿 JSON 文本
pub fn parse_draft(text: &str) -> Result<RecipeDraft, String> {
    let draft = serde_json::from_str::<RecipeDraft>(text)
        .map_err(|e| AppError::DraftFormat(e.to_string()))?;
    Ok(draft)
}

/// 导入草稿并替换控制器当前草稿
pub fn import_draft<B: NutritionBackend>(
    controller: &WorkflowController<B>,
    path: &Path,
) -> Result<RecipeDraft, String> {
    let draft = load_draft_file(path)?;
    log::info!(
        "已导入草稿 {}：{} 行食材",
        path.display(),
        draft.ingredients.len()
    );
    controller.replace_draft(draft.clone());
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_draft_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "Oats Bowl", "servings": 2, "ingredients": [{{"name": "Milk", "quantity_g": 300}}]}}"#
        )
        .unwrap();

        let draft = load_draft_file(file.path()).unwrap();
        assert_eq!(draft.name, "Oats Bowl");
        assert_eq!(draft.servings, "2");
        assert_eq!(draft.ingredients[0].quantity_g, "300");
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = load_draft_file(Path::new("/nonexistent/draft.json")).unwrap_err();
        assert!(err.starts_with("Invalid recipe draft: cannot read /nonexistent/draft.json"));
    }

    #[test]
    fn test_parse_draft_rejects_wrong_shape() {
        let err = parse_draft(r#"{"ingredients": "milk"}"#).unwrap_err();
        assert!(err.starts_with("Invalid recipe draft:"));
    }

    #[test]
    fn test_import_draft_replaces_controller_draft() {
        use crate::services::file_delivery::{DownloadDirTarget, FileDeliveryHandler};
        use crate::services::nutrition_client::NutritionClient;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let controller = WorkflowController::new(
            NutritionClient::with_base_url("http://127.0.0.1:9"),
            FileDeliveryHandler::new(
                dir.path().join("staging"),
                Box::new(DownloadDirTarget::new(dir.path().join("downloads"))),
            ),
        );
        let draft_path = dir.path().join("dal.json");
        std::fs::write(
            &draft_path,
            r#"{"name": "Dal", "servings": "4", "ingredients": [{"name": "Toor dal", "quantity_g": 400}]}"#,
        )
        .unwrap();

        let imported = import_draft(&controller, &draft_path).unwrap();

        assert_eq!(controller.draft(), imported);
        assert_eq!(controller.draft().ingredients.len(), 1);
        assert!(import_draft(&controller, &dir.path().join("missing.json")).is_err());
        assert_eq!(controller.draft().name, "Dal");
    }
}
