// ============================================================================
// 看板 Commands
// 负责：营养计算、标签下载、服务探测
// 把工作流的提交结果转换为 Result<T, String>
// ============================================================================

use crate::models::dtos::{
    DeliveryReceipt, NormalizedResult, OperationKind, SubmitOutcome, WorkflowSnapshot,
};
use crate::services::nutrition_client::NutritionBackend;
use crate::services::workflow::WorkflowController;
use crate::utils::error::AppError;

/// 同类操作仍在进行时的提示
pub const BUSY_MESSAGE: &str = "Another request is still in progress.";

/// 结果已被重置丢弃时的提示
pub const SUPERSEDED_MESSAGE: &str = "The request was discarded because the recipe was reset.";

fn outcome_error<B: NutritionBackend>(
    controller: &WorkflowController<B>,
    kind: OperationKind,
    outcome: SubmitOutcome,
) -> String {
    match outcome {
        SubmitOutcome::Busy => BUSY_MESSAGE.to_string(),
        SubmitOutcome::Superseded => SUPERSEDED_MESSAGE.to_string(),
        SubmitOutcome::Failed | SubmitOutcome::Succeeded => controller
            .operation_state(kind)
            .error()
            .map(str::to_string)
            .unwrap_or_default(),
    }
}

/// 计算营养数据，返回看板所需的规范化结果
pub async fn calculate_nutrition<B: NutritionBackend>(
    controller: &WorkflowController<B>,
) -> Result<NormalizedResult, String> {
    match controller.submit_calculation().await {
        SubmitOutcome::Succeeded => controller
            .result()
            .ok_or_else(|| SUPERSEDED_MESSAGE.to_string()),
        outcome => Err(outcome_error(controller, OperationKind::Calculate, outcome)),
    }
}

/// 生成标签并保存到下载目录
pub async fn download_label<B: NutritionBackend>(
    controller: &WorkflowController<B>,
) -> Result<DeliveryReceipt, String> {
    match controller.submit_label().await {
        SubmitOutcome::Succeeded => controller
            .snapshot()
            .last_delivery
            .ok_or_else(|| SUPERSEDED_MESSAGE.to_string()),
        outcome => Err(outcome_error(controller, OperationKind::Label, outcome)),
    }
}

/// 探测营养计算服务
pub async fn check_service<B: NutritionBackend>(
    controller: &WorkflowController<B>,
) -> Result<(), String> {
    controller.probe_service().await.map_err(AppError::from)?;
    Ok(())
}

/// 当前工作流快照
pub fn workflow_snapshot<B: NutritionBackend>(controller: &WorkflowController<B>) -> WorkflowSnapshot {
    controller.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::draft::{CalculationRequest, IngredientField};
    use crate::models::payload::{BinaryPayload, CalculationResult};
    use crate::services::file_delivery::{DownloadDirTarget, FileDeliveryHandler};
    use crate::utils::error::TransportError;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// 内存后端：计算固定返回 400 克，标签固定失败
    struct StubBackend;

    #[async_trait]
    impl NutritionBackend for StubBackend {
        async fn compute_nutrition(
            &self,
            _request: &CalculationRequest,
        ) -> Result<CalculationResult, TransportError> {
            Ok(serde_json::from_value(serde_json::json!({"total_weight": 400})).unwrap())
        }

        async fn generate_label(
            &self,
            _request: &CalculationRequest,
        ) -> Result<BinaryPayload, TransportError> {
            Err(TransportError::Network)
        }

        async fn check_health(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn controller(dir: &TempDir) -> WorkflowController<StubBackend> {
        let delivery = FileDeliveryHandler::new(
            dir.path().join("staging"),
            Box::new(DownloadDirTarget::new(dir.path().join("downloads"))),
        );
        let controller = WorkflowController::new(StubBackend, delivery);
        controller.set_name("Dal");
        controller.set_servings("4");
        controller.update_ingredient(0, IngredientField::Name, "Toor dal");
        controller.update_ingredient(0, IngredientField::QuantityG, "400");
        controller
    }

    #[tokio::test]
    async fn test_calculate_returns_normalized_result() {
        let dir = TempDir::new().unwrap();
        let controller = controller(&dir);

        let result = calculate_nutrition(&controller).await.unwrap();
        assert_eq!(result.total_weight, 400.0);
        assert_eq!(result.per_serving_weight, 100.0);
    }

    #[tokio::test]
    async fn test_download_label_surfaces_transport_message() {
        let dir = TempDir::new().unwrap();
        let controller = controller(&dir);

        let err = download_label(&controller).await.unwrap_err();
        assert_eq!(
            err,
            "Unable to reach the nutrition service. Check your connection and try again."
        );
        assert!(workflow_snapshot(&controller).last_delivery.is_none());
    }

    #[tokio::test]
    async fn test_calculate_surfaces_validation_message() {
        let dir = TempDir::new().unwrap();
        let controller = controller(&dir);
        controller.set_name("  ");

        let err = calculate_nutrition(&controller).await.unwrap_err();
        assert_eq!(err, "Recipe name cannot be empty.");
    }

    #[tokio::test]
    async fn test_check_service() {
        let dir = TempDir::new().unwrap();
        assert!(check_service(&controller(&dir)).await.is_ok());
    }
}
