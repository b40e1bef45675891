// ============================================================================
// 工作流控制器：草稿、两类异步操作的状态、最近一次结果与错误
// 状态只在短暂持锁期间整体替换，任何 await 期间都不持有锁
// ============================================================================
//
// 每个操作：Idle → InFlight → Idle（成功）或 Failed（失败）
// calculate 与 label 互相独立，可以同时处于 InFlight。
// 同类操作仍在进行时再次提交直接返回 Busy。
// 每次提交分配递增序号，结算时序号不是最新的则丢弃结果。

use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::draft::{IngredientField, RecipeDraft};
use crate::models::dtos::{
    DeliveryReceipt, NormalizedResult, OperationKind, OperationState, SubmitOutcome,
    WorkflowSnapshot,
};
use crate::services::file_delivery::FileDeliveryHandler;
use crate::services::normalizer::normalize;
use crate::services::nutrition_client::NutritionBackend;
use crate::services::validator::{first_message, validate};
use crate::utils::error::{AppError, TransportError};

#[derive(Default)]
struct WorkflowState {
    draft: RecipeDraft,
    calculate: OperationState,
    label: OperationState,
    result: Option<NormalizedResult>,
    last_error: Option<(OperationKind, String)>,
    last_delivery: Option<DeliveryReceipt>,
    calculate_seq: u64,
    label_seq: u64,
}

impl WorkflowState {
    fn operation(&self, kind: OperationKind) -> &OperationState {
        match kind {
            OperationKind::Calculate => &self.calculate,
            OperationKind::Label => &self.label,
        }
    }

    fn set_operation(&mut self, kind: OperationKind, next: OperationState) {
        match kind {
            OperationKind::Calculate => self.calculate = next,
            OperationKind::Label => self.label = next,
        }
    }

    /// 分配新的提交序号并标记为进行中
    fn begin(&mut self, kind: OperationKind) -> u64 {
        self.set_operation(kind, OperationState::InFlight);
        if matches!(&self.last_error, Some((owner, _)) if *owner == kind) {
            self.last_error = None;
        }
        let seq = match kind {
            OperationKind::Calculate => &mut self.calculate_seq,
            OperationKind::Label => &mut self.label_seq,
        };
        *seq += 1;
        *seq
    }

    fn is_current(&self, kind: OperationKind, seq: u64) -> bool {
        match kind {
            OperationKind::Calculate => self.calculate_seq == seq,
            OperationKind::Label => self.label_seq == seq,
        }
    }

    fn fail(&mut self, kind: OperationKind, message: String) {
        self.set_operation(kind, OperationState::Failed(message.clone()));
        self.last_error = Some((kind, message));
    }
}

pub struct WorkflowController<B: NutritionBackend> {
    backend: B,
    delivery: Arc<FileDeliveryHandler>,
    state: Mutex<WorkflowState>,
}

impl<B: NutritionBackend> WorkflowController<B> {
    pub fn new(backend: B, delivery: FileDeliveryHandler) -> Self {
        Self {
            backend,
            delivery: Arc::new(delivery),
            state: Mutex::new(WorkflowState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ========================================================================
    // 只读访问
    // ========================================================================

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.lock();
        WorkflowSnapshot {
            draft: state.draft.clone(),
            calculate: state.calculate.clone(),
            label: state.label.clone(),
            result: state.result.clone(),
            last_error: state.last_error.as_ref().map(|(_, message)| message.clone()),
            last_delivery: state.last_delivery.clone(),
        }
    }

    pub fn draft(&self) -> RecipeDraft {
        self.lock().draft.clone()
    }

    pub fn result(&self) -> Option<NormalizedResult> {
        self.lock().result.clone()
    }

    pub fn operation_state(&self, kind: OperationKind) -> OperationState {
        self.lock().operation(kind).clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.as_ref().map(|(_, message)| message.clone())
    }

    // ========================================================================
    // 草稿编辑
    // ========================================================================

    pub fn replace_draft(&self, draft: RecipeDraft) {
        self.lock().draft = draft;
    }

    pub fn set_name(&self, name: &str) {
        let mut state = self.lock();
        state.draft = state.draft.with_name(name);
    }

    pub fn set_servings(&self, servings: &str) {
        let mut state = self.lock();
        state.draft = state.draft.with_servings(servings);
    }

    pub fn add_ingredient(&self) {
        let mut state = self.lock();
        state.draft = state.draft.add_ingredient();
    }

    /// 删除食材行；只剩一行或下标越界时不做任何事并返回 false
    pub fn remove_ingredient(&self, index: usize) -> bool {
        let mut state = self.lock();
        if !state.draft.can_remove_ingredient() || index >= state.draft.ingredients.len() {
            return false;
        }
        state.draft = state.draft.remove_ingredient(index);
        true
    }

    pub fn update_ingredient(&self, index: usize, field: IngredientField, value: &str) {
        let mut state = self.lock();
        state.draft = state.draft.update_ingredient(index, field, value);
    }

    /// 重新挂载：恢复初始草稿，清空结果与错误
    ///
    /// 仍在进行中的请求结算时会因序号过期而被丢弃。
    pub fn reset(&self) {
        let mut state = self.lock();
        let calculate_seq = state.calculate_seq + 1;
        let label_seq = state.label_seq + 1;
        *state = WorkflowState {
            calculate_seq,
            label_seq,
            ..WorkflowState::default()
        };
    }

    // ========================================================================
    // 异步操作
    // ========================================================================

    /// 提交计算
    ///
    /// 一旦提交就清除旧结果：校验失败不发请求，请求失败时结果保持为空，
    /// 避免看板与刚报告的错误不一致。
    pub async fn submit_calculation(&self) -> SubmitOutcome {
        let (request, seq) = {
            let mut state = self.lock();
            if state.calculate.is_in_flight() {
                return SubmitOutcome::Busy;
            }
            state.result = None;
            match validate(&state.draft) {
                Err(errors) => {
                    state.fail(OperationKind::Calculate, first_message(&errors));
                    return SubmitOutcome::Failed;
                }
                Ok(request) => {
                    let seq = state.begin(OperationKind::Calculate);
                    (request, seq)
                }
            }
        };

        log::info!(
            "提交营养计算 #{}: {} ({} 种食材)",
            seq,
            request.recipe_name(),
            request.ingredients().len()
        );
        let outcome = self.backend.compute_nutrition(&request).await;

        let mut state = self.lock();
        if !state.is_current(OperationKind::Calculate, seq) {
            log::debug!("丢弃过期的计算结果 #{}", seq);
            return SubmitOutcome::Superseded;
        }
        match outcome {
            Ok(raw) => {
                state.result = Some(normalize(&raw, request.servings()));
                state.calculate = OperationState::Idle;
                SubmitOutcome::Succeeded
            }
            Err(e) => {
                state.result = None;
                state.fail(OperationKind::Calculate, e.user_message());
                SubmitOutcome::Failed
            }
        }
    }

    /// 提交标签生成并交付文件
    ///
    /// 任何失败（包括校验失败）都只记录到 label 操作上，不影响当前展示的计算结果。
    /// 文件交付是阻塞 IO，放到 blocking 线程池执行。
    pub async fn submit_label(&self) -> SubmitOutcome {
        let (request, seq) = {
            let mut state = self.lock();
            if state.label.is_in_flight() {
                return SubmitOutcome::Busy;
            }
            match validate(&state.draft) {
                Err(errors) => {
                    state.fail(OperationKind::Label, first_message(&errors));
                    return SubmitOutcome::Failed;
                }
                Ok(request) => {
                    let seq = state.begin(OperationKind::Label);
                    (request, seq)
                }
            }
        };

        log::info!("提交标签生成 #{}: {}", seq, request.recipe_name());
        let outcome = self.backend.generate_label(&request).await;

        let payload = {
            let mut state = self.lock();
            if !state.is_current(OperationKind::Label, seq) {
                log::debug!("丢弃过期的标签文档 #{}", seq);
                return SubmitOutcome::Superseded;
            }
            match outcome {
                Ok(payload) => payload,
                Err(e) => {
                    state.fail(OperationKind::Label, e.user_message());
                    return SubmitOutcome::Failed;
                }
            }
        };

        let delivery = Arc::clone(&self.delivery);
        let recipe_name = request.recipe_name().to_string();
        let delivered = tokio::task::spawn_blocking(move || delivery.deliver(&payload, &recipe_name))
            .await
            .unwrap_or_else(|e| Err(AppError::Delivery(format!("delivery task failed: {}", e))));

        let mut state = self.lock();
        if !state.is_current(OperationKind::Label, seq) {
            return SubmitOutcome::Superseded;
        }
        match delivered {
            Ok(receipt) => {
                state.last_delivery = Some(receipt);
                state.label = OperationState::Idle;
                SubmitOutcome::Succeeded
            }
            Err(e) => {
                state.fail(OperationKind::Label, e.to_string());
                SubmitOutcome::Failed
            }
        }
    }

    /// 探测营养计算服务是否可达，不改变工作流状态
    pub async fn probe_service(&self) -> Result<(), TransportError> {
        self.backend.check_health().await
    }
}

// ============================================================================
// 单元测试
// ============================================================================
