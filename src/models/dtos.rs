// ============================================================================
// 数据传输对象（DTO）定义
// 归一化后的看板数据与工作流状态快照，任何渲染层都可以直接消费
// ⛔ 禁止：包含复杂的业务逻辑方法
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::draft::RecipeDraft;

/// 归一化后的计算结果，由 `normalize` 生成，每次成功计算整体替换
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NormalizedResult {
    pub total_weight: f64,
    /// total_weight / servings；份数非法时为 0
    pub per_serving_weight: f64,
    pub per_100g: BTreeMap<String, f64>,
    pub per_serving: BTreeMap<String, f64>,
    /// 固定顺序的每份营养素表格
    pub nutrient_rows: Vec<NutrientRow>,
    /// 营养素分布环形图，值为 0 的切片已剔除
    pub nutrient_distribution: Vec<ChartSlice>,
    pub compliance: ComplianceView,
    pub suggestions: SuggestionsView,
    pub health_bars: Vec<HealthBarView>,
    pub allergy_alerts: Vec<String>,
}

/// 营养素表格中的一行
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NutrientRow {
    pub key: String,
    pub label: String,
    pub unit: String,
    /// 服务端未返回该营养素时为 None
    pub value: Option<f64>,
}

/// 图表切片
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChartSlice {
    pub name: String,
    pub value: f64,
}

/// 合规规则状态；未知或缺失的状态归入 `Unspecified`，只影响展示样式
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Pass,
    Warn,
    Fail,
    Unspecified,
}

/// 合规区块
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ComplianceView {
    pub aligned: bool,
    pub warning_banner: Option<String>,
    pub legal_note: Option<String>,
    /// 仅在未达标时保留
    pub risk_note: Option<String>,
    pub warning_count: u32,
    pub rule_count: usize,
    pub rules: Vec<RuleView>,
    pub summary: Vec<StatusSlice>,
}

/// 单条规则的展示数据
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RuleView {
    pub rule_id: String,
    pub title: String,
    pub description: String,
    pub observation: String,
    pub status: RuleStatus,
    pub glyph: String,
}

/// 合规环形图切片：按状态计数
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StatusSlice {
    pub status: RuleStatus,
    pub label: String,
    pub count: usize,
}

/// 建议区块，条目均已格式化为单行文本
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct SuggestionsView {
    pub cut_down: Vec<String>,
    pub add_up: Vec<String>,
    pub note: Option<String>,
}

/// 健康条色调
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BarTone {
    Ok,
    Caution,
    Alert,
}

/// 单个营养素健康条
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthBarView {
    pub key: String,
    pub label: String,
    /// 数值与单位拼接后的展示文本，如 "2100mg"
    pub value_text: String,
    pub status: Option<String>,
    pub tone: BarTone,
    /// 服务端下发的原始百分比，不做截断
    pub percent_of_reference: f64,
    /// 如 "134% DV"，基于未截断的原始值
    pub percent_label: String,
    /// 进度条宽度，截断到 [0, 100]
    pub fill_percent: f64,
    pub guidance: Option<String>,
}

// ============================================================================
// 工作流状态
// ============================================================================

/// 两类互相独立的异步操作
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Calculate,
    Label,
}

/// 单个操作的三态
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum OperationState {
    #[default]
    Idle,
    InFlight,
    Failed(String),
}

impl OperationState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, OperationState::InFlight)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            OperationState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// 提交结果：被忙碌保护拦下，或已结算
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// 同类操作仍在进行中，本次提交被忽略
    Busy,
    Succeeded,
    Failed,
    /// 已结算但被更新的提交取代，结果被丢弃
    Superseded,
}

/// 标签文件交付回执
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub path: PathBuf,
    pub file_name: String,
    pub bytes: usize,
    pub sha256: String,
    pub delivered_at: String,
}

/// 控制器的只读快照，供渲染层或 CLI 输出
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WorkflowSnapshot {
    pub draft: RecipeDraft,
    pub calculate: OperationState,
    pub label: OperationState,
    pub result: Option<NormalizedResult>,
    pub last_error: Option<String>,
    pub last_delivery: Option<DeliveryReceipt>,
}
