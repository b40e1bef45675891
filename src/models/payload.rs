// ============================================================================
// 营养计算服务的原始响应结构
// 字段形态松散：几乎全部可缺省，建议/过敏原条目可能是字符串也可能是对象
// 这些类型只允许在 normalizer 中被消费
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// `/calculate` 成功响应
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct CalculationResult {
    #[serde(deserialize_with = "lenient_number")]
    pub total_weight: f64,
    #[serde(deserialize_with = "lenient_nutrients")]
    pub per_100g: BTreeMap<String, f64>,
    #[serde(deserialize_with = "lenient_nutrients")]
    pub per_serving: BTreeMap<String, f64>,
    pub fssai_compliance: Option<ComplianceReport>,
    pub fssai_suggestions: Option<SuggestionGroups>,
    #[serde(deserialize_with = "lenient_items")]
    pub health_bars: Vec<RawHealthBar>,
    #[serde(deserialize_with = "lenient_items")]
    pub allergy_alerts: Vec<AllergyAlert>,
}

/// 合规评估结果
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ComplianceReport {
    pub is_fssai_aligned: Option<bool>,
    pub warning_banner: Option<String>,
    pub legal_note: Option<String>,
    pub risk_note: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub warning_count: Option<u32>,
    #[serde(deserialize_with = "lenient_items")]
    pub rulebook: Vec<RawRule>,
}

/// 单条合规规则，`status` 原样保留，由 normalizer 归类
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RawRule {
    pub rule_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub observation: Option<String>,
    pub status: Option<String>,
}

/// 改进建议：减少 / 增加两组，外加可选说明
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SuggestionGroups {
    #[serde(deserialize_with = "lenient_items")]
    pub cut_down: Vec<SuggestionItem>,
    #[serde(deserialize_with = "lenient_items")]
    pub add_up: Vec<SuggestionItem>,
    pub note: Option<String>,
}

/// 建议条目：纯文本或结构化记录
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum SuggestionItem {
    PlainText(String),
    Structured(SuggestionRecord),
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct SuggestionRecord {
    pub nutrient_key: Option<String>,
    pub nutrient_label: Option<String>,
    pub current_value: Option<DisplayValue>,
    pub unit: Option<String>,
    pub recommendation: Option<String>,
    pub top_contributors: Vec<String>,
}

/// 数值字段可能以数字或字符串下发
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum DisplayValue {
    Number(f64),
    Text(String),
}

/// 过敏原提示：纯文本或结构化记录
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum AllergyAlert {
    PlainText(String),
    Structured(AllergenRecord),
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AllergenRecord {
    pub allergen: Option<String>,
    pub detected_ingredients: Vec<String>,
    pub alternatives: Vec<String>,
}

/// 营养素健康条
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct RawHealthBar {
    pub key: Option<String>,
    pub label: Option<String>,
    pub value: Option<DisplayValue>,
    pub unit: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_optional_number")]
    pub percent_of_reference: Option<f64>,
    pub guidance: Option<String>,
}

/// `/generate-label` 成功响应：不透明的二进制文档
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// 服务端 `Content-Disposition` 中给出的文件名（仅供参考）
    pub suggested_name: Option<String>,
}

// ============================================================================
// 宽松反序列化：形态不符的条目跳过而不是让整个响应解析失败
// ============================================================================

fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut items = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<T>(value) {
            Ok(item) => items.push(item),
            Err(e) => log::warn!("跳过无法识别的响应条目: {}", e),
        }
    }
    Ok(items)
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64).unwrap_or(0.0))
}

fn lenient_optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(value_as_f64)
        .filter(|count| *count >= 0.0)
        .map(|count| count.round() as u32))
}

fn lenient_nutrients<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?
        .unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| value_as_f64(&value).map(|number| (key, number)))
        .collect())
}

fn value_as_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
}
