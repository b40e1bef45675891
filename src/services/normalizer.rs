// ============================================================================
// 响应归一化：原始 CalculationResult → NormalizedResult
// 纯函数、无 IO。字符串/对象二选一的字段在这里一次性解析为展示文本，
// 原始联合类型不得流出本模块
// ============================================================================

use crate::models::dtos::{
    BarTone, ChartSlice, ComplianceView, HealthBarView, NormalizedResult, NutrientRow, RuleStatus,
    RuleView, StatusSlice, SuggestionsView,
};
use crate::models::payload::{
    AllergyAlert, CalculationResult, ComplianceReport, DisplayValue, RawHealthBar, RawRule,
    SuggestionGroups, SuggestionItem,
};

/// 营养素表格：(key, 标签, 单位)，顺序即展示顺序
pub const NUTRIENT_TABLE: &[(&str, &str, &str)] = &[
    ("energy_kcal", "Energy", "kcal"),
    ("protein_g", "Protein", "g"),
    ("carbs_g", "Carbohydrates", "g"),
    ("sugar_g", "of which Sugars", "g"),
    ("fat_g", "Fat", "g"),
    ("saturated_fat_g", "Saturated Fat", "g"),
    ("sodium_mg", "Sodium", "mg"),
];

/// 营养素分布环形图的切片：(key, 名称)
pub const DISTRIBUTION_SLICES: &[(&str, &str)] = &[
    ("protein_g", "Protein"),
    ("carbs_g", "Carbs"),
    ("sugar_g", "Sugar"),
    ("fat_g", "Fat"),
    ("saturated_fat_g", "Sat. Fat"),
];

/// 结构化建议缺少标签时的兜底文本
pub const SUGGESTION_FALLBACK_LABEL: &str = "Suggestion";

/// 过敏原提示各段之间的分隔符
pub const ALLERGEN_SEPARATOR: &str = " • ";

/// 归一化入口
///
/// `servings` 为请求中的份数；为 0、负数或 NaN 时每份重量记为 0。
pub fn normalize(raw: &CalculationResult, servings: f64) -> NormalizedResult {
    NormalizedResult {
        total_weight: raw.total_weight,
        per_serving_weight: per_serving_weight(raw.total_weight, servings),
        per_100g: raw.per_100g.clone(),
        per_serving: raw.per_serving.clone(),
        nutrient_rows: NUTRIENT_TABLE
            .iter()
            .map(|(key, label, unit)| NutrientRow {
                key: key.to_string(),
                label: label.to_string(),
                unit: unit.to_string(),
                value: raw.per_serving.get(*key).copied(),
            })
            .collect(),
        nutrient_distribution: DISTRIBUTION_SLICES
            .iter()
            .filter_map(|(key, name)| {
                let value = raw.per_serving.get(*key).copied().unwrap_or(0.0);
                (value > 0.0).then(|| ChartSlice {
                    name: name.to_string(),
                    value,
                })
            })
            .collect(),
        compliance: normalize_compliance(raw.fssai_compliance.as_ref()),
        suggestions: normalize_suggestions(raw.fssai_suggestions.as_ref()),
        health_bars: raw.health_bars.iter().map(normalize_health_bar).collect(),
        allergy_alerts: raw.allergy_alerts.iter().map(format_allergen).collect(),
    }
}

/// 每份重量：份数不是有限正数时为 0
pub fn per_serving_weight(total_weight: f64, servings: f64) -> f64 {
    if !servings.is_finite() || servings <= 0.0 {
        return 0.0;
    }
    let weight = total_weight / servings;
    if weight.is_finite() {
        weight
    } else {
        0.0
    }
}

/// 将百分比截断到 [0, 100]，仅用于进度条宽度等比例计算
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

// ============================================================================
// 合规规则
// ============================================================================

impl RuleStatus {
    /// 按原始字符串归类，无法识别的状态归入 Unspecified
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("pass") => RuleStatus::Pass,
            Some("warn") => RuleStatus::Warn,
            Some("fail") => RuleStatus::Fail,
            _ => RuleStatus::Unspecified,
        }
    }

    pub fn glyph(self) -> &'static str {
        match self {
            RuleStatus::Pass => "✓",
            RuleStatus::Warn => "⚠",
            RuleStatus::Fail => "✗",
            RuleStatus::Unspecified => "•",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RuleStatus::Pass => "Pass",
            RuleStatus::Warn => "Warning",
            RuleStatus::Fail => "Fail",
            RuleStatus::Unspecified => "Unspecified",
        }
    }
}

fn normalize_compliance(report: Option<&ComplianceReport>) -> ComplianceView {
    let default_report = ComplianceReport::default();
    let report = report.unwrap_or(&default_report);
    let aligned = report.is_fssai_aligned.unwrap_or(false);

    ComplianceView {
        aligned,
        warning_banner: non_blank(report.warning_banner.as_deref()),
        legal_note: non_blank(report.legal_note.as_deref()),
        risk_note: if aligned {
            None
        } else {
            non_blank(report.risk_note.as_deref())
        },
        warning_count: report.warning_count.unwrap_or(0),
        rule_count: report.rulebook.len(),
        rules: report.rulebook.iter().map(normalize_rule).collect(),
        summary: summarize_rules(&report.rulebook),
    }
}

fn normalize_rule(rule: &RawRule) -> RuleView {
    let status = RuleStatus::from_raw(rule.status.as_deref());
    RuleView {
        rule_id: rule.rule_id.clone().unwrap_or_default(),
        title: rule.title.clone().unwrap_or_default(),
        description: rule.description.clone().unwrap_or_default(),
        observation: rule.observation.clone().unwrap_or_default(),
        status,
        glyph: status.glyph().to_string(),
    }
}

/// 合规环形图：按 pass/warn/fail 计数，剔除为 0 的切片
///
/// 规则列表为空时合成一个 pass 切片，保证图表至少有一块可渲染。
/// Unspecified 只参与单条规则的展示，不进入环形图。
pub fn summarize_rules(rules: &[RawRule]) -> Vec<StatusSlice> {
    let mut counts = [0usize; 3];
    for rule in rules {
        match RuleStatus::from_raw(rule.status.as_deref()) {
            RuleStatus::Pass => counts[0] += 1,
            RuleStatus::Warn => counts[1] += 1,
            RuleStatus::Fail => counts[2] += 1,
            RuleStatus::Unspecified => {}
        }
    }
    if rules.is_empty() {
        counts[0] = 1;
    }

    [RuleStatus::Pass, RuleStatus::Warn, RuleStatus::Fail]
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| StatusSlice {
            status,
            label: status.label().to_string(),
            count,
        })
        .collect()
}

// ============================================================================
// 建议与过敏原
// ============================================================================

fn normalize_suggestions(groups: Option<&SuggestionGroups>) -> SuggestionsView {
    match groups {
        Some(groups) => SuggestionsView {
            cut_down: groups.cut_down.iter().map(format_suggestion).collect(),
            add_up: groups.add_up.iter().map(format_suggestion).collect(),
            note: non_blank(groups.note.as_deref()),
        },
        None => SuggestionsView::default(),
    }
}

/// 建议条目格式化
///
/// 纯文本原样返回；结构化记录渲染为
/// `"{label}{ (value unit)}{: recommendation}{ Top contributors: a, b.}"`，
/// 缺失的字段整段省略。
pub fn format_suggestion(item: &SuggestionItem) -> String {
    let record = match item {
        SuggestionItem::PlainText(text) => return text.clone(),
        SuggestionItem::Structured(record) => record,
    };

    let label = non_blank(record.nutrient_label.as_deref())
        .or_else(|| non_blank(record.nutrient_key.as_deref()))
        .unwrap_or_else(|| SUGGESTION_FALLBACK_LABEL.to_string());

    let mut text = label;
    if let Some(value) = record.current_value.as_ref().and_then(display_value) {
        match non_blank(record.unit.as_deref()) {
            Some(unit) => text.push_str(&format!(" ({} {})", value, unit)),
            None => text.push_str(&format!(" ({})", value)),
        }
    }
    if let Some(recommendation) = non_blank(record.recommendation.as_deref()) {
        text.push_str(&format!(": {}", recommendation));
    }
    if !record.top_contributors.is_empty() {
        text.push_str(&format!(
            " Top contributors: {}.",
            record.top_contributors.join(", ")
        ));
    }
    text
}

/// 过敏原提示格式化：`"{allergen} • Detected: … • Alternatives: …"`，空段省略
pub fn format_allergen(alert: &AllergyAlert) -> String {
    let record = match alert {
        AllergyAlert::PlainText(text) => return text.clone(),
        AllergyAlert::Structured(record) => record,
    };

    let mut parts = Vec::with_capacity(3);
    if let Some(allergen) = non_blank(record.allergen.as_deref()) {
        parts.push(allergen);
    }
    if !record.detected_ingredients.is_empty() {
        parts.push(format!("Detected: {}", record.detected_ingredients.join(", ")));
    }
    if !record.alternatives.is_empty() {
        parts.push(format!("Alternatives: {}", record.alternatives.join(", ")));
    }
    parts.join(ALLERGEN_SEPARATOR)
}

// ============================================================================
// 健康条
// ============================================================================

impl BarTone {
    pub fn from_status(status: Option<&str>) -> Self {
        match status.map(str::trim) {
            Some("high") => BarTone::Alert,
            Some("moderate") | Some("watch") => BarTone::Caution,
            _ => BarTone::Ok,
        }
    }
}

fn normalize_health_bar(bar: &RawHealthBar) -> HealthBarView {
    let percent = bar
        .percent_of_reference
        .filter(|p| p.is_finite())
        .unwrap_or(0.0);
    let value = bar.value.as_ref().and_then(display_value).unwrap_or_default();
    let unit = bar.unit.clone().unwrap_or_default();

    HealthBarView {
        key: bar.key.clone().unwrap_or_default(),
        label: bar.label.clone().unwrap_or_default(),
        value_text: format!("{}{}", value, unit),
        status: non_blank(bar.status.as_deref()),
        tone: BarTone::from_status(bar.status.as_deref()),
        percent_of_reference: percent,
        percent_label: format!("{}% DV", format_number((percent * 100.0).round() / 100.0)),
        fill_percent: clamp_percent(percent),
        guidance: non_blank(bar.guidance.as_deref()),
    }
}

// ============================================================================
// 辅助函数
// ============================================================================

/// 数字按最短形式输出（2100.0 → "2100"），与前端的数字展示一致
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

fn display_value(value: &DisplayValue) -> Option<String> {
    match value {
        DisplayValue::Number(number) if number.is_finite() => Some(format_number(*number)),
        DisplayValue::Number(_) => None,
        DisplayValue::Text(text) => non_blank(Some(text)),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// ============================================================================
// 单元测试
// ============================================================================
