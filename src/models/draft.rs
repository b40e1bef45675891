// ============================================================================
// 配方草稿与计算请求
// 草稿保留用户输入的原始文本，请求只能由 validator 构造
// ⛔ 禁止：包含复杂的业务逻辑方法
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize};

/// 新草稿的默认份数
pub const DEFAULT_SERVINGS: &str = "2";

/// 新草稿预置的空白食材行数
pub const STARTER_ROWS: usize = 2;

/// 一行食材输入
///
/// `quantity_g` 保持为可编辑的原始文本，直到校验时才解析为数字。
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct IngredientRow {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub quantity_g: String,
}

/// 食材行中可编辑的字段
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngredientField {
    Name,
    QuantityG,
}

/// 编辑中的配方草稿
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RecipeDraft {
    #[serde(default)]
    pub name: String,
    /// 份数原始文本，校验时才解析
    #[serde(default, deserialize_with = "text_or_number")]
    pub servings: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientRow>,
}

impl Default for RecipeDraft {
    /// 初始草稿：空名称、2 份、两行空白食材
    fn default() -> Self {
        Self {
            name: String::new(),
            servings: DEFAULT_SERVINGS.to_string(),
            ingredients: vec![IngredientRow::default(); STARTER_ROWS],
        }
    }
}

/// 已校验的单个食材，由 `CalculationRequest` 持有
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IngredientInput {
    pub name: String,
    pub quantity_g: f64,
}

/// 发送给营养计算服务的请求体
///
/// 只有 `services::validator::validate` 能构造该类型。
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CalculationRequest {
    recipe_name: String,
    servings: f64,
    ingredients: Vec<IngredientInput>,
}

impl CalculationRequest {
    pub(crate) fn new(recipe_name: String, servings: f64, ingredients: Vec<IngredientInput>) -> Self {
        Self {
            recipe_name,
            servings,
            ingredients,
        }
    }

    pub fn recipe_name(&self) -> &str {
        &self.recipe_name
    }

    pub fn servings(&self) -> f64 {
        self.servings
    }

    pub fn ingredients(&self) -> &[IngredientInput] {
        &self.ingredients
    }
}

/// 草稿文件里的数字既可以写成 JSON 数字也可以写成字符串，统一保存为文本
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
        Null(()),
    }

    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(number) => number.to_string(),
        TextOrNumber::Null(()) => String::new(),
    })
}
