// ============================================================================
// 草稿校验：RecipeDraft → CalculationRequest
// 规则顺序：名称 → 份数 → 逐行食材 → 至少保留一行
// 无效食材行直接丢弃，只有全部丢弃时才拒绝
// ============================================================================

use crate::models::draft::{CalculationRequest, IngredientInput, IngredientRow, RecipeDraft};
use crate::utils::error::ValidationError;

/// 按 JS `Number()` 的宽松语义解析数字文本：去除空白后解析，非有限值视为无效
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// 单行食材是否有效：名称非空且用量为有限正数
fn accept_row(row: &IngredientRow) -> Option<IngredientInput> {
    let name = row.name.trim();
    let quantity = parse_number(&row.quantity_g)?;
    if name.is_empty() || quantity <= 0.0 {
        return None;
    }
    Some(IngredientInput {
        name: name.to_string(),
        quantity_g: quantity,
    })
}

/// 校验草稿并构造请求
///
/// 失败时返回按发现顺序排列的全部错误，界面只展示一条时取第一条。
/// 成功时请求中的食材保持草稿中的原始顺序。
pub fn validate(draft: &RecipeDraft) -> Result<CalculationRequest, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let recipe_name = draft.name.trim();
    if recipe_name.is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    let servings = parse_number(&draft.servings).filter(|value| *value > 0.0);
    if servings.is_none() {
        errors.push(ValidationError::InvalidServings);
    }

    let mut ingredients = Vec::with_capacity(draft.ingredients.len());
    let mut dropped = Vec::new();
    for (index, row) in draft.ingredients.iter().enumerate() {
        match accept_row(row) {
            Some(input) => ingredients.push(input),
            None => dropped.push(index),
        }
    }

    if ingredients.is_empty() {
        errors.extend(dropped.iter().copied().map(ValidationError::InvalidIngredient));
        errors.push(ValidationError::NoIngredients);
    } else if !errors.is_empty() {
        errors.extend(dropped.iter().copied().map(ValidationError::InvalidIngredient));
    }

    match servings {
        Some(servings) if errors.is_empty() => {
            if !dropped.is_empty() {
                log::debug!("丢弃无效食材行: {:?}", dropped);
            }
            Ok(CalculationRequest::new(
                recipe_name.to_string(),
                servings,
                ingredients,
            ))
        }
        _ => Err(errors),
    }
}

/// 取第一条错误作为界面提示
pub fn first_message(errors: &[ValidationError]) -> String {
    errors
        .first()
        .map(|e| e.to_string())
        .unwrap_or_else(|| ValidationError::NoIngredients.to_string())
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::draft::IngredientField;
    use proptest::prelude::*;

    fn draft(name: &str, servings: &str, rows: &[(&str, &str)]) -> RecipeDraft {
        RecipeDraft {
            name: name.to_string(),
            servings: servings.to_string(),
            ingredients: rows
                .iter()
                .map(|(n, q)| IngredientRow {
                    name: n.to_string(),
                    quantity_g: q.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_blank_row_dropped_not_rejected() {
        let d = draft("Oats Bowl", "2", &[("Milk", "300"), ("Oats", "80"), ("", "")]);
        let request = validate(&d).unwrap();

        assert_eq!(request.recipe_name(), "Oats Bowl");
        assert_eq!(request.servings(), 2.0);
        let names: Vec<&str> = request.ingredients().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Milk", "Oats"]);
        assert_eq!(request.ingredients()[0].quantity_g, 300.0);
    }

    #[test]
    fn test_names_and_numbers_are_trimmed() {
        let d = draft("  Chai  ", " 4 ", &[("  Tea leaves ", " 12.5 ")]);
        let request = validate(&d).unwrap();
        assert_eq!(request.recipe_name(), "Chai");
        assert_eq!(request.servings(), 4.0);
        assert_eq!(request.ingredients()[0].name, "Tea leaves");
        assert_eq!(request.ingredients()[0].quantity_g, 12.5);
    }

    #[test]
    fn test_empty_name_is_first_error() {
        let d = draft("   ", "2", &[("Milk", "300")]);
        let errors = validate(&d).unwrap_err();
        assert_eq!(errors, vec![ValidationError::EmptyName]);
        assert_eq!(first_message(&errors), "Recipe name cannot be empty.");
    }

    #[test]
    fn test_invalid_servings() {
        for servings in ["0", "-1", "", "abc", "inf", "NaN"] {
            let d = draft("Soup", servings, &[("Water", "500")]);
            assert_eq!(
                validate(&d).unwrap_err(),
                vec![ValidationError::InvalidServings],
                "份数 {:?} 应被拒绝",
                servings
            );
        }
    }

    #[test]
    fn test_all_rows_invalid_reports_no_ingredients() {
        let d = draft("Soup", "2", &[("", "100"), ("Salt", "0"), ("Water", "-5")]);
        let errors = validate(&d).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::InvalidIngredient(0),
                ValidationError::InvalidIngredient(1),
                ValidationError::InvalidIngredient(2),
                ValidationError::NoIngredients,
            ]
        );
    }

    #[test]
    fn test_errors_collected_in_rule_order() {
        let d = draft("", "0", &[("", "")]);
        let errors = validate(&d).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::EmptyName,
                ValidationError::InvalidServings,
                ValidationError::InvalidIngredient(0),
                ValidationError::NoIngredients,
            ]
        );
    }

    #[test]
    fn test_default_draft_fails_validation() {
        let d = RecipeDraft::default()
            .with_name("Toast")
            .update_ingredient(0, IngredientField::Name, "Bread");
        // 用量为空，两行都被丢弃
        assert!(validate(&d)
            .unwrap_err()
            .contains(&ValidationError::NoIngredients));
    }

    // ========================================================================
    // 属性测试
    // ========================================================================

    fn row_strategy() -> impl Strategy<Value = IngredientRow> {
        let name = prop_oneof![Just(String::new()), Just("   ".to_string()), "[A-Za-z][A-Za-z ]{0,12}"];
        let quantity = prop_oneof![
            Just(String::new()),
            Just("abc".to_string()),
            (-500.0f64..2000.0).prop_map(|q| format!("{}", q)),
            (0u32..1000).prop_map(|q| q.to_string()),
        ];
        (name, quantity).prop_map(|(name, quantity_g)| IngredientRow { name, quantity_g })
    }

    fn passes(row: &IngredientRow) -> bool {
        !row.name.trim().is_empty()
            && parse_number(&row.quantity_g).map_or(false, |q| q > 0.0)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// 至少一行有效时校验成功，且请求恰好包含所有有效行、顺序不变
        #[test]
        fn prop_request_keeps_exactly_valid_rows(rows in proptest::collection::vec(row_strategy(), 1..8)) {
            let d = RecipeDraft { name: "Mix".to_string(), servings: "3".to_string(), ingredients: rows.clone() };
            let expected: Vec<String> = rows.iter().filter(|r| passes(r)).map(|r| r.name.trim().to_string()).collect();

            match validate(&d) {
                Ok(request) => {
                    let got: Vec<String> = request.ingredients().iter().map(|i| i.name.clone()).collect();
                    prop_assert_eq!(got, expected);
                }
                Err(errors) => {
                    prop_assert!(expected.is_empty());
                    prop_assert_eq!(errors.last(), Some(&ValidationError::NoIngredients));
                }
            }
        }
    }
}
