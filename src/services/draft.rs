// ============================================================================
// 草稿编辑：增删改食材行
// 每个操作都返回新的草稿值，不修改传入的草稿
// ============================================================================

use crate::models::draft::{IngredientField, IngredientRow, RecipeDraft};

impl RecipeDraft {
    /// 替换配方名称
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// 替换份数原始文本
    pub fn with_servings(&self, servings: impl Into<String>) -> Self {
        Self {
            servings: servings.into(),
            ..self.clone()
        }
    }

    /// 末尾追加一行空白食材
    pub fn add_ingredient(&self) -> Self {
        let mut next = self.clone();
        next.ingredients.push(IngredientRow::default());
        next
    }

    /// 删除指定下标的食材行，越界时返回原样副本
    pub fn remove_ingredient(&self, index: usize) -> Self {
        let mut next = self.clone();
        if index < next.ingredients.len() {
            next.ingredients.remove(index);
        }
        next
    }

    /// 替换指定行的单个字段，其它行保持不变
    pub fn update_ingredient(
        &self,
        index: usize,
        field: IngredientField,
        value: impl Into<String>,
    ) -> Self {
        let mut next = self.clone();
        if let Some(row) = next.ingredients.get_mut(index) {
            match field {
                IngredientField::Name => row.name = value.into(),
                IngredientField::QuantityG => row.quantity_g = value.into(),
            }
        }
        next
    }

    /// 只剩一行时不允许删除（界面据此禁用删除按钮）
    pub fn can_remove_ingredient(&self) -> bool {
        self.ingredients.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_ingredient_appends_blank_row() {
        let draft = RecipeDraft::default();
        let next = draft.add_ingredient();
        assert_eq!(draft.ingredients.len(), 2);
        assert_eq!(next.ingredients.len(), 3);
        assert_eq!(next.ingredients[2], IngredientRow::default());
    }

    #[test]
    fn test_remove_ingredient_by_index() {
        let draft = RecipeDraft::default()
            .update_ingredient(0, IngredientField::Name, "Milk")
            .update_ingredient(1, IngredientField::Name, "Oats");
        let next = draft.remove_ingredient(0);
        assert_eq!(next.ingredients.len(), 1);
        assert_eq!(next.ingredients[0].name, "Oats");
        // 原草稿不受影响
        assert_eq!(draft.ingredients.len(), 2);
    }

    #[test]
    fn test_remove_out_of_range_is_noop() {
        let draft = RecipeDraft::default();
        assert_eq!(draft.remove_ingredient(9), draft);
    }

    #[test]
    fn test_update_ingredient_touches_one_field() {
        let draft = RecipeDraft::default()
            .update_ingredient(0, IngredientField::Name, "Milk")
            .update_ingredient(0, IngredientField::QuantityG, "300");
        let next = draft.update_ingredient(0, IngredientField::QuantityG, "250");

        assert_eq!(next.ingredients[0].name, "Milk");
        assert_eq!(next.ingredients[0].quantity_g, "250");
        assert_eq!(next.ingredients[1], draft.ingredients[1]);
        assert_eq!(next.name, draft.name);
        assert_eq!(next.servings, draft.servings);
    }

    #[test]
    fn test_can_remove_requires_more_than_one_row() {
        let draft = RecipeDraft::default();
        assert!(draft.can_remove_ingredient());
        assert!(!draft.remove_ingredient(0).can_remove_ingredient());
    }
}
