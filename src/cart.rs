//! Shopping-list aggregation.
//!
//! Sums ingredient amounts across every recipe in a user's cart. Rows are
//! keyed by `(name, measurement_unit)`, so "Salt (g)" and "Salt (tsp)" stay
//! separate. Output is ordered alphabetically by that key.

use std::collections::BTreeMap;

use crate::models::RecipeIngredient;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_list.txt";

/// A cart entry with its recipe's ingredient list already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartRecipe {
    pub recipe_id: i64,
    pub ingredients: Vec<RecipeIngredient>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientTotal {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

pub fn aggregate(cart: &[CartRecipe]) -> Vec<IngredientTotal> {
    let mut totals: BTreeMap<(&str, &str), i64> = BTreeMap::new();
    for item in cart.iter().flat_map(|recipe| &recipe.ingredients) {
        *totals
            .entry((item.name.as_str(), item.measurement_unit.as_str()))
            .or_default() += i64::from(item.amount);
    }

    totals
        .into_iter()
        .map(|((name, unit), total)| IngredientTotal {
            name: name.to_string(),
            measurement_unit: unit.to_string(),
            total,
        })
        .collect()
}

/// One `"{name} ({unit}) — {total}"` line per row.
pub fn render(totals: &[IngredientTotal]) -> String {
    totals
        .iter()
        .map(|t| format!("{} ({}) — {}", t.name, t.measurement_unit, t.total))
        .collect::<Vec<_>>()
        .join("\n")
}
