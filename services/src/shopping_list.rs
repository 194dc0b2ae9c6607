//! Shopping-list aggregation over a user's cart.
//!
//! Lines are grouped by ingredient name and measurement unit (never by
//! ingredient id) and summed with checked integer arithmetic. The output
//! order depends only on the grouped values, so the same cart always renders
//! to the same bytes.

use crate::error::{ServiceError, ServiceResult};
use crate::model::{IngredientLine, RecipeId, UserId};
use crate::storage::{CatalogStorage, RecipeRelation, RelationStorage};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingListItem {
    pub name: String,
    pub unit: String,
    pub total_amount: u64,
    /// Names of the cart recipes that contributed, sorted and deduplicated.
    pub recipes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShoppingList {
    pub items: Vec<ShoppingListItem>,
    /// Ingredient names that appear with more than one unit.
    pub unit_conflicts: Vec<String>,
}

impl ShoppingList {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Plain-text rendering used for the download, one line per item.
    pub fn render_text(&self) -> String {
        if self.items.is_empty() {
            return "Shopping list is empty\n".to_owned();
        }

        let mut out = String::new();
        for item in &self.items {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "- {} ({}): {}", item.name, item.unit, item.total_amount);
        }
        out
    }
}

#[derive(Default)]
struct Group {
    total: u64,
    recipes: BTreeSet<String>,
}

/// Folds ingredient lines into a consolidated list.
///
/// `recipe_names` labels contributing recipes; lines of unnamed recipes still
/// count toward the totals.
pub fn consolidate(
    lines: &[IngredientLine],
    recipe_names: &HashMap<RecipeId, String>,
) -> ServiceResult<ShoppingList> {
    let mut groups: BTreeMap<(&str, &str), Group> = BTreeMap::new();

    for line in lines {
        let name = line.ingredient.name.as_str();
        let unit = line.ingredient.measurement_unit.as_str();
        let group = groups.entry((name, unit)).or_default();

        group.total = group
            .total
            .checked_add(u64::from(line.amount.get()))
            .ok_or_else(|| ServiceError::AmountOverflow {
                name: name.to_owned(),
                unit: unit.to_owned(),
            })?;
        if let Some(recipe) = recipe_names.get(&line.recipe_id) {
            group.recipes.insert(recipe.clone());
        }
    }

    let mut units_by_name: BTreeMap<&str, usize> = BTreeMap::new();
    for (name, _) in groups.keys() {
        *units_by_name.entry(*name).or_default() += 1;
    }
    let unit_conflicts: Vec<String> = units_by_name
        .into_iter()
        .filter(|(_, units)| *units > 1)
        .map(|(name, _)| name.to_owned())
        .collect();
    if !unit_conflicts.is_empty() {
        tracing::warn!(
            ingredients = ?unit_conflicts,
            "Ingredients appear with different units; keeping separate lines"
        );
    }

    let mut items: Vec<ShoppingListItem> = groups
        .into_iter()
        .map(|((name, unit), group)| ShoppingListItem {
            name: name.to_owned(),
            unit: unit.to_owned(),
            total_amount: group.total,
            recipes: group.recipes.into_iter().collect(),
        })
        .collect();
    items.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.unit.cmp(&b.unit))
    });

    Ok(ShoppingList {
        items,
        unit_conflicts,
    })
}

/// Builds the shopping list for `user`'s current cart.
///
/// An empty cart yields an empty list. The cart itself is left untouched.
pub async fn aggregate<S>(storage: &S, user: UserId) -> ServiceResult<ShoppingList>
where
    S: CatalogStorage + RelationStorage,
{
    let cart = storage
        .recipe_relation_targets(RecipeRelation::Cart, user)
        .await?;
    if cart.is_empty() {
        tracing::debug!(user = %user, "Cart is empty");
        return Ok(ShoppingList::default());
    }

    let lines = storage.ingredient_lines(&cart).await?;
    let names = storage.recipe_names(&cart).await?;
    let list = consolidate(&lines, &names)?;

    tracing::debug!(
        user = %user,
        recipes = cart.len(),
        items = list.items.len(),
        "Aggregated shopping list"
    );
    Ok(list)
}
