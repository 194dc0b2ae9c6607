//! Domain types shared by the storage layer, the relation ledger, the query
//! engine and the shopping-list aggregator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroU32;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// Identifier of a user account.
    UserId
);
id_type!(
    /// Identifier of a recipe.
    RecipeId
);
id_type!(TagId);
id_type!(IngredientId);

/// Quantity of an ingredient in a recipe. Always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Amount(NonZeroU32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("amount must be greater than zero")]
pub struct ZeroAmount;

impl Amount {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for Amount {
    type Error = ZeroAmount;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ZeroAmount)
    }
}

impl From<Amount> for u32 {
    fn from(amount: Amount) -> Self {
        amount.get()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
}

impl NewUser {
    /// Convenience constructor for a regular (non-admin) account.
    pub fn regular(username: impl Into<String>) -> Self {
        let username = username.into();
        Self {
            email: format!("{username}@example.com"),
            first_name: username.clone(),
            last_name: String::new(),
            username,
            is_admin: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
}

/// Reference ingredient. `(name, measurement_unit)` is unique in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

/// One ingredient line of a recipe, with the ingredient resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientLine {
    pub recipe_id: RecipeId,
    pub ingredient: Ingredient,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    /// Minutes, at least 1.
    pub cooking_time: u32,
    pub published_at: DateTime<Utc>,
    pub tags: Vec<Tag>,
    /// In authored order.
    pub ingredients: Vec<IngredientLine>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub author_id: UserId,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub tag_ids: Vec<TagId>,
    pub ingredients: Vec<(IngredientId, Amount)>,
}

impl NewRecipe {
    /// Checks the invariants the catalog relies on before anything is written.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("recipe name cannot be empty".to_owned());
        }
        if self.cooking_time < 1 {
            return Err("cooking time must be at least one minute".to_owned());
        }
        if self.ingredients.is_empty() {
            return Err("a recipe needs at least one ingredient".to_owned());
        }
        let mut seen = HashSet::new();
        if !self.ingredients.iter().all(|(id, _)| seen.insert(*id)) {
            return Err("ingredients must not repeat".to_owned());
        }
        let mut seen = HashSet::new();
        if !self.tag_ids.iter().all(|id| seen.insert(*id)) {
            return Err("tags must not repeat".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe() -> NewRecipe {
        NewRecipe {
            author_id: UserId(1),
            name: "Pancakes".to_owned(),
            text: String::new(),
            cooking_time: 15,
            tag_ids: vec![TagId(1)],
            ingredients: vec![(IngredientId(1), Amount::new(200).unwrap())],
        }
    }

    #[test]
    fn amount_rejects_zero() {
        assert!(Amount::new(0).is_none());
        assert_eq!(Amount::try_from(0), Err(ZeroAmount));
        assert_eq!(Amount::new(3).map(Amount::get), Some(3));
    }

    #[test]
    fn amount_deserialization_enforces_positive() {
        assert!(serde_json::from_str::<Amount>("0").is_err());
        let amount: Amount = serde_json::from_str("12").unwrap();
        assert_eq!(amount.get(), 12);
        assert_eq!(serde_json::to_string(&amount).unwrap(), "12");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        assert_eq!(serde_json::to_string(&RecipeId(42)).unwrap(), "42");
        assert_eq!(UserId(7).to_string(), "7");
    }

    #[test]
    fn validate_accepts_well_formed_recipe() {
        assert!(recipe().validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_ingredients() {
        let mut r = recipe();
        r.ingredients
            .push((IngredientId(1), Amount::new(5).unwrap()));
        assert!(r.validate().unwrap_err().contains("ingredients"));
    }

    #[test]
    fn validate_rejects_zero_cooking_time_and_empty_lines() {
        let mut r = recipe();
        r.cooking_time = 0;
        assert!(r.validate().is_err());

        let mut r = recipe();
        r.ingredients.clear();
        assert!(r.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_tags() {
        let mut r = recipe();
        r.tag_ids.push(TagId(1));
        assert!(r.validate().unwrap_err().contains("tags"));
    }
}
