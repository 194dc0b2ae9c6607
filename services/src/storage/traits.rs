//! Storage traits.

use super::types::{RecipeQuery, RecipeRelation, RecipeSlice, Relation, StoreError, UserSlice};
use crate::model::{
    Ingredient, IngredientId, IngredientLine, NewRecipe, NewUser, Recipe, RecipeId, Tag, TagId,
    User, UserId,
};
use std::collections::{HashMap, HashSet};
use std::future::Future;

/// Read/write access to users, tags, ingredients and recipes.
///
/// Deleting a recipe or a user must remove every dependent row (ingredient
/// lines, tag links, favorites, cart entries, subscriptions) in the same
/// atomic unit as the row itself.
pub trait CatalogStorage: Clone + Send + Sync + 'static {
    /// Whether the backing store is reachable.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    fn get_user(&self, id: UserId)
    -> impl Future<Output = Result<Option<User>, StoreError>> + Send;

    fn insert_user(&self, user: NewUser) -> impl Future<Output = Result<User, StoreError>> + Send;

    /// Removes the user, their recipes and every relation row they appear in.
    ///
    /// Returns `false` if the user did not exist.
    fn delete_user(&self, id: UserId) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// All tags ordered by name.
    fn list_tags(&self) -> impl Future<Output = Result<Vec<Tag>, StoreError>> + Send;

    fn get_tag(&self, id: TagId) -> impl Future<Output = Result<Option<Tag>, StoreError>> + Send;

    fn insert_tag(
        &self,
        name: &str,
        slug: &str,
    ) -> impl Future<Output = Result<Tag, StoreError>> + Send;

    /// Ingredients ordered by name, optionally restricted to names starting
    /// with `name_prefix` (case-insensitive).
    fn list_ingredients(
        &self,
        name_prefix: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Ingredient>, StoreError>> + Send;

    fn get_ingredient(
        &self,
        id: IngredientId,
    ) -> impl Future<Output = Result<Option<Ingredient>, StoreError>> + Send;

    fn insert_ingredient(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> impl Future<Output = Result<Ingredient, StoreError>> + Send;

    fn get_recipe(
        &self,
        id: RecipeId,
    ) -> impl Future<Output = Result<Option<Recipe>, StoreError>> + Send;

    /// Recipes matching `query`, most recently published first.
    fn list_recipes(
        &self,
        query: &RecipeQuery,
    ) -> impl Future<Output = Result<RecipeSlice, StoreError>> + Send;

    /// Ingredient lines of the given recipes. Unknown ids contribute nothing.
    fn ingredient_lines(
        &self,
        recipes: &[RecipeId],
    ) -> impl Future<Output = Result<Vec<IngredientLine>, StoreError>> + Send;

    /// Display names of the given recipes. Unknown ids are absent.
    fn recipe_names(
        &self,
        recipes: &[RecipeId],
    ) -> impl Future<Output = Result<HashMap<RecipeId, String>, StoreError>> + Send;

    fn insert_recipe(
        &self,
        recipe: NewRecipe,
    ) -> impl Future<Output = Result<Recipe, StoreError>> + Send;

    /// Removes the recipe with its lines, tag links, favorites and cart
    /// entries. Returns `false` if the recipe did not exist.
    fn delete_recipe(&self, id: RecipeId)
    -> impl Future<Output = Result<bool, StoreError>> + Send;
}

/// Row-level access to favorites, cart entries and subscriptions.
///
/// Implementations enforce pair uniqueness, referential integrity and the
/// no-self-subscription rule themselves and report violations through the
/// corresponding [`StoreError`] variant.
pub trait RelationStorage: Clone + Send + Sync + 'static {
    /// Atomically inserts the row.
    ///
    /// Fails with [`StoreError::UniqueViolation`] if it already exists and
    /// [`StoreError::ForeignKeyViolation`] if a referenced row is missing.
    fn insert_relation(
        &self,
        relation: Relation,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns `false` if there was nothing to delete.
    fn delete_relation(
        &self,
        relation: Relation,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn relation_exists(
        &self,
        relation: Relation,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// The subset of `recipes` that `user` holds in the `kind` relation.
    fn recipe_relation_among(
        &self,
        kind: RecipeRelation,
        user: UserId,
        recipes: &[RecipeId],
    ) -> impl Future<Output = Result<HashSet<RecipeId>, StoreError>> + Send;

    /// Every recipe `user` holds in the `kind` relation.
    fn recipe_relation_targets(
        &self,
        kind: RecipeRelation,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<RecipeId>, StoreError>> + Send;

    /// Removes all of `user`'s rows of the `kind` relation, returning how many
    /// were removed.
    fn clear_recipe_relation(
        &self,
        kind: RecipeRelation,
        user: UserId,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Authors followed by `follower`, ordered by first name, last name and
    /// username.
    fn subscribed_authors(
        &self,
        follower: UserId,
        offset: u64,
        limit: u64,
    ) -> impl Future<Output = Result<UserSlice, StoreError>> + Send;

    fn subscribed_among(
        &self,
        follower: UserId,
        authors: &[UserId],
    ) -> impl Future<Output = Result<HashSet<UserId>, StoreError>> + Send;
}
