//! In-memory storage for tests and local experiments.
//!
//! Catalog rows and relation rows live behind a single lock, so every
//! mutation (including cascading deletes) is one atomic step, mirroring the
//! transactional guarantees of [`PgStorage`](super::PgStorage).

use super::traits::{CatalogStorage, RelationStorage};
use super::types::{
    RecipeQuery, RecipeRelation, RecipeSlice, Reference, Relation, StoreError, UserSlice,
};
use crate::model::{
    Amount, Ingredient, IngredientId, IngredientLine, NewRecipe, NewUser, Recipe, RecipeId, Tag,
    TagId, User, UserId,
};
use chrono::{DateTime, Utc};
use recipebook_utils::slug::is_valid_slug;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory implementation of both storage traits.
///
/// Clones share the same data.
#[derive(Clone)]
pub struct MockStorage {
    state: Arc<RwLock<MockState>>,
    connected: Arc<AtomicBool>,
}

#[derive(Default)]
struct MockState {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    tags: BTreeMap<TagId, Tag>,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    recipes: BTreeMap<RecipeId, StoredRecipe>,
    favorites: BTreeSet<(UserId, RecipeId)>,
    cart: BTreeSet<(UserId, RecipeId)>,
    subscriptions: BTreeSet<(UserId, UserId)>,
}

struct StoredRecipe {
    author_id: UserId,
    name: String,
    text: String,
    cooking_time: u32,
    published_at: DateTime<Utc>,
    tag_ids: Vec<TagId>,
    lines: Vec<(IngredientId, Amount)>,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the backing store going away (or coming back).
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Total number of favorite, cart and subscription rows.
    pub fn relation_count(&self) -> usize {
        self.read()
            .map(|s| s.favorites.len() + s.cart.len() + s.subscriptions.len())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MockState>, StoreError> {
        self.state
            .read()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MockState>, StoreError> {
        self.state
            .write()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl MockState {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn resolve(&self, id: RecipeId, stored: &StoredRecipe) -> Recipe {
        let mut tags: Vec<Tag> = stored
            .tag_ids
            .iter()
            .filter_map(|tag_id| self.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Recipe {
            id,
            author_id: stored.author_id,
            name: stored.name.clone(),
            text: stored.text.clone(),
            cooking_time: stored.cooking_time,
            published_at: stored.published_at,
            tags,
            ingredients: self.lines_of(id, stored),
        }
    }

    fn lines_of(&self, id: RecipeId, stored: &StoredRecipe) -> Vec<IngredientLine> {
        stored
            .lines
            .iter()
            .filter_map(|(ingredient_id, amount)| {
                self.ingredients
                    .get(ingredient_id)
                    .map(|ingredient| IngredientLine {
                        recipe_id: id,
                        ingredient: ingredient.clone(),
                        amount: *amount,
                    })
            })
            .collect()
    }

    fn matches(&self, id: RecipeId, recipe: &StoredRecipe, query: &RecipeQuery) -> bool {
        let tag_match = query.tag_slugs.as_ref().is_none_or(|slugs| {
            recipe.tag_ids.iter().any(|tag_id| {
                self.tags
                    .get(tag_id)
                    .is_some_and(|tag| slugs.contains(&tag.slug))
            })
        });

        tag_match
            && query.author.is_none_or(|author| recipe.author_id == author)
            && query
                .favorited_by
                .is_none_or(|user| self.favorites.contains(&(user, id)))
            && query
                .in_cart_of
                .is_none_or(|user| self.cart.contains(&(user, id)))
    }

    fn recipe_set(&self, kind: RecipeRelation) -> &BTreeSet<(UserId, RecipeId)> {
        match kind {
            RecipeRelation::Favorite => &self.favorites,
            RecipeRelation::Cart => &self.cart,
        }
    }

    fn recipe_set_mut(&mut self, kind: RecipeRelation) -> &mut BTreeSet<(UserId, RecipeId)> {
        match kind {
            RecipeRelation::Favorite => &mut self.favorites,
            RecipeRelation::Cart => &mut self.cart,
        }
    }

    fn remove_recipe(&mut self, id: RecipeId) -> bool {
        if self.recipes.remove(&id).is_none() {
            return false;
        }
        self.favorites.retain(|(_, recipe)| *recipe != id);
        self.cart.retain(|(_, recipe)| *recipe != id);
        true
    }
}

impl CatalogStorage for MockStorage {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        if user.username.is_empty() || user.email.is_empty() {
            return Err(StoreError::InvalidInput(
                "username and email are required".to_owned(),
            ));
        }

        let mut state = self.write()?;
        if state
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(StoreError::UniqueViolation(format!(
                "user {} already exists",
                user.username
            )));
        }

        let id = UserId(state.allocate_id());
        let stored = User {
            id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_admin: user.is_admin,
        };
        state.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let authored: Vec<RecipeId> = state
            .recipes
            .iter()
            .filter(|(_, r)| r.author_id == id)
            .map(|(recipe_id, _)| *recipe_id)
            .collect();
        for recipe_id in authored {
            state.remove_recipe(recipe_id);
        }

        state.favorites.retain(|(user, _)| *user != id);
        state.cart.retain(|(user, _)| *user != id);
        state
            .subscriptions
            .retain(|(follower, author)| *follower != id && *author != id);
        Ok(true)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let mut tags: Vec<Tag> = self.read()?.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tag(&self, id: TagId) -> Result<Option<Tag>, StoreError> {
        Ok(self.read()?.tags.get(&id).cloned())
    }

    async fn insert_tag(&self, name: &str, slug: &str) -> Result<Tag, StoreError> {
        if name.trim().is_empty() || !is_valid_slug(slug) {
            return Err(StoreError::InvalidInput(format!(
                "invalid tag {name:?} ({slug:?})"
            )));
        }

        let mut state = self.write()?;
        if state.tags.values().any(|t| t.name == name || t.slug == slug) {
            return Err(StoreError::UniqueViolation(format!(
                "tag {slug} already exists"
            )));
        }

        let tag = Tag {
            id: TagId(state.allocate_id()),
            name: name.to_owned(),
            slug: slug.to_owned(),
        };
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, StoreError> {
        let prefix = name_prefix.map(str::to_lowercase);
        let mut ingredients: Vec<Ingredient> = self
            .read()?
            .ingredients
            .values()
            .filter(|i| {
                prefix
                    .as_deref()
                    .is_none_or(|p| i.name.to_lowercase().starts_with(p))
            })
            .cloned()
            .collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(ingredients)
    }

    async fn get_ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>, StoreError> {
        Ok(self.read()?.ingredients.get(&id).cloned())
    }

    async fn insert_ingredient(
        &self,
        name: &str,
        measurement_unit: &str,
    ) -> Result<Ingredient, StoreError> {
        if name.trim().is_empty() || measurement_unit.trim().is_empty() {
            return Err(StoreError::InvalidInput(
                "ingredient name and unit are required".to_owned(),
            ));
        }

        let mut state = self.write()?;
        if state
            .ingredients
            .values()
            .any(|i| i.name == name && i.measurement_unit == measurement_unit)
        {
            return Err(StoreError::UniqueViolation(format!(
                "ingredient {name} ({measurement_unit}) already exists"
            )));
        }

        let ingredient = Ingredient {
            id: IngredientId(state.allocate_id()),
            name: name.to_owned(),
            measurement_unit: measurement_unit.to_owned(),
        };
        state.ingredients.insert(ingredient.id, ingredient.clone());
        Ok(ingredient)
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let state = self.read()?;
        Ok(state
            .recipes
            .get(&id)
            .map(|stored| state.resolve(id, stored)))
    }

    async fn list_recipes(&self, query: &RecipeQuery) -> Result<RecipeSlice, StoreError> {
        let state = self.read()?;
        let mut matched: Vec<(RecipeId, &StoredRecipe)> = state
            .recipes
            .iter()
            .filter(|(id, recipe)| state.matches(**id, recipe, query))
            .map(|(id, recipe)| (*id, recipe))
            .collect();
        matched.sort_by(|(a_id, a), (b_id, b)| {
            b.published_at
                .cmp(&a.published_at)
                .then(b_id.cmp(a_id))
        });

        let total = matched.len() as u64;
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
        let recipes = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(id, stored)| state.resolve(id, stored))
            .collect();

        Ok(RecipeSlice { recipes, total })
    }

    async fn ingredient_lines(&self, recipes: &[RecipeId]) -> Result<Vec<IngredientLine>, StoreError> {
        let state = self.read()?;
        Ok(recipes
            .iter()
            .filter_map(|id| state.recipes.get(id).map(|stored| (*id, stored)))
            .flat_map(|(id, stored)| state.lines_of(id, stored))
            .collect())
    }

    async fn recipe_names(
        &self,
        recipes: &[RecipeId],
    ) -> Result<HashMap<RecipeId, String>, StoreError> {
        let state = self.read()?;
        Ok(recipes
            .iter()
            .filter_map(|id| state.recipes.get(id).map(|r| (*id, r.name.clone())))
            .collect())
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        recipe.validate().map_err(StoreError::InvalidInput)?;

        let mut state = self.write()?;
        if !state.users.contains_key(&recipe.author_id) {
            return Err(StoreError::missing(
                Reference::Author,
                format!("author {} does not exist", recipe.author_id),
            ));
        }
        if let Some(missing) = recipe.tag_ids.iter().find(|id| !state.tags.contains_key(id)) {
            return Err(StoreError::missing(
                Reference::Tag,
                format!("tag {missing} does not exist"),
            ));
        }
        if let Some((missing, _)) = recipe
            .ingredients
            .iter()
            .find(|(id, _)| !state.ingredients.contains_key(id))
        {
            return Err(StoreError::missing(
                Reference::Ingredient,
                format!("ingredient {missing} does not exist"),
            ));
        }

        let id = RecipeId(state.allocate_id());
        let stored = StoredRecipe {
            author_id: recipe.author_id,
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            published_at: Utc::now(),
            tag_ids: recipe.tag_ids,
            lines: recipe.ingredients,
        };
        let resolved = state.resolve(id, &stored);
        state.recipes.insert(id, stored);
        Ok(resolved)
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, StoreError> {
        Ok(self.write()?.remove_recipe(id))
    }
}

impl RelationStorage for MockStorage {
    async fn insert_relation(&self, relation: Relation) -> Result<(), StoreError> {
        let mut state = self.write()?;
        match relation {
            Relation::Recipe { kind, user, recipe } => {
                if !state.recipes.contains_key(&recipe) {
                    return Err(StoreError::missing(
                        Reference::Recipe,
                        format!("recipe {recipe} does not exist"),
                    ));
                }
                if !state.users.contains_key(&user) {
                    return Err(StoreError::missing(
                        Reference::User,
                        format!("user {user} does not exist"),
                    ));
                }
                if !state.recipe_set_mut(kind).insert((user, recipe)) {
                    return Err(StoreError::UniqueViolation(format!(
                        "{} ({user}, {recipe}) already exists",
                        kind.table()
                    )));
                }
            }
            Relation::Subscription { follower, author } => {
                if follower == author {
                    return Err(StoreError::CheckViolation(
                        "users cannot subscribe to themselves".to_owned(),
                    ));
                }
                if !state.users.contains_key(&author) {
                    return Err(StoreError::missing(
                        Reference::Author,
                        format!("user {author} does not exist"),
                    ));
                }
                if !state.users.contains_key(&follower) {
                    return Err(StoreError::missing(
                        Reference::Follower,
                        format!("user {follower} does not exist"),
                    ));
                }
                if !state.subscriptions.insert((follower, author)) {
                    return Err(StoreError::UniqueViolation(format!(
                        "subscription ({follower}, {author}) already exists"
                    )));
                }
            }
        }
        Ok(())
    }

    async fn delete_relation(&self, relation: Relation) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        Ok(match relation {
            Relation::Recipe { kind, user, recipe } => {
                state.recipe_set_mut(kind).remove(&(user, recipe))
            }
            Relation::Subscription { follower, author } => {
                state.subscriptions.remove(&(follower, author))
            }
        })
    }

    async fn relation_exists(&self, relation: Relation) -> Result<bool, StoreError> {
        let state = self.read()?;
        Ok(match relation {
            Relation::Recipe { kind, user, recipe } => {
                state.recipe_set(kind).contains(&(user, recipe))
            }
            Relation::Subscription { follower, author } => {
                state.subscriptions.contains(&(follower, author))
            }
        })
    }

    async fn recipe_relation_among(
        &self,
        kind: RecipeRelation,
        user: UserId,
        recipes: &[RecipeId],
    ) -> Result<HashSet<RecipeId>, StoreError> {
        let state = self.read()?;
        let set = state.recipe_set(kind);
        Ok(recipes
            .iter()
            .copied()
            .filter(|recipe| set.contains(&(user, *recipe)))
            .collect())
    }

    async fn recipe_relation_targets(
        &self,
        kind: RecipeRelation,
        user: UserId,
    ) -> Result<Vec<RecipeId>, StoreError> {
        Ok(self
            .read()?
            .recipe_set(kind)
            .range((user, RecipeId(i64::MIN))..=(user, RecipeId(i64::MAX)))
            .map(|(_, recipe)| *recipe)
            .collect())
    }

    async fn clear_recipe_relation(
        &self,
        kind: RecipeRelation,
        user: UserId,
    ) -> Result<u64, StoreError> {
        let mut state = self.write()?;
        let set = state.recipe_set_mut(kind);
        let before = set.len();
        set.retain(|(owner, _)| *owner != user);
        Ok((before - set.len()) as u64)
    }

    async fn subscribed_authors(
        &self,
        follower: UserId,
        offset: u64,
        limit: u64,
    ) -> Result<UserSlice, StoreError> {
        let state = self.read()?;
        let mut users: Vec<User> = state
            .subscriptions
            .iter()
            .filter(|(f, _)| *f == follower)
            .filter_map(|(_, author)| state.users.get(author).cloned())
            .collect();
        users.sort_by(|a, b| {
            (&a.first_name, &a.last_name, &a.username, a.id)
                .cmp(&(&b.first_name, &b.last_name, &b.username, b.id))
        });

        let total = users.len() as u64;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(UserSlice {
            users: users.into_iter().skip(offset).take(limit).collect(),
            total,
        })
    }

    async fn subscribed_among(
        &self,
        follower: UserId,
        authors: &[UserId],
    ) -> Result<HashSet<UserId>, StoreError> {
        let state = self.read()?;
        Ok(authors
            .iter()
            .copied()
            .filter(|author| state.subscriptions.contains(&(follower, *author)))
            .collect())
    }
}
