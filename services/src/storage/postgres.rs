//! PostgreSQL implementation of the storage traits.
//!
//! Queries are checked at runtime, so the crate builds without a live
//! database. Constraint violations come back through
//! [`StoreError::from`](super::StoreError) with their kind preserved.

use super::traits::{CatalogStorage, RelationStorage};
use super::types::{RecipeQuery, RecipeRelation, RecipeSlice, Relation, StoreError, UserSlice};
use crate::model::{
    Amount, Ingredient, IngredientId, IngredientLine, NewRecipe, NewUser, Recipe, RecipeId, Tag,
    TagId, User, UserId,
};
use chrono::{DateTime, Utc};
use recipebook_utils::slug::is_valid_slug;
use sqlx::PgPool;
use std::collections::{HashMap, HashSet};

/// Postgres-backed catalog and relation store.
///
/// # Table Schema
///
/// See `migrations/0001_initial.sql`. Every foreign key is plain (no
/// `ON DELETE CASCADE`); deletes remove dependents explicitly in the same
/// transaction.
#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RecipeRow {
    id: RecipeId,
    author_id: UserId,
    name: String,
    text: String,
    cooking_time: i32,
    published_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RecipeTagRow {
    recipe_id: RecipeId,
    id: TagId,
    name: String,
    slug: String,
}

#[derive(sqlx::FromRow)]
struct LineRow {
    recipe_id: RecipeId,
    ingredient_id: IngredientId,
    name: String,
    measurement_unit: String,
    amount: i64,
}

impl TryFrom<LineRow> for IngredientLine {
    type Error = StoreError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let amount = u32::try_from(row.amount)
            .ok()
            .and_then(Amount::new)
            .ok_or_else(|| {
                StoreError::Backend(format!(
                    "recipe {} holds out-of-range amount {}",
                    row.recipe_id, row.amount
                ))
            })?;

        Ok(IngredientLine {
            recipe_id: row.recipe_id,
            ingredient: Ingredient {
                id: row.ingredient_id,
                name: row.name,
                measurement_unit: row.measurement_unit,
            },
            amount,
        })
    }
}

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.text, r.cooking_time, r.published_at";

/// Shared by the listing and count queries. `$1`..`$4` may be NULL to disable
/// a predicate.
const RECIPE_FILTER: &str = r#"
    ($1::text[] IS NULL OR EXISTS (
        SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = r.id AND t.slug = ANY($1)))
    AND ($2::bigint IS NULL OR r.author_id = $2)
    AND ($3::bigint IS NULL OR EXISTS (
        SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $3))
    AND ($4::bigint IS NULL OR EXISTS (
        SELECT 1 FROM cart_entries c WHERE c.recipe_id = r.id AND c.user_id = $4))
"#;

fn raw_ids<T: Copy>(ids: &[T], f: impl Fn(T) -> i64) -> Vec<i64> {
    ids.iter().copied().map(f).collect()
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl PgStorage {
    async fn load_lines(&self, ids: &[i64]) -> Result<Vec<IngredientLine>, StoreError> {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT ri.recipe_id, i.id AS ingredient_id, i.name, i.measurement_unit, ri.amount
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ANY($1)
            ORDER BY ri.recipe_id, ri.position
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(IngredientLine::try_from).collect()
    }

    /// Resolves tags and ingredient lines for `rows`, preserving their order.
    async fn assemble(&self, rows: Vec<RecipeRow>) -> Result<Vec<Recipe>, StoreError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id.0).collect();

        let tag_rows = sqlx::query_as::<_, RecipeTagRow>(
            r#"
            SELECT rt.recipe_id, t.id, t.name, t.slug
            FROM recipe_tags rt
            JOIN tags t ON t.id = rt.tag_id
            WHERE rt.recipe_id = ANY($1)
            ORDER BY t.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags: HashMap<RecipeId, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags.entry(row.recipe_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }

        let mut lines: HashMap<RecipeId, Vec<IngredientLine>> = HashMap::new();
        for line in self.load_lines(&ids).await? {
            lines.entry(line.recipe_id).or_default().push(line);
        }

        rows.into_iter()
            .map(|row| {
                let cooking_time = u32::try_from(row.cooking_time).map_err(|_| {
                    StoreError::Backend(format!(
                        "recipe {} has negative cooking time",
                        row.id
                    ))
                })?;
                Ok(Recipe {
                    id: row.id,
                    author_id: row.author_id,
                    name: row.name,
                    text: row.text,
                    cooking_time,
                    published_at: row.published_at,
                    tags: tags.remove(&row.id).unwrap_or_default(),
                    ingredients: lines.remove(&row.id).unwrap_or_default(),
                })
            })
            .collect()
    }
}

impl CatalogStorage for PgStorage {
    async fn is_connected(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, username, first_name, last_name, is_admin
            FROM users WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        if user.username.is_empty() || user.email.is_empty() {
            return Err(StoreError::InvalidInput(
                "username and email are required".to_owned(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, first_name, last_name, is_admin)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, username, first_name, last_name, is_admin
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row locks block relation and recipe inserts that reference the user
        // or their recipes until the cascade commits.
        let locked = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }
        sqlx::query("SELECT id FROM recipes WHERE author_id = $1 FOR UPDATE")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        for statement in [
            "DELETE FROM favorites WHERE user_id = $1 \
             OR recipe_id IN (SELECT id FROM recipes WHERE author_id = $1)",
            "DELETE FROM cart_entries WHERE user_id = $1 \
             OR recipe_id IN (SELECT id FROM recipes WHERE author_id = $1)",
            "DELETE FROM subscriptions WHERE follower_id = $1 OR author_id = $1",
            "DELETE FROM recipe_tags \
             WHERE recipe_id IN (SELECT id FROM recipes WHERE author_id = $1)",
            "DELETE FROM recipe_ingredients \
             WHERE recipe_id IN (SELECT id FROM recipes WHERE author_id = $1)",
            "DELETE FROM recipes WHERE author_id = $1",
        ] {
            sqlx::query(statement).bind(id.0).execute(&mut *tx).await?;
        }

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, StoreError> {
        let tags = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    async fn get_tag(&self, id: TagId) -> Result<Option<Tag>, StoreError> {
        let tag = sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tag)
    }

    async fn insert_tag(&self, name: &str, slug: &str) -> Result<Tag, StoreError> {
        if name.trim().is_empty() || !is_valid_slug(slug) {
            return Err(StoreError::InvalidInput(format!(
                "invalid tag {name:?} ({slug:?})"
            )));
        }

        let tag = sqlx::query_as::<_, Tag>(
            "INSERT INTO tags (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn list_ingredients(&self, name_prefix: Option<&str>) -> Result<Vec<Ingredient>, StoreError> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, name, measurement_unit
            FROM ingredients
            WHERE $1::text IS NULL OR starts_with(lower(name), lower($1))
            ORDER BY name, id
            "#,
        )
        .bind(name_prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(ingredients)
    }

    async fn get_ingredient(&self, id: IngredientId) -> Result<Option<Ingredient>, StoreError> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ingredient)
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

        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (name, measurement_unit)
            VALUES ($1, $2)
            RETURNING id, name, measurement_unit
            "#,
        )
        .bind(name)
        .bind(measurement_unit)
        .fetch_one(&self.pool)
        .await?;
        Ok(ingredient)
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_recipes(&self, query: &RecipeQuery) -> Result<RecipeSlice, StoreError> {
        let slugs: Option<Vec<String>> = query
            .tag_slugs
            .as_ref()
            .map(|slugs| slugs.iter().cloned().collect());
        let author = query.author.map(|id| id.0);
        let favorited_by = query.favorited_by.map(|id| id.0);
        let in_cart_of = query.in_cart_of.map(|id| id.0);

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM recipes r WHERE {RECIPE_FILTER}"
        ))
        .bind(&slugs)
        .bind(author)
        .bind(favorited_by)
        .bind(in_cart_of)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE {RECIPE_FILTER} \
             ORDER BY r.published_at DESC, r.id DESC LIMIT $5 OFFSET $6"
        ))
        .bind(&slugs)
        .bind(author)
        .bind(favorited_by)
        .bind(in_cart_of)
        .bind(clamp_i64(query.limit))
        .bind(clamp_i64(query.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(RecipeSlice {
            recipes: self.assemble(rows).await?,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn ingredient_lines(&self, recipes: &[RecipeId]) -> Result<Vec<IngredientLine>, StoreError> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }
        self.load_lines(&raw_ids(recipes, |id| id.0)).await
    }

    async fn recipe_names(
        &self,
        recipes: &[RecipeId],
    ) -> Result<HashMap<RecipeId, String>, StoreError> {
        if recipes.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM recipes WHERE id = ANY($1)")
                .bind(raw_ids(recipes, |id| id.0))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| (RecipeId(id), name))
            .collect())
    }

    async fn insert_recipe(&self, recipe: NewRecipe) -> Result<Recipe, StoreError> {
        recipe.validate().map_err(StoreError::InvalidInput)?;
        let cooking_time = i32::try_from(recipe.cooking_time)
            .map_err(|_| StoreError::InvalidInput("cooking time is too large".to_owned()))?;

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (author_id, name, text, cooking_time)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(recipe.author_id.0)
        .bind(&recipe.name)
        .bind(&recipe.text)
        .bind(cooking_time)
        .fetch_one(&mut *tx)
        .await?;

        for tag_id in &recipe.tag_ids {
            sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
                .bind(id)
                .bind(tag_id.0)
                .execute(&mut *tx)
                .await?;
        }

        for (position, (ingredient_id, amount)) in recipe.ingredients.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(id)
            .bind(ingredient_id.0)
            .bind(i64::from(amount.get()))
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_recipe(RecipeId(id))
            .await?
            .ok_or_else(|| StoreError::Backend(format!("recipe {id} vanished after insert")))
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("SELECT id FROM recipes WHERE id = $1 FOR UPDATE")
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        for statement in [
            "DELETE FROM favorites WHERE recipe_id = $1",
            "DELETE FROM cart_entries WHERE recipe_id = $1",
            "DELETE FROM recipe_tags WHERE recipe_id = $1",
            "DELETE FROM recipe_ingredients WHERE recipe_id = $1",
        ] {
            sqlx::query(statement).bind(id.0).execute(&mut *tx).await?;
        }

        let deleted = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted > 0)
    }
}

impl RelationStorage for PgStorage {
    async fn insert_relation(&self, relation: Relation) -> Result<(), StoreError> {
        match relation {
            Relation::Recipe { kind, user, recipe } => {
                sqlx::query(&format!(
                    "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2)",
                    kind.table()
                ))
                .bind(user.0)
                .bind(recipe.0)
                .execute(&self.pool)
                .await?;
            }
            Relation::Subscription { follower, author } => {
                sqlx::query("INSERT INTO subscriptions (follower_id, author_id) VALUES ($1, $2)")
                    .bind(follower.0)
                    .bind(author.0)
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn delete_relation(&self, relation: Relation) -> Result<bool, StoreError> {
        let result = match relation {
            Relation::Recipe { kind, user, recipe } => {
                sqlx::query(&format!(
                    "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
                    kind.table()
                ))
                .bind(user.0)
                .bind(recipe.0)
                .execute(&self.pool)
                .await?
            }
            Relation::Subscription { follower, author } => {
                sqlx::query("DELETE FROM subscriptions WHERE follower_id = $1 AND author_id = $2")
                    .bind(follower.0)
                    .bind(author.0)
                    .execute(&self.pool)
                    .await?
            }
        };
        Ok(result.rows_affected() > 0)
    }

    async fn relation_exists(&self, relation: Relation) -> Result<bool, StoreError> {
        let exists: bool = match relation {
            Relation::Recipe { kind, user, recipe } => {
                sqlx::query_scalar(&format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = $1 AND recipe_id = $2)",
                    kind.table()
                ))
                .bind(user.0)
                .bind(recipe.0)
                .fetch_one(&self.pool)
                .await?
            }
            Relation::Subscription { follower, author } => {
                sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM subscriptions \
                     WHERE follower_id = $1 AND author_id = $2)",
                )
                .bind(follower.0)
                .bind(author.0)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(exists)
    }

    async fn recipe_relation_among(
        &self,
        kind: RecipeRelation,
        user: UserId,
        recipes: &[RecipeId],
    ) -> Result<HashSet<RecipeId>, StoreError> {
        if recipes.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<i64> = sqlx::query_scalar(&format!(
            "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
            kind.table()
        ))
        .bind(user.0)
        .bind(raw_ids(recipes, |id| id.0))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(RecipeId).collect())
    }

    async fn recipe_relation_targets(
        &self,
        kind: RecipeRelation,
        user: UserId,
    ) -> Result<Vec<RecipeId>, StoreError> {
        let ids: Vec<i64> = sqlx::query_scalar(&format!(
            "SELECT recipe_id FROM {} WHERE user_id = $1 ORDER BY recipe_id",
            kind.table()
        ))
        .bind(user.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(RecipeId).collect())
    }

    async fn clear_recipe_relation(
        &self,
        kind: RecipeRelation,
        user: UserId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", kind.table()))
            .bind(user.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn subscribed_authors(
        &self,
        follower: UserId,
        offset: u64,
        limit: u64,
    ) -> Result<UserSlice, StoreError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE follower_id = $1")
                .bind(follower.0)
                .fetch_one(&self.pool)
                .await?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.username, u.first_name, u.last_name, u.is_admin
            FROM subscriptions s
            JOIN users u ON u.id = s.author_id
            WHERE s.follower_id = $1
            ORDER BY u.first_name, u.last_name, u.username, u.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(follower.0)
        .bind(clamp_i64(limit))
        .bind(clamp_i64(offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(UserSlice {
            users,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn subscribed_among(
        &self,
        follower: UserId,
        authors: &[UserId],
    ) -> Result<HashSet<UserId>, StoreError> {
        if authors.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT author_id FROM subscriptions WHERE follower_id = $1 AND author_id = ANY($2)",
        )
        .bind(follower.0)
        .bind(raw_ids(authors, |id| id.0))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewUser;
    use crate::storage::Reference;
    use sqlx::postgres::PgPoolOptions;
    use std::env;
    use std::time::{SystemTime, UNIX_EPOCH};

    async fn setup() -> PgStorage {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&database_url)
            .await
            .expect("Failed to create pool.");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations should apply");
        PgStorage::new(pool)
    }

    fn unique(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    async fn seed_recipe(storage: &PgStorage) -> (UserId, RecipeId) {
        let author = storage
            .insert_user(NewUser::regular(unique("author")))
            .await
            .unwrap();
        let flour = storage
            .insert_ingredient(&unique("flour"), "g")
            .await
            .unwrap();
        let recipe = storage
            .insert_recipe(NewRecipe {
                author_id: author.id,
                name: "Bread".to_owned(),
                text: String::new(),
                cooking_time: 45,
                tag_ids: vec![],
                ingredients: vec![(flour.id, Amount::new(500).unwrap())],
            })
            .await
            .unwrap();
        (author.id, recipe.id)
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_duplicate_favorite_is_unique_violation() {
        let storage = setup().await;
        let (author, recipe) = seed_recipe(&storage).await;

        storage
            .insert_relation(Relation::favorite(author, recipe))
            .await
            .unwrap();
        let err = storage
            .insert_relation(Relation::favorite(author, recipe))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation(_)));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_missing_recipe_is_foreign_key_violation() {
        let storage = setup().await;
        let (author, _) = seed_recipe(&storage).await;

        let err = storage
            .insert_relation(Relation::cart(author, RecipeId(i64::MAX)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::ForeignKeyViolation {
                reference: Reference::Recipe,
                ..
            }
        ));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_delete_recipe_removes_relations() {
        let storage = setup().await;
        let (author, recipe) = seed_recipe(&storage).await;
        let fan = storage
            .insert_user(NewUser::regular(unique("fan")))
            .await
            .unwrap();

        for relation in [
            Relation::favorite(fan.id, recipe),
            Relation::cart(fan.id, recipe),
            Relation::cart(author, recipe),
        ] {
            storage.insert_relation(relation).await.unwrap();
        }

        assert!(storage.delete_recipe(recipe).await.unwrap());
        assert!(storage.get_recipe(recipe).await.unwrap().is_none());
        assert!(
            !storage
                .relation_exists(Relation::cart(fan.id, recipe))
                .await
                .unwrap()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_delete_recipe_wins_against_concurrent_inserts() {
        let storage = setup().await;
        let (_, recipe) = seed_recipe(&storage).await;

        let mut fans = Vec::new();
        for _ in 0..8 {
            let fan = storage
                .insert_user(NewUser::regular(unique("fan")))
                .await
                .unwrap();
            fans.push(fan.id);
        }

        let mut inserts = Vec::new();
        for fan in fans {
            let storage = storage.clone();
            inserts.push(tokio::spawn(async move {
                storage.insert_relation(Relation::favorite(fan, recipe)).await
            }));
        }
        let delete = {
            let storage = storage.clone();
            tokio::spawn(async move { storage.delete_recipe(recipe).await })
        };

        assert!(delete.await.unwrap().unwrap());
        for insert in inserts {
            match insert.await.unwrap() {
                Ok(()) => {}
                Err(StoreError::ForeignKeyViolation {
                    reference: Reference::Recipe,
                    ..
                }) => {}
                Err(other) => panic!("unexpected insert error: {other:?}"),
            }
        }

        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE recipe_id = $1")
            .bind(recipe.0)
            .fetch_one(&storage.pool)
            .await
            .unwrap();
        assert_eq!(left, 0);
        assert!(storage.get_recipe(recipe).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_missing_actor_is_reported_by_column() {
        let storage = setup().await;
        let (author, recipe) = seed_recipe(&storage).await;

        let err = storage
            .insert_relation(Relation::favorite(UserId(i64::MAX), recipe))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::ForeignKeyViolation {
                reference: Reference::User,
                ..
            }
        ));

        let err = storage
            .insert_relation(Relation::subscription(UserId(i64::MAX), author))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::ForeignKeyViolation {
                reference: Reference::Follower,
                ..
            }
        ));
    }
}
