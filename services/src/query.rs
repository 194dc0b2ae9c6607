//! Recipe listing: raw query parameters, their validated form and the engine
//! that turns a filter into an annotated page.

use crate::error::{Entity, ServiceError, ServiceResult};
use crate::ledger::RelationLedger;
use crate::model::{Recipe, RecipeId, UserId};
use crate::storage::{CatalogStorage, RecipeQuery, RelationStorage};
use recipebook_utils::slug::is_valid_slug;
use serde::Deserialize;
use std::collections::BTreeSet;

/// Page size bounds, taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSettings {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            default_size: 6,
            max_size: 100,
        }
    }
}

/// Validated page request. `number` starts at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        settings: PageSettings,
    ) -> ServiceResult<Self> {
        let number = match page {
            None => 1,
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if n >= 1 => n,
                _ => return Err(ServiceError::invalid(format!("invalid page {raw:?}"))),
            },
        };
        let size = match limit {
            None => settings.default_size,
            Some(raw) => match raw.parse::<u64>() {
                Ok(n) if (1..=settings.max_size).contains(&n) => n,
                _ => {
                    return Err(ServiceError::invalid(format!(
                        "limit must be between 1 and {}, got {raw:?}",
                        settings.max_size
                    )));
                }
            },
        };
        Ok(Self { number, size })
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

/// Recipe listing parameters exactly as they arrive on the query string.
///
/// `tags` may repeat (`?tags=breakfast&tags=lunch`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeListParams {
    #[serde(default)]
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Typed, validated listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    /// OR semantics: a recipe matches if it carries any of these.
    pub tag_slugs: Option<BTreeSet<String>>,
    pub author: Option<UserId>,
    pub favorited_only: bool,
    pub in_cart_only: bool,
    pub page: PageRequest,
}

impl RecipeFilter {
    pub fn all(page: PageRequest) -> Self {
        Self {
            tag_slugs: None,
            author: None,
            favorited_only: false,
            in_cart_only: false,
            page,
        }
    }

    /// Storage predicates for `viewer`. The relation flags only apply to a
    /// known user.
    fn to_query(&self, viewer: Option<UserId>) -> RecipeQuery {
        RecipeQuery {
            tag_slugs: self.tag_slugs.clone(),
            author: self.author,
            favorited_by: viewer.filter(|_| self.favorited_only),
            in_cart_of: viewer.filter(|_| self.in_cart_only),
            offset: self.page.offset(),
            limit: self.page.size,
        }
    }
}

impl RecipeListParams {
    pub fn validate(self, settings: PageSettings) -> ServiceResult<RecipeFilter> {
        let tag_slugs = if self.tags.is_empty() {
            None
        } else {
            if let Some(bad) = self.tags.iter().find(|slug| !is_valid_slug(slug)) {
                return Err(ServiceError::invalid(format!("malformed tag slug {bad:?}")));
            }
            Some(self.tags.into_iter().collect())
        };

        let author = self
            .author
            .as_deref()
            .map(|raw| {
                raw.parse::<i64>()
                    .map(UserId)
                    .map_err(|_| ServiceError::invalid(format!("invalid author id {raw:?}")))
            })
            .transpose()?;

        Ok(RecipeFilter {
            tag_slugs,
            author,
            favorited_only: parse_flag("is_favorited", self.is_favorited.as_deref())?,
            in_cart_only: parse_flag("is_in_shopping_cart", self.is_in_shopping_cart.as_deref())?,
            page: PageRequest::parse(self.page.as_deref(), self.limit.as_deref(), settings)?,
        })
    }
}

fn parse_flag(name: &str, raw: Option<&str>) -> ServiceResult<bool> {
    match raw {
        None | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(ServiceError::invalid(format!(
            "{name} must be one of 1, 0, true, false; got {other:?}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedRecipe {
    pub recipe: Recipe,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Number of items across all pages.
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.request.offset().saturating_add(self.request.size) < self.total
    }

    pub fn has_previous(&self) -> bool {
        self.request.number > 1
    }
}

#[derive(Clone)]
pub struct QueryEngine<S> {
    storage: S,
    ledger: RelationLedger<S>,
}

impl<S: CatalogStorage + RelationStorage> QueryEngine<S> {
    pub fn new(storage: S) -> Self {
        Self {
            ledger: RelationLedger::new(storage.clone()),
            storage,
        }
    }

    /// Resolves `filter` into one page, most recently published first.
    ///
    /// A page past the end is empty rather than an error.
    pub async fn list(
        &self,
        filter: &RecipeFilter,
        viewer: Option<UserId>,
    ) -> ServiceResult<Page<AnnotatedRecipe>> {
        let slice = self.storage.list_recipes(&filter.to_query(viewer)).await?;
        tracing::debug!(
            total = slice.total,
            returned = slice.recipes.len(),
            page = filter.page.number,
            "Listed recipes"
        );

        Ok(Page {
            items: self.annotate(slice.recipes, viewer).await?,
            total: slice.total,
            request: filter.page,
        })
    }

    pub async fn get(&self, id: RecipeId, viewer: Option<UserId>) -> ServiceResult<AnnotatedRecipe> {
        let recipe = self
            .storage
            .get_recipe(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Entity::Recipe, id))?;

        let mut annotated = self.annotate(vec![recipe], viewer).await?;
        annotated
            .pop()
            .ok_or_else(|| ServiceError::not_found(Entity::Recipe, id))
    }

    /// Adds the viewer's favorite and cart flags with one lookup per relation.
    pub async fn annotate(
        &self,
        recipes: Vec<Recipe>,
        viewer: Option<UserId>,
    ) -> ServiceResult<Vec<AnnotatedRecipe>> {
        let Some(user) = viewer else {
            return Ok(recipes
                .into_iter()
                .map(|recipe| AnnotatedRecipe {
                    recipe,
                    is_favorited: false,
                    is_in_shopping_cart: false,
                })
                .collect());
        };

        let ids: Vec<RecipeId> = recipes.iter().map(|r| r.id).collect();
        let favorited = self.ledger.favorited_among(user, &ids).await?;
        let in_cart = self.ledger.in_cart_among(user, &ids).await?;

        Ok(recipes
            .into_iter()
            .map(|recipe| AnnotatedRecipe {
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                recipe,
            })
            .collect())
    }
}
