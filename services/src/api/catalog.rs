//! Read-only tag and ingredient endpoints.

use super::AppState;
use super::types::{ApiResult, IngredientItem, TagItem};
use crate::error::{Entity, ServiceError};
use crate::model::{IngredientId, TagId};
use crate::storage::Storage;
use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::extract::Query;
use serde::Deserialize;

/// GET /api/tags
pub async fn list_tags<S: Storage>(
    State(state): State<AppState<S>>,
) -> ApiResult<Json<Vec<TagItem>>> {
    let tags = state.storage.list_tags().await?;
    Ok(Json(tags.into_iter().map(TagItem::from).collect()))
}

/// GET /api/tags/{id}
pub async fn get_tag<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TagItem>> {
    state
        .storage
        .get_tag(TagId(id))
        .await?
        .map(|tag| Json(TagItem::from(tag)))
        .ok_or_else(|| ServiceError::not_found(Entity::Tag, id).into())
}

#[derive(Debug, Default, Deserialize)]
pub struct IngredientSearch {
    /// Case-insensitive name prefix.
    pub name: Option<String>,
}

/// GET /api/ingredients?name=<prefix>
pub async fn list_ingredients<S: Storage>(
    State(state): State<AppState<S>>,
    Query(search): Query<IngredientSearch>,
) -> ApiResult<Json<Vec<IngredientItem>>> {
    let prefix = search.name.as_deref().filter(|p| !p.is_empty());
    let ingredients = state.storage.list_ingredients(prefix).await?;
    Ok(Json(
        ingredients.into_iter().map(IngredientItem::from).collect(),
    ))
}

/// GET /api/ingredients/{id}
pub async fn get_ingredient<S: Storage>(
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<IngredientItem>> {
    state
        .storage
        .get_ingredient(IngredientId(id))
        .await?
        .map(|ingredient| Json(IngredientItem::from(ingredient)))
        .ok_or_else(|| ServiceError::not_found(Entity::Ingredient, id).into())
}
