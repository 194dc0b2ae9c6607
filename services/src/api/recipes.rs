//! Handlers for `/api/recipes/*`.

use super::AppState;
use super::types::{
    ApiError, ApiResult, ClearCartResponse, PageResponse, RecipeIngredientItem, RecipeItem,
    RecipeShortItem, TagItem, UserItem,
};
use crate::auth::{MaybeAuth, RequireAuth};
use crate::error::{Entity, ServiceError};
use crate::ledger::{AddOutcome, RemoveOutcome};
use crate::model::{RecipeId, User, UserId};
use crate::query::{AnnotatedRecipe, RecipeListParams};
use crate::shopping_list::{self, ShoppingList};
use crate::storage::Storage;
use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use std::collections::HashMap;

/// Renders annotated recipes with their authors, resolving each distinct
/// author once.
async fn render<S: Storage>(
    state: &AppState<S>,
    recipes: Vec<AnnotatedRecipe>,
    viewer: Option<UserId>,
) -> ApiResult<Vec<RecipeItem>> {
    let mut author_ids: Vec<UserId> = recipes.iter().map(|r| r.recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut authors: HashMap<UserId, User> = HashMap::new();
    for id in &author_ids {
        let user = state
            .storage
            .get_user(*id)
            .await?
            .ok_or_else(|| ServiceError::not_found(Entity::User, id))?;
        authors.insert(*id, user);
    }
    let subscribed = match viewer {
        Some(viewer) => state.ledger.subscribed_among(viewer, &author_ids).await?,
        None => Default::default(),
    };

    recipes
        .into_iter()
        .map(|annotated| {
            let recipe = annotated.recipe;
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| ApiError::internal("Recipe author missing"))?;
            Ok(RecipeItem {
                id: recipe.id.0,
                tags: recipe.tags.into_iter().map(TagItem::from).collect(),
                author: UserItem::new(author, subscribed.contains(&recipe.author_id)),
                ingredients: recipe
                    .ingredients
                    .into_iter()
                    .map(RecipeIngredientItem::from)
                    .collect(),
                is_favorited: annotated.is_favorited,
                is_in_shopping_cart: annotated.is_in_shopping_cart,
                name: recipe.name,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                published_at: recipe.published_at,
            })
        })
        .collect()
}

/// List recipes.
///
/// GET /api/recipes?tags=<slug>&author=<id>&is_favorited=1&is_in_shopping_cart=1&page=1&limit=6
///
/// `tags` may repeat; a recipe matches if it has any of them. The relation
/// flags are ignored for anonymous callers.
pub async fn list<S: Storage>(
    State(state): State<AppState<S>>,
    auth: MaybeAuth,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<RecipeListParams>,
) -> ApiResult<Json<PageResponse<RecipeItem>>> {
    let viewer = auth.user_id();
    let filter = params.validate(state.page_settings)?;
    let mut page = state.engine.list(&filter, viewer).await?;

    let results = render(&state, std::mem::take(&mut page.items), viewer).await?;
    Ok(Json(PageResponse::new(&uri, &page, results)))
}

/// GET /api/recipes/{id}
pub async fn get<S: Storage>(
    State(state): State<AppState<S>>,
    auth: MaybeAuth,
    Path(id): Path<i64>,
) -> ApiResult<Json<RecipeItem>> {
    let viewer = auth.user_id();
    let recipe = state.engine.get(RecipeId(id), viewer).await?;

    let mut items = render(&state, vec![recipe], viewer).await?;
    items
        .pop()
        .map(Json)
        .ok_or_else(|| ServiceError::not_found(Entity::Recipe, id).into())
}

/// Delete a recipe together with its lines, tag links, favorites and cart
/// entries.
///
/// DELETE /api/recipes/{id}
///
/// # Errors
///
/// - 401 Unauthorized: missing or invalid token
/// - 403 Forbidden: caller is neither the author nor an admin
/// - 404 Not Found: no such recipe
pub async fn delete<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let recipe_id = RecipeId(id);
    let recipe = state
        .storage
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(Entity::Recipe, id))?;
    let caller = state
        .storage
        .get_user(auth.user_id())
        .await?
        .ok_or_else(|| ApiError::unauthorized("Token refers to an unknown user"))?;

    if recipe.author_id != caller.id && !caller.is_admin {
        return Err(ApiError::forbidden(
            "Only the author or an administrator may delete this recipe",
        ));
    }

    if state.storage.delete_recipe(recipe_id).await? {
        tracing::info!(recipe = %recipe_id, user = %caller.id, "Recipe deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServiceError::not_found(Entity::Recipe, id).into())
    }
}

async fn short_recipe<S: Storage>(
    state: &AppState<S>,
    outcome: AddOutcome,
    recipe_id: RecipeId,
) -> ApiResult<Response> {
    let recipe = state
        .storage
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(Entity::Recipe, recipe_id))?;
    let status = match outcome {
        AddOutcome::Created => StatusCode::CREATED,
        AddOutcome::AlreadyExists => StatusCode::OK,
    };
    Ok((status, Json(RecipeShortItem::from(recipe))).into_response())
}

fn removed(outcome: RemoveOutcome, what: &str) -> ApiResult<StatusCode> {
    match outcome {
        RemoveOutcome::Removed => Ok(StatusCode::NO_CONTENT),
        RemoveOutcome::NotFound => Err(ApiError::not_found(format!("Recipe is not in {what}"))),
    }
}

/// POST /api/recipes/{id}/favorite
///
/// 201 when created, 200 with the same body when it already existed.
pub async fn add_favorite<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let outcome = state.ledger.add_favorite(auth.user_id(), RecipeId(id)).await?;
    short_recipe(&state, outcome, RecipeId(id)).await
}

/// DELETE /api/recipes/{id}/favorite
pub async fn remove_favorite<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let outcome = state
        .ledger
        .remove_favorite(auth.user_id(), RecipeId(id))
        .await?;
    removed(outcome, "favorites")
}

/// POST /api/recipes/{id}/shopping_cart
pub async fn add_to_cart<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let outcome = state.ledger.add_to_cart(auth.user_id(), RecipeId(id)).await?;
    short_recipe(&state, outcome, RecipeId(id)).await
}

/// DELETE /api/recipes/{id}/shopping_cart
pub async fn remove_from_cart<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let outcome = state
        .ledger
        .remove_from_cart(auth.user_id(), RecipeId(id))
        .await?;
    removed(outcome, "the shopping cart")
}

/// Consolidated shopping list as JSON.
///
/// GET /api/recipes/shopping_cart
pub async fn shopping_list<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
) -> ApiResult<Json<ShoppingList>> {
    let list = shopping_list::aggregate(&state.storage, auth.user_id()).await?;
    Ok(Json(list))
}

/// Empty the caller's cart.
///
/// DELETE /api/recipes/shopping_cart
pub async fn clear_cart<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
) -> ApiResult<Json<ClearCartResponse>> {
    let removed = state.ledger.clear_cart(auth.user_id()).await?;
    Ok(Json(ClearCartResponse { removed }))
}

/// Shopping list as a plain-text attachment.
///
/// GET /api/recipes/download_shopping_cart
///
/// # Response
///
/// ```text
/// Content-Type: text/plain; charset=utf-8
/// Content-Disposition: attachment; filename="shopping_list.txt"
///
/// - egg (pcs): 3
/// - flour (g): 500
/// ```
pub async fn download_shopping_cart<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
) -> ApiResult<Response> {
    let list = shopping_list::aggregate(&state.storage, auth.user_id()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"shopping_list.txt\"",
            ),
        ],
        list.render_text(),
    )
        .into_response())
}
