//! Handlers for `/api/users/*`.

use super::AppState;
use super::types::{ApiError, ApiResult, PageResponse, RecipeShortItem, SubscriptionItem, UserItem};
use crate::auth::{MaybeAuth, RequireAuth};
use crate::error::{Entity, ServiceError};
use crate::ledger::{AddOutcome, RemoveOutcome};
use crate::model::{User, UserId};
use crate::query::{Page, PageRequest};
use crate::storage::{RecipeQuery, Storage};
use axum::{
    Json,
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Query;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    /// Maximum number of recipes shown per author.
    pub recipes_limit: Option<String>,
}

fn parse_recipes_limit(raw: Option<&str>) -> ApiResult<Option<u64>> {
    raw.map(|raw| {
        raw.parse::<u64>()
            .map_err(|_| ApiError::bad_request(format!("invalid recipes_limit {raw:?}")))
    })
    .transpose()
}

/// Builds the subscription view of `author`: their newest recipes (up to
/// `recipes_limit`) and the total count.
async fn subscription_item<S: Storage>(
    state: &AppState<S>,
    author: User,
    recipes_limit: Option<u64>,
) -> ApiResult<SubscriptionItem> {
    let mut query = RecipeQuery {
        author: Some(author.id),
        ..RecipeQuery::default()
    };
    if let Some(limit) = recipes_limit {
        query.limit = limit;
    }
    let slice = state.storage.list_recipes(&query).await?;

    Ok(SubscriptionItem {
        author: UserItem::new(author, true),
        recipes: slice.recipes.into_iter().map(RecipeShortItem::from).collect(),
        recipes_count: slice.total,
    })
}

/// User profile.
///
/// GET /api/users/{id}
///
/// `is_subscribed` is `false` for anonymous callers.
pub async fn profile<S: Storage>(
    State(state): State<AppState<S>>,
    auth: MaybeAuth,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserItem>> {
    let user = state
        .storage
        .get_user(UserId(id))
        .await?
        .ok_or_else(|| ServiceError::not_found(Entity::User, id))?;

    let is_subscribed = match auth.user_id() {
        Some(viewer) => state.ledger.is_subscribed(viewer, user.id).await?,
        None => false,
    };
    Ok(Json(UserItem::new(user, is_subscribed)))
}

/// The caller's own profile.
///
/// GET /api/users/me
pub async fn me<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
) -> ApiResult<Json<UserItem>> {
    let user = state
        .storage
        .get_user(auth.user_id())
        .await?
        .ok_or_else(|| ServiceError::not_found(Entity::User, auth.user_id()))?;
    Ok(Json(UserItem::new(user, false)))
}

/// Authors the caller follows, ordered by first name, last name and username.
///
/// GET /api/users/subscriptions?page=1&limit=6&recipes_limit=3
pub async fn subscriptions<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<SubscriptionParams>,
) -> ApiResult<Json<PageResponse<SubscriptionItem>>> {
    let request = PageRequest::parse(
        params.page.as_deref(),
        params.limit.as_deref(),
        state.page_settings,
    )?;
    let recipes_limit = parse_recipes_limit(params.recipes_limit.as_deref())?;

    let slice = state
        .storage
        .subscribed_authors(auth.user_id(), request.offset(), request.size)
        .await?;

    let mut results = Vec::with_capacity(slice.users.len());
    for author in slice.users {
        results.push(subscription_item(&state, author, recipes_limit).await?);
    }

    let page: Page<()> = Page {
        items: Vec::new(),
        total: slice.total,
        request,
    };
    Ok(Json(PageResponse::new(&uri, &page, results)))
}

/// Follow an author.
///
/// POST /api/users/{id}/subscribe
///
/// # Errors
///
/// - 400 Bad Request: subscribing to yourself
/// - 404 Not Found: no such author
pub async fn subscribe<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
    Query(params): Query<SubscriptionParams>,
) -> ApiResult<Response> {
    let recipes_limit = parse_recipes_limit(params.recipes_limit.as_deref())?;
    let outcome = state.ledger.subscribe(auth.user_id(), UserId(id)).await?;

    let author = state
        .storage
        .get_user(UserId(id))
        .await?
        .ok_or_else(|| ServiceError::not_found(Entity::User, id))?;
    let status = match outcome {
        AddOutcome::Created => StatusCode::CREATED,
        AddOutcome::AlreadyExists => StatusCode::OK,
    };

    let item = subscription_item(&state, author, recipes_limit).await?;
    Ok((status, Json(item)).into_response())
}

/// DELETE /api/users/{id}/subscribe
pub async fn unsubscribe<S: Storage>(
    State(state): State<AppState<S>>,
    auth: RequireAuth,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    match state.ledger.unsubscribe(auth.user_id(), UserId(id)).await? {
        RemoveOutcome::Removed => Ok(StatusCode::NO_CONTENT),
        RemoveOutcome::NotFound => Err(ApiError::not_found("Not subscribed to this user")),
    }
}
