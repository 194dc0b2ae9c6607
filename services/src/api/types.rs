//! Response bodies and the error type shared by the API handlers.

use crate::error::ServiceError;
use crate::model::{Ingredient, IngredientLine, Recipe, Tag, User};
use crate::query::Page;
use crate::storage::StoreError;
use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Generic error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            error: "not_found".to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: "bad_request".to_string(),
            message: message.into(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            error: "internal_error".to_string(),
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            error: "forbidden".to_string(),
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            error: "unauthorized".to_string(),
            message: message.into(),
        }
    }
}

/// An error response ready to be returned from a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ErrorResponse) -> Self {
        Self { status, body }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorResponse::not_found(message))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorResponse::bad_request(message))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorResponse::forbidden(message))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorResponse::unauthorized(message))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::internal_error(message),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound { .. } => Self::not_found(err.to_string()),
            ServiceError::InvalidOperation(message) => Self::bad_request(message),
            ServiceError::AmountOverflow { .. } => {
                tracing::error!("Shopping list aggregation failed: {}", err);
                Self::internal(err.to_string())
            }
            ServiceError::Storage(e) => e.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Storage error: {:?}", err);
        Self::internal("Storage operation failed")
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Paginated list envelope.
#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PageResponse<T> {
    /// Wraps `results` for `page`; `next`/`previous` point at `uri` with the
    /// `page` parameter replaced.
    pub fn new<U>(uri: &Uri, page: &Page<U>, results: Vec<T>) -> Self {
        let number = page.request.number;
        Self {
            count: page.total,
            next: page.has_next().then(|| with_page(uri, number + 1)),
            previous: page.has_previous().then(|| with_page(uri, number - 1)),
            results,
        }
    }
}

fn with_page(uri: &Uri, number: u64) -> String {
    let mut pairs: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && *pair != "page" && !pair.starts_with("page="))
        .collect();
    let page = format!("page={number}");
    pairs.push(&page);
    format!("{}?{}", uri.path(), pairs.join("&"))
}

#[derive(Debug, Serialize)]
pub struct TagItem {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl From<Tag> for TagItem {
    fn from(tag: Tag) -> Self {
        Self {
            id: tag.id.0,
            name: tag.name,
            slug: tag.slug,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngredientItem {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl From<Ingredient> for IngredientItem {
    fn from(ingredient: Ingredient) -> Self {
        Self {
            id: ingredient.id.0,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

/// An ingredient line inside a recipe.
#[derive(Debug, Serialize)]
pub struct RecipeIngredientItem {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

impl From<IngredientLine> for RecipeIngredientItem {
    fn from(line: IngredientLine) -> Self {
        Self {
            id: line.ingredient.id.0,
            name: line.ingredient.name,
            measurement_unit: line.ingredient.measurement_unit,
            amount: line.amount.get(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserItem {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserItem {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            id: user.id.0,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecipeItem {
    pub id: i64,
    pub tags: Vec<TagItem>,
    pub author: UserItem,
    pub ingredients: Vec<RecipeIngredientItem>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub published_at: DateTime<Utc>,
}

/// Compact recipe form returned by favorite/cart actions and subscriptions.
#[derive(Debug, Serialize)]
pub struct RecipeShortItem {
    pub id: i64,
    pub name: String,
    pub cooking_time: u32,
}

impl From<Recipe> for RecipeShortItem {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id.0,
            name: recipe.name,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// A followed author with a preview of their recipes.
#[derive(Debug, Serialize)]
pub struct SubscriptionItem {
    #[serde(flatten)]
    pub author: UserItem,
    pub recipes: Vec<RecipeShortItem>,
    pub recipes_count: u64,
}

#[derive(Debug, Serialize)]
pub struct ClearCartResponse {
    pub removed: u64,
}
