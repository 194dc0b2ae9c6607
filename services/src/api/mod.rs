//! JSON API mounted under `/api`.
//!
//! Sub-modules by resource:
//! - `recipes` - listing, detail, deletion, favorites, cart and shopping list
//! - `users` - profiles and subscriptions
//! - `catalog` - read-only tags and ingredients
//! - `types` - response bodies and the error type

pub mod catalog;
pub mod recipes;
pub mod types;
pub mod users;

use crate::ledger::RelationLedger;
use crate::query::{PageSettings, QueryEngine};
use crate::storage::Storage;
use axum::{
    Router,
    routing::{get, post},
};

/// Shared handler state. Cheap to clone; every field wraps the same storage.
#[derive(Clone)]
pub struct AppState<S> {
    pub storage: S,
    pub ledger: RelationLedger<S>,
    pub engine: QueryEngine<S>,
    pub page_settings: PageSettings,
}

impl<S: Storage> AppState<S> {
    pub fn new(storage: S, page_settings: PageSettings) -> Self {
        Self {
            ledger: RelationLedger::new(storage.clone()),
            engine: QueryEngine::new(storage.clone()),
            storage,
            page_settings,
        }
    }
}

/// Creates the API router with all endpoints.
pub fn routes<S: Storage>() -> Router<AppState<S>> {
    Router::new()
        // Recipes
        .route("/recipes", get(recipes::list::<S>))
        .route(
            "/recipes/shopping_cart",
            get(recipes::shopping_list::<S>).delete(recipes::clear_cart::<S>),
        )
        .route(
            "/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart::<S>),
        )
        .route(
            "/recipes/{id}",
            get(recipes::get::<S>).delete(recipes::delete::<S>),
        )
        .route(
            "/recipes/{id}/favorite",
            post(recipes::add_favorite::<S>).delete(recipes::remove_favorite::<S>),
        )
        .route(
            "/recipes/{id}/shopping_cart",
            post(recipes::add_to_cart::<S>).delete(recipes::remove_from_cart::<S>),
        )
        // Users
        .route("/users/me", get(users::me::<S>))
        .route("/users/subscriptions", get(users::subscriptions::<S>))
        .route("/users/{id}", get(users::profile::<S>))
        .route(
            "/users/{id}/subscribe",
            post(users::subscribe::<S>).delete(users::unsubscribe::<S>),
        )
        // Catalog
        .route("/tags", get(catalog::list_tags::<S>))
        .route("/tags/{id}", get(catalog::get_tag::<S>))
        .route("/ingredients", get(catalog::list_ingredients::<S>))
        .route("/ingredients/{id}", get(catalog::get_ingredient::<S>))
}
